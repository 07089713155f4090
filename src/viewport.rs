//! Virtual scrolling over the filtered list.
//!
//! Rows are laid out with a fixed height estimate. The real rows may be
//! taller or shorter, so the computed window is approximate; a buffer of
//! extra rows on each side hides most of the error.

/// Row metrics for virtualization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    /// Height used to map scroll offsets to row indices.
    pub estimated_row_height: f64,
    /// Conservative average used for the total scroll extent.
    pub average_row_height: f64,
    /// Extra rows rendered above and below the visible range.
    pub buffer_rows: usize,
}

impl ViewportConfig {
    /// Pixel metrics of a web list: 100px estimate, 80px minimum row height.
    pub const PIXELS: ViewportConfig = ViewportConfig {
        estimated_row_height: 100.0,
        average_row_height: 80.0,
        buffer_rows: 5,
    };

    /// Terminal metrics in lines. Terminal rows are drawn at exactly the
    /// estimated height, so the average needs no margin.
    pub const TERMINAL: ViewportConfig = ViewportConfig {
        estimated_row_height: 2.0,
        average_row_height: 2.0,
        buffer_rows: 5,
    };
}

impl Default for ViewportConfig {
    fn default() -> Self {
        ViewportConfig::TERMINAL
    }
}

/// Inclusive index range to render, plus the total scroll extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualWindow {
    pub start_index: usize,
    pub end_index: usize,
    pub total_height: f64,
}

impl VirtualWindow {
    pub const EMPTY: VirtualWindow = VirtualWindow {
        start_index: 0,
        end_index: 0,
        total_height: 0.0,
    };

    /// Constant time in `item_count`.
    pub fn compute(
        config: &ViewportConfig,
        scroll_top: f64,
        container_height: f64,
        item_count: usize,
    ) -> Self {
        if item_count == 0 {
            return VirtualWindow::EMPTY;
        }
        let last = item_count - 1;
        let row = config.estimated_row_height.max(f64::EPSILON);
        let scroll_top = scroll_top.max(0.0);
        let container_height = container_height.max(0.0);

        let visible_start = clamp_index((scroll_top / row).floor(), last);
        let visible_end = clamp_index(((scroll_top + container_height) / row).ceil(), last);

        VirtualWindow {
            start_index: visible_start.saturating_sub(config.buffer_rows),
            end_index: visible_end.saturating_add(config.buffer_rows).min(last),
            total_height: item_count as f64 * config.average_row_height,
        }
    }

    /// Translation applied to the rendered slice.
    pub fn offset(&self, config: &ViewportConfig) -> f64 {
        self.start_index as f64 * config.estimated_row_height
    }

    pub fn len(&self, item_count: usize) -> usize {
        if item_count == 0 {
            0
        } else {
            self.end_index - self.start_index + 1
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }
}

fn clamp_index(value: f64, last: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= last as f64 {
        last
    } else {
        value as usize
    }
}

/// Scroll position and container size fed by scroll and resize events.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    config: ViewportConfig,
    scroll_top: f64,
    container_height: f64,
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Viewport {
            config,
            scroll_top: 0.0,
            container_height: 0.0,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn container_height(&self) -> f64 {
        self.container_height
    }

    pub fn on_resize(&mut self, container_height: f64) {
        self.container_height = container_height.max(0.0);
    }

    pub fn on_scroll(&mut self, scroll_top: f64, item_count: usize) {
        self.scroll_top = scroll_top.clamp(0.0, self.max_scroll(item_count));
    }

    pub fn scroll_by(&mut self, delta: f64, item_count: usize) {
        self.on_scroll(self.scroll_top + delta, item_count);
    }

    /// Adjusts the scroll offset so the estimated row for `index` is in view.
    pub fn scroll_to_item(&mut self, index: usize, item_count: usize) {
        let row = self.config.estimated_row_height;
        let top = index as f64 * row;
        let bottom = top + row;
        if top < self.scroll_top {
            self.on_scroll(top, item_count);
        } else if bottom > self.scroll_top + self.container_height {
            self.on_scroll(bottom - self.container_height, item_count);
        }
    }

    pub fn window(&self, item_count: usize) -> VirtualWindow {
        VirtualWindow::compute(&self.config, self.scroll_top, self.container_height, item_count)
    }

    /// First row whose estimated position is at or below the scroll offset.
    pub fn first_visible(&self, item_count: usize) -> usize {
        if item_count == 0 {
            return 0;
        }
        clamp_index(
            (self.scroll_top / self.config.estimated_row_height.max(f64::EPSILON)).floor(),
            item_count - 1,
        )
    }

    fn max_scroll(&self, item_count: usize) -> f64 {
        (item_count as f64 * self.config.estimated_row_height - self.container_height).max(0.0)
    }
}
