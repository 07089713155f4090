use std::ops::Range;

use ratatui::{prelude::*, widgets::*};

use crate::app::{App, Mode, ReplaceField};
use crate::search::Matcher;
use crate::subtitle::format_timecode;

/// Screen regions, shared by drawing and mouse hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub status: Rect,
    pub search: Rect,
    pub list: Rect,
    pub panel: Rect,
    pub help: Rect,
}

pub fn layout(area: Rect, mode: Mode) -> AppLayout {
    let panel_height = match mode {
        Mode::Browse => 0,
        Mode::Edit | Mode::Replace | Mode::Rename => 6,
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),            // Status message
            Constraint::Length(3),            // Search input
            Constraint::Min(0),               // Subtitle list
            Constraint::Length(panel_height), // Edit or replace panel
            Constraint::Length(1),            // Help
        ])
        .split(area);

    AppLayout {
        status: chunks[0],
        search: chunks[1],
        list: chunks[2],
        panel: chunks[3],
        help: chunks[4],
    }
}

/// First terminal row holding subtitle content, below the border and header.
pub fn list_body_top(list: Rect) -> u16 {
    list.y.saturating_add(2)
}

pub fn list_body_height(list: Rect) -> u16 {
    list.height.saturating_sub(3)
}

pub fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}

pub fn ui(frame: &mut Frame, app: &App) {
    let regions = layout(frame.size(), app.mode());

    frame.render_widget(
        Paragraph::new(app.status_message().to_string()).style(Style::default().fg(Color::Cyan)),
        regions.status,
    );

    render_search(frame, app, regions.search);
    render_list(frame, app, regions.list);
    match app.mode() {
        Mode::Browse => {}
        Mode::Edit => render_edit_panel(frame, app, regions.panel),
        Mode::Replace => render_replace_panel(frame, app, regions.panel),
        Mode::Rename => render_rename_panel(frame, app, regions.panel),
    }

    let help = match app.mode() {
        Mode::Browse => "Type to search | F2: case | F3: whole word | Enter: edit | Ctrl+R: replace | Tab: next file | Ctrl+S: save | Ctrl+E/J: export SRT/JSON | q: quit",
        Mode::Edit => "Enter: save | Shift+Enter: newline | Esc: revert | Alt+Up/Down: move word | F4: rename speaker | Up/Down: other subtitle",
        Mode::Replace => "Tab: switch field | F2: match case | Up/Down: occurrence | Enter: replace | Ctrl+A: replace all | Esc: close",
        Mode::Rename => "Enter: rename | Esc: cancel",
    };
    frame.render_widget(
        Paragraph::new(help).alignment(Alignment::Center),
        regions.help,
    );
}

fn render_search(frame: &mut Frame, app: &App, area: Rect) {
    let query = app.query();
    let query_display = if query.text.is_empty() {
        "Type to search...".to_string()
    } else {
        format!("Search: {}", query.text)
    };
    let flag = |on: bool, label: &'static str| {
        if on {
            Span::styled(label, Style::default().fg(Color::Black).bg(Color::Yellow))
        } else {
            Span::styled(label, Style::default().fg(Color::DarkGray))
        }
    };
    let line = Line::from(vec![
        Span::styled(
            query_display,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        flag(query.options.case_sensitive, "[Aa]"),
        Span::raw(" "),
        flag(query.options.whole_word, "[word]"),
    ]);

    frame.render_widget(
        Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Search {}", app.file_label())),
        ),
        area,
    );
}

fn render_list(frame: &mut Frame, app: &App, area: Rect) {
    let transcript = app.transcript();
    let filtered = app.filtered();
    let count = filtered.len();
    let viewport = app.viewport();
    let window = app.window();
    let matcher = app.highlight_matcher();
    let active = app.editor().active_index();

    let header_style = Style::default().add_modifier(Modifier::BOLD);
    let rows: Vec<Row> = if count == 0 {
        Vec::new()
    } else {
        filtered[window.start_index..=window.end_index]
            .iter()
            .map(|&index| {
                let subtitle = &transcript.subtitles()[index];
                let style = if active == Some(index) {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default().fg(Color::White)
                };
                let times = Text::from(vec![
                    Line::from(format_timecode(subtitle.start)),
                    Line::from(Span::styled(
                        format_timecode(subtitle.end),
                        Style::default().fg(Color::DarkGray),
                    )),
                ]);
                let speaker = transcript.speaker_name(index).unwrap_or_default().to_string();
                Row::new(vec![
                    Cell::from(format!("{:>5}", index + 1)),
                    Cell::from(times),
                    Cell::from(speaker),
                    Cell::from(highlighted(&subtitle.text, &matcher)),
                ])
                .height(viewport.config().estimated_row_height as u16)
                .style(style)
            })
            .collect()
    };

    let widths = [
        Constraint::Length(6),       // Number
        Constraint::Length(10),      // Start and end
        Constraint::Length(14),      // Speaker
        Constraint::Percentage(100), // Text
    ];

    let table = Table::new(rows, widths)
        .header(Row::new(vec![
            Cell::from("#").style(header_style),
            Cell::from("Time").style(header_style),
            Cell::from("Speaker").style(header_style),
            Cell::from("Text").style(header_style),
        ]))
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Subtitles ({} of {})",
            count,
            transcript.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    // The slice starts at the buffered window start; skip to the first visible row.
    let first_visible = viewport.first_visible(count);
    let visible_rows =
        (f64::from(list_body_height(area)) / viewport.config().estimated_row_height).floor() as usize;
    let selected = app
        .selected()
        .and_then(|s| filtered.binary_search(&s).ok())
        .filter(|&p| p >= first_visible && p < first_visible + visible_rows.max(1))
        .map(|p| p - window.start_index);
    let mut state = TableState::default()
        .with_offset(first_visible.saturating_sub(window.start_index))
        .with_selected(selected);
    frame.render_stateful_widget(table, area, &mut state);

    let mut scrollbar_state = ScrollbarState::new(window.total_height as usize)
        .viewport_content_length(viewport.container_height() as usize)
        .position(viewport.scroll_top() as usize);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        area.inner(&Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut scrollbar_state,
    );
}

/// Newlines are shown as spaces so the match ranges stay aligned.
fn highlighted(text: &str, matcher: &Matcher) -> Line<'static> {
    let flat = text.replace('\n', " ");
    let ranges = matcher.highlight_ranges(&flat);
    spans_for(&flat, &ranges)
}

fn spans_for(text: &str, ranges: &[Range<usize>]) -> Line<'static> {
    let emphasis = Style::default().fg(Color::Black).bg(Color::Yellow);
    let mut spans = Vec::new();
    let mut cursor = 0;
    for range in ranges {
        if range.start < cursor || range.end > text.len() {
            continue;
        }
        if range.start > cursor {
            spans.push(Span::raw(text[cursor..range.start].to_string()));
        }
        spans.push(Span::styled(text[range.clone()].to_string(), emphasis));
        cursor = range.end;
    }
    if cursor < text.len() {
        spans.push(Span::raw(text[cursor..].to_string()));
    }
    Line::from(spans)
}

fn render_edit_panel(frame: &mut Frame, app: &App, area: Rect) {
    let editor = app.editor();
    let (Some(index), Some(draft)) = (editor.active_index(), editor.draft()) else {
        return;
    };
    let len = app.transcript().len();
    let mut moves = Vec::new();
    if editor.can_move_to_previous(index) {
        moves.push("Alt+Up: first word to previous");
    }
    if editor.can_move_to_next(index, len) {
        moves.push("Alt+Down: last word to next");
    }

    let mut title = format!("Editing #{}", index + 1);
    if let Some(name) = app.transcript().speaker_name(index).filter(|n| !n.is_empty()) {
        title.push_str(&format!(" ({name})"));
    }
    if !moves.is_empty() {
        title.push_str(&format!(" | {}", moves.join(" | ")));
    }

    let mut lines: Vec<Line> = draft.split('\n').map(|l| Line::from(l.to_string())).collect();
    if let Some(last) = lines.last_mut() {
        last.spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    }

    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(Color::Yellow)),
        area,
    );
}

fn render_rename_panel(frame: &mut Frame, app: &App, area: Rect) {
    let Some(rename) = app.speaker_rename() else {
        return;
    };
    let current = app
        .transcript()
        .speakers()
        .get(rename.speaker)
        .map(|s| s.name.as_str())
        .unwrap_or_default();
    let lines = vec![
        Line::from(format!("Current:  {current}")),
        Line::from(vec![
            Span::styled("New name: ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(rename.name.clone()),
            Span::raw("_"),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Speaker {}", rename.speaker + 1)),
        ),
        area,
    );
}

fn render_replace_panel(frame: &mut Frame, app: &App, area: Rect) {
    let panel = app.replace_panel();
    let occurrences = app.occurrences().len();
    let field = |label: &str, value: &str, active: bool| {
        let style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{:<9}", label), style),
            Span::raw(value.to_string()),
            Span::raw(if active { "_" } else { "" }),
        ])
    };

    let position = match panel.current {
        Some(i) if occurrences > 0 => format!("{} occurrences ({} of {})", occurrences, i + 1, occurrences),
        _ => format!("{} occurrences", occurrences),
    };
    let lines = vec![
        field("Find:", &panel.find, panel.field == ReplaceField::Find),
        field("Replace:", &panel.replacement, panel.field == ReplaceField::Replace),
        Line::from(format!(
            "Match case: {} | {}",
            if panel.match_case { "on" } else { "off" },
            position
        )),
    ];

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Find and replace")),
        area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_reserves_panel_only_outside_browse() {
        let area = Rect::new(0, 0, 80, 24);
        let browse = layout(area, Mode::Browse);
        let edit = layout(area, Mode::Edit);
        assert_eq!(browse.panel.height, 0);
        assert_eq!(edit.panel.height, 6);
        assert_eq!(browse.list.height, edit.list.height + 6);
        assert_eq!(list_body_top(browse.list), browse.list.y + 2);
    }

    #[test]
    fn highlight_spans_split_text() {
        let line = spans_for("the cat sat", &[4..7]);
        let parts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["the ", "cat", " sat"]);
    }

    #[test]
    fn hit_test_respects_bounds() {
        let area = Rect::new(2, 3, 10, 5);
        assert!(contains(area, 2, 3));
        assert!(!contains(area, 12, 3));
        assert!(!contains(area, 2, 8));
    }
}
