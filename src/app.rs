use std::path::{Path, PathBuf};

use anyhow::Result;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::layout::Rect;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::editor::InlineEditor;
use crate::search::{
    self, filter_indices, find_occurrences, Matcher, Occurrence, SearchOptions, SearchQuery,
};
use crate::transcript::Transcript;
use crate::ui;
use crate::viewport::{Viewport, ViewportConfig, VirtualWindow};

/// Startup options, filled from the command line.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub export_dir: PathBuf,
    pub file: Option<PathBuf>,
    pub search: SearchOptions,
    pub speaker_labels: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Edit,
    Replace,
    /// Renaming the speaker of the subtitle being edited.
    Rename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceField {
    Find,
    Replace,
}

#[derive(Debug, Clone)]
pub struct ReplacePanel {
    pub find: String,
    pub replacement: String,
    pub match_case: bool,
    pub field: ReplaceField,
    pub current: Option<usize>,
}

impl Default for ReplacePanel {
    fn default() -> Self {
        ReplacePanel {
            find: String::new(),
            replacement: String::new(),
            match_case: false,
            field: ReplaceField::Find,
            current: None,
        }
    }
}

/// Name being typed for a speaker registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerRename {
    pub speaker: usize,
    pub name: String,
}

impl ReplacePanel {
    fn active_field(&mut self) -> &mut String {
        match self.field {
            ReplaceField::Find => &mut self.find,
            ReplaceField::Replace => &mut self.replacement,
        }
    }
}

pub struct App {
    settings: Settings,
    files: Vec<PathBuf>,     // Transcripts found under the input directory
    file_idx: usize,
    transcript: Transcript,
    query: SearchQuery,
    mode: Mode,
    filtered: Vec<usize>,    // Original indices passing the query, ascending
    filter_key: Option<(u64, SearchQuery)>,
    selected: Option<usize>, // Original index of the cursor row
    editor: InlineEditor,
    viewport: Viewport,
    replace: ReplacePanel,
    rename: Option<SpeakerRename>,
    area: Rect,
    status_message: String,
    should_quit: bool,
}

/// All `.json` and `.srt` files under `dir`, sorted by path.
pub fn discover_transcripts(dir: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("srt"))
        })
        .map(|e| e.path().to_path_buf())
        .collect::<Vec<_>>();
    files.sort();
    files
}

impl App {
    pub fn new(settings: Settings) -> Result<App> {
        let mut files = discover_transcripts(&settings.input_dir);
        if let Some(file) = &settings.file {
            files.retain(|f| f != file);
            files.insert(0, file.clone());
        }

        let (transcript, status_message) = match files.first() {
            Some(first) => match Transcript::open(first) {
                Ok(t) => {
                    let message = format!("Loaded {} subtitles from {}", t.len(), first.display());
                    (t, message)
                }
                // an explicitly requested file must load
                Err(e) if settings.file.is_some() => return Err(e.into()),
                Err(e) => {
                    warn!(path = %first.display(), error = %e, "could not open transcript");
                    (Transcript::new(Vec::new(), Vec::new()), format!("Error: {}", e))
                }
            },
            None => (
                Transcript::new(Vec::new(), Vec::new()),
                format!("No transcripts found in {}", settings.input_dir.display()),
            ),
        };

        let mut app = App::with_transcript(transcript, settings);
        app.files = files;
        app.status_message = status_message;
        Ok(app)
    }

    pub fn with_transcript(transcript: Transcript, settings: Settings) -> App {
        let query = SearchQuery::new(String::new(), settings.search);
        let mut app = App {
            settings,
            files: Vec::new(),
            file_idx: 0,
            transcript,
            query,
            mode: Mode::Browse,
            filtered: Vec::new(),
            filter_key: None,
            selected: None,
            editor: InlineEditor::new(),
            viewport: Viewport::new(ViewportConfig::TERMINAL),
            replace: ReplacePanel::default(),
            rename: None,
            area: Rect::new(0, 0, 80, 24),
            status_message: String::from("Type to search, Enter to edit, Ctrl+R to replace"),
            should_quit: false,
        };
        app.refresh();
        app
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn filtered(&self) -> &[usize] {
        &self.filtered
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn editor(&self) -> &InlineEditor {
        &self.editor
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn replace_panel(&self) -> &ReplacePanel {
        &self.replace
    }

    pub fn speaker_rename(&self) -> Option<&SpeakerRename> {
        self.rename.as_ref()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn file_label(&self) -> String {
        match self.transcript.path() {
            Some(path) if self.files.len() > 1 => {
                format!("{} ({}/{})", path.display(), self.file_idx + 1, self.files.len())
            }
            Some(path) => path.display().to_string(),
            None => String::from("(no transcript)"),
        }
    }

    pub fn window(&self) -> VirtualWindow {
        self.viewport.window(self.filtered.len())
    }

    /// Matcher for list highlighting: the find text while replacing,
    /// otherwise the search query.
    pub fn highlight_matcher(&self) -> Matcher {
        match self.mode {
            Mode::Replace => Matcher::new(&SearchQuery::new(
                self.replace.find.clone(),
                SearchOptions {
                    case_sensitive: self.replace.match_case,
                    whole_word: false,
                },
            )),
            _ => Matcher::new(&self.query),
        }
    }

    pub fn occurrences(&self) -> Vec<Occurrence> {
        find_occurrences(self.transcript.subtitles(), &self.replace.find, self.replace.match_case)
    }

    fn selected_position(&self) -> Option<usize> {
        self.filtered.binary_search(&self.selected?).ok()
    }

    /// Recomputes the filter when the collection or query changed and keeps
    /// the viewport and editor consistent with it.
    ///
    /// A recompute lowercases every subtitle for case-insensitive queries.
    /// The key below keeps that to one pass per keystroke or edit, not one
    /// per frame.
    pub fn refresh(&mut self) {
        let key = (self.transcript.revision(), self.query.clone());
        if self.filter_key.as_ref() != Some(&key) {
            self.filtered = filter_indices(
                self.transcript.subtitles(),
                self.transcript.speakers(),
                self.transcript.resolver(),
                &self.query,
            );
            self.filter_key = Some(key);
        }

        let list = ui::layout(self.area, self.mode).list;
        self.viewport.on_resize(f64::from(ui::list_body_height(list)));
        self.viewport.scroll_by(0.0, self.filtered.len());

        if self.selected.is_some_and(|s| s >= self.transcript.len()) {
            self.selected = None;
        }
        self.editor.sync(&self.transcript);
    }

    pub fn on_resize(&mut self, area: Rect) {
        self.area = area;
        self.refresh();
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => self.on_resize(Rect::new(0, 0, width, height)),
            _ => {}
        }
        self.refresh();
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }
        match self.mode {
            Mode::Browse => self.browse_key(key),
            Mode::Edit => self.edit_key(key),
            Mode::Replace => self.replace_key(key),
            Mode::Rename => self.rename_key(key),
        }
        self.refresh();
    }

    fn browse_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('r') if ctrl => {
                self.mode = Mode::Replace;
                self.status_message = "Find and replace: Tab switches field, Ctrl+A replaces all".to_string();
            }
            KeyCode::Char('s') if ctrl => self.save(),
            KeyCode::Char('e') if ctrl => self.export_srt(),
            KeyCode::Char('j') if ctrl => self.export_json(),
            KeyCode::Char('q') if self.query.text.is_empty() => self.quit(),
            KeyCode::Char(c) if !ctrl => {
                self.query.text.push(c);
                self.on_query_changed();
            }
            KeyCode::Backspace => {
                self.query.text.pop();
                self.on_query_changed();
            }
            KeyCode::Esc => {
                self.query.text.clear();
                self.on_query_changed();
            }
            KeyCode::F(2) => {
                self.query.options.case_sensitive = !self.query.options.case_sensitive;
                self.on_query_changed();
            }
            KeyCode::F(3) => {
                self.query.options.whole_word = !self.query.options.whole_word;
                self.on_query_changed();
            }
            KeyCode::Tab => self.next_file(),
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Home => self.move_cursor(isize::MIN),
            KeyCode::End => self.move_cursor(isize::MAX),
            KeyCode::PageUp => self.scroll_page(-1.0),
            KeyCode::PageDown => self.scroll_page(1.0),
            KeyCode::Enter => match self.selected {
                Some(index) => self.begin_edit(index),
                None => self.status_message = "No subtitle selected".to_string(),
            },
            _ => {}
        }
    }

    fn edit_key(&mut self, key: KeyEvent) {
        let Some(index) = self.editor.active_index() else {
            self.mode = Mode::Browse;
            return;
        };
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Esc => {
                self.editor.cancel(&mut self.transcript);
                self.status_message = "Edit reverted".to_string();
            }
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.editor.insert_char('\n', &mut self.transcript);
            }
            KeyCode::Enter => {
                self.editor.commit();
                self.mode = Mode::Browse;
                self.persist("Edit saved");
            }
            KeyCode::Up if alt => {
                if self.editor.move_first_word_to_previous(index, &mut self.transcript) {
                    self.persist("Moved first word to previous subtitle");
                } else {
                    self.status_message = "Nothing to move to the previous subtitle".to_string();
                }
            }
            KeyCode::Down if alt => {
                if self.editor.move_last_word_to_next(index, &mut self.transcript) {
                    self.persist("Moved last word to next subtitle");
                } else {
                    self.status_message = "Nothing to move to the next subtitle".to_string();
                }
            }
            KeyCode::F(4) => match self.transcript.speaker_index(index) {
                Some(speaker) => {
                    let name = self.transcript.speakers()[speaker].name.clone();
                    self.rename = Some(SpeakerRename { speaker, name });
                    self.mode = Mode::Rename;
                    self.status_message = "Rename speaker: Enter applies, Esc keeps the old name".to_string();
                }
                None => self.status_message = "This subtitle has no speaker".to_string(),
            },
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Backspace => self.editor.delete_char(&mut self.transcript),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.editor.insert_char(c, &mut self.transcript);
            }
            _ => {}
        }
    }

    fn rename_key(&mut self, key: KeyEvent) {
        let Some(rename) = self.rename.as_mut() else {
            self.mode = Mode::Edit;
            return;
        };
        match key.code {
            KeyCode::Esc => {
                self.rename = None;
                self.mode = Mode::Edit;
                self.status_message = "Speaker unchanged".to_string();
            }
            KeyCode::Enter => {
                let SpeakerRename { speaker, name } = rename.clone();
                self.rename = None;
                self.mode = Mode::Edit;
                if name.trim().is_empty() {
                    self.status_message = "Speaker name cannot be empty".to_string();
                } else if self.transcript.rename_speaker(speaker, &name) {
                    self.persist(&format!("Speaker renamed to {}", name.trim()));
                } else {
                    self.status_message = "Speaker unchanged".to_string();
                }
            }
            KeyCode::Backspace => {
                rename.name.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => rename.name.push(c),
            _ => {}
        }
    }

    fn replace_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Browse;
                self.status_message = "Find and replace closed".to_string();
            }
            KeyCode::Tab => {
                self.replace.field = match self.replace.field {
                    ReplaceField::Find => ReplaceField::Replace,
                    ReplaceField::Replace => ReplaceField::Find,
                };
            }
            KeyCode::F(2) => {
                self.replace.match_case = !self.replace.match_case;
                self.reset_occurrence();
            }
            KeyCode::Char('a') if ctrl => self.replace_all(),
            KeyCode::Char(c) if !ctrl => {
                self.replace.active_field().push(c);
                if self.replace.field == ReplaceField::Find {
                    self.reset_occurrence();
                }
            }
            KeyCode::Backspace => {
                self.replace.active_field().pop();
                if self.replace.field == ReplaceField::Find {
                    self.reset_occurrence();
                }
            }
            KeyCode::Up => self.step_occurrence(false),
            KeyCode::Down => self.step_occurrence(true),
            KeyCode::Enter => self.replace_current(),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        let count = self.filtered.len();
        let row_height = self.viewport.config().estimated_row_height;
        match mouse.kind {
            MouseEventKind::ScrollUp => self.viewport.scroll_by(-row_height, count),
            MouseEventKind::ScrollDown => self.viewport.scroll_by(row_height, count),
            MouseEventKind::Down(MouseButton::Left) => {
                let list = ui::layout(self.area, self.mode).list;
                if !ui::contains(list, mouse.column, mouse.row) {
                    if self.editor.is_editing() {
                        self.editor.deselect();
                        self.rename = None;
                        self.mode = Mode::Browse;
                        self.persist("Selection cleared");
                    }
                    return;
                }
                if let Some(index) = self.row_at(list, mouse.row) {
                    self.selected = Some(index);
                    self.begin_edit(index);
                }
            }
            _ => {}
        }
    }

    /// Original index of the subtitle drawn at terminal row `y`.
    fn row_at(&self, list: Rect, y: u16) -> Option<usize> {
        let body_top = ui::list_body_top(list);
        if y < body_top {
            return None;
        }
        let row = (f64::from(y - body_top) / self.viewport.config().estimated_row_height).floor() as usize;
        let position = self.viewport.first_visible(self.filtered.len()) + row;
        self.filtered.get(position).copied()
    }

    fn on_query_changed(&mut self) {
        self.refresh();
        self.viewport.on_scroll(0.0, self.filtered.len());
        self.selected = self.filtered.first().copied();
        self.status_message = format!(
            "Found {} of {} subtitles{}{}",
            self.filtered.len(),
            self.transcript.len(),
            if self.query.options.case_sensitive { " [Aa]" } else { "" },
            if self.query.options.whole_word { " [word]" } else { "" },
        );
    }

    fn move_cursor(&mut self, delta: isize) {
        let count = self.filtered.len();
        if count == 0 {
            return;
        }
        let base = match self.selected.map(|s| self.filtered.binary_search(&s)) {
            Some(Ok(p)) => p as isize,
            // cursor row filtered out: step from where it would sit
            Some(Err(p)) if delta > 0 => p as isize - 1,
            Some(Err(p)) => p as isize,
            None => -1,
        };
        let target = base.saturating_add(delta).clamp(0, count as isize - 1) as usize;
        let index = self.filtered[target];
        self.selected = Some(index);
        self.viewport.scroll_to_item(target, count);

        if self.mode == Mode::Edit && self.editor.select(index, &self.transcript) {
            self.persist_quietly();
        }
    }

    fn scroll_page(&mut self, direction: f64) {
        let page = self.viewport.container_height().max(1.0);
        self.viewport.scroll_by(direction * page, self.filtered.len());
    }

    fn begin_edit(&mut self, index: usize) {
        if self.editor.select(index, &self.transcript) {
            self.status_message =
                "Editing: Enter saves, Esc reverts, Alt+Up/Down move words".to_string();
        }
        self.selected = Some(index);
        self.mode = Mode::Edit;
        if let Some(position) = self.selected_position() {
            self.viewport.scroll_to_item(position, self.filtered.len());
        }
    }

    fn reset_occurrence(&mut self) {
        let count = self.occurrences().len();
        self.replace.current = if count == 0 { None } else { Some(0) };
        self.reveal_occurrence();
    }

    fn step_occurrence(&mut self, forward: bool) {
        let count = self.occurrences().len();
        self.replace.current = if forward {
            search::wrap_next(self.replace.current, count)
        } else {
            search::wrap_previous(self.replace.current, count)
        };
        self.reveal_occurrence();
    }

    fn reveal_occurrence(&mut self) {
        let occurrences = self.occurrences();
        let Some(occurrence) = self.replace.current.and_then(|i| occurrences.get(i)) else {
            return;
        };
        let index = occurrence.subtitle_index;
        self.selected = Some(index);
        if let Some(position) = self.selected_position() {
            self.viewport.scroll_to_item(position, self.filtered.len());
        }
        self.status_message = format!(
            "Occurrence {} of {}",
            self.replace.current.map_or(0, |i| i + 1),
            occurrences.len()
        );
    }

    fn replace_current(&mut self) {
        let occurrences = self.occurrences();
        let Some(occurrence) = self.replace.current.and_then(|i| occurrences.get(i)) else {
            self.status_message = "No occurrence selected".to_string();
            return;
        };
        let next = search::replace_occurrence(
            self.transcript.subtitles(),
            occurrence,
            &self.replace.replacement,
        );
        self.transcript.replace_subtitles(next);

        let remaining = self.occurrences().len();
        self.replace.current = match self.replace.current {
            Some(i) if i < remaining => Some(i),
            _ if remaining > 0 => Some(0),
            _ => None,
        };
        self.persist(&format!("Replaced 1 occurrence, {} left", remaining));
        self.refresh();
        self.reveal_occurrence();
    }

    fn replace_all(&mut self) {
        let (next, changed) = search::replace_all(
            self.transcript.subtitles(),
            &self.replace.find,
            &self.replace.replacement,
            self.replace.match_case,
        );
        if changed == 0 {
            self.status_message = "Nothing to replace".to_string();
            return;
        }
        self.transcript.replace_subtitles(next);
        self.replace = ReplacePanel {
            match_case: self.replace.match_case,
            ..ReplacePanel::default()
        };
        self.persist(&format!("Replaced text in {} subtitles", changed));
    }

    fn next_file(&mut self) {
        if self.files.len() < 2 {
            self.status_message = "No other transcripts to open".to_string();
            return;
        }
        self.persist_quietly();
        let next_idx = (self.file_idx + 1) % self.files.len();
        let path = self.files[next_idx].clone();
        match Transcript::open(&path) {
            Ok(transcript) => {
                self.file_idx = next_idx;
                self.status_message = format!("Loaded {} subtitles from {}", transcript.len(), path.display());
                self.transcript = transcript;
                self.editor.deselect();
                self.selected = None;
                self.filter_key = None;
                self.viewport.on_scroll(0.0, 0);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open transcript");
                self.status_message = format!("Error: {}", e);
            }
        }
    }

    fn save(&mut self) {
        match self.transcript.save() {
            Ok(path) => self.status_message = format!("Saved {}", path.display()),
            Err(e) => {
                warn!(error = %e, "save failed");
                self.status_message = format!("Save error: {}", e);
            }
        }
    }

    fn needs_autosave(&self) -> bool {
        self.transcript.is_dirty() && self.transcript.path().is_some()
    }

    /// Saves a dirty transcript that came from a file. Failures are logged
    /// and reported, never raised.
    fn persist(&mut self, done: &str) {
        if !self.needs_autosave() {
            self.status_message = done.to_string();
            return;
        }
        match self.transcript.save() {
            Ok(_) => self.status_message = done.to_string(),
            Err(e) => {
                warn!(error = %e, "autosave failed");
                self.status_message = format!("{} (not saved: {})", done, e);
            }
        }
    }

    fn persist_quietly(&mut self) {
        if self.needs_autosave() {
            if let Err(e) = self.transcript.save() {
                warn!(error = %e, "autosave failed");
            }
        }
    }

    fn export_target(&self, extension: &str) -> PathBuf {
        let stem = self
            .transcript
            .path()
            .and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or("subtitles");
        self.settings.export_dir.join(format!("{stem}.{extension}"))
    }

    fn export_srt(&mut self) {
        let target = self.export_target("srt");
        self.status_message = match self.transcript.export_srt(&target, self.settings.speaker_labels) {
            Ok(()) => format!("SRT exported to {}", target.display()),
            Err(e) => {
                warn!(error = %e, "SRT export failed");
                format!("Export error: {}", e)
            }
        };
    }

    fn export_json(&mut self) {
        let target = self.export_target("json");
        self.status_message = match self.transcript.export_json(&target) {
            Ok(()) => format!("JSON exported to {}", target.display()),
            Err(e) => {
                warn!(error = %e, "JSON export failed");
                format!("Export error: {}", e)
            }
        };
    }

    fn quit(&mut self) {
        if self.editor.is_editing() {
            self.editor.commit();
        }
        self.persist_quietly();
        info!("quitting");
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::{Speaker, SpeakerRef, Subtitle};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn with_mods(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn app(texts: &[&str]) -> App {
        let subtitles = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Subtitle::new(i as u64, i as f64, i as f64 + 1.0, *t))
            .collect();
        App::with_transcript(Transcript::new(subtitles, Vec::new()), Settings::default())
    }

    #[test]
    fn typing_filters_and_selects_first_match() {
        let mut app = app(&["the cat", "a dog", "cats and dogs"]);
        type_str(&mut app, "dog");
        assert_eq!(app.filtered(), &[1, 2]);
        assert_eq!(app.selected(), Some(1));

        app.handle_key(key(KeyCode::F(3)));
        assert_eq!(app.filtered(), &[1]);

        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.filtered(), &[0, 1, 2]);
    }

    #[test]
    fn speaker_names_are_searchable() {
        let subtitles = vec![
            Subtitle::new(0, 0.0, 1.0, "hello").with_speaker(SpeakerRef::Numeric(0)),
            Subtitle::new(1, 1.0, 2.0, "hi").with_speaker(SpeakerRef::Numeric(1)),
        ];
        let transcript = Transcript::new(subtitles, vec![Speaker::named("Ann"), Speaker::named("Bob")]);
        let mut app = App::with_transcript(transcript, Settings::default());
        type_str(&mut app, "bob");
        assert_eq!(app.filtered(), &[1]);
    }

    #[test]
    fn edit_cancel_and_commit() {
        let mut app = app(&["hello world", "foo bar"]);
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode(), Mode::Edit);
        assert_eq!(app.editor().active_index(), Some(0));

        type_str(&mut app, "!!");
        assert_eq!(app.transcript().text(0), Some("hello world!!"));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.transcript().text(0), Some("hello world"));
        assert_eq!(app.mode(), Mode::Edit);

        app.handle_key(key(KeyCode::Backspace));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode(), Mode::Browse);
        assert_eq!(app.transcript().text(0), Some("hello worl"));
    }

    #[test]
    fn alt_arrows_move_words() {
        let mut app = app(&["hello world", "foo bar"]);
        app.handle_key(key(KeyCode::End));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(with_mods(KeyCode::Up, KeyModifiers::ALT));
        assert_eq!(app.transcript().text(0), Some("hello world foo"));
        assert_eq!(app.transcript().text(1), Some("bar"));

        app.handle_key(with_mods(KeyCode::Down, KeyModifiers::ALT));
        assert_eq!(app.transcript().text(1), Some("bar"));
    }

    #[test]
    fn arrows_switch_selection_while_editing() {
        let mut app = app(&["one", "two", "three"]);
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.editor().active_index(), Some(1));
        assert_eq!(app.editor().draft(), Some("two"));
    }

    #[test]
    fn click_outside_list_deselects() {
        let mut app = app(&["one", "two"]);
        app.on_resize(Rect::new(0, 0, 80, 24));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        let list = ui::layout(app.area, app.mode()).list;
        app.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 0,
            row: list.y + list.height + 1,
            modifiers: KeyModifiers::NONE,
        });
        assert!(!app.editor().is_editing());
        assert_eq!(app.mode(), Mode::Browse);
    }

    #[test]
    fn click_on_row_starts_editing_it() {
        let mut app = app(&["one", "two", "three"]);
        app.on_resize(Rect::new(0, 0, 80, 24));
        let list = ui::layout(app.area, app.mode()).list;
        let row_height = ViewportConfig::TERMINAL.estimated_row_height as u16;
        app.handle_mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: list.x + 2,
            row: ui::list_body_top(list) + row_height,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(app.editor().active_index(), Some(1));
    }

    #[test]
    fn replace_current_then_all() {
        let mut app = app(&["the cat", "the dog", "The end"]);
        app.handle_key(with_mods(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert_eq!(app.mode(), Mode::Replace);
        type_str(&mut app, "the");
        assert_eq!(app.occurrences().len(), 3);
        app.handle_key(key(KeyCode::Tab));
        type_str(&mut app, "a");

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.transcript().text(1), Some("a dog"));
        assert_eq!(app.occurrences().len(), 2);

        app.handle_key(with_mods(KeyCode::Char('a'), KeyModifiers::CONTROL));
        assert_eq!(app.transcript().text(0), Some("a cat"));
        assert_eq!(app.transcript().text(2), Some("a end"));
        assert!(app.replace_panel().find.is_empty());
    }

    #[test]
    fn commit_autosaves_opened_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.json");
        std::fs::write(
            &path,
            r#"{"speakers": [], "segments": [{"id": 0, "start": 0.0, "end": 1.0, "text": "draft"}]}"#,
        )
        .unwrap();

        let settings = Settings {
            input_dir: dir.path().to_path_buf(),
            export_dir: dir.path().join("exports"),
            ..Settings::default()
        };
        let mut app = App::new(settings).unwrap();
        assert_eq!(app.transcript().len(), 1);

        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        type_str(&mut app, "ed");
        app.handle_key(key(KeyCode::Enter));
        assert!(!app.transcript().is_dirty());

        let saved = Transcript::open(&path).unwrap();
        assert_eq!(saved.text(0), Some("drafted"));

        app.handle_key(with_mods(KeyCode::Char('e'), KeyModifiers::CONTROL));
        assert!(dir.path().join("exports/talk.srt").exists());
    }

    #[test]
    fn renamed_speaker_is_searchable() {
        let subtitles = vec![
            Subtitle::new(0, 0.0, 1.0, "hello").with_speaker(SpeakerRef::Numeric(1)),
            Subtitle::new(1, 1.0, 2.0, "hi").with_speaker(SpeakerRef::Numeric(2)),
        ];
        let transcript = Transcript::new(subtitles, vec![Speaker::named("Ann"), Speaker::named("Bob")]);
        let mut app = App::with_transcript(transcript, Settings::default());

        app.handle_key(key(KeyCode::End));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::F(4)));
        assert_eq!(app.mode(), Mode::Rename);
        assert_eq!(app.speaker_rename().map(|r| r.name.as_str()), Some("Bob"));

        for _ in 0..3 {
            app.handle_key(key(KeyCode::Backspace));
        }
        type_str(&mut app, "Robert");
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.mode(), Mode::Edit);
        assert_eq!(app.transcript().speaker_name(1), Some("Robert"));

        app.handle_key(key(KeyCode::Enter));
        type_str(&mut app, "robert");
        assert_eq!(app.filtered(), &[1]);
    }

    #[test]
    fn rename_without_speaker_stays_in_edit() {
        let mut app = app(&["nobody speaks"]);
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::F(4)));
        assert_eq!(app.mode(), Mode::Edit);
        assert!(app.speaker_rename().is_none());
    }

    #[test]
    fn quit_from_empty_query() {
        let mut app = app(&["q is for quit"]);
        type_str(&mut app, "x");
        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.should_quit());
        app.handle_key(key(KeyCode::Esc));
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit());
    }
}
