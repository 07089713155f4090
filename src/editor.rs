//! Inline editing of a single subtitle.
//!
//! At most one subtitle is active. Draft edits are written through to the
//! transcript immediately; cancelling restores the text and word timings
//! captured when the subtitle was selected.

use tracing::debug;

use crate::subtitle::{join_words, split_into_words, Word};
use crate::transcript::Transcript;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditorState {
    #[default]
    Idle,
    Editing {
        index: usize,
        draft: String,
        original: String,
        /// Word timings at selection; every draft is rebuilt from these.
        words: Vec<Word>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct InlineEditor {
    state: EditorState,
}

impl InlineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn active_index(&self) -> Option<usize> {
        match &self.state {
            EditorState::Editing { index, .. } => Some(*index),
            EditorState::Idle => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.active_index().is_some()
    }

    pub fn draft(&self) -> Option<&str> {
        match &self.state {
            EditorState::Editing { draft, .. } => Some(draft),
            EditorState::Idle => None,
        }
    }

    pub fn original(&self) -> Option<&str> {
        match &self.state {
            EditorState::Editing { original, .. } => Some(original),
            EditorState::Idle => None,
        }
    }

    /// Makes `index` the active subtitle. Selecting the active subtitle again
    /// changes nothing; selecting another one drops the current session.
    pub fn select(&mut self, index: usize, transcript: &Transcript) -> bool {
        if self.active_index() == Some(index) {
            return false;
        }
        if index >= transcript.len() {
            return false;
        }
        debug!(index, "subtitle selected for editing");
        self.capture(index, transcript);
        true
    }

    /// Replaces the draft and writes it through to the transcript.
    pub fn edit_draft(&mut self, text: impl Into<String>, transcript: &mut Transcript) {
        let EditorState::Editing {
            index, draft, words, ..
        } = &mut self.state
        else {
            return;
        };
        *draft = text.into().replace("\r\n", "\n");
        transcript.set_text_from(*index, words, draft);
    }

    pub fn insert_char(&mut self, c: char, transcript: &mut Transcript) {
        if let Some(draft) = self.draft() {
            let mut next = draft.to_string();
            next.push(c);
            self.edit_draft(next, transcript);
        }
    }

    pub fn delete_char(&mut self, transcript: &mut Transcript) {
        if let Some(draft) = self.draft() {
            let mut next = draft.to_string();
            if next.pop().is_some() {
                self.edit_draft(next, transcript);
            }
        }
    }

    /// Restores the text and words captured at selection. The session
    /// stays open.
    pub fn cancel(&mut self, transcript: &mut Transcript) {
        let EditorState::Editing {
            index,
            draft,
            original,
            words,
        } = &mut self.state
        else {
            return;
        };
        debug!(index = *index, "edit reverted");
        draft.clone_from(original);
        transcript.restore(*index, original, words);
    }

    /// Ends the session, leaving the live text as it is.
    pub fn commit(&mut self) -> Option<usize> {
        let index = self.active_index()?;
        debug!(index, "edit committed");
        self.state = EditorState::Idle;
        Some(index)
    }

    /// Drops the selection without touching the transcript.
    pub fn deselect(&mut self) {
        if self.is_editing() {
            debug!("selection cleared");
        }
        self.state = EditorState::Idle;
    }

    fn draft_word_count(&self) -> usize {
        self.draft().map_or(0, |d| split_into_words(d).len())
    }

    pub fn can_move_to_previous(&self, index: usize) -> bool {
        self.active_index() == Some(index) && index > 0 && self.draft_word_count() > 0
    }

    pub fn can_move_to_next(&self, index: usize, len: usize) -> bool {
        self.active_index() == Some(index) && index + 1 < len && self.draft_word_count() > 0
    }

    /// Moves the first draft word to the end of the previous subtitle.
    pub fn move_first_word_to_previous(&mut self, index: usize, transcript: &mut Transcript) -> bool {
        if !self.can_move_to_previous(index) || index >= transcript.len() {
            return false;
        }
        let EditorState::Editing { draft, words, .. } = &self.state else {
            return false;
        };
        let captured = words.clone();
        let mut tokens = split_into_words(draft);
        let first = tokens.remove(0).to_string();
        let remainder = join_words(tokens);

        let previous_text = transcript.text(index - 1).unwrap_or_default();
        let mut previous_words = split_into_words(previous_text);
        previous_words.push(&first);
        let previous_text = join_words(previous_words);

        transcript.modify(|subtitles| {
            subtitles[index - 1].set_text(&previous_text);
            subtitles[index].set_text_from(&captured, &remainder);
        });
        debug!(index, word = %first, "word moved to previous subtitle");
        self.capture(index, transcript);
        true
    }

    /// Moves the last draft word to the start of the next subtitle.
    pub fn move_last_word_to_next(&mut self, index: usize, transcript: &mut Transcript) -> bool {
        if !self.can_move_to_next(index, transcript.len()) {
            return false;
        }
        let EditorState::Editing { draft, words, .. } = &self.state else {
            return false;
        };
        let captured = words.clone();
        let mut tokens = split_into_words(draft);
        let Some(last) = tokens.pop().map(str::to_string) else {
            return false;
        };
        let remainder = join_words(tokens);

        let next_text = transcript.text(index + 1).unwrap_or_default();
        let mut next_words = split_into_words(next_text);
        next_words.insert(0, &last);
        let next_text = join_words(next_words);

        transcript.modify(|subtitles| {
            subtitles[index].set_text_from(&captured, &remainder);
            subtitles[index + 1].set_text(&next_text);
        });
        debug!(index, word = %last, "word moved to next subtitle");
        self.capture(index, transcript);
        true
    }

    /// Starts a fresh session on the subtitle as it stands in the transcript.
    fn capture(&mut self, index: usize, transcript: &Transcript) {
        let Some(subtitle) = transcript.subtitles().get(index) else {
            self.state = EditorState::Idle;
            return;
        };
        self.state = EditorState::Editing {
            index,
            draft: subtitle.text.clone(),
            original: subtitle.text.clone(),
            words: subtitle.words.clone(),
        };
    }

    /// Picks up changes made to the active subtitle by other paths, as long
    /// as the draft has not been touched.
    pub fn sync(&mut self, transcript: &Transcript) {
        let EditorState::Editing {
            index,
            draft,
            original,
            ..
        } = &self.state
        else {
            return;
        };
        if draft != original {
            return;
        }
        let index = *index;
        match transcript.text(index) {
            None => self.state = EditorState::Idle,
            Some(latest) if latest != draft.as_str() => self.capture(index, transcript),
            Some(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::Subtitle;

    fn transcript(texts: &[&str]) -> Transcript {
        Transcript::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Subtitle::new(i as u64, i as f64, i as f64 + 1.0, *t))
                .collect(),
            Vec::new(),
        )
    }

    #[test]
    fn select_captures_text_and_is_idempotent() {
        let t = transcript(&["hello world", "foo bar"]);
        let mut editor = InlineEditor::new();
        assert!(editor.select(1, &t));
        assert!(!editor.select(1, &t));
        assert_eq!(editor.draft(), Some("foo bar"));
        assert_eq!(editor.original(), Some("foo bar"));
        assert!(!editor.select(9, &t));
        assert_eq!(editor.active_index(), Some(1));
    }

    #[test]
    fn switching_selection_starts_a_new_session() {
        let mut t = transcript(&["a", "b"]);
        let mut editor = InlineEditor::new();
        editor.select(0, &t);
        editor.edit_draft("changed", &mut t);
        editor.select(1, &t);
        assert_eq!(
            editor.state(),
            &EditorState::Editing {
                index: 1,
                draft: "b".into(),
                original: "b".into(),
                words: Vec::new(),
            }
        );
        assert_eq!(t.text(0), Some("changed"));
    }

    #[test]
    fn edits_are_live_and_cancel_restores() {
        let mut t = transcript(&["hello"]);
        let mut editor = InlineEditor::new();
        editor.select(0, &t);
        editor.insert_char('!', &mut t);
        assert_eq!(t.text(0), Some("hello!"));
        editor.delete_char(&mut t);
        editor.delete_char(&mut t);
        assert_eq!(t.text(0), Some("hell"));

        editor.cancel(&mut t);
        assert_eq!(t.text(0), Some("hello"));
        assert_eq!(editor.draft(), Some("hello"));
        assert!(editor.is_editing());
    }

    #[test]
    fn commit_and_outside_click_go_idle() {
        let mut t = transcript(&["hello"]);
        let mut editor = InlineEditor::new();
        editor.select(0, &t);
        editor.edit_draft("bye", &mut t);
        assert_eq!(editor.commit(), Some(0));
        assert_eq!(editor.state(), &EditorState::Idle);
        assert_eq!(t.text(0), Some("bye"));

        editor.select(0, &t);
        editor.deselect();
        assert_eq!(editor.commit(), None);
    }

    #[test]
    fn first_word_moves_to_previous() {
        let mut t = transcript(&["hello world", "foo bar"]);
        let mut editor = InlineEditor::new();
        editor.select(1, &t);
        assert!(editor.move_first_word_to_previous(1, &mut t));
        assert_eq!(t.text(0), Some("hello world foo"));
        assert_eq!(t.text(1), Some("bar"));
        assert_eq!(editor.draft(), Some("bar"));
        assert_eq!(editor.original(), Some("bar"));
    }

    #[test]
    fn last_word_moves_to_next() {
        let mut t = transcript(&["hello world", "foo bar"]);
        let mut editor = InlineEditor::new();
        editor.select(0, &t);
        assert!(editor.move_last_word_to_next(0, &mut t));
        assert_eq!(t.text(0), Some("hello"));
        assert_eq!(t.text(1), Some("world foo bar"));
    }

    #[test]
    fn transfers_at_the_edges_are_noops() {
        let mut t = transcript(&["one two", "three"]);
        let mut editor = InlineEditor::new();
        editor.select(0, &t);
        let revision = t.revision();
        assert!(!editor.move_first_word_to_previous(0, &mut t));

        editor.select(1, &t);
        assert!(!editor.move_last_word_to_next(1, &mut t));
        // inactive row
        assert!(!editor.move_first_word_to_previous(0, &mut t));
        assert_eq!(t.revision(), revision);
        assert_eq!(t.text(0), Some("one two"));
    }

    #[test]
    fn empty_draft_cannot_transfer() {
        let mut t = transcript(&["a", "   ", "c"]);
        let mut editor = InlineEditor::new();
        editor.select(1, &t);
        assert!(!editor.move_first_word_to_previous(1, &mut t));
        assert!(!editor.move_last_word_to_next(1, &mut t));
    }

    #[test]
    fn transfer_regenerates_words() {
        let mut t = Transcript::new(
            vec![
                Subtitle::new(0, 0.0, 1.0, "hello world").with_interpolated_words(),
                Subtitle::new(1, 1.0, 2.0, "foo bar").with_interpolated_words(),
            ],
            Vec::new(),
        );
        let mut editor = InlineEditor::new();
        editor.select(1, &t);
        editor.move_first_word_to_previous(1, &mut t);
        let subs = t.subtitles();
        assert_eq!(subs[0].words_text(), subs[0].text);
        assert_eq!(subs[0].words.len(), 3);
        assert_eq!(subs[1].words_text(), "bar");
    }

    #[test]
    fn cancel_after_clearing_restores_word_timings() {
        let mut t = Transcript::new(
            vec![Subtitle::new(0, 0.0, 1.0, "hello world").with_interpolated_words()],
            Vec::new(),
        );
        let before = t.subtitles()[0].words.clone();
        let mut editor = InlineEditor::new();
        editor.select(0, &t);
        for _ in 0.."hello world".len() {
            editor.delete_char(&mut t);
        }
        assert_eq!(t.text(0), Some(""));
        assert!(t.subtitles()[0].words.is_empty());

        editor.cancel(&mut t);
        assert_eq!(t.text(0), Some("hello world"));
        assert_eq!(t.subtitles()[0].words, before);
    }

    #[test]
    fn retyping_after_clearing_keeps_word_timings() {
        let mut t = Transcript::new(
            vec![Subtitle::new(0, 2.0, 4.0, "hello world").with_interpolated_words()],
            Vec::new(),
        );
        let mut editor = InlineEditor::new();
        editor.select(0, &t);
        editor.edit_draft("", &mut t);
        editor.edit_draft("goodbye world", &mut t);
        let words = &t.subtitles()[0].words;
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].start, 2.0);
        assert_eq!(words[1].end, 4.0);
        assert_eq!(t.text(0), Some("goodbye world"));
    }

    #[test]
    fn sync_follows_untouched_drafts_only() {
        let mut t = transcript(&["alpha", "beta"]);
        let mut editor = InlineEditor::new();
        editor.select(0, &t);
        t.set_text(0, "replaced");
        editor.sync(&t);
        assert_eq!(editor.draft(), Some("replaced"));

        editor.edit_draft("typing", &mut t);
        t.set_text(0, "elsewhere");
        editor.sync(&t);
        assert_eq!(editor.draft(), Some("typing"));
    }
}
