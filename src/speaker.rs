//! Maps a subtitle's speaker reference onto the speaker registry.
//!
//! Transcript producers disagree on whether speaker numbers start at 0 or 1.
//! The base is inferred once per loaded collection so every row resolves the
//! same way for the lifetime of that collection.

use tracing::debug;

use crate::subtitle::{Speaker, SpeakerRef, Subtitle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerBase {
    Zero,
    One,
}

impl SpeakerBase {
    /// Zero-based as soon as any subtitle references speaker `0`.
    pub fn infer(subtitles: &[Subtitle]) -> Self {
        if subtitles.iter().any(|s| s.speaker == SpeakerRef::Numeric(0)) {
            SpeakerBase::Zero
        } else {
            SpeakerBase::One
        }
    }

    pub fn offset(self) -> i64 {
        match self {
            SpeakerBase::Zero => 0,
            SpeakerBase::One => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakerResolver {
    base: SpeakerBase,
}

impl SpeakerResolver {
    pub fn new(base: SpeakerBase) -> Self {
        SpeakerResolver { base }
    }

    pub fn for_collection(subtitles: &[Subtitle]) -> Self {
        let base = SpeakerBase::infer(subtitles);
        debug!(?base, "inferred speaker numbering");
        SpeakerResolver::new(base)
    }

    pub fn base(&self) -> SpeakerBase {
        self.base
    }

    /// Index into a registry of `speaker_count` entries. Never fails: missing,
    /// non-numeric and out-of-range references all land on index 0.
    pub fn resolve_index(&self, speaker: &SpeakerRef, speaker_count: usize) -> usize {
        let Some(n) = speaker.numeric() else {
            return 0;
        };
        let in_bounds = |i: i64| i >= 0 && (i as u128) < speaker_count as u128;

        let primary = n.saturating_sub(self.base.offset());
        if in_bounds(primary) {
            return primary as usize;
        }
        // mixed or legacy numbering
        if in_bounds(n) {
            return n as usize;
        }
        if in_bounds(n.saturating_sub(1)) {
            return (n - 1) as usize;
        }
        0
    }

    /// Registry entry for a subtitle, `None` when it has no speaker reference
    /// or the registry is empty.
    pub fn speaker_for<'a>(&self, subtitle: &Subtitle, speakers: &'a [Speaker]) -> Option<&'a Speaker> {
        if subtitle.speaker.is_none() {
            return None;
        }
        speakers.get(self.resolve_index(&subtitle.speaker, speakers.len()))
    }
}
