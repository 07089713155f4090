//! Subtitle records, word timings and the helpers that keep the two in step.
//!
//! A subtitle with a non-empty `words` list always has `text` equal to the
//! words joined by single spaces. Every mutation goes through
//! [`Subtitle::set_text`] or [`Subtitle::normalize`] to keep it that way.

use std::fmt;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize, Serializer};
use tracing::warn;

/// One timed word inside a subtitle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub word: String,
    #[serde(default = "missing_seconds", deserialize_with = "de_seconds")]
    pub start: f64,
    #[serde(default = "missing_seconds", deserialize_with = "de_seconds")]
    pub end: f64,
    #[serde(default)]
    pub line_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

/// Reference from a subtitle to the speaker registry, decided at parse time.
///
/// Numbering may be zero- or one-based depending on who produced the
/// transcript; see [`crate::speaker::SpeakerResolver`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SpeakerRef {
    #[default]
    None,
    Numeric(i64),
    /// Present but not a number, kept so it survives a save.
    Unparsed(String),
}

impl SpeakerRef {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return SpeakerRef::None;
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return SpeakerRef::Numeric(n);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 => SpeakerRef::Numeric(f as i64),
            _ => SpeakerRef::Unparsed(raw.to_string()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SpeakerRef::None)
    }

    pub fn numeric(&self) -> Option<i64> {
        match self {
            SpeakerRef::Numeric(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for SpeakerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeakerRef::None => Ok(()),
            SpeakerRef::Numeric(n) => write!(f, "{n}"),
            SpeakerRef::Unparsed(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for SpeakerRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SpeakerRef::None => serializer.serialize_none(),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for SpeakerRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<Lenient>::deserialize(deserializer)? {
            None => SpeakerRef::None,
            Some(Lenient::Int(n)) => SpeakerRef::Numeric(n),
            Some(Lenient::Float(f)) if f.is_finite() && f.fract() == 0.0 => {
                SpeakerRef::Numeric(f as i64)
            }
            Some(Lenient::Float(f)) => SpeakerRef::Unparsed(f.to_string()),
            Some(Lenient::Text(s)) => SpeakerRef::parse(&s),
        })
    }
}

/// One entry of the speaker registry. Display attributes (colors, sample
/// range, track) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Speaker {
    pub fn named(name: impl Into<String>) -> Self {
        Speaker {
            name: name.into(),
            attributes: serde_json::Map::new(),
        }
    }
}

/// One caption entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    #[serde(default, deserialize_with = "de_id")]
    pub id: u64,
    #[serde(default = "missing_seconds", deserialize_with = "de_seconds")]
    pub start: f64,
    #[serde(default = "missing_seconds", deserialize_with = "de_seconds")]
    pub end: f64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default, rename = "speaker_id", skip_serializing_if = "SpeakerRef::is_none")]
    pub speaker: SpeakerRef,
}

impl Subtitle {
    pub fn new(id: u64, start: f64, end: f64, text: impl Into<String>) -> Self {
        Subtitle {
            id,
            start,
            end,
            text: text.into(),
            words: Vec::new(),
            speaker: SpeakerRef::None,
        }
    }

    pub fn with_speaker(mut self, speaker: SpeakerRef) -> Self {
        self.speaker = speaker;
        self
    }

    /// Fills `words` by spreading the subtitle duration evenly over its text.
    pub fn with_interpolated_words(mut self) -> Self {
        self.words = interpolate_words(&self.text, self.start, self.end);
        self.normalize();
        self
    }

    pub fn words_text(&self) -> String {
        join_words(self.words.iter().map(|w| w.word.as_str()))
    }

    /// Replaces the text. When word timings exist they are rebuilt from the
    /// new text and the text is regenerated from them.
    pub fn set_text(&mut self, text: &str) {
        let base = std::mem::take(&mut self.words);
        self.set_text_from(&base, text);
    }

    /// Like [`Subtitle::set_text`], but rebuilds the words from `base`
    /// instead of the current ones. An empty `base` leaves the subtitle
    /// without words.
    pub fn set_text_from(&mut self, base: &[Word], text: &str) {
        let text = text.replace("\r\n", "\n");
        if base.is_empty() {
            self.words.clear();
            self.text = text;
            return;
        }
        self.words = reconstruct_words_from_text(base, &text);
        self.text = self.words_text();
    }

    /// Regenerates `text` from `words` when they disagree. Returns whether
    /// anything changed.
    pub fn normalize(&mut self) -> bool {
        if self.words.is_empty() {
            return false;
        }
        let joined = self.words_text();
        if joined == self.text {
            return false;
        }
        self.text = joined;
        true
    }

    pub fn has_valid_times(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }
}

/// Splits on any whitespace, dropping empty tokens.
pub fn split_into_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn join_words<'a>(words: impl IntoIterator<Item = &'a str>) -> String {
    words.into_iter().collect::<Vec<_>>().join(" ")
}

/// Rebuilds word timings for `new_text`.
///
/// When the word count stays within two of the original, words are mapped
/// one-to-one and keep the timing of their positional counterpart (the last
/// original word for any overflow). Larger changes spread the original span
/// evenly across the new words.
pub fn reconstruct_words_from_text(original: &[Word], new_text: &str) -> Vec<Word> {
    let tokens = split_into_words(new_text);
    if tokens.is_empty() {
        return Vec::new();
    }

    if tokens.len().abs_diff(original.len()) <= 2 {
        return tokens
            .iter()
            .enumerate()
            .map(|(i, token)| match original.get(i.min(original.len().saturating_sub(1))) {
                Some(source) => Word {
                    word: token.to_string(),
                    ..source.clone()
                },
                None => Word {
                    word: token.to_string(),
                    start: 0.0,
                    end: 0.0,
                    line_number: 0,
                    probability: None,
                },
            })
            .collect();
    }

    let span_start = original.first().map(|w| w.start).unwrap_or(0.0);
    let span = match (original.first(), original.last()) {
        (Some(first), Some(last)) => last.end - first.start,
        _ => 0.0,
    };
    let per_word = span / tokens.len() as f64;

    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| Word {
            word: token.to_string(),
            start: span_start + i as f64 * per_word,
            end: span_start + (i + 1) as f64 * per_word,
            line_number: 0,
            probability: None,
        })
        .collect()
}

/// Creates evenly spaced word timings for text that arrived without any.
pub fn interpolate_words(text: &str, start: f64, end: f64) -> Vec<Word> {
    let tokens = split_into_words(text);
    if tokens.is_empty() {
        return Vec::new();
    }
    let per_word = (end - start) / tokens.len() as f64;
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| Word {
            word: token.to_string(),
            start: round_millis(start + i as f64 * per_word),
            end: round_millis(start + (i + 1) as f64 * per_word),
            line_number: 0,
            probability: None,
        })
        .collect()
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Parses a timestamp in seconds from upstream string data.
pub fn parse_seconds(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|s| s.is_finite())
}

/// `HH:MM:SS` for list display.
pub fn format_timecode(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--:--".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(i64),
    Float(f64),
    Text(String),
}

fn missing_seconds() -> f64 {
    f64::NAN
}

fn de_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Option::<Lenient>::deserialize(deserializer)? {
        Some(Lenient::Int(n)) => n as f64,
        Some(Lenient::Float(f)) => f,
        Some(Lenient::Text(s)) => match parse_seconds(&s) {
            Some(seconds) => seconds,
            None => {
                warn!(value = %s, "unparseable timestamp, keeping it as NaN");
                f64::NAN
            }
        },
        None => f64::NAN,
    })
}

fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Option::<Lenient>::deserialize(deserializer)? {
        // ids are reassigned by position on load, so a bad one is not fatal
        Some(Lenient::Int(n)) => Ok(u64::try_from(n).unwrap_or(0)),
        Some(Lenient::Float(f)) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        Some(Lenient::Text(s)) => Ok(s.trim().parse().unwrap_or(0)),
        _ => Ok(0),
    }
}
