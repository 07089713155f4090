//! The loaded subtitle collection and its speaker registry.
//!
//! The transcript is the single owner of the collection. Editors hand back
//! whole replacement collections (or mutate through [`Transcript::modify`]),
//! and each replacement bumps the revision so cached filter results can tell
//! the collection changed.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{Result, SublineError};
use crate::speaker::SpeakerResolver;
use crate::srt::{self, SpeakerLabels};
use crate::subtitle::{Speaker, SpeakerRef, Subtitle, Word};

#[derive(Debug, Default, Serialize, Deserialize)]
struct TranscriptFile {
    #[serde(default)]
    speakers: Vec<Speaker>,
    #[serde(default)]
    segments: Vec<Subtitle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mark_in: Option<f64>,
    /// Fields this editor does not interpret, written back unchanged.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    created_at: String,
    segments: Vec<ExportSegment<'a>>,
}

#[derive(Serialize)]
struct ExportSegment<'a> {
    id: String,
    start: f64,
    end: f64,
    text: &'a str,
    #[serde(skip_serializing_if = "unassigned")]
    speaker_id: &'a SpeakerRef,
    words: &'a [Word],
}

fn unassigned(speaker: &&SpeakerRef) -> bool {
    speaker.is_none()
}

#[derive(Debug, Clone)]
pub struct Transcript {
    path: Option<PathBuf>,
    subtitles: Vec<Subtitle>,
    speakers: Vec<Speaker>,
    mark_in: Option<f64>,
    extra: Map<String, Value>,
    resolver: SpeakerResolver,
    revision: u64,
    dirty: bool,
}

impl Transcript {
    pub fn new(subtitles: Vec<Subtitle>, speakers: Vec<Speaker>) -> Self {
        let mut subtitles = subtitles;
        let mut regenerated = 0;
        for (position, subtitle) in subtitles.iter_mut().enumerate() {
            subtitle.id = position as u64;
            if subtitle.normalize() {
                regenerated += 1;
            }
        }
        if regenerated > 0 {
            debug!(regenerated, "subtitle text regenerated from words");
        }

        let resolver = SpeakerResolver::for_collection(&subtitles);
        Transcript {
            path: None,
            subtitles,
            speakers,
            mark_in: None,
            extra: Map::new(),
            resolver,
            revision: 0,
            dirty: false,
        }
    }

    /// Loads a `.json` transcript or imports a `.srt` file.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SublineError::TranscriptNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let mut transcript = match extension.as_deref() {
            Some("json") => Self::from_json(&content)?,
            Some("srt") => {
                let mut imported = Self::new(srt::parse(&content), Vec::new());
                // imported subtitles are written next to the source as JSON
                imported.dirty = true;
                imported
            }
            _ => return Err(SublineError::UnsupportedFormat(path.to_path_buf())),
        };
        transcript.path = Some(path.with_extension("json"));

        info!(
            path = %path.display(),
            subtitles = transcript.subtitles.len(),
            speakers = transcript.speakers.len(),
            "transcript loaded"
        );
        Ok(transcript)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: TranscriptFile = serde_json::from_str(content)?;
        let mut transcript = Self::new(file.segments, file.speakers);
        transcript.mark_in = file.mark_in;
        transcript.extra = file.extra;
        Ok(transcript)
    }

    pub fn to_json(&self) -> Result<String> {
        let file = TranscriptFile {
            speakers: self.speakers.clone(),
            segments: self.subtitles.clone(),
            mark_in: self.mark_in,
            extra: self.extra.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn subtitles(&self) -> &[Subtitle] {
        &self.subtitles
    }

    pub fn speakers(&self) -> &[Speaker] {
        &self.speakers
    }

    pub fn resolver(&self) -> &SpeakerResolver {
        &self.resolver
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.subtitles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtitles.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        self.subtitles.get(index).map(|s| s.text.as_str())
    }

    /// Display name of the speaker attached to `index`, if any.
    pub fn speaker_name(&self, index: usize) -> Option<&str> {
        let subtitle = self.subtitles.get(index)?;
        self.resolver
            .speaker_for(subtitle, &self.speakers)
            .map(|speaker| speaker.name.as_str())
    }

    /// Swaps in a whole new collection. The speaker base stays as inferred
    /// at load time.
    pub fn replace_subtitles(&mut self, subtitles: Vec<Subtitle>) {
        self.subtitles = subtitles;
        self.touch();
    }

    /// Mutates the collection in place; counts as a replacement.
    pub fn modify<R>(&mut self, f: impl FnOnce(&mut [Subtitle]) -> R) -> R {
        let result = f(&mut self.subtitles);
        self.touch();
        result
    }

    /// Sets the text of one subtitle, keeping its words consistent.
    pub fn set_text(&mut self, index: usize, text: &str) -> bool {
        if index >= self.subtitles.len() {
            return false;
        }
        self.modify(|subtitles| subtitles[index].set_text(text));
        true
    }

    /// Sets the text of one subtitle, rebuilding its words from `base`.
    pub fn set_text_from(&mut self, index: usize, base: &[Word], text: &str) -> bool {
        if index >= self.subtitles.len() {
            return false;
        }
        self.modify(|subtitles| subtitles[index].set_text_from(base, text));
        true
    }

    /// Puts back a text and word list captured earlier.
    pub fn restore(&mut self, index: usize, text: &str, words: &[Word]) -> bool {
        if index >= self.subtitles.len() {
            return false;
        }
        self.modify(|subtitles| {
            subtitles[index].text = text.to_string();
            subtitles[index].words = words.to_vec();
        });
        true
    }

    /// Renames a registry entry. Counts as a change so cached filters see
    /// the new name.
    pub fn rename_speaker(&mut self, index: usize, name: &str) -> bool {
        let name = name.trim();
        let Some(speaker) = self.speakers.get_mut(index) else {
            return false;
        };
        if speaker.name == name {
            return false;
        }
        debug!(index, from = %speaker.name, to = name, "speaker renamed");
        speaker.name = name.to_string();
        self.touch();
        true
    }

    /// Registry index the subtitle at `index` resolves to.
    pub fn speaker_index(&self, index: usize) -> Option<usize> {
        let subtitle = self.subtitles.get(index)?;
        if subtitle.speaker.is_none() || self.speakers.is_empty() {
            return None;
        }
        Some(self.resolver.resolve_index(&subtitle.speaker, self.speakers.len()))
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.dirty = true;
    }

    pub fn save(&mut self) -> Result<PathBuf> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("transcript.json"));
        self.save_to(&path)?;
        self.path = Some(path.clone());
        Ok(path)
    }

    /// Writes the whole collection, replacing the target atomically.
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_json()?)?;
        self.dirty = false;
        info!(path = %path.display(), subtitles = self.subtitles.len(), "transcript saved");
        Ok(())
    }

    pub fn export_srt(&self, path: &Path, include_speaker_labels: bool) -> Result<()> {
        let labels = include_speaker_labels.then_some(SpeakerLabels {
            speakers: &self.speakers,
            resolver: &self.resolver,
        });
        let content = srt::render(&self.subtitles, labels);
        if content.trim().is_empty() {
            return Err(SublineError::EmptyExport);
        }
        write_atomic(path, &content)?;
        info!(path = %path.display(), "SRT exported");
        Ok(())
    }

    pub fn export_json(&self, path: &Path) -> Result<()> {
        if self.subtitles.is_empty() {
            return Err(SublineError::EmptyExport);
        }
        let export = JsonExport {
            created_at: chrono::Utc::now().to_rfc3339(),
            segments: self
                .subtitles
                .iter()
                .enumerate()
                .map(|(position, subtitle)| ExportSegment {
                    id: position.to_string(),
                    start: subtitle.start,
                    end: subtitle.end,
                    text: subtitle.text.trim(),
                    speaker_id: &subtitle.speaker,
                    words: &subtitle.words,
                })
                .collect(),
        };
        write_atomic(path, &serde_json::to_string_pretty(&export)?)?;
        info!(path = %path.display(), "JSON exported");
        Ok(())
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, content)?;
    if let Err(e) = fs::rename(&tmp, path) {
        warn!(path = %path.display(), error = %e, "rename failed, removing temp file");
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r##"{
        "filename": "demo.json",
        "speakers": [{"name": "Ann", "fill": {"enabled": false, "color": "#fff"}}],
        "mark_in": 12.5,
        "segments": [
            {"id": "7", "start": "0.0", "end": 1.0, "text": "stale", "speaker_id": "1",
             "words": [{"word": "hello", "start": 0.0, "end": 0.5, "line_number": 0},
                       {"word": "world", "start": 0.5, "end": 1.0, "line_number": 0}]},
            {"id": "9", "start": 1.0, "end": 2.0, "text": "plain"}
        ]
    }"##;

    #[test]
    fn load_normalizes_ids_and_text() {
        let t = Transcript::from_json(JSON).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.subtitles()[0].id, 0);
        assert_eq!(t.subtitles()[1].id, 1);
        assert_eq!(t.text(0), Some("hello world"));
        assert_eq!(t.speaker_name(0), Some("Ann"));
        assert_eq!(t.speaker_name(1), None);
        assert!(!t.is_dirty());
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let t = Transcript::from_json(JSON).unwrap();
        let value: Value = serde_json::from_str(&t.to_json().unwrap()).unwrap();
        assert_eq!(value["filename"], "demo.json");
        assert_eq!(value["mark_in"], 12.5);
        assert_eq!(value["speakers"][0]["fill"]["color"], "#fff");
        assert_eq!(value["segments"][0]["speaker_id"], "1");
    }

    #[test]
    fn replacements_bump_revision_and_keep_ids() {
        let mut t = Transcript::from_json(JSON).unwrap();
        let before = t.revision();
        assert!(t.set_text(1, "changed"));
        assert!(!t.set_text(5, "nope"));
        assert_eq!(t.revision(), before + 1);
        assert!(t.is_dirty());

        let mut next = t.subtitles().to_vec();
        next[0].speaker = SpeakerRef::None;
        t.replace_subtitles(next);
        assert_eq!(t.revision(), before + 2);
        assert_eq!(t.subtitles()[1].id, 1);
    }

    #[test]
    fn negative_ids_do_not_refuse_the_file() {
        let t = Transcript::from_json(
            r#"{"segments": [{"id": -1, "start": 0, "end": 1, "text": "a"}, {"id": -5, "start": 1, "end": 2, "text": "b"}]}"#,
        )
        .unwrap();
        assert_eq!(t.subtitles()[0].id, 0);
        assert_eq!(t.subtitles()[1].id, 1);
    }

    #[test]
    fn rename_speaker_updates_registry_and_revision() {
        let mut t = Transcript::from_json(JSON).unwrap();
        let before = t.revision();
        assert_eq!(t.speaker_index(0), Some(0));
        assert_eq!(t.speaker_index(1), None);

        assert!(t.rename_speaker(0, " Annabel "));
        assert_eq!(t.speaker_name(0), Some("Annabel"));
        assert_eq!(t.revision(), before + 1);
        assert!(t.is_dirty());

        assert!(!t.rename_speaker(0, "Annabel"));
        assert!(!t.rename_speaker(3, "Nobody"));
        assert_eq!(t.revision(), before + 1);

        let value: Value = serde_json::from_str(&t.to_json().unwrap()).unwrap();
        assert_eq!(value["speakers"][0]["name"], "Annabel");
        assert_eq!(value["speakers"][0]["fill"]["color"], "#fff");
    }

    #[test]
    fn save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");
        fs::write(&path, JSON).unwrap();

        let mut t = Transcript::open(&path).unwrap();
        t.set_text(1, "edited text");
        assert_eq!(t.save().unwrap(), path);
        assert!(!t.is_dirty());

        let reopened = Transcript::open(&path).unwrap();
        assert_eq!(reopened.text(1), Some("edited text"));
        assert!(!dir.path().join("demo.json.tmp").exists());
    }

    #[test]
    fn srt_import_targets_json_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.srt");
        fs::write(&path, "1\n00:00:00,000 --> 00:00:01,000\nhi there\n").unwrap();

        let t = Transcript::open(&path).unwrap();
        assert_eq!(t.len(), 1);
        assert!(t.is_dirty());
        assert_eq!(t.path(), Some(dir.path().join("clip.json").as_path()));
    }

    #[test]
    fn unsupported_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, "x").unwrap();
        assert!(matches!(Transcript::open(&txt), Err(SublineError::UnsupportedFormat(_))));
        assert!(matches!(
            Transcript::open(&dir.path().join("gone.json")),
            Err(SublineError::TranscriptNotFound(_))
        ));
    }

    #[test]
    fn exports_refuse_empty_collections() {
        let dir = tempfile::tempdir().unwrap();
        let t = Transcript::new(Vec::new(), Vec::new());
        assert!(matches!(
            t.export_srt(&dir.path().join("a.srt"), false),
            Err(SublineError::EmptyExport)
        ));
        assert!(matches!(
            t.export_json(&dir.path().join("a.json")),
            Err(SublineError::EmptyExport)
        ));
    }

    #[test]
    fn json_export_renumbers_ids() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out/export.json");
        let t = Transcript::from_json(JSON).unwrap();
        t.export_json(&out).unwrap();
        let value: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value["segments"][1]["id"], "1");
        assert!(value["createdAt"].is_string());
        assert!(value["segments"][1].get("speaker_id").is_none());
    }
}
