//! Query matching over a subtitle collection.
//!
//! Filtering never reorders: it yields the subset of original indices whose
//! text or resolved speaker name matches, in playback order.

use std::ops::Range;

use regex::{NoExpand, Regex, RegexBuilder};
use tracing::warn;

use crate::speaker::SpeakerResolver;
use crate::subtitle::{Speaker, Subtitle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub whole_word: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub text: String,
    pub options: SearchOptions,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, options: SearchOptions) -> Self {
        SearchQuery {
            text: text.into(),
            options,
        }
    }

    /// A blank query lets everything through.
    pub fn is_inert(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A subtitle that passed the filter, with its position in the full collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredItem<'a> {
    pub subtitle: &'a Subtitle,
    pub index: usize,
}

/// A query compiled for repeated matching.
#[derive(Debug, Clone)]
pub struct Matcher {
    query: String,
    folded: String,
    options: SearchOptions,
    whole_word: Option<Regex>,
    highlight: Option<Regex>,
}

impl Matcher {
    pub fn new(query: &SearchQuery) -> Self {
        let trimmed = query.text.trim();
        let escaped = regex::escape(trimmed);
        let case_insensitive = !query.options.case_sensitive;

        let (whole_word, highlight) = if trimmed.is_empty() {
            (None, None)
        } else if query.options.whole_word {
            let bounded = compile(&format!(r"\b{escaped}\b"), case_insensitive);
            (bounded.clone(), bounded)
        } else {
            (None, compile(&escaped, case_insensitive))
        };

        Matcher {
            query: query.text.clone(),
            folded: query.text.to_lowercase(),
            options: query.options,
            whole_word,
            highlight,
        }
    }

    pub fn is_inert(&self) -> bool {
        self.query.trim().is_empty()
    }

    pub fn matches_text(&self, text: &str) -> bool {
        if self.is_inert() {
            return true;
        }
        if text.is_empty() {
            return false;
        }
        if self.options.whole_word {
            return self.whole_word.as_ref().is_some_and(|re| re.is_match(text));
        }
        self.contains(text)
    }

    /// Speaker names always use substring containment.
    pub fn matches_speaker(&self, name: &str) -> bool {
        !name.is_empty() && self.contains(name)
    }

    fn contains(&self, haystack: &str) -> bool {
        if self.options.case_sensitive {
            haystack.contains(&self.query)
        } else {
            haystack.to_lowercase().contains(&self.folded)
        }
    }

    /// Byte ranges of `text` to emphasise for this query.
    pub fn highlight_ranges(&self, text: &str) -> Vec<Range<usize>> {
        match &self.highlight {
            Some(re) => re.find_iter(text).map(|m| m.range()).collect(),
            None => Vec::new(),
        }
    }
}

fn compile(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(case_insensitive).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern, error = %e, "search pattern rejected");
            None
        }
    }
}

/// Subtitles whose text or speaker name match `query`, in original order.
pub fn filter_subtitles<'a>(
    subtitles: &'a [Subtitle],
    speakers: &[Speaker],
    resolver: &SpeakerResolver,
    query: &SearchQuery,
) -> Vec<FilteredItem<'a>> {
    filter_indices(subtitles, speakers, resolver, query)
        .into_iter()
        .map(|index| FilteredItem {
            subtitle: &subtitles[index],
            index,
        })
        .collect()
}

pub fn filter_indices(
    subtitles: &[Subtitle],
    speakers: &[Speaker],
    resolver: &SpeakerResolver,
    query: &SearchQuery,
) -> Vec<usize> {
    if query.is_inert() {
        return (0..subtitles.len()).collect();
    }
    let matcher = Matcher::new(query);
    subtitles
        .iter()
        .enumerate()
        .filter(|(_, subtitle)| {
            let speaker_match = resolver
                .speaker_for(subtitle, speakers)
                .is_some_and(|speaker| matcher.matches_speaker(&speaker.name));
            matcher.matches_text(&subtitle.text) || speaker_match
        })
        .map(|(index, _)| index)
        .collect()
}

/// One hit of the find/replace panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub subtitle_index: usize,
    pub range: Range<usize>,
}

fn literal(find: &str, match_case: bool) -> Option<Regex> {
    if find.trim().is_empty() {
        return None;
    }
    compile(&regex::escape(find), !match_case)
}

pub fn find_occurrences(subtitles: &[Subtitle], find: &str, match_case: bool) -> Vec<Occurrence> {
    let Some(re) = literal(find, match_case) else {
        return Vec::new();
    };
    subtitles
        .iter()
        .enumerate()
        .flat_map(|(subtitle_index, subtitle)| {
            re.find_iter(&subtitle.text)
                .map(move |m| Occurrence {
                    subtitle_index,
                    range: m.range(),
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Replaces a single occurrence. A stale occurrence (text changed since it
/// was found) leaves the collection as it was.
pub fn replace_occurrence(
    subtitles: &[Subtitle],
    occurrence: &Occurrence,
    replacement: &str,
) -> Vec<Subtitle> {
    let mut next = subtitles.to_vec();
    let Some(subtitle) = next.get_mut(occurrence.subtitle_index) else {
        return next;
    };
    let text = &subtitle.text;
    let Range { start, end } = occurrence.range;
    if start > end || end > text.len() || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
        warn!(?occurrence, "stale occurrence, nothing replaced");
        return next;
    }
    let new_text = format!("{}{}{}", &text[..start], replacement, &text[end..]);
    subtitle.set_text(&new_text);
    next
}

/// Replaces every occurrence and reports how many subtitles changed.
pub fn replace_all(
    subtitles: &[Subtitle],
    find: &str,
    replacement: &str,
    match_case: bool,
) -> (Vec<Subtitle>, usize) {
    let mut next = subtitles.to_vec();
    let Some(re) = literal(find, match_case) else {
        return (next, 0);
    };
    let mut changed = 0;
    for subtitle in next.iter_mut().filter(|s| re.is_match(&s.text)) {
        let new_text = re.replace_all(&subtitle.text, NoExpand(replacement)).into_owned();
        subtitle.set_text(&new_text);
        changed += 1;
    }
    (next, changed)
}

pub fn wrap_next(current: Option<usize>, len: usize) -> Option<usize> {
    match (current, len) {
        (_, 0) => None,
        (Some(i), _) if i + 1 < len => Some(i + 1),
        _ => Some(0),
    }
}

pub fn wrap_previous(current: Option<usize>, len: usize) -> Option<usize> {
    match (current, len) {
        (_, 0) => None,
        (Some(i), _) if i > 0 && i <= len => Some(i - 1),
        _ => Some(len - 1),
    }
}
