//! SubRip import and export.

use std::time::Duration;

use tracing::warn;

use crate::speaker::SpeakerResolver;
use crate::subtitle::{Speaker, Subtitle};

/// Speaker registry used to prefix exported cues with `[Name]: `.
#[derive(Debug, Clone, Copy)]
pub struct SpeakerLabels<'a> {
    pub speakers: &'a [Speaker],
    pub resolver: &'a SpeakerResolver,
}

/// Parses SRT text. Blocks without a usable timing line are skipped.
pub fn parse(content: &str) -> Vec<Subtitle> {
    let normalized = content.replace("\r\n", "\n");
    let mut subtitles = Vec::new();

    for block in split_blocks(&normalized) {
        let lines: Vec<&str> = block.lines().collect();
        let Some(timing_idx) = lines.iter().position(|line| line.contains("-->")) else {
            warn!(block, "SRT block without timing line skipped");
            continue;
        };
        let Some((start, end)) = parse_time_range(lines[timing_idx]) else {
            warn!(line = lines[timing_idx], "malformed SRT timing skipped");
            continue;
        };

        let text = lines[timing_idx + 1..]
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let id = subtitles.len() as u64;
        subtitles.push(
            Subtitle::new(id, start.as_secs_f64(), end.as_secs_f64(), text).with_interpolated_words(),
        );
    }

    subtitles
}

fn split_blocks(content: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                blocks.push(&content[s..offset]);
            }
        } else if start.is_none() {
            start = Some(offset);
        }
        offset += line.len();
    }
    if let Some(s) = start {
        blocks.push(&content[s..]);
    }
    blocks
}

fn parse_time_range(line: &str) -> Option<(Duration, Duration)> {
    let parts: Vec<&str> = line.split("-->").collect();
    if parts.len() != 2 {
        return None;
    }

    let start = parse_timestamp(parts[0].trim())?;
    // cue settings may follow the end time
    let end = parse_timestamp(parts[1].split_whitespace().next()?)?;

    Some((start, end))
}

fn parse_timestamp(timestamp: &str) -> Option<Duration> {
    let parts: Vec<&str> = timestamp.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: u64 = parts[0].trim().parse().ok()?;
    let minutes: u64 = parts[1].trim().parse().ok()?;

    let seconds_parts: Vec<&str> = parts[2].split([',', '.']).collect();
    if seconds_parts.len() != 2 {
        return None;
    }

    let seconds: u64 = seconds_parts[0].trim().parse().ok()?;
    let milliseconds: u64 = seconds_parts[1].trim().parse().ok()?;

    let total_millis = hours
        .checked_mul(3_600_000)?
        .checked_add(minutes.checked_mul(60_000)?)?
        .checked_add(seconds.checked_mul(1000)?)?
        .checked_add(milliseconds)?;
    Some(Duration::from_millis(total_millis))
}

/// `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total / 3600,
        (total / 60) % 60,
        total % 60,
        ms
    )
}

/// Renders cues in playback order. Entries with non-numeric times are
/// skipped and do not consume a sequence number.
pub fn render(subtitles: &[Subtitle], labels: Option<SpeakerLabels<'_>>) -> String {
    let mut cues = Vec::with_capacity(subtitles.len());

    for subtitle in subtitles {
        if !subtitle.has_valid_times() {
            warn!(id = subtitle.id, "invalid timestamp, subtitle left out of SRT");
            continue;
        }

        let mut text = subtitle.text.trim().to_string();
        if let Some(labels) = labels {
            if !subtitle.speaker.is_none() {
                let name = labels
                    .resolver
                    .speaker_for(subtitle, labels.speakers)
                    .map(|speaker| speaker.name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| format!("Speaker {}", subtitle.speaker));
                text = format!("[{name}]: {text}");
            }
        }

        cues.push(format!(
            "{}\n{} --> {}\n{}\n",
            cues.len() + 1,
            format_timestamp(subtitle.start),
            format_timestamp(subtitle.end),
            text
        ));
    }

    cues.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speaker::SpeakerBase;
    use crate::subtitle::SpeakerRef;

    const SAMPLE: &str = "1\r\n00:00:01,000 --> 00:00:02,500\r\nHello there\r\nfriend\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nSecond cue\r\n";

    #[test]
    fn parses_multiline_cues() {
        let subs = parse(SAMPLE);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].text, "Hello there friend");
        assert_eq!(subs[0].start, 1.0);
        assert_eq!(subs[0].end, 2.5);
        assert_eq!(subs[0].words.len(), 3);
        assert_eq!(subs[1].id, 1);
    }

    #[test]
    fn malformed_blocks_are_skipped() {
        let content = "1\n00:00:01 --> soon\nbroken\n\n2\n00:00:05.000 --> 00:00:06.000 align:start\nkept\n\njust text\n";
        let subs = parse(content);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].text, "kept");
        assert_eq!(subs[0].start, 5.0);
        assert_eq!(subs[0].id, 0);
    }

    #[test]
    fn overflowing_timestamp_skips_only_its_block() {
        let content = "1\n99999999999999999:00:00,000 --> 99999999999999999:00:01,000\nboom\n\n2\n00:00:01,000 --> 00:00:02,000\nsurvivor\n";
        let subs = parse(content);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].text, "survivor");
    }

    #[test]
    fn timestamps_round_to_millis() {
        assert_eq!(format_timestamp(3723.004), "01:02:03,004");
        assert_eq!(format_timestamp(1.0), "00:00:01,000");
        assert_eq!(format_timestamp(-2.0), "00:00:00,000");
    }

    #[test]
    fn render_skips_invalid_times_without_gaps() {
        let subs = vec![
            Subtitle::new(0, 0.0, 1.0, " first "),
            Subtitle::new(1, f64::NAN, 2.0, "broken"),
            Subtitle::new(2, 2.0, 3.0, "third"),
        ];
        let srt = render(&subs, None);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,000\nfirst\n\n2\n00:00:02,000 --> 00:00:03,000\nthird\n"
        );
    }

    #[test]
    fn render_adds_speaker_labels() {
        let subs = vec![
            Subtitle::new(0, 0.0, 1.0, "hi").with_speaker(SpeakerRef::Numeric(1)),
            Subtitle::new(1, 1.0, 2.0, "narration"),
        ];
        let speakers = vec![Speaker::named("Ann")];
        let resolver = SpeakerResolver::new(SpeakerBase::One);
        let srt = render(
            &subs,
            Some(SpeakerLabels {
                speakers: &speakers,
                resolver: &resolver,
            }),
        );
        assert!(srt.contains("[Ann]: hi"));
        assert!(srt.contains("\nnarration\n"));
    }

    #[test]
    fn render_then_parse_keeps_cues() {
        let subs = parse(SAMPLE);
        let again = parse(&render(&subs, None));
        assert_eq!(again.len(), 2);
        assert_eq!(again[1].text, "Second cue");
        assert_eq!(again[1].start, 3.0);
    }
}
