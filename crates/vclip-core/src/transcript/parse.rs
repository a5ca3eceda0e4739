//! Caption format parsing: WebVTT, SRT, and YouTube's JSON3 event format.
//!
//! Generalizes the teacher's `vclip-worker::transcript::parse_vtt` (which
//! only handled VTT and emitted a timestamp marker on every caption change)
//! into a shared `Segment` parser for all three source formats, plus the
//! spec-accurate 30-second-gap timestamped-text renderer.

use regex::Regex;
use vclip_models::Segment;

/// Strip `<...>` inline tags and bracketed annotations like `[Music]`,
/// `[Applause]` (and localized equivalents), then collapse whitespace.
fn clean_caption_text(raw: &str) -> String {
    let tag_re = Regex::new(r"<[^>]+>").unwrap();
    let bracket_re = Regex::new(r"(?i)\[(music|applause|laughter|silence|musique|rires|applaudissements)\]").unwrap();
    let without_tags = tag_re.replace_all(raw, "");
    let without_brackets = bracket_re.replace_all(&without_tags, "");
    without_brackets.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
fn parse_vtt_timestamp(ts: &str) -> Option<f64> {
    let parts: Vec<&str> = ts.split(':').collect();
    let (h, m, s) = match parts.len() {
        3 => (parts[0].parse().ok()?, parts[1].parse::<f64>().ok()?, parts[2].parse::<f64>().ok()?),
        2 => (0.0, parts[0].parse::<f64>().ok()?, parts[1].parse::<f64>().ok()?),
        _ => return None,
    };
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Parse a WebVTT (or SRT, sharing the same `-->` cue-timing line shape)
/// document into segments, de-duplicating consecutive rolling-caption
/// repeats the way YouTube's auto-captions emit them.
pub fn parse_vtt_or_srt(content: &str) -> Vec<Segment> {
    let cue_re = Regex::new(
        r"((?:\d{2}:)?\d{2}:\d{2}[.,]\d{3})\s*-->\s*((?:\d{2}:)?\d{2}:\d{2}[.,]\d{3})",
    )
    .unwrap();

    let mut segments = Vec::new();
    let mut last_text = String::new();
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].replace(',', ".");
        if let Some(caps) = cue_re.captures(&line) {
            let start = parse_vtt_timestamp(&caps[1]).unwrap_or(0.0);
            let end = parse_vtt_timestamp(&caps[2]).unwrap_or(start);

            let mut text_lines = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim().is_empty() && !cue_re.is_match(&lines[i].replace(',', ".")) {
                text_lines.push(lines[i]);
                i += 1;
            }

            let text = clean_caption_text(&text_lines.join(" "));
            if text.len() >= 2 && text != last_text {
                segments.push(Segment {
                    text: text.clone(),
                    start_seconds: start,
                    duration_seconds: (end - start).max(0.0),
                });
                last_text = text;
            }
            continue;
        }
        i += 1;
    }

    segments
}

/// A YouTube JSON3 transcript document: `{"events": [{"tStartMs", "dDurationMs", "segs": [{"utf8"}]}]}`.
#[derive(serde::Deserialize)]
struct Json3Doc {
    events: Vec<Json3Event>,
}

#[derive(serde::Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    t_start_ms: Option<f64>,
    #[serde(rename = "dDurationMs")]
    d_duration_ms: Option<f64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(serde::Deserialize)]
struct Json3Seg {
    utf8: Option<String>,
}

pub fn parse_json3(content: &str) -> Vec<Segment> {
    let Ok(doc) = serde_json::from_str::<Json3Doc>(content) else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    for event in doc.events {
        let Some(segs) = event.segs else { continue };
        let text = clean_caption_text(
            &segs
                .iter()
                .filter_map(|s| s.utf8.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        );
        if text.len() < 2 {
            continue;
        }
        segments.push(Segment {
            text,
            start_seconds: event.t_start_ms.unwrap_or(0.0) / 1000.0,
            duration_seconds: event.d_duration_ms.unwrap_or(0.0) / 1000.0,
        });
    }
    segments
}

/// Plain whitespace-joined transcript text from segments.
pub fn join_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `HH:MM:SS` above one hour, `MM:SS` otherwise.
fn format_marker(total_seconds: f64) -> String {
    let total = total_seconds.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// Render timestamped text: a new `[marker]` is emitted whenever the gap
/// since the last marker is >= 30 seconds; otherwise segments concatenate
/// with a single space.
pub fn render_timestamped(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut last_emit: Option<f64> = None;

    for segment in segments {
        let needs_marker = match last_emit {
            None => true,
            Some(last) => segment.start_seconds - last >= 30.0,
        };
        if needs_marker {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{}] ", format_marker(segment.start_seconds)));
            last_emit = Some(segment.start_seconds);
        } else {
            out.push(' ');
        }
        out.push_str(&segment.text);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_vtt() {
        let vtt = "WEBVTT\n\n00:00:01.000 --> 00:00:03.000\nHello there\n\n00:00:03.500 --> 00:00:05.000\n<i>World</i>\n";
        let segments = parse_vtt_or_srt(vtt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello there");
        assert_eq!(segments[1].text, "World");
    }

    #[test]
    fn parses_srt_with_comma_decimal() {
        let srt = "1\n00:00:01,000 --> 00:00:03,000\nHello\n\n2\n00:00:03,500 --> 00:00:05,000\nWorld\n";
        let segments = parse_vtt_or_srt(srt);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_seconds, 1.0);
    }

    #[test]
    fn strips_bracketed_annotations() {
        let vtt = "00:00:01.000 --> 00:00:03.000\n[Music] Hello\n";
        let segments = parse_vtt_or_srt(vtt);
        assert_eq!(segments[0].text, "Hello");
    }

    #[test]
    fn dedups_rolling_captions() {
        let vtt = "00:00:01.000 --> 00:00:02.000\nHello\n\n00:00:02.000 --> 00:00:03.000\nHello\n";
        let segments = parse_vtt_or_srt(vtt);
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn parses_json3() {
        let json = r#"{"events":[{"tStartMs":1000,"dDurationMs":2000,"segs":[{"utf8":"Hello "},{"utf8":"world"}]}]}"#;
        let segments = parse_json3(json);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Hello world");
        assert_eq!(segments[0].start_seconds, 1.0);
    }

    #[test]
    fn timestamped_render_respects_30s_gap() {
        let segments = vec![
            Segment { text: "a".into(), start_seconds: 0.0, duration_seconds: 2.0 },
            Segment { text: "b".into(), start_seconds: 5.0, duration_seconds: 2.0 },
            Segment { text: "c".into(), start_seconds: 40.0, duration_seconds: 2.0 },
        ];
        let rendered = render_timestamped(&segments);
        assert_eq!(rendered, "[00:00] a b\n[00:40] c");
    }

    #[test]
    fn marker_format_switches_to_hms_above_one_hour() {
        assert_eq!(format_marker(59.0), "00:59");
        assert_eq!(format_marker(3661.0), "01:01:01");
    }
}
