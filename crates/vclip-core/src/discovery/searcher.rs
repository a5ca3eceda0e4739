//! Video searcher (§4.9 component H): a bounded-parallel wrapper over
//! `yt-dlp`'s search pseudo-URLs (`ytsearchN:query`), the same subprocess
//! tool the teacher already depends on for downloads.

use std::process::Stdio;

use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;
use vclip_models::VideoMetadata;

use crate::error::DiscoveryError;

#[derive(Deserialize)]
struct YtDlpSearchEntry {
    id: String,
    title: Option<String>,
    channel: Option<String>,
    channel_id: Option<String>,
    description: Option<String>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    upload_date: Option<String>,
}

fn parse_upload_date(raw: Option<&str>) -> chrono::DateTime<Utc> {
    raw.and_then(|s| {
        if s.len() == 8 {
            let year: i32 = s[0..4].parse().ok()?;
            let month: u32 = s[4..6].parse().ok()?;
            let day: u32 = s[6..8].parse().ok()?;
            Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single()
        } else {
            None
        }
    })
    .unwrap_or_else(Utc::now)
}

/// Run one search for `query` in `search_language`, returning up to
/// `max_results` raw candidates. Timeouts are applied by the caller.
pub async fn search(query: &str, search_language: &str, max_results: usize) -> Result<Vec<VideoMetadata>, DiscoveryError> {
    which::which("yt-dlp").map_err(|_| DiscoveryError::Search("yt-dlp not found on PATH".into()))?;

    let pseudo_url = format!("ytsearch{max_results}:{query}");
    let output = Command::new("yt-dlp")
        .args(["--flat-playlist", "--dump-json", "--no-warnings"])
        .arg(&pseudo_url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| DiscoveryError::Search(format!("failed to spawn yt-dlp: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DiscoveryError::Search(format!(
            "yt-dlp search failed: {}",
            stderr.lines().last().unwrap_or("unknown error")
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut results = Vec::new();
    for line in stdout.lines() {
        let Ok(entry) = serde_json::from_str::<YtDlpSearchEntry>(line) else {
            continue;
        };
        results.push(VideoMetadata {
            video_id: entry.id,
            title: entry.title.unwrap_or_default(),
            channel: entry.channel.unwrap_or_default(),
            channel_id: entry.channel_id.unwrap_or_default(),
            description: entry.description.unwrap_or_default().chars().take(1000).collect(),
            thumbnail_url: entry.thumbnail.unwrap_or_default(),
            duration_seconds: entry.duration.unwrap_or(0.0),
            view_count: entry.view_count.unwrap_or(0),
            like_count: entry.like_count.unwrap_or(0),
            upload_date: parse_upload_date(entry.upload_date.as_deref()),
            detected_language: None,
            search_language: search_language.to_string(),
        });
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_yyyymmdd_upload_date() {
        let date = parse_upload_date(Some("20240315"));
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2024-03-15");
    }

    #[test]
    fn falls_back_to_now_on_malformed_date() {
        let date = parse_upload_date(Some("not-a-date"));
        assert!(date <= Utc::now());
    }
}
