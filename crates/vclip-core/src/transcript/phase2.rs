//! Phase 2 — sequential subprocess methods, shelling out to `yt-dlp` the
//! way the teacher's `vclip-worker::transcript::fetch_transcript_ytdlp`
//! does: write subtitles to a temp dir, find the file, parse it, clean up.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::MethodError;
use crate::transcript::parse::parse_vtt_or_srt;
use crate::transcript::types::MethodOutcome;

const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
];

fn rotating_user_agent(attempt: usize) -> &'static str {
    USER_AGENTS[attempt % USER_AGENTS.len()]
}

async fn run_yt_dlp(
    video_url: &str,
    workdir: &Path,
    preferred_languages: &[String],
    auto_subs: bool,
    attempt: usize,
) -> Result<(), String> {
    which::which("yt-dlp").map_err(|_| "yt-dlp not found on PATH".to_string())?;

    let output_template = workdir.join("%(id)s");
    let lang_arg = preferred_languages.join(",");
    let sub_flag = if auto_subs { "--write-auto-subs" } else { "--write-subs" };

    let output = Command::new("yt-dlp")
        .args([
            sub_flag,
            "--skip-download",
            "--sub-format",
            "vtt/srt",
            "--sub-langs",
            &lang_arg,
            "--user-agent",
            rotating_user_agent(attempt),
            "--sleep-requests",
            "1",
            "--output",
        ])
        .arg(&output_template)
        .arg(video_url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("failed to spawn yt-dlp: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("yt-dlp exited with failure: {}", stderr.lines().last().unwrap_or("unknown error")));
    }
    Ok(())
}

fn find_and_read_subtitle_file(workdir: &Path, preferred_languages: &[String]) -> Result<(String, String), String> {
    let mut candidates: Vec<_> = std::fs::read_dir(workdir)
        .map_err(|e| format!("failed to read workdir: {e}"))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            matches!(
                entry.path().extension().and_then(|s| s.to_str()),
                Some("vtt") | Some("srt")
            )
        })
        .collect();

    if candidates.is_empty() {
        return Err("no subtitle file produced".to_string());
    }

    candidates.sort_by_key(|entry| {
        let name = entry.file_name().to_string_lossy().to_string();
        preferred_languages
            .iter()
            .position(|lang| name.contains(lang.as_str()))
            .unwrap_or(usize::MAX)
    });

    let path = candidates[0].path();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    let language = preferred_languages
        .iter()
        .find(|lang| name.contains(lang.as_str()))
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    let content = std::fs::read_to_string(&path).map_err(|e| format!("failed to read subtitle file: {e}"))?;

    for entry in &candidates {
        let _ = std::fs::remove_file(entry.path());
    }

    Ok((content, language))
}

async fn extract_with_ytdlp(
    method: &'static str,
    video_url: &str,
    preferred_languages: &[String],
    auto_subs: bool,
) -> Result<MethodOutcome, MethodError> {
    let workdir = std::env::temp_dir().join(format!("vclip-transcript-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&workdir)
        .await
        .map_err(|e| MethodError::new(method, format!("failed to create workdir: {e}")))?;

    let result = run_yt_dlp(video_url, &workdir, preferred_languages, auto_subs, 0).await;
    let outcome = match result {
        Ok(()) => find_and_read_subtitle_file(&workdir, preferred_languages).map(|(content, language)| {
            let segments = parse_vtt_or_srt(&content);
            MethodOutcome { segments, language, is_auto_generated: auto_subs }
        }),
        Err(e) => Err(e),
    };

    let _ = tokio::fs::remove_dir_all(&workdir).await;

    outcome.map_err(|e| MethodError::new(method, e)).and_then(|outcome| {
        if outcome.segments.is_empty() {
            Err(MethodError::new(method, "subtitle file parsed to zero segments"))
        } else {
            Ok(outcome)
        }
    })
}

/// §4.6 method 6: manually-authored subtitles.
pub async fn yt_dlp_manual_subs(video_url: &str, preferred_languages: &[String]) -> Result<MethodOutcome, MethodError> {
    extract_with_ytdlp("yt_dlp_manual_subs", video_url, preferred_languages, false).await
}

/// §4.6 method 7: auto-generated subtitles.
pub async fn yt_dlp_auto_subs(video_url: &str, preferred_languages: &[String]) -> Result<MethodOutcome, MethodError> {
    extract_with_ytdlp("yt_dlp_auto_subs", video_url, preferred_languages, true).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotating_user_agent_wraps_around() {
        assert_eq!(rotating_user_agent(0), rotating_user_agent(USER_AGENTS.len()));
    }
}
