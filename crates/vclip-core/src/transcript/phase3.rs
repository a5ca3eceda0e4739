//! Phase 3 — audio-transcription fallback. Downloads the audio track once
//! (re-encoding it down if oversized) and tries the configured paid
//! transcription providers against the shared buffer, the way §4.6 Phase 3
//! specifies.

use std::process::Stdio;
use std::sync::Arc;

use bytes::Bytes;
use tokio::process::Command;
use tracing::{debug, warn};
use vclip_llm::TranscriptionProvider;

use crate::error::MethodError;
use crate::transcript::types::MethodOutcome;

const MAX_AUDIO_BYTES: u64 = 25 * 1024 * 1024;

/// Download the video's audio track once via `yt-dlp -f bestaudio`,
/// re-encoding with `ffmpeg` (32kbit/s mono 16kHz) if it exceeds 25MB.
pub async fn download_audio(video_url: &str) -> Result<Bytes, String> {
    which::which("yt-dlp").map_err(|_| "yt-dlp not found on PATH".to_string())?;

    let workdir = std::env::temp_dir().join(format!("vclip-audio-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&workdir)
        .await
        .map_err(|e| format!("failed to create workdir: {e}"))?;
    let raw_path = workdir.join("audio.m4a");

    let output = Command::new("yt-dlp")
        .args(["-f", "bestaudio", "-o"])
        .arg(&raw_path)
        .arg(video_url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| format!("failed to spawn yt-dlp: {e}"))?;

    if !output.status.success() {
        let _ = tokio::fs::remove_dir_all(&workdir).await;
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("yt-dlp audio download failed: {}", stderr.lines().last().unwrap_or("unknown error")));
    }

    let size = tokio::fs::metadata(&raw_path)
        .await
        .map_err(|e| format!("failed to stat downloaded audio: {e}"))?
        .len();

    let final_path = if size > MAX_AUDIO_BYTES {
        let encoded_path = workdir.join("audio.mp3");
        let encode_result = Command::new("ffmpeg")
            .args(["-y", "-i"])
            .arg(&raw_path)
            .args(["-ac", "1", "-ar", "16000", "-b:a", "32k"])
            .arg(&encoded_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| format!("failed to spawn ffmpeg: {e}"))?;
        if !encode_result.status.success() {
            let _ = tokio::fs::remove_dir_all(&workdir).await;
            return Err("ffmpeg re-encode failed".to_string());
        }
        encoded_path
    } else {
        raw_path
    };

    let bytes = tokio::fs::read(&final_path)
        .await
        .map_err(|e| format!("failed to read encoded audio: {e}"))?;
    let _ = tokio::fs::remove_dir_all(&workdir).await;

    Ok(Bytes::from(bytes))
}

/// Try each configured transcription provider in §4.6 catalog order
/// (low-latency Whisper, general Whisper, streaming, async-poll),
/// skipping any that lack an API key.
pub async fn transcribe_with_providers(
    providers: &[Arc<dyn TranscriptionProvider>],
    audio: Bytes,
    language_hint: Option<&str>,
) -> Result<(&'static str, MethodOutcome), MethodError> {
    for provider in providers {
        if !provider.is_configured() {
            debug!(provider = provider.name(), "skipping unconfigured transcription provider");
            continue;
        }
        match provider.transcribe(audio.clone(), language_hint).await {
            Ok(text) if !text.trim().is_empty() => {
                return Ok((
                    provider.name(),
                    MethodOutcome {
                        segments: vec![vclip_models::Segment {
                            text,
                            start_seconds: 0.0,
                            duration_seconds: 0.0,
                        }],
                        language: language_hint.unwrap_or("unknown").to_string(),
                        is_auto_generated: true,
                    },
                ));
            }
            Ok(_) => warn!(provider = provider.name(), "transcription provider returned empty text"),
            Err(err) => warn!(provider = provider.name(), error = %err, "transcription provider failed"),
        }
    }
    Err(MethodError::new("audio_transcription", "all configured transcription providers failed or were unconfigured"))
}
