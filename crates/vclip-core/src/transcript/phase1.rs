//! Phase 1 — parallel text-based extraction methods: the official caption
//! endpoint, the Innertube internal client, a watch-page scrape, and the
//! two public-mirror networks (Invidious, Piped).

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;

use crate::backoff::BackoffPolicy;
use crate::error::MethodError;
use crate::instance_health::InstanceHealthRegistry;
use crate::transcript::parse::{parse_json3, parse_vtt_or_srt};
use crate::transcript::types::{select_track, MethodOutcome};

/// One retry with jittered backoff (§4.8) around a single GET, used for
/// the methods that hit a single well-known endpoint rather than racing
/// across several candidate hosts.
async fn get_with_one_retry(client: &Client, url: &str) -> Result<reqwest::Response, reqwest::Error> {
    match client.get(url).send().await {
        Ok(response) => Ok(response),
        Err(_) => {
            tokio::time::sleep(BackoffPolicy::default().delay(0)).await;
            client.get(url).send().await
        }
    }
}

const INNERTUBE_CLIENT_PROFILES: [(&str, &str, &str); 4] = [
    ("ANDROID", "19.09.37", "com.google.android.youtube/19.09.37 (Linux; U; Android 14)"),
    ("WEB", "2.20240101.00.00", "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"),
    ("IOS", "19.09.3", "com.google.ios.youtube/19.09.3 (iPhone16,2; U; CPU iOS 17_4 like Mac OS X)"),
    ("TVHTML5_SIMPLY_EMBEDDED_PLAYER", "2.0", "Mozilla/5.0 (SMART-TV; LINUX; Tizen 6.5)"),
];

/// §4.6 method 1: official `timedtext` endpoint, requested directly in
/// `json3` format so the same JSON3 parser covers every text method.
pub async fn caption_api(
    client: &Client,
    video_id: &str,
    preferred_languages: &[String],
) -> Result<MethodOutcome, MethodError> {
    for lang in preferred_languages {
        let url = format!(
            "https://www.youtube.com/api/timedtext?v={video_id}&lang={lang}&fmt=json3"
        );
        let response = get_with_one_retry(client, &url).await.map_err(|e| MethodError::new("caption_api", e.to_string()))?;

        if !response.status().is_success() {
            continue;
        }
        let body = response.text().await.unwrap_or_default();
        if body.trim().is_empty() {
            continue;
        }
        let segments = parse_json3(&body);
        if !segments.is_empty() {
            return Ok(MethodOutcome { segments, language: lang.clone(), is_auto_generated: false });
        }
    }
    Err(MethodError::new("caption_api", "no transcript available for preferred languages"))
}

#[derive(Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    kind: Option<String>,
}

#[derive(Deserialize)]
struct CaptionsRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Vec<CaptionTrack>,
}

#[derive(Deserialize)]
struct CaptionsWrapper {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: CaptionsRenderer,
}

#[derive(Deserialize)]
struct PlayerResponse {
    captions: Option<CaptionsWrapper>,
}

async fn download_track(client: &Client, base_url: &str) -> Result<Vec<vclip_models::Segment>, String> {
    let url = if base_url.contains("fmt=") {
        base_url.to_string()
    } else {
        format!("{base_url}&fmt=json3")
    };
    let body = client.get(&url).send().await.map_err(|e| e.to_string())?.text().await.map_err(|e| e.to_string())?;
    let segments = parse_json3(&body);
    if segments.is_empty() {
        Err("empty caption track".to_string())
    } else {
        Ok(segments)
    }
}

fn pick_track(
    tracks: &[CaptionTrack],
    preferred_languages: &[String],
) -> Option<&CaptionTrack> {
    select_track(
        tracks,
        preferred_languages,
        |t| t.language_code.as_str(),
        |t| t.kind.as_deref() != Some("asr"),
    )
}

/// §4.6 method 2: Innertube client, trying each client-profile impersonation
/// in sequence within the method until one yields a usable player response.
pub async fn innertube_client(
    client: &Client,
    video_id: &str,
    preferred_languages: &[String],
) -> Result<MethodOutcome, MethodError> {
    for (client_name, client_version, user_agent) in INNERTUBE_CLIENT_PROFILES {
        let body = serde_json::json!({
            "videoId": video_id,
            "context": {
                "client": {
                    "clientName": client_name,
                    "clientVersion": client_version,
                }
            }
        });

        let response = match client
            .post("https://www.youtube.com/youtubei/v1/player")
            .header("User-Agent", user_agent)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => continue,
        };
        if !response.status().is_success() {
            continue;
        }
        let Ok(parsed) = response.json::<PlayerResponse>().await else {
            continue;
        };
        let Some(captions) = parsed.captions else {
            continue;
        };
        let tracks = captions.player_captions_tracklist_renderer.caption_tracks;
        let Some(track) = pick_track(&tracks, preferred_languages) else {
            continue;
        };
        if let Ok(segments) = download_track(client, &track.base_url).await {
            return Ok(MethodOutcome {
                segments,
                language: track.language_code.clone(),
                is_auto_generated: track.kind.as_deref() == Some("asr"),
            });
        }
    }
    Err(MethodError::new("innertube_client", "no client profile produced a usable transcript"))
}

/// §4.6 method 3: fetch the watch page, regex-extract the embedded player
/// response, select and download a caption track.
pub async fn watch_page_scrape(
    client: &Client,
    video_id: &str,
    preferred_languages: &[String],
) -> Result<MethodOutcome, MethodError> {
    let url = format!("https://www.youtube.com/watch?v={video_id}");
    let html = client
        .get(&url)
        .send()
        .await
        .map_err(|e| MethodError::new("watch_page_scrape", e.to_string()))?
        .text()
        .await
        .map_err(|e| MethodError::new("watch_page_scrape", e.to_string()))?;

    let re = Regex::new(r#"ytInitialPlayerResponse\s*=\s*(\{.+?\});"#).unwrap();
    let captures = re
        .captures(&html)
        .ok_or_else(|| MethodError::new("watch_page_scrape", "player response not found in watch page"))?;

    let parsed: PlayerResponse = serde_json::from_str(&captures[1])
        .map_err(|e| MethodError::new("watch_page_scrape", format!("failed to parse player response: {e}")))?;

    let captions = parsed
        .captions
        .ok_or_else(|| MethodError::new("watch_page_scrape", "no captions in player response"))?;
    let tracks = captions.player_captions_tracklist_renderer.caption_tracks;
    let track = pick_track(&tracks, preferred_languages)
        .ok_or_else(|| MethodError::new("watch_page_scrape", "no caption track matched"))?;

    let segments = download_track(client, &track.base_url)
        .await
        .map_err(|e| MethodError::new("watch_page_scrape", e))?;

    Ok(MethodOutcome {
        segments,
        language: track.language_code.clone(),
        is_auto_generated: track.kind.as_deref() == Some("asr"),
    })
}

#[derive(Deserialize)]
struct InvidiousCaption {
    label: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    url: String,
}

#[derive(Deserialize)]
struct InvidiousCaptionsResponse {
    captions: Vec<InvidiousCaption>,
}

/// §4.6 method 4: query each healthy Invidious instance in turn.
pub async fn invidious(
    client: &Client,
    video_id: &str,
    preferred_languages: &[String],
    instances: &[String],
    health: &InstanceHealthRegistry,
) -> Result<MethodOutcome, MethodError> {
    let healthy = health.get_healthy_instances(instances).await;
    for instance in healthy.iter().take(5) {
        let url = format!("{instance}/api/v1/captions/{video_id}");
        let response = match client.get(&url).send().await {
            Ok(r) => r,
            Err(_) => {
                health.record_failure(instance).await;
                continue;
            }
        };
        if !response.status().is_success() {
            health.record_failure(instance).await;
            continue;
        }
        let Ok(parsed) = response.json::<InvidiousCaptionsResponse>().await else {
            health.record_failure(instance).await;
            continue;
        };
        let Some(track) = select_track(
            &parsed.captions,
            preferred_languages,
            |c| c.language_code.as_str(),
            |_| true,
        ) else {
            health.record_failure(instance).await;
            continue;
        };

        let full_url = if track.url.starts_with("http") {
            track.url.clone()
        } else {
            format!("{instance}{}", track.url)
        };
        let Ok(vtt) = client.get(&full_url).send().await.and_then_ok_text().await else {
            health.record_failure(instance).await;
            continue;
        };
        let segments = parse_vtt_or_srt(&vtt);
        if segments.is_empty() {
            health.record_failure(instance).await;
            continue;
        }

        health.record_success(instance).await;
        return Ok(MethodOutcome {
            segments,
            language: track.language_code.clone(),
            is_auto_generated: track.label.to_lowercase().contains("auto"),
        });
    }
    Err(MethodError::new("invidious", "no healthy instance returned a usable transcript"))
}

#[derive(Deserialize)]
struct PipedSubtitle {
    url: String,
    code: String,
    #[serde(default, rename = "autoGenerated")]
    auto_generated: bool,
}

#[derive(Deserialize)]
struct PipedStreamsResponse {
    subtitles: Vec<PipedSubtitle>,
}

/// §4.6 method 5: query each healthy Piped instance in turn.
pub async fn piped(
    client: &Client,
    video_id: &str,
    preferred_languages: &[String],
    instances: &[String],
    health: &InstanceHealthRegistry,
) -> Result<MethodOutcome, MethodError> {
    let healthy = health.get_healthy_instances(instances).await;
    for instance in healthy.iter().take(6) {
        let url = format!("{instance}/streams/{video_id}");
        let response = match client.get(&url).send().await {
            Ok(r) => r,
            Err(_) => {
                health.record_failure(instance).await;
                continue;
            }
        };
        if !response.status().is_success() {
            health.record_failure(instance).await;
            continue;
        }
        let Ok(parsed) = response.json::<PipedStreamsResponse>().await else {
            health.record_failure(instance).await;
            continue;
        };
        let Some(track) = select_track(
            &parsed.subtitles,
            preferred_languages,
            |s| s.code.as_str(),
            |s| !s.auto_generated,
        ) else {
            health.record_failure(instance).await;
            continue;
        };

        let Ok(vtt) = client.get(&track.url).send().await.and_then_ok_text().await else {
            health.record_failure(instance).await;
            continue;
        };
        let segments = parse_vtt_or_srt(&vtt);
        if segments.is_empty() {
            health.record_failure(instance).await;
            continue;
        }

        health.record_success(instance).await;
        return Ok(MethodOutcome {
            segments,
            language: track.code.clone(),
            is_auto_generated: track.auto_generated,
        });
    }
    Err(MethodError::new("piped", "no healthy instance returned a usable transcript"))
}

/// Small helper trait so the network methods above can chain
/// `.send().await.and_then_ok_text().await` without an intermediate `match`.
#[async_trait::async_trait]
trait ResponseTextExt {
    async fn and_then_ok_text(self) -> Result<String, reqwest::Error>;
}

#[async_trait::async_trait]
impl ResponseTextExt for Result<reqwest::Response, reqwest::Error> {
    async fn and_then_ok_text(self) -> Result<String, reqwest::Error> {
        self?.text().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_manual_over_auto_in_preferred_language() {
        let tracks = vec![
            CaptionTrack { base_url: "a".into(), language_code: "en".into(), kind: Some("asr".into()) },
            CaptionTrack { base_url: "b".into(), language_code: "en".into(), kind: None },
        ];
        let picked = pick_track(&tracks, &["en".to_string()]).unwrap();
        assert_eq!(picked.base_url, "b");
    }

    #[test]
    fn falls_back_to_first_track_when_no_language_matches() {
        let tracks = vec![CaptionTrack { base_url: "a".into(), language_code: "de".into(), kind: None }];
        let picked = pick_track(&tracks, &["en".to_string()]).unwrap();
        assert_eq!(picked.base_url, "a");
    }
}
