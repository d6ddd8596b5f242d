//! Track resolution through yt-dlp.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::music::track::Track;

const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no results for query")]
    NoResults,
    #[error("resolver timed out")]
    Timeout,
    #[error("yt-dlp exited with an error: {0}")]
    Tool(String),
    #[error("failed to launch yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("unexpected yt-dlp metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Turns a user query into an ordered list of playable tracks.
///
/// A plain URL resolves as-is (one track, or every entry for a playlist URL);
/// anything else is treated as a search and yields the single best match.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, query: &str, requested_by: u64) -> Result<Vec<Track>, ResolveError>;
}

/// Resolver shelling out to the yt-dlp binary for metadata.
pub struct YtDlpResolver {
    timeout: Duration,
}

impl YtDlpResolver {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(&self, query: &str, requested_by: u64) -> Result<Vec<Track>, ResolveError> {
        let target = if query.starts_with("http://") || query.starts_with("https://") {
            query.to_string()
        } else {
            format!("ytsearch1:{query}")
        };

        debug!(%target, "resolving track metadata");

        let output = tokio::time::timeout(
            self.timeout,
            Command::new("yt-dlp")
                .args(["--dump-single-json", "--flat-playlist", "--no-warnings"])
                .arg(&target)
                .output(),
        )
        .await
        .map_err(|_| ResolveError::Timeout)??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolveError::Tool(stderr.trim().to_string()));
        }

        let metadata: TrackMetadata = serde_json::from_slice(&output.stdout)?;
        let tracks = tracks_from_metadata(metadata, requested_by);

        if tracks.is_empty() {
            return Err(ResolveError::NoResults);
        }
        Ok(tracks)
    }
}

/// Single-video or playlist metadata as emitted by `yt-dlp --dump-single-json`.
#[derive(Debug, Deserialize)]
struct TrackMetadata {
    title: Option<String>,
    webpage_url: Option<String>,
    url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    /// Present for playlists and search results; each entry is a track.
    entries: Option<Vec<TrackMetadata>>,
}

/// Flattens yt-dlp metadata into tracks, expanding playlist entries and
/// dropping entries without a usable URL.
fn tracks_from_metadata(metadata: TrackMetadata, requested_by: u64) -> Vec<Track> {
    match metadata.entries {
        Some(entries) => entries
            .into_iter()
            .flat_map(|entry| tracks_from_metadata(entry, requested_by))
            .collect(),
        None => {
            let Some(url) = metadata.webpage_url.or(metadata.url) else {
                return Vec::new();
            };
            vec![Track {
                title: metadata.title.unwrap_or_else(|| "Unknown title".to_string()),
                url,
                duration: metadata
                    .duration
                    .filter(|seconds| *seconds >= 0.0)
                    .map(Duration::from_secs_f64),
                thumbnail: metadata.thumbnail,
                requested_by,
            }]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_video_metadata_yields_one_track() {
        let metadata: TrackMetadata = serde_json::from_str(
            r#"{
                "title": "Test Song",
                "webpage_url": "https://example.com/watch?v=abc",
                "duration": 213.0,
                "thumbnail": "https://example.com/thumb.jpg"
            }"#,
        )
        .unwrap();

        let tracks = tracks_from_metadata(metadata, 42);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Test Song");
        assert_eq!(tracks[0].url, "https://example.com/watch?v=abc");
        assert_eq!(tracks[0].duration, Some(Duration::from_secs(213)));
        assert_eq!(
            tracks[0].thumbnail.as_deref(),
            Some("https://example.com/thumb.jpg")
        );
        assert_eq!(tracks[0].requested_by, 42);
    }

    #[test]
    fn playlist_metadata_preserves_entry_order() {
        let metadata: TrackMetadata = serde_json::from_str(
            r#"{
                "title": "Some Playlist",
                "entries": [
                    {"title": "First", "url": "https://example.com/1", "duration": 60},
                    {"title": "Second", "url": "https://example.com/2", "duration": 90}
                ]
            }"#,
        )
        .unwrap();

        let tracks = tracks_from_metadata(metadata, 7);

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "First");
        assert_eq!(tracks[1].title, "Second");
    }

    #[test]
    fn entries_without_urls_are_dropped() {
        let metadata: TrackMetadata = serde_json::from_str(
            r#"{
                "entries": [
                    {"title": "Unavailable"},
                    {"title": "Playable", "url": "https://example.com/ok"}
                ]
            }"#,
        )
        .unwrap();

        let tracks = tracks_from_metadata(metadata, 7);

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Playable");
    }

    #[test]
    fn missing_title_gets_a_placeholder() {
        let metadata: TrackMetadata = serde_json::from_str(
            r#"{"url": "https://example.com/raw"}"#,
        )
        .unwrap();

        let tracks = tracks_from_metadata(metadata, 7);

        assert_eq!(tracks[0].title, "Unknown title");
        assert_eq!(tracks[0].duration, None);
        assert_eq!(tracks[0].thumbnail, None);
    }
}
