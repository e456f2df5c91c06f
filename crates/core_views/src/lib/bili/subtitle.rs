use std::fmt;

use itertools::Itertools;

use crate::{bili::SubtitleSource, error::PlatformError};

/// Result of looking for a video's subtitles. Never an error: subtitle
/// availability on the platform is too inconsistent for a missing track to
/// stop the pipeline, so callers decide what to fall back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtitleText {
    Available(String),
    Unavailable(Unavailable),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    NoTracks,
    EmptyTrack,
    Platform(String),
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::NoTracks => write!(f, "no subtitle tracks"),
            Unavailable::EmptyTrack => write!(f, "subtitle track is empty"),
            Unavailable::Platform(reason) => write!(f, "{reason}"),
        }
    }
}

impl From<PlatformError> for Unavailable {
    fn from(e: PlatformError) -> Self {
        Unavailable::Platform(e.to_string())
    }
}

/// Downloads the first subtitle track of `video_id` and joins its fragments
/// with single spaces.
#[tracing::instrument(skip(source))]
pub async fn fetch_subtitle<S: SubtitleSource>(source: &S, video_id: &str) -> SubtitleText {
    match try_fetch_subtitle(source, video_id).await {
        Ok(text) => {
            tracing::info!(chars = text.chars().count(), "Fetched subtitles");
            SubtitleText::Available(text)
        }
        Err(reason) => {
            tracing::info!(%reason, "No subtitles available");
            SubtitleText::Unavailable(reason)
        }
    }
}

async fn try_fetch_subtitle<S: SubtitleSource>(
    source: &S,
    video_id: &str,
) -> Result<String, Unavailable> {
    let cid = source.video_cid(video_id).await?;
    let tracks = source.subtitle_tracks(video_id, cid).await?;
    let track = tracks.first().ok_or(Unavailable::NoTracks)?;

    tracing::debug!(lan = %track.lan, "Using first subtitle track");
    let body = source.subtitle_body(track).await?;

    let text = body
        .body
        .iter()
        .map(|fragment| fragment.content.as_str())
        .join(" ")
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(Unavailable::EmptyTrack);
    }
    Ok(text)
}
