pub mod client;
pub mod lister;
pub mod subtitle;

use std::future::Future;

use serde_json::Value;

use crate::{
    error::PlatformError,
    types::{SubtitleBody, SubtitleTrack},
};

/// Parameter sets accepted by the listing endpoint, widest first. When the
/// platform rejects one, the lister retries the page with the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListQuery {
    /// `pn` + `ps`
    Paged { page: u32, page_size: u32 },
    /// `ps` only
    PageSize { page_size: u32 },
    /// legacy `page_size` only
    LegacyPageSize { page_size: u32 },
    /// no parameters: the whole catalog the endpoint is willing to return
    Catalog,
}

impl ListQuery {
    /// The degradation ladder for `page`.
    pub fn ladder(page: u32, page_size: u32) -> [ListQuery; 4] {
        [
            ListQuery::Paged { page, page_size },
            ListQuery::PageSize { page_size },
            ListQuery::LegacyPageSize { page_size },
            ListQuery::Catalog,
        ]
    }

    pub fn is_paged(&self) -> bool {
        matches!(self, ListQuery::Paged { .. })
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match *self {
            ListQuery::Paged { page, page_size } => {
                vec![("pn", page.to_string()), ("ps", page_size.to_string())]
            }
            ListQuery::PageSize { page_size } => vec![("ps", page_size.to_string())],
            ListQuery::LegacyPageSize { page_size } => vec![("page_size", page_size.to_string())],
            ListQuery::Catalog => Vec::new(),
        }
    }
}

pub trait VideoSource {
    /// Fetches one listing payload for `creator_id`. Returns the raw payload
    /// (see [`crate::parser::parse_video_list`]).
    fn fetch_videos(
        &self,
        creator_id: &str,
        query: ListQuery,
    ) -> impl Future<Output = Result<Value, PlatformError>> + Send;
}

pub trait SubtitleSource {
    /// Resolves the internal content id of a video.
    fn video_cid(&self, video_id: &str) -> impl Future<Output = Result<u64, PlatformError>> + Send;

    fn subtitle_tracks(
        &self,
        video_id: &str,
        cid: u64,
    ) -> impl Future<Output = Result<Vec<SubtitleTrack>, PlatformError>> + Send;

    fn subtitle_body(
        &self,
        track: &SubtitleTrack,
    ) -> impl Future<Output = Result<SubtitleBody, PlatformError>> + Send;
}

impl<T: VideoSource + Send + Sync> VideoSource for &T {
    async fn fetch_videos(&self, creator_id: &str, query: ListQuery) -> Result<Value, PlatformError> {
        (**self).fetch_videos(creator_id, query).await
    }
}

impl<T: SubtitleSource + Send + Sync> SubtitleSource for &T {
    async fn video_cid(&self, video_id: &str) -> Result<u64, PlatformError> {
        (**self).video_cid(video_id).await
    }

    async fn subtitle_tracks(
        &self,
        video_id: &str,
        cid: u64,
    ) -> Result<Vec<SubtitleTrack>, PlatformError> {
        (**self).subtitle_tracks(video_id, cid).await
    }

    async fn subtitle_body(&self, track: &SubtitleTrack) -> Result<SubtitleBody, PlatformError> {
        (**self).subtitle_body(track).await
    }
}
