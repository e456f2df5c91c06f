use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use core_views::{
    types::{SubtitleBody, SubtitleFragment, SubtitleTrack},
    ListQuery, PlatformError, SubtitleSource, VideoSource,
};
use serde_json::{json, Value};

/// 2024-01-01T00:00:00Z
pub const FIRST_PUBLISHED_AT: i64 = 1_704_067_200;

/// Serves a fixed catalog on the first page and subtitles keyed by video id.
#[derive(Clone, Default)]
pub struct MockPlatform {
    pub videos: Vec<Value>,
    pub subtitles: HashMap<String, Vec<String>>,
    pub fail_listing: bool,
    pub panic_on: Option<String>,
    pub list_calls: Arc<Mutex<Vec<(String, ListQuery)>>>,
    pub subtitle_calls: Arc<Mutex<Vec<String>>>,
}

impl MockPlatform {
    /// `(id, title, description)` triples, published one hour apart.
    pub fn with_videos(videos: &[(&str, &str, &str)]) -> Self {
        Self {
            videos: videos
                .iter()
                .enumerate()
                .map(|(i, (id, title, description))| {
                    json!({
                        "bvid": id,
                        "title": title,
                        "description": description,
                        "created": FIRST_PUBLISHED_AT + 3600 * i as i64,
                    })
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_listing: true,
            ..Default::default()
        }
    }

    pub fn subtitle(mut self, video_id: &str, fragments: &[&str]) -> Self {
        self.subtitles.insert(
            video_id.to_string(),
            fragments.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    pub fn panicking_on(mut self, video_id: &str) -> Self {
        self.panic_on = Some(video_id.to_string());
        self
    }
}

impl VideoSource for MockPlatform {
    async fn fetch_videos(&self, creator_id: &str, query: ListQuery) -> Result<Value, PlatformError> {
        self.list_calls
            .lock()
            .unwrap()
            .push((creator_id.to_string(), query));

        if self.fail_listing {
            return Err(PlatformError::Status(503));
        }

        match query {
            ListQuery::Paged { page: 1, .. } | ListQuery::Catalog => {
                Ok(json!({"list": {"vlist": self.videos}}))
            }
            _ => Ok(json!({"list": {"vlist": []}})),
        }
    }
}

impl SubtitleSource for MockPlatform {
    async fn video_cid(&self, video_id: &str) -> Result<u64, PlatformError> {
        self.subtitle_calls.lock().unwrap().push(video_id.to_string());
        if self.panic_on.as_deref() == Some(video_id) {
            panic!("subtitle service exploded on {video_id}");
        }
        Ok(1)
    }

    async fn subtitle_tracks(&self, video_id: &str, _cid: u64) -> Result<Vec<SubtitleTrack>, PlatformError> {
        Ok(self
            .subtitles
            .get(video_id)
            .map(|_| {
                vec![SubtitleTrack {
                    lan: "zh-CN".into(),
                    subtitle_url: video_id.to_string(),
                }]
            })
            .unwrap_or_default())
    }

    async fn subtitle_body(&self, track: &SubtitleTrack) -> Result<SubtitleBody, PlatformError> {
        let fragments = self
            .subtitles
            .get(&track.subtitle_url)
            .cloned()
            .unwrap_or_default();

        Ok(SubtitleBody {
            body: fragments
                .into_iter()
                .map(|content| SubtitleFragment { content })
                .collect(),
        })
    }
}
