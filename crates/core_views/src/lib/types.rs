use serde::Deserialize;
use serde_json::Value;

pub const VIDEO_BASE_URL: &str = "https://www.bilibili.com/video";

/// A creator's video as the rest of the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    /// Epoch seconds
    pub published_at: i64,
}

impl VideoRecord {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        published_at: i64,
    ) -> Self {
        let id = id.into();
        Self {
            url: format!("{VIDEO_BASE_URL}/{id}"),
            id,
            title: title.into(),
            description: description.into(),
            published_at,
        }
    }
}

/// The payload shapes the listing endpoint has been observed to return.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawVideoList {
    /// `{"list": {"vlist": [...]}}`
    Nested { list: NestedVideoList },
    /// `{"data": [...]}`
    Flat { data: Vec<Value> },
    /// `[...]`
    Legacy(Vec<Value>),
    Other(Value),
}

#[derive(Debug, Deserialize)]
pub struct NestedVideoList {
    #[serde(default)]
    pub vlist: Vec<Value>,
}

/// One listing item. Every field is optional because the shapes disagree on
/// naming (`desc` vs `description`, `pubdate` vs `created`).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawVideo {
    pub bvid: Option<String>,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub description: Option<String>,
    pub pubdate: Option<i64>,
    pub created: Option<i64>,
}

/// Standard API envelope: `{"code": 0, "message": "0", "data": {...}}`
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct ViewInfo {
    pub cid: u64,
}

#[derive(Debug, Deserialize)]
pub struct PlayerInfo {
    pub subtitle: Option<SubtitleManifest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubtitleManifest {
    #[serde(default)]
    pub subtitles: Vec<SubtitleTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleTrack {
    #[serde(default)]
    pub lan: String,
    pub subtitle_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SubtitleBody {
    pub body: Vec<SubtitleFragment>,
}

#[derive(Debug, Deserialize)]
pub struct SubtitleFragment {
    #[serde(default)]
    pub content: String,
}
