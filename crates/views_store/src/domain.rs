use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// The outcome of processing a single video.
///
/// `core_view` is never empty: it holds either the extracted summary or a
/// failure message describing why extraction was not possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    #[serde(alias = "视频标题")]
    pub title: String,
    #[serde(alias = "视频链接")]
    pub url: String,
    #[serde(alias = "发布时间")]
    pub published_at_formatted: String,
    #[serde(alias = "核心观点")]
    pub core_view: String,
}

/// Run-level metadata written alongside the records.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub creator_id: String,
    pub overall_summary: Option<String>,
    pub generated_at: DateTime<Local>,
}

impl RunContext {
    pub fn new(creator_id: impl Into<String>) -> Self {
        Self {
            creator_id: creator_id.into(),
            overall_summary: None,
            generated_at: Local::now(),
        }
    }

    pub fn with_overall_summary(mut self, summary: impl Into<String>) -> Self {
        self.overall_summary = Some(summary.into());
        self
    }
}
