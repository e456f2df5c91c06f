use std::ops::Deref;

use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    bili::{ListQuery, SubtitleSource, VideoSource},
    error::PlatformError,
    types::{ApiEnvelope, PlayerInfo, SubtitleBody, SubtitleTrack, ViewInfo},
};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Platform code for "request parameters invalid"
const CODE_BAD_PARAMS: i64 = -400;

/// Bilibili web API client.
#[derive(Debug, Clone)]
pub struct BiliClient {
    client: reqwest::Client,
    base_url: String,
}

impl Deref for BiliClient {
    type Target = reqwest::Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Default for BiliClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl BiliClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.bilibili.com";

    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: Self::DEFAULT_BASE_URL.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn browser_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(REFERER, HeaderValue::from_static("https://www.bilibili.com"));
        headers
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, PlatformError> {
        let resp = self
            .get(url)
            .headers(Self::browser_headers())
            .query(query)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, url, "Failed to make http request"))?;

        if !resp.status().is_success() {
            return Err(PlatformError::Status(resp.status().as_u16()));
        }

        Ok(resp.json::<Value>().await?)
    }

    /// Unwraps the `{code, message, data}` envelope.
    fn unwrap_envelope<T: DeserializeOwned>(body: Value) -> Result<T, PlatformError> {
        let envelope = serde_json::from_value::<ApiEnvelope<T>>(body)?;
        match envelope.code {
            0 => envelope
                .data
                .ok_or(PlatformError::Malformed("envelope has no data")),
            CODE_BAD_PARAMS => Err(PlatformError::Rejected {
                code: envelope.code,
                message: envelope.message,
            }),
            code => Err(PlatformError::Api {
                code,
                message: envelope.message,
            }),
        }
    }
}

impl VideoSource for BiliClient {
    #[tracing::instrument(skip(self))]
    async fn fetch_videos(&self, creator_id: &str, query: ListQuery) -> Result<Value, PlatformError> {
        let url = format!("{}/x/space/arc/search", self.base_url);
        let mut params = vec![("mid", creator_id.to_string())];
        params.extend(query.query_pairs());

        let body = self.get_json(&url, &params).await?;

        // legacy endpoints answer with a bare array and no envelope
        if body.is_array() {
            return Ok(body);
        }
        Self::unwrap_envelope::<Value>(body)
    }
}

impl SubtitleSource for BiliClient {
    async fn video_cid(&self, video_id: &str) -> Result<u64, PlatformError> {
        let url = format!("{}/x/web-interface/view", self.base_url);
        let body = self.get_json(&url, &[("bvid", video_id.to_string())]).await?;

        Ok(Self::unwrap_envelope::<ViewInfo>(body)?.cid)
    }

    async fn subtitle_tracks(
        &self,
        video_id: &str,
        cid: u64,
    ) -> Result<Vec<SubtitleTrack>, PlatformError> {
        let url = format!("{}/x/player/v2", self.base_url);
        let body = self
            .get_json(
                &url,
                &[("bvid", video_id.to_string()), ("cid", cid.to_string())],
            )
            .await?;

        let player = Self::unwrap_envelope::<PlayerInfo>(body)?;
        Ok(player.subtitle.unwrap_or_default().subtitles)
    }

    async fn subtitle_body(&self, track: &SubtitleTrack) -> Result<SubtitleBody, PlatformError> {
        let url = absolute_url(&track.subtitle_url);
        let body = self.get_json(&url, &[]).await?;

        Ok(serde_json::from_value::<SubtitleBody>(body)?)
    }
}

/// Subtitle URLs in the manifest are protocol-relative (`//i0.hdslb.com/...`).
fn absolute_url(url: &str) -> String {
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("//i0.hdslb.com/bfs/subtitle/x.json"),
            "https://i0.hdslb.com/bfs/subtitle/x.json"
        );
        assert_eq!(absolute_url("https://a.b/c.json"), "https://a.b/c.json");
    }

    #[test]
    fn test_unwrap_envelope_success() {
        let body = json!({"code": 0, "message": "0", "data": {"cid": 123456}});
        let view = BiliClient::unwrap_envelope::<ViewInfo>(body).unwrap();
        assert_eq!(view.cid, 123456);
    }

    #[test]
    fn test_unwrap_envelope_rejection() {
        let body = json!({"code": -400, "message": "请求错误", "data": null});
        let err = BiliClient::unwrap_envelope::<Value>(body).unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn test_unwrap_envelope_api_error() {
        let body = json!({"code": -412, "message": "request was banned"});
        let err = BiliClient::unwrap_envelope::<Value>(body).unwrap_err();
        assert!(matches!(err, PlatformError::Api { code: -412, .. }));
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_unwrap_envelope_missing_data() {
        let body = json!({"code": 0, "message": "0"});
        let err = BiliClient::unwrap_envelope::<ViewInfo>(body).unwrap_err();
        assert!(matches!(err, PlatformError::Malformed(_)));
    }

    #[test]
    fn test_player_without_subtitles() {
        let body = json!({"code": 0, "data": {"subtitle": {"subtitles": []}}});
        let player = BiliClient::unwrap_envelope::<PlayerInfo>(body).unwrap();
        assert!(player.subtitle.unwrap().subtitles.is_empty());
    }
}
