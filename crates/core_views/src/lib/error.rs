#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Platform rejected request parameters ({code}): {message}")]
    Rejected { code: i64, message: String },
    #[error("Platform error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("Unexpected HTTP status: {0}")]
    Status(u16),
    #[error("Malformed payload: {0}")]
    Malformed(&'static str),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlatformError {
    /// Whether the platform refused the parameter set rather than failing outright.
    pub fn is_rejection(&self) -> bool {
        matches!(self, PlatformError::Rejected { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unsupported model provider: {0} (expected openai, deepseek or siliconflow)")]
    UnsupportedProvider(String),
    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),
}
