use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::{bili::lister::ListOptions, error::ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    OpenAI,
    #[default]
    DeepSeek,
    SiliconFlow,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::DeepSeek => "deepseek",
            Provider::SiliconFlow => "siliconflow",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
            Provider::SiliconFlow => "SILICONFLOW_API_KEY",
        }
    }

    pub fn default_settings(&self) -> ProviderSettings {
        let (base_url, model) = match self {
            Provider::OpenAI => ("https://api.openai.com/v1", "gpt-3.5-turbo"),
            Provider::DeepSeek => ("https://api.deepseek.com/v1", "deepseek-chat"),
            Provider::SiliconFlow => ("https://api.siliconflow.cn/v1", "Qwen/Qwen2-72B-Instruct"),
        };
        ProviderSettings {
            api_key: None,
            model: model.into(),
            base_url: base_url.into(),
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "deepseek" => Ok(Provider::DeepSeek),
            "siliconflow" => Ok(Provider::SiliconFlow),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, PartialEq)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

// keeps API keys out of logs
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Providers {
    pub openai: ProviderSettings,
    pub deepseek: ProviderSettings,
    pub siliconflow: ProviderSettings,
}

impl Default for Providers {
    fn default() -> Self {
        Self {
            openai: Provider::OpenAI.default_settings(),
            deepseek: Provider::DeepSeek.default_settings(),
            siliconflow: Provider::SiliconFlow.default_settings(),
        }
    }
}

impl Providers {
    pub fn get(&self, provider: Provider) -> &ProviderSettings {
        match provider {
            Provider::OpenAI => &self.openai,
            Provider::DeepSeek => &self.deepseek,
            Provider::SiliconFlow => &self.siliconflow,
        }
    }

    pub fn get_mut(&mut self, provider: Provider) -> &mut ProviderSettings {
        match provider {
            Provider::OpenAI => &mut self.openai,
            Provider::DeepSeek => &mut self.deepseek,
            Provider::SiliconFlow => &mut self.siliconflow,
        }
    }
}

/// Everything one chat call needs to reach the selected provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub provider: Provider,
    pub settings: ProviderSettings,
}

/// Settings for a single run. Read-only once the run starts; the HTTP
/// backend derives a fresh copy per request via [`RunConfig::with_overrides`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub creator_id: String,
    pub max_videos: usize,
    pub page_size: u32,
    pub request_delay: Duration,
    pub provider: Provider,
    pub providers: Providers,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timezone: Tz,
    pub response_language: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            creator_id: String::new(),
            max_videos: 100,
            page_size: 30,
            request_delay: Duration::from_millis(100),
            provider: Provider::default(),
            providers: Providers::default(),
            temperature: 0.3,
            max_tokens: 1024,
            timezone: chrono_tz::Asia::Shanghai,
            response_language: "Simplified Chinese".into(),
        }
    }
}

/// Per-request values that may replace the defaults.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub creator_id: Option<String>,
    pub max_videos: Option<usize>,
    pub provider: Option<Provider>,
    pub api_keys: Vec<(Provider, String)>,
}

impl RunConfig {
    /// Returns a new config with `overrides` applied; `self` is untouched.
    pub fn with_overrides(&self, overrides: RunOverrides) -> RunConfig {
        let mut config = self.clone();

        if let Some(creator_id) = overrides.creator_id {
            config.creator_id = creator_id;
        }
        if let Some(max_videos) = overrides.max_videos {
            config.max_videos = max_videos;
        }
        if let Some(provider) = overrides.provider {
            config.provider = provider;
        }
        for (provider, key) in overrides.api_keys {
            if !key.trim().is_empty() {
                config.providers.get_mut(provider).api_key = Some(key);
            }
        }

        config
    }

    pub fn endpoint(&self) -> ProviderEndpoint {
        ProviderEndpoint {
            provider: self.provider,
            settings: self.providers.get(self.provider).clone(),
        }
    }

    pub fn list_options(&self) -> ListOptions {
        ListOptions {
            page_size: self.page_size,
            max_count: self.max_videos,
            delay: self.request_delay,
        }
    }

    /// Formats an epoch timestamp as `YYYY-mm-dd HH:MM:SS` in the run's timezone.
    pub fn format_timestamp(&self, epoch_secs: i64) -> String {
        let utc = DateTime::<Utc>::from_timestamp(epoch_secs, 0).unwrap_or_default();
        self.timezone
            .from_utc_datetime(&utc.naive_utc())
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, ConfigError> {
    name.parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        assert_eq!("DeepSeek".parse::<Provider>().unwrap(), Provider::DeepSeek);
        assert_eq!("openai".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!(" siliconflow ".parse::<Provider>().unwrap(), Provider::SiliconFlow);
        assert!(matches!(
            "claude".parse::<Provider>(),
            Err(ConfigError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_endpoint_follows_selected_provider() {
        let config = RunConfig {
            provider: Provider::SiliconFlow,
            ..Default::default()
        };
        let endpoint = config.endpoint();
        assert_eq!(endpoint.provider, Provider::SiliconFlow);
        assert_eq!(endpoint.settings.model, "Qwen/Qwen2-72B-Instruct");
        assert_eq!(endpoint.settings.base_url, "https://api.siliconflow.cn/v1");
    }

    #[test]
    fn test_overrides_do_not_touch_defaults() {
        let mut defaults = RunConfig::default();
        defaults.providers.deepseek.api_key = Some("server-key".into());
        let snapshot = defaults.clone();

        let request = defaults.with_overrides(RunOverrides {
            creator_id: Some("123".into()),
            max_videos: Some(5),
            provider: Some(Provider::SiliconFlow),
            api_keys: vec![
                (Provider::SiliconFlow, "request-key".into()),
                (Provider::DeepSeek, "".into()),
            ],
        });

        assert_eq!(defaults, snapshot);
        assert_eq!(request.creator_id, "123");
        assert_eq!(request.max_videos, 5);
        assert_eq!(request.provider, Provider::SiliconFlow);
        assert_eq!(request.providers.siliconflow.api_key.as_deref(), Some("request-key"));
        assert_eq!(request.providers.deepseek.api_key.as_deref(), Some("server-key"));
    }

    #[test]
    fn test_format_timestamp_in_timezone() {
        let config = RunConfig::default();
        // 2024-01-01T00:00:00Z
        assert_eq!(config.format_timestamp(1704067200), "2024-01-01 08:00:00");

        let utc = RunConfig {
            timezone: parse_timezone("UTC").unwrap(),
            ..Default::default()
        };
        assert_eq!(utc.format_timestamp(1704067200), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_invalid_timezone() {
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut settings = Provider::OpenAI.default_settings();
        settings.api_key = Some("sk-secret".into());
        assert!(!format!("{settings:?}").contains("sk-secret"));
    }
}
