use std::{fmt::Display, future::Future, sync::LazyLock};

use regex::{Captures, Regex};

use crate::config::{ProviderEndpoint, RunConfig};

pub mod aggregator;
pub mod openai;
pub mod summarizer;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").unwrap());

/// A single chat completion call against an OpenAI-compatible provider.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub endpoint: ProviderEndpoint,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatRequest {
    pub fn new(config: &RunConfig, prompt: impl Into<String>) -> Self {
        Self {
            endpoint: config.endpoint(),
            prompt: prompt.into(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

pub trait ChatModel {
    type Error: Display + Send;

    /// Returns the trimmed content of the first completion choice.
    fn complete(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

impl<T: ChatModel + Sync> ChatModel for &T {
    type Error = T::Error;

    fn complete(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send {
        (**self).complete(request)
    }
}

/// Substitutes `{name}` placeholders in one pass. Placeholders that appear
/// inside substituted values are left as they are; unknown names are kept.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(key, _)| *key == &caps[1])
                .map(|(_, value)| value.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let rendered = render_template(
            "Title: {title}\nText: {text}",
            &[("title", "Rust"), ("text", "ownership")],
        );
        assert_eq!(rendered, "Title: Rust\nText: ownership");
    }

    #[test]
    fn test_render_template_is_single_pass() {
        let rendered = render_template(
            "{title} / {text}",
            &[("title", "{text}"), ("text", "body")],
        );
        assert_eq!(rendered, "{text} / body");
    }

    #[test]
    fn test_render_template_keeps_unknown_placeholders() {
        assert_eq!(render_template("{missing}", &[]), "{missing}");
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("核心观点提取", 2), "核心");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_chat_request_uses_selected_provider() {
        let config = RunConfig::default();
        let request = ChatRequest::new(&config, "hi");
        assert_eq!(request.endpoint.settings.model, "deepseek-chat");
        assert_eq!(request.max_tokens, 1024);
    }
}
