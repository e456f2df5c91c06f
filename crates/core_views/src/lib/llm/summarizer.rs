use crate::{
    config::{Provider, RunConfig},
    llm::{render_template, truncate_chars, ChatModel, ChatRequest},
};

/// Characters of cleaned text sent to the model per video.
pub const MAX_INPUT_CHARS: usize = 1500;

const ERROR_EXCERPT_CHARS: usize = 100;

/// Why a core view could not be extracted. Rendered into the result record
/// in place of the core view, so every message is user-facing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionFailure {
    #[error("Core view extraction failed: no usable text")]
    NoText,
    #[error("Core view extraction failed: API credential invalid, check {key_var}")]
    InvalidCredential { key_var: &'static str },
    #[error("Core view extraction failed: insufficient API balance, top up or switch API keys")]
    InsufficientBalance,
    #[error("Core view extraction failed: rate limited by the provider, retry later or raise REQUEST_DELAY_MS")]
    RateLimited,
    #[error("Core view extraction failed: {0}")]
    Other(String),
}

impl ExtractionFailure {
    /// Maps a provider error message onto a failure kind by substring.
    ///
    /// Balance and rate-limit markers are checked first: provider error bodies
    /// carry codes such as `invalid_request_error` that would otherwise read
    /// as a credential failure.
    pub fn classify(message: &str, provider: Provider) -> Self {
        let lowered = message.to_lowercase();

        if message.contains("Insufficient Balance") {
            ExtractionFailure::InsufficientBalance
        } else if lowered.contains("rate limit") || message.contains("Too Many Requests") {
            ExtractionFailure::RateLimited
        } else if message.contains("Authentication Fails")
            || message.contains("401")
            || lowered.contains("invalid")
        {
            ExtractionFailure::InvalidCredential {
                key_var: provider.key_var(),
            }
        } else {
            ExtractionFailure::Other(truncate_chars(message, ERROR_EXCERPT_CHARS))
        }
    }
}

pub struct Summarizer<'a, M> {
    model: &'a M,
    config: &'a RunConfig,
}

impl<'a, M: ChatModel + Sync> Summarizer<'a, M> {
    const PROMPT: &'static str = include_str!("./prompts/core_view.txt");

    pub fn new(model: &'a M, config: &'a RunConfig) -> Self {
        Self { model, config }
    }

    pub fn prompt(&self, title: &str, text: &str) -> String {
        let excerpt = truncate_chars(text, MAX_INPUT_CHARS);
        render_template(
            Self::PROMPT,
            &[
                ("title", title),
                ("text", excerpt.as_str()),
                ("language", self.config.response_language.as_str()),
            ],
        )
    }

    /// Core view for one video, or the rendered failure message.
    #[tracing::instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn summarize(&self, title: &str, text: &str) -> String {
        match self.extract(title, text).await {
            Ok(core_view) => core_view,
            Err(failure) => {
                tracing::warn!(%failure, "Core view extraction failed");
                failure.to_string()
            }
        }
    }

    pub async fn extract(&self, title: &str, text: &str) -> Result<String, ExtractionFailure> {
        if text.trim().is_empty() {
            return Err(ExtractionFailure::NoText);
        }

        let request = ChatRequest::new(self.config, self.prompt(title, text));
        let content = self
            .model
            .complete(&request)
            .await
            .map_err(|e| ExtractionFailure::classify(&e.to_string(), self.config.provider))?;

        let content = content.trim();
        if content.is_empty() {
            return Err(ExtractionFailure::Other("model returned no content".into()));
        }
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::llm::openai::OpenAIError;

    struct StubModel {
        reply: Result<String, String>,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl ChatModel for StubModel {
        type Error = String;

        async fn complete(&self, request: &ChatRequest) -> Result<String, Self::Error> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            self.reply.clone()
        }
    }

    fn replying(reply: &str) -> StubModel {
        StubModel {
            reply: Ok(reply.into()),
            prompts: Arc::default(),
        }
    }

    fn failing(message: &str) -> StubModel {
        StubModel {
            reply: Err(message.into()),
            prompts: Arc::default(),
        }
    }

    #[test]
    fn test_classify() {
        let cases = [
            ("Error code: 401 - Authentication Fails", "credential invalid"),
            ("API error: 400 Bad Request - Invalid model", "credential invalid"),
            ("Insufficient Balance", "balance"),
            ("API error: 429 Too Many Requests - {}", "rate limited"),
            ("Rate Limit reached for requests", "rate limited"),
        ];
        for (message, expected) in cases {
            let failure = ExtractionFailure::classify(message, Provider::DeepSeek);
            assert!(
                failure.to_string().contains(expected),
                "{message} -> {failure}"
            );
        }

        assert_eq!(
            ExtractionFailure::classify("401", Provider::SiliconFlow),
            ExtractionFailure::InvalidCredential {
                key_var: "SILICONFLOW_API_KEY"
            }
        );
    }

    #[test]
    fn test_classify_balance_error_with_provider_body() {
        let body = r#"{"error":{"message":"Insufficient Balance","type":"unknown_error","param":null,"code":"invalid_request_error"}}"#;
        let message = OpenAIError::Api {
            status: 402,
            message: body.into(),
        }
        .to_string();

        assert_eq!(
            ExtractionFailure::classify(&message, Provider::DeepSeek),
            ExtractionFailure::InsufficientBalance
        );
    }

    #[test]
    fn test_classify_rate_limit_with_provider_body() {
        let body = r#"{"error":{"message":"Rate limit reached","code":"invalid_request_error"}}"#;
        assert_eq!(
            ExtractionFailure::classify(body, Provider::OpenAI),
            ExtractionFailure::RateLimited
        );
    }

    #[test]
    fn test_classify_generic_truncates_message() {
        let message = "x".repeat(250);
        let ExtractionFailure::Other(excerpt) = ExtractionFailure::classify(&message, Provider::OpenAI) else {
            panic!("expected generic failure");
        };
        assert_eq!(excerpt.chars().count(), 100);
    }

    #[tokio::test]
    async fn test_empty_text_skips_the_model() {
        let model = replying("unused");
        let config = RunConfig::default();

        let message = Summarizer::new(&model, &config).summarize("title", "   ").await;
        assert_eq!(message, ExtractionFailure::NoText.to_string());
        assert!(model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_uses_truncated_text() {
        let model = replying("  核心观点1：所有权  ");
        let config = RunConfig::default();
        let text = "字".repeat(2000);

        let core_view = Summarizer::new(&model, &config).summarize("Rust 入门", &text).await;
        assert_eq!(core_view, "核心观点1：所有权");

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("Rust 入门"));
        assert!(prompts[0].contains("Simplified Chinese"));
        assert!(prompts[0].contains(&"字".repeat(MAX_INPUT_CHARS)));
        assert!(!prompts[0].contains(&"字".repeat(MAX_INPUT_CHARS + 1)));
    }

    #[tokio::test]
    async fn test_model_errors_become_messages() {
        let config = RunConfig::default();

        let model = failing("Insufficient Balance");
        let message = Summarizer::new(&model, &config).summarize("t", "text").await;
        assert!(message.contains("balance"));

        let model = replying("   ");
        let err = Summarizer::new(&model, &config).extract("t", "text").await.unwrap_err();
        assert!(matches!(err, ExtractionFailure::Other(_)));
    }
}
