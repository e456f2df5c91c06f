use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    config::ProviderEndpoint,
    llm::{ChatModel, ChatRequest},
};

/// Chat completions client for OpenAI and the OpenAI-compatible providers
/// (DeepSeek, SiliconFlow). The endpoint travels with each request.
#[derive(Debug, Clone, Default)]
pub struct OpenAIClient {
    client: Client,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} {} - {message}", canonical_reason(.status))]
    Api { status: u16, message: String },
    #[error("Invalid API key: {0} is not set")]
    MissingApiKey(&'static str),
    #[error("No content in response")]
    EmptyResponse,
}

fn canonical_reason(status: &u16) -> &'static str {
    StatusCode::from_u16(*status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

impl OpenAIClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn completion_body(
        model_name: &str,
        user_content: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> serde_json::Value {
        serde_json::json!({
            "model": model_name,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": user_content
                }
            ]
        })
    }

    pub async fn send_completion_request(
        &self,
        endpoint: &ProviderEndpoint,
        user_content: impl AsRef<str>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<CompletionResponse, OpenAIError> {
        let api_key = endpoint
            .settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(OpenAIError::MissingApiKey(endpoint.provider.key_var()))?;

        let body = Self::completion_body(
            &endpoint.settings.model,
            user_content.as_ref(),
            temperature,
            max_tokens,
        );

        let resp = self
            .client
            .post(format!(
                "{}/chat/completions",
                endpoint.settings.base_url.trim_end_matches('/')
            ))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(OpenAIError::Api { status, message });
        }

        Ok(resp.json::<CompletionResponse>().await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    #[serde(default)]
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: Option<String>,
}

impl CompletionResponse {
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
    }
}

impl ChatModel for OpenAIClient {
    type Error = OpenAIError;

    #[tracing::instrument(skip_all, fields(provider = %request.endpoint.provider, model = %request.endpoint.settings.model))]
    async fn complete(&self, request: &ChatRequest) -> Result<String, Self::Error> {
        let response = self
            .send_completion_request(
                &request.endpoint,
                &request.prompt,
                request.temperature,
                request.max_tokens,
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Chat completion failed"))?;

        response.into_content().ok_or(OpenAIError::EmptyResponse)
    }
}
