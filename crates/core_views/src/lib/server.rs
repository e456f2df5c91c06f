use std::{future::Future, io, net::SocketAddr, panic::AssertUnwindSafe, sync::Arc};

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use views_store::ResultRecord;

use crate::{
    bili::{SubtitleSource, VideoSource},
    config::{Provider, RunConfig, RunOverrides},
    llm::ChatModel,
    processor::RunState,
    DigestProcessor,
};

/// Shared across requests. `defaults` is never mutated: every request runs
/// on its own copy with the request's overrides applied.
pub struct AppState<V, S, M> {
    pub processor: Arc<DigestProcessor<V, S, M>>,
    pub defaults: Arc<RunConfig>,
    pub shutdown: CancellationToken,
}

impl<V, S, M> Clone for AppState<V, S, M> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
            defaults: Arc::clone(&self.defaults),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<V, S, M> AppState<V, S, M> {
    pub fn new(processor: DigestProcessor<V, S, M>, defaults: RunConfig) -> Self {
        Self {
            processor: Arc::new(processor),
            defaults: Arc::new(defaults),
            shutdown: CancellationToken::new(),
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "Request failed");
        }
        let body = serde_json::json!({
            "success": false,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Creator ids arrive as strings or bare numbers depending on the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Uid {
    Number(u64),
    Text(String),
}

impl Uid {
    fn into_creator_id(self) -> Option<String> {
        let id = match self {
            Uid::Number(n) => n.to_string(),
            Uid::Text(s) => s.trim().to_string(),
        };
        (!id.is_empty()).then_some(id)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub deepseek: Option<String>,
    pub siliconflow: Option<String>,
}

impl ApiKeys {
    fn into_pairs(self) -> Vec<(Provider, String)> {
        [
            (Provider::OpenAI, self.openai),
            (Provider::DeepSeek, self.deepseek),
            (Provider::SiliconFlow, self.siliconflow),
        ]
        .into_iter()
        .filter_map(|(provider, key)| key.map(|key| (provider, key)))
        .collect()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractRequest {
    pub uid: Option<Uid>,
    pub max_videos: Option<usize>,
    pub model_type: Option<String>,
    pub api_keys: Option<ApiKeys>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub results: Vec<ResultRecord>,
    pub total: usize,
    pub overall_summary: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    pub question: Option<String>,
    pub results: Option<Vec<ResultRecord>>,
    pub uid: Option<Uid>,
    pub model_type: Option<String>,
    pub api_keys: Option<ApiKeys>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub success: bool,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

fn parse_provider(model_type: Option<String>) -> ApiResult<Option<Provider>> {
    model_type
        .filter(|name| !name.trim().is_empty())
        .map(|name| name.parse::<Provider>())
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

pub fn router<V, S, M>(state: AppState<V, S, M>) -> Router
where
    V: VideoSource + Send + Sync + 'static,
    S: SubtitleSource + Send + Sync + 'static,
    M: ChatModel + Send + Sync + 'static,
{
    Router::new()
        .route("/api/extract", post(extract::<V, S, M>))
        .route("/api/ask", post(ask::<V, S, M>))
        .route("/api/test", get(test))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Runs the full extraction for one creator with request-scoped settings.
#[tracing::instrument(skip_all)]
pub async fn extract<V, S, M>(
    State(state): State<AppState<V, S, M>>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> ApiResult<Json<ExtractResponse>>
where
    V: VideoSource + Send + Sync + 'static,
    S: SubtitleSource + Send + Sync + 'static,
    M: ChatModel + Send + Sync + 'static,
{
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let creator_id = request
        .uid
        .and_then(Uid::into_creator_id)
        .ok_or_else(|| ApiError::bad_request("uid is required"))?;
    let provider = parse_provider(request.model_type)?;

    let config = state.defaults.with_overrides(RunOverrides {
        creator_id: Some(creator_id),
        max_videos: request.max_videos.filter(|n| *n > 0),
        provider,
        api_keys: request.api_keys.map(ApiKeys::into_pairs).unwrap_or_default(),
    });
    tracing::info!(creator_id = %config.creator_id, max_videos = config.max_videos, provider = %config.provider, "Extract requested");

    let cancel = state.shutdown.child_token();
    let report = state.processor.extract(&config, &cancel).await;

    match report.state {
        RunState::Done if report.is_no_op() => Err(ApiError::not_found(
            "No videos found for this creator, check the uid",
        )),
        RunState::Done => Ok(Json(ExtractResponse {
            success: true,
            total: report.results.len(),
            results: report.results,
            overall_summary: report.overall_summary.unwrap_or_default(),
        })),
        _ => Err(ApiError::internal(
            report
                .failure
                .unwrap_or_else(|| "extraction did not complete".into()),
        )),
    }
}

/// Answers a question grounded in previously extracted results.
#[tracing::instrument(skip_all)]
pub async fn ask<V, S, M>(
    State(state): State<AppState<V, S, M>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult<Json<AskResponse>>
where
    V: VideoSource + Send + Sync + 'static,
    S: SubtitleSource + Send + Sync + 'static,
    M: ChatModel + Send + Sync + 'static,
{
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let question = request
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("question is required"))?;
    let results = request
        .results
        .ok_or_else(|| ApiError::bad_request("results are required"))?;
    let provider = parse_provider(request.model_type)?;

    let config = state.defaults.with_overrides(RunOverrides {
        creator_id: request.uid.and_then(Uid::into_creator_id),
        provider,
        api_keys: request.api_keys.map(ApiKeys::into_pairs).unwrap_or_default(),
        ..Default::default()
    });
    tracing::info!(results = results.len(), "Question asked");

    let answer = AssertUnwindSafe(
        state
            .processor
            .aggregator(&config)
            .answer(&results, question.trim()),
    )
    .catch_unwind()
    .await
    .map_err(|_| ApiError::internal("Failed to answer question"))?;

    Ok(Json(AskResponse {
        success: true,
        answer,
    }))
}

pub async fn test() -> Json<StatusResponse> {
    Json(StatusResponse {
        success: true,
        message: "Backend service is running".into(),
    })
}

/// Serves the API until Ctrl-C; in-flight runs are cancelled on shutdown.
pub async fn serve<V, S, M>(addr: SocketAddr, state: AppState<V, S, M>) -> anyhow::Result<()>
where
    V: VideoSource + Send + Sync + 'static,
    S: SubtitleSource + Send + Sync + 'static,
    M: ChatModel + Send + Sync + 'static,
{
    let shutdown = state.shutdown.clone();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(signal::ctrl_c(), shutdown))
        .await
        .context("running API server")?;

    Ok(())
}

/// Resolves on Ctrl-C or when `shutdown` is cancelled elsewhere. Without a
/// Ctrl-C handler only the token can stop the server.
async fn shutdown_signal(
    ctrl_c: impl Future<Output = io::Result<()>>,
    shutdown: CancellationToken,
) {
    tokio::select! {
        result = ctrl_c => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                shutdown.cancelled().await;
            }
        }
        _ = shutdown.cancelled() => {}
    }
    tracing::info!("Shutting down, cancelling in-flight runs");
    shutdown.cancel();
}
