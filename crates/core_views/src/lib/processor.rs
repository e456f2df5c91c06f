use std::{any::Any, fmt, panic::AssertUnwindSafe};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use views_store::{PersistReceipt, ResultRecord, ResultStore, RunContext};

use crate::{
    bili::{
        lister::list_videos,
        subtitle::{fetch_subtitle, SubtitleText},
        SubtitleSource, VideoSource,
    },
    cleaner::clean_text,
    config::RunConfig,
    llm::{aggregator::Aggregator, summarizer::Summarizer, ChatModel},
    types::VideoRecord,
};

pub mod builder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Listing,
    ProcessingVideos,
    Aggregating,
    Persisting,
    Done,
    Interrupted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Listing => "listing",
            RunState::ProcessingVideos => "processing_videos",
            RunState::Aggregating => "aggregating",
            RunState::Persisting => "persisting",
            RunState::Done => "done",
            RunState::Interrupted => "interrupted",
        };
        f.write_str(name)
    }
}

/// Why a run stopped before reaching `Done`.
#[derive(Debug, thiserror::Error)]
pub enum Halt {
    #[error("run was cancelled")]
    Cancelled,
    #[error("run panicked: {0}")]
    Panicked(String),
    #[error("failed to persist results: {0}")]
    Persist(String),
}

/// Outcome of a run, including everything accumulated before an interruption.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: RunState,
    pub videos_listed: usize,
    pub results: Vec<ResultRecord>,
    pub overall_summary: Option<String>,
    pub receipt: Option<PersistReceipt>,
    pub failure: Option<String>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
            videos_listed: 0,
            results: Vec::new(),
            overall_summary: None,
            receipt: None,
            failure: None,
        }
    }

    /// The creator had no videos; nothing was processed or written.
    pub fn is_no_op(&self) -> bool {
        self.state == RunState::Done && self.videos_listed == 0
    }

    fn transition(&mut self, next: RunState) {
        tracing::info!(from = %self.state, to = %next, "Run state changed");
        self.state = next;
    }

    fn interrupt(&mut self, halt: Halt) {
        tracing::warn!(reason = %halt, results = self.results.len(), "Run interrupted");
        self.failure = Some(halt.to_string());
        self.transition(RunState::Interrupted);
    }
}

/// Lists a creator's videos, extracts a core view per video and builds the
/// overall digest. Store-less processors only support [`DigestProcessor::extract`].
#[derive(Debug)]
pub struct DigestProcessor<V, S, M, R = ()> {
    video_source: V,
    subtitle_source: S,
    chat_model: M,
    store: R,
}

impl<V, S, M, R> DigestProcessor<V, S, M, R>
where
    V: VideoSource + Send + Sync,
    S: SubtitleSource + Send + Sync,
    M: ChatModel + Send + Sync,
{
    pub fn aggregator<'a>(&'a self, config: &'a RunConfig) -> Aggregator<'a, M> {
        Aggregator::new(&self.chat_model, config)
    }

    /// List, process and aggregate without persisting anything.
    #[tracing::instrument(skip_all, fields(creator_id = %config.creator_id))]
    pub async fn extract(&self, config: &RunConfig, cancel: &CancellationToken) -> RunReport {
        let mut report = RunReport::new();

        match self.execute(config, cancel, &mut report).await {
            Ok(()) if report.state != RunState::Done => report.transition(RunState::Done),
            Ok(()) => {}
            Err(halt) => report.interrupt(halt),
        }
        report
    }

    async fn execute(
        &self,
        config: &RunConfig,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<(), Halt> {
        match AssertUnwindSafe(self.drive(config, cancel, report))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(panic = %message, "Run panicked");
                Err(Halt::Panicked(message))
            }
        }
    }

    async fn drive(
        &self,
        config: &RunConfig,
        cancel: &CancellationToken,
        report: &mut RunReport,
    ) -> Result<(), Halt> {
        report.transition(RunState::Listing);
        let options = config.list_options();
        let videos = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Halt::Cancelled),
            videos = list_videos(&self.video_source, &config.creator_id, &options) => videos,
        };
        report.videos_listed = videos.len();

        if videos.is_empty() {
            tracing::info!("Creator has no videos, nothing to do");
            report.transition(RunState::Done);
            return Ok(());
        }

        report.transition(RunState::ProcessingVideos);
        let summarizer = Summarizer::new(&self.chat_model, config);

        for (i, video) in videos.iter().enumerate() {
            if i > 0 {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(Halt::Cancelled),
                    _ = tokio::time::sleep(config.request_delay) => {}
                }
            }

            tracing::info!(index = i + 1, total = videos.len(), id = %video.id, "Processing video");
            let record = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Halt::Cancelled),
                record = self.process_video(video, &summarizer, config) => record,
            };

            if let Some(record) = record {
                report.results.push(record);
            }
        }
        tracing::info!(results = report.results.len(), "Processed all videos");

        report.transition(RunState::Aggregating);
        let aggregator = self.aggregator(config);
        let summary = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Halt::Cancelled),
            summary = aggregator.summarize_all(&report.results) => summary,
        };
        report.overall_summary = Some(summary);

        Ok(())
    }

    /// subtitle, else title + description, then clean and summarize.
    /// Returns `None` when no usable text remains after cleaning.
    #[tracing::instrument(skip_all, fields(id = %video.id))]
    async fn process_video(
        &self,
        video: &VideoRecord,
        summarizer: &Summarizer<'_, M>,
        config: &RunConfig,
    ) -> Option<ResultRecord> {
        let text = match fetch_subtitle(&self.subtitle_source, &video.id).await {
            SubtitleText::Available(text) => text,
            SubtitleText::Unavailable(reason) => {
                tracing::info!(%reason, "Falling back to title and description");
                format!("{} {}", video.title, video.description)
            }
        };

        let cleaned = clean_text(&text);
        if cleaned.is_empty() {
            tracing::warn!("No usable text after cleaning, skipping video");
            return None;
        }

        let core_view = summarizer.summarize(&video.title, &cleaned).await;

        Some(ResultRecord {
            title: video.title.clone(),
            url: video.url.clone(),
            published_at_formatted: config.format_timestamp(video.published_at),
            core_view,
        })
    }
}

impl<V, S, M, R> DigestProcessor<V, S, M, R>
where
    V: VideoSource + Send + Sync,
    S: SubtitleSource + Send + Sync,
    M: ChatModel + Send + Sync,
    R: ResultStore + Send + Sync,
{
    /// A full run: extract, then persist whatever was gathered, including
    /// the partial results of an interrupted run.
    #[tracing::instrument(skip_all, fields(creator_id = %config.creator_id))]
    pub async fn run(&self, config: &RunConfig, cancel: &CancellationToken) -> RunReport {
        let mut report = RunReport::new();
        let halted = self.execute(config, cancel, &mut report).await.err();

        if halted.is_none() && report.state == RunState::Done {
            return report;
        }

        if !report.results.is_empty() {
            report.transition(RunState::Persisting);

            let mut context = RunContext::new(&config.creator_id);
            if let Some(summary) = &report.overall_summary {
                context = context.with_overall_summary(summary);
            }

            match self.store.persist(&report.results, &context).await {
                Ok(receipt) => {
                    tracing::info!(location = ?receipt.location, records = receipt.records_written, "Persisted results");
                    report.receipt = Some(receipt);
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Failed to persist results");
                    if halted.is_none() {
                        report.interrupt(Halt::Persist(format!("{e:#}")));
                        return report;
                    }
                }
            }
        } else {
            tracing::info!("No results to persist");
        }

        match halted {
            Some(halt) => report.interrupt(halt),
            None => report.transition(RunState::Done),
        }
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
