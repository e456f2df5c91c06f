use itertools::Itertools;
use views_store::ResultRecord;

use crate::{
    config::RunConfig,
    llm::{render_template, truncate_chars, ChatModel, ChatRequest},
};

pub const NO_RESULTS: &str = "No results to summarize";
pub const SUMMARY_FAILED: &str = "Failed to generate overall summary";
pub const NO_CORE_VIEWS: &str = "No core views available to answer the question";

const ANSWER_ERROR_CHARS: usize = 50;

/// Works across a whole run's results: the overall digest and grounded
/// question answering.
pub struct Aggregator<'a, M> {
    model: &'a M,
    config: &'a RunConfig,
}

impl<'a, M: ChatModel + Sync> Aggregator<'a, M> {
    const SUMMARY_PROMPT: &'static str = include_str!("./prompts/overall_summary.txt");
    const ANSWER_PROMPT: &'static str = include_str!("./prompts/answer.txt");

    pub fn new(model: &'a M, config: &'a RunConfig) -> Self {
        Self { model, config }
    }

    #[tracing::instrument(skip_all, fields(results = results.len()))]
    pub async fn summarize_all(&self, results: &[ResultRecord]) -> String {
        if results.is_empty() {
            return NO_RESULTS.to_string();
        }

        let context = context_block(results);
        let prompt = render_template(
            Self::SUMMARY_PROMPT,
            &[
                ("context", context.as_str()),
                ("language", self.config.response_language.as_str()),
            ],
        );

        match self.model.complete(&ChatRequest::new(self.config, prompt)).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => {
                tracing::warn!("Overall summary came back empty");
                SUMMARY_FAILED.to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to generate overall summary");
                SUMMARY_FAILED.to_string()
            }
        }
    }

    #[tracing::instrument(skip(self, results), fields(results = results.len()))]
    pub async fn answer(&self, results: &[ResultRecord], question: &str) -> String {
        if results.is_empty() {
            return NO_CORE_VIEWS.to_string();
        }

        let context = context_block(results);
        let prompt = render_template(
            Self::ANSWER_PROMPT,
            &[
                ("context", context.as_str()),
                ("question", question),
                ("language", self.config.response_language.as_str()),
            ],
        );

        match self.model.complete(&ChatRequest::new(self.config, prompt)).await {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to answer question");
                format!(
                    "Failed to answer question: {}",
                    truncate_chars(&e.to_string(), ANSWER_ERROR_CHARS)
                )
            }
        }
    }
}

fn context_block(results: &[ResultRecord]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, record)| {
            format!(
                "Video {} title: {}\nCore views: {}\n",
                i + 1,
                record.title,
                record.core_view
            )
        })
        .join("\n")
}
