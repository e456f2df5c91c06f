pub mod bili;
pub mod cleaner;
pub mod config;
mod error;
pub mod llm;
pub mod parser;
mod processor;
pub mod server;
pub mod tracing;
pub mod types;

pub use bili::{client::BiliClient, ListQuery, SubtitleSource, VideoSource};
pub use config::{Provider, RunConfig, RunOverrides};
pub use error::{ConfigError, PlatformError};
pub use llm::{
    openai::{OpenAIClient, OpenAIError},
    summarizer::ExtractionFailure,
    ChatModel, ChatRequest,
};
pub use processor::{builder::DigestProcessorBuilder, DigestProcessor, Halt, RunReport, RunState};
