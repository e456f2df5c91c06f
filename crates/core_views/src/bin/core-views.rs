use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use core_views::{
    config::{parse_timezone, ProviderSettings, Providers},
    server::{serve, AppState},
    tracing::init_tracing_subscriber,
    BiliClient, DigestProcessorBuilder, OpenAIClient, Provider, RunConfig, RunReport, RunState,
};
use tokio_util::sync::CancellationToken;
use views_store::{FileResultStore, OutputFormat};

#[derive(Parser)]
#[command(
    name = "core-views",
    about = "Extracts the core views of a Bilibili creator's videos"
)]
struct Cli {
    /// Creator (UP) uid
    #[arg(long, env = "BILI_UID")]
    uid: Option<String>,

    /// Maximum videos to process per run
    #[arg(long, env = "MAX_VIDEOS", default_value = "100")]
    max_videos: usize,

    /// Videos requested per listing page
    #[arg(long, env = "PAGE_SIZE", default_value = "30")]
    page_size: u32,

    /// Delay between platform and model requests, in milliseconds
    #[arg(long, env = "REQUEST_DELAY_MS", default_value = "100")]
    request_delay_ms: u64,

    /// Model provider: openai, deepseek or siliconflow
    #[arg(long, env = "MODEL_TYPE", default_value = "deepseek")]
    model_type: Provider,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-3.5-turbo")]
    openai_model: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    openai_base_url: String,

    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    deepseek_api_key: Option<String>,

    #[arg(long, env = "DEEPSEEK_MODEL", default_value = "deepseek-chat")]
    deepseek_model: String,

    #[arg(long, env = "DEEPSEEK_BASE_URL", default_value = "https://api.deepseek.com/v1")]
    deepseek_base_url: String,

    #[arg(long, env = "SILICONFLOW_API_KEY", hide_env_values = true)]
    siliconflow_api_key: Option<String>,

    #[arg(long, env = "SILICONFLOW_MODEL", default_value = "Qwen/Qwen2-72B-Instruct")]
    siliconflow_model: String,

    #[arg(long, env = "SILICONFLOW_BASE_URL", default_value = "https://api.siliconflow.cn/v1")]
    siliconflow_base_url: String,

    #[arg(long, env = "TEMPERATURE", default_value = "0.3")]
    temperature: f32,

    #[arg(long, env = "MAX_TOKENS", default_value = "1024")]
    max_tokens: u32,

    /// Timezone used to format publish times
    #[arg(long, env = "TIMEZONE", default_value = "Asia/Shanghai", value_parser = parse_timezone)]
    timezone: Tz,

    /// Language the model is asked to answer in
    #[arg(long, env = "RESPONSE_LANGUAGE", default_value = "Simplified Chinese")]
    response_language: String,

    #[arg(long, env = "BILI_API_BASE_URL", default_value = "https://api.bilibili.com")]
    bili_api_base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process one creator and write the results to disk
    Run {
        /// spreadsheet, json or markdown
        #[arg(long, env = "SAVE_FORMAT", default_value = "spreadsheet")]
        format: OutputFormat,

        #[arg(long, env = "SAVE_PATH", default_value = "results")]
        output_dir: PathBuf,

        #[arg(long, env = "RESULTS_FILENAME", default_value = "up_core_views")]
        filename: String,
    },
    /// Start the HTTP API
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        #[arg(long, env = "PORT", default_value = "5000")]
        port: u16,
    },
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        let settings = |api_key: &Option<String>, model: &str, base_url: &str| ProviderSettings {
            api_key: api_key.clone().filter(|key| !key.trim().is_empty()),
            model: model.to_string(),
            base_url: base_url.to_string(),
        };

        RunConfig {
            creator_id: self.uid.clone().unwrap_or_default().trim().to_string(),
            max_videos: self.max_videos,
            page_size: self.page_size,
            request_delay: Duration::from_millis(self.request_delay_ms),
            provider: self.model_type,
            providers: Providers {
                openai: settings(&self.openai_api_key, &self.openai_model, &self.openai_base_url),
                deepseek: settings(
                    &self.deepseek_api_key,
                    &self.deepseek_model,
                    &self.deepseek_base_url,
                ),
                siliconflow: settings(
                    &self.siliconflow_api_key,
                    &self.siliconflow_model,
                    &self.siliconflow_base_url,
                ),
            },
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timezone: self.timezone,
            response_language: self.response_language.clone(),
        }
    }
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("Received Ctrl-C, stopping after saving partial results");
            cancel.cancel();
        }
        Err(e) => tracing::error!(error = %e, "Failed to install Ctrl+C handler"),
    }
}

fn print_report(report: &RunReport) {
    if report.is_no_op() {
        println!("No videos found for this creator, nothing to do");
        return;
    }

    println!(
        "Run {}: {} videos listed, {} core views extracted",
        report.state,
        report.videos_listed,
        report.results.len()
    );
    if let Some(receipt) = &report.receipt {
        println!(
            "Saved {} records to {}",
            receipt.records_written,
            receipt.location.display()
        );
    }
    if let Some(failure) = &report.failure {
        println!("Stopped early: {failure}");
    }
    if let Some(summary) = &report.overall_summary {
        println!("\nOverall summary:\n{summary}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let config = cli.run_config();
    let http_client = reqwest::Client::new();
    let bili = BiliClient::new(http_client.clone()).with_base_url(&cli.bili_api_base_url);
    let openai = OpenAIClient::new(http_client);

    match cli.command {
        Command::Run {
            format,
            output_dir,
            filename,
        } => {
            if config.creator_id.is_empty() {
                anyhow::bail!("A creator uid is required: pass --uid or set BILI_UID");
            }
            tracing::info!(
                creator_id = %config.creator_id,
                max_videos = config.max_videos,
                provider = %config.provider,
                %format,
                "Running pipeline once..."
            );

            let store = FileResultStore::new(output_dir, filename, format);
            let processor = DigestProcessorBuilder::new()
                .video_source(&bili)
                .subtitle_source(&bili)
                .chat_model(&openai)
                .result_store(&store)
                .build();

            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

            let report = processor.run(&config, &cancel).await;
            print_report(&report);

            if report.state == RunState::Interrupted {
                tracing::warn!(failure = ?report.failure, "Run did not complete");
            }
        }
        Command::Serve { host, port } => {
            let processor = DigestProcessorBuilder::new()
                .video_source(bili.clone())
                .subtitle_source(bili)
                .chat_model(openai)
                .build();

            serve(SocketAddr::new(host, port), AppState::new(processor, config)).await?;
        }
    }

    Ok(())
}
