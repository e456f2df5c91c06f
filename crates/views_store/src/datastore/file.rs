use std::{
    fmt, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::Context;
use chrono::{DateTime, Local};
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
};

use crate::{
    datastore::{PersistReceipt, ResultStore},
    domain::{ResultRecord, RunContext},
    render::{render_json, render_markdown, render_spreadsheet},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Spreadsheet,
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Spreadsheet => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "md",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported output format: {0} (expected spreadsheet, json or markdown)")]
pub struct ParseOutputFormatError(String);

impl FromStr for OutputFormat {
    type Err = ParseOutputFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spreadsheet" | "excel" | "csv" => Ok(OutputFormat::Spreadsheet),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(ParseOutputFormatError(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Spreadsheet => write!(f, "spreadsheet"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Writes every run to `{dir}/{base_name}_{YYYYmmdd_HHMMSS}.{ext}`.
#[derive(Debug, Clone)]
pub struct FileResultStore {
    dir: PathBuf,
    base_name: String,
    format: OutputFormat,
}

impl FileResultStore {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            format,
        }
    }

    fn candidate_path(&self, stem: &str, suffix: usize) -> PathBuf {
        let ext = self.format.extension();
        match suffix {
            0 => self.dir.join(format!("{stem}.{ext}")),
            n => self.dir.join(format!("{stem}_{n}.{ext}")),
        }
    }

    /// Creates a file that no earlier or concurrent run owns. Creation is
    /// exclusive, so a name taken between attempts moves on to the next suffix.
    async fn create_target(&self, at: &DateTime<Local>) -> anyhow::Result<(PathBuf, File)> {
        let stem = format!("{}_{}", self.base_name, at.format("%Y%m%d_%H%M%S"));

        let mut suffix = 0;
        loop {
            let path = self.candidate_path(&stem, suffix);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to create {}", path.display()));
                }
            }
        }
    }

    fn render(&self, records: &[ResultRecord], context: &RunContext) -> anyhow::Result<String> {
        let rendered = match self.format {
            OutputFormat::Spreadsheet => {
                render_spreadsheet(records).context("Failed to render spreadsheet")?
            }
            OutputFormat::Json => render_json(records).context("Failed to serialize results")?,
            OutputFormat::Markdown => render_markdown(records, context),
        };
        Ok(rendered)
    }
}

impl ResultStore for FileResultStore {
    async fn persist(
        &self,
        records: &[ResultRecord],
        context: &RunContext,
    ) -> anyhow::Result<PersistReceipt> {
        ensure_dir(&self.dir).await?;

        let rendered = self.render(records, context)?;
        let (path, mut file) = self.create_target(&context.generated_at).await?;

        write_all(&mut file, rendered.as_bytes())
            .await
            .inspect_err(|e| tracing::error!(error = ?e, path = ?path, "Failed to write results"))
            .with_context(|| format!("Failed to write results to {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            format = %self.format,
            records = records.len(),
            "Results saved"
        );

        Ok(PersistReceipt {
            location: path,
            records_written: records.len(),
        })
    }
}

async fn write_all(file: &mut File, contents: &[u8]) -> io::Result<()> {
    file.write_all(contents).await?;
    file.flush().await
}

async fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))
}
