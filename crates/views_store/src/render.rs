//! Renderers for the three persisted output formats.

use crate::domain::{ResultRecord, RunContext};

const SPREADSHEET_HEADER: [&str; 4] = ["Title", "URL", "Published At", "Core View"];

/// Pretty-printed JSON array of records.
pub fn render_json(records: &[ResultRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Markdown report with one section per video.
pub fn render_markdown(records: &[ResultRecord], context: &RunContext) -> String {
    let mut doc = String::new();

    doc.push_str("# Creator Core Views\n\n");
    doc.push_str(&format!("**Creator ID**: {}\n", context.creator_id));
    doc.push_str(&format!("**Videos processed**: {}\n", records.len()));
    doc.push_str(&format!(
        "**Generated at**: {}\n\n",
        context.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    if let Some(summary) = context.overall_summary.as_deref() {
        doc.push_str("## Overall Summary\n\n");
        doc.push_str(summary.trim());
        doc.push_str("\n\n");
    }

    doc.push_str("## Core Views\n\n");
    for (i, record) in records.iter().enumerate() {
        doc.push_str(&format!("### {}. {}\n", i + 1, record.title));
        doc.push_str(&format!("**Link**: [{0}]({0})\n", record.url));
        doc.push_str(&format!("**Published**: {}\n", record.published_at_formatted));
        doc.push_str(&format!("**Core views**:\n{}\n\n", record.core_view));
    }

    doc
}

/// Spreadsheet-compatible CSV. The leading BOM makes spreadsheet tools
/// detect UTF-8, which matters for CJK titles.
pub fn render_spreadsheet(records: &[ResultRecord]) -> anyhow::Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer("\u{feff}".as_bytes().to_vec());

    writer.write_record(SPREADSHEET_HEADER)?;
    for r in records {
        writer.write_record([
            r.title.as_str(),
            r.url.as_str(),
            r.published_at_formatted.as_str(),
            r.core_view.as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush spreadsheet: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}
