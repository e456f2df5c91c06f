//! # Result Store
//!
//! This module provides the persistence side of a core-view run: the
//! `ResultRecord` produced for every processed video and the `ResultStore`
//! abstraction that flushes a run's buffered records to disk.
//!
//! The file-backed store writes one of three formats (spreadsheet, JSON or
//! Markdown) to a timestamped file so that earlier runs are never overwritten.

mod datastore;
mod domain;
mod render;

pub use datastore::file::{FileResultStore, OutputFormat, ParseOutputFormatError};
pub use datastore::{PersistReceipt, ResultStore};
pub use domain::{ResultRecord, RunContext};
pub use render::{render_json, render_markdown, render_spreadsheet};
