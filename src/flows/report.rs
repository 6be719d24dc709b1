//! Report flow - everything a run emits besides the document itself
//!
//! Provides:
//! - the stderr summary line and token-threshold warnings
//! - the `--stats-json` run report
//! - writing files with parent-directory creation

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

use crate::core::error::{ContextError, Result};
use crate::core::model::{ExcludedEntry, FileContent, FileRecord, WalkStats};
use crate::core::tokenizer::crossed_threshold;
use crate::flows::context::ContextReport;

/// One-line run summary
pub fn summary_line(stats: &WalkStats) -> String {
    format!(
        "Processed {} files, excluded {} files/directories.",
        stats.included, stats.excluded
    )
}

/// Warning for the largest context-window threshold the total exceeds
pub fn threshold_warning(total_tokens: usize) -> Option<String> {
    crossed_threshold(total_tokens).map(|(_, label)| {
        format!(
            "Estimated tokens ({}) exceed the {} context window; consider adding exclusions or --max-tokens.",
            total_tokens, label
        )
    })
}

/// Print the summary and any threshold warning on stderr
pub fn print_summary(report: &ContextReport, quiet: bool) {
    let stats = &report.result.stats;
    if !quiet {
        eprintln!("{}", summary_line(stats).green());
        if report.result.is_empty() && stats.excluded > 0 {
            eprintln!(
                "{} every file was excluded; check the exclude patterns or --max-tokens",
                "Note:".cyan()
            );
        }
        if stats.lossy_files > 0 {
            eprintln!(
                "{} {} file(s) contained invalid byte sequences (replaced with U+FFFD)",
                "Note:".cyan(),
                stats.lossy_files
            );
        }
    }
    if let Some(warning) = threshold_warning(stats.total_tokens) {
        eprintln!("{} {}", "Warning:".yellow().bold(), warning);
    }
}

/// Write `contents` to `path`, creating missing parent directories
pub fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ContextError::OutputDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| ContextError::OutputWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Per-file entry of the run report
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: String,
    pub absolute_path: String,
    pub size: u64,
    pub tokens: usize,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub lossy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_error: Option<String>,
}

impl From<&FileRecord> for FileSummary {
    fn from(record: &FileRecord) -> Self {
        let (lossy, format, metadata_error) = match &record.content {
            FileContent::Text { lossy, .. } => (*lossy, None, None),
            FileContent::Binary {
                metadata,
                metadata_error,
            } => (
                false,
                metadata.as_ref().map(|m| m.format()),
                metadata_error.clone(),
            ),
        };
        Self {
            path: record.relative_path.clone(),
            absolute_path: record.absolute_path.display().to_string(),
            size: record.size,
            tokens: record.tokens,
            kind: record.content.kind_str(),
            lossy,
            format,
            metadata_error,
        }
    }
}

/// Machine-readable run report written by `--stats-json`
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub stats: &'a WalkStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_exceeded: Option<&'static str>,
    pub files: Vec<FileSummary>,
    pub excluded: &'a [ExcludedEntry],
}

impl<'a> RunReport<'a> {
    pub fn new(report: &'a ContextReport) -> Self {
        let stats = &report.result.stats;
        Self {
            generated_at: Utc::now(),
            root: report.root.display().to_string(),
            output: report.output.as_ref().map(|p| p.display().to_string()),
            stats,
            threshold_exceeded: crossed_threshold(stats.total_tokens).map(|(_, label)| label),
            files: report.result.files.iter().map(FileSummary::from).collect(),
            excluded: &report.result.excluded,
        }
    }
}

/// Write the run report as pretty JSON
pub fn write_stats_json(path: &Path, report: &ContextReport) -> Result<()> {
    let json = serde_json::to_string_pretty(&RunReport::new(report)).map_err(|e| {
        ContextError::OutputWrite {
            path: path.to_path_buf(),
            source: io::Error::from(e),
        }
    })?;
    write_output(path, &(json + "\n"))
}
