//! Walk result model
//!
//! The walker produces a `WalkResult`; the renderer and the diagnostic report
//! only ever read it.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::backends::metadata::BinaryMetadata;
use crate::core::patterns::RuleOrigin;
use crate::core::paths::extension_of;
use crate::core::util::format_file_size;

/// Bucket used for the excluded-entry counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExclusionCategory {
    Default,
    IgnoreFile,
    User,
    OutputFile,
    TokenBudget,
    Symlink,
    Special,
    Error,
}

impl ExclusionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionCategory::Default => "default",
            ExclusionCategory::IgnoreFile => "ignore-file",
            ExclusionCategory::User => "user",
            ExclusionCategory::OutputFile => "output-file",
            ExclusionCategory::TokenBudget => "token-budget",
            ExclusionCategory::Symlink => "symlink",
            ExclusionCategory::Special => "special",
            ExclusionCategory::Error => "error",
        }
    }
}

impl fmt::Display for ExclusionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an entry was left out of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExclusionReason {
    /// Matched an exclusion rule
    Pattern { origin: RuleOrigin, pattern: String },
    /// The run's own output file
    OutputFile,
    /// Including it would exceed the token budget
    TokenBudget { tokens: usize, remaining: usize },
    /// Symbolic link to a directory (never followed)
    Symlink,
    /// Socket, FIFO, device or other non-regular file
    Special,
    /// Could not be read
    Unreadable { message: String },
}

impl ExclusionReason {
    pub fn category(&self) -> ExclusionCategory {
        match self {
            ExclusionReason::Pattern { origin, .. } => match origin {
                RuleOrigin::Default => ExclusionCategory::Default,
                RuleOrigin::IgnoreFile => ExclusionCategory::IgnoreFile,
                RuleOrigin::User => ExclusionCategory::User,
            },
            ExclusionReason::OutputFile => ExclusionCategory::OutputFile,
            ExclusionReason::TokenBudget { .. } => ExclusionCategory::TokenBudget,
            ExclusionReason::Symlink => ExclusionCategory::Symlink,
            ExclusionReason::Special => ExclusionCategory::Special,
            ExclusionReason::Unreadable { .. } => ExclusionCategory::Error,
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Pattern { origin, pattern } => {
                write!(f, "{} exclude: {}", origin.label(), pattern)
            }
            ExclusionReason::OutputFile => f.write_str("output file"),
            ExclusionReason::TokenBudget { tokens, remaining } => write!(
                f,
                "token budget ({} tokens, {} remaining)",
                tokens, remaining
            ),
            ExclusionReason::Symlink => f.write_str("symlinked directory not followed"),
            ExclusionReason::Special => f.write_str("not a regular file"),
            ExclusionReason::Unreadable { message } => write!(f, "unreadable: {}", message),
        }
    }
}

/// An entry left out of the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedEntry {
    pub path: String,
    pub is_dir: bool,
    pub reason: ExclusionReason,
}

/// Classified content of an included file
#[derive(Debug, Clone, PartialEq)]
pub enum FileContent {
    Text {
        body: String,
        /// Fence hint derived from the extension
        language: Option<&'static str>,
        /// Invalid byte sequences were replaced with U+FFFD
        lossy: bool,
    },
    Binary {
        metadata: Option<BinaryMetadata>,
        /// Why metadata extraction failed, for diagnostics only
        metadata_error: Option<String>,
    },
}

impl FileContent {
    #[cfg(test)]
    pub fn is_binary(&self) -> bool {
        matches!(self, FileContent::Binary { .. })
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            FileContent::Text { .. } => "text",
            FileContent::Binary { .. } => "binary",
        }
    }
}

/// An included file
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Path relative to root, using '/' as separator
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size: u64,
    /// Estimated tokens this file contributes to the document
    pub tokens: usize,
    pub content: FileContent,
}

impl FileRecord {
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.relative_path)
    }
}

/// Lines describing a binary file in the document
pub fn binary_lines(path: &str, size: u64, metadata: Option<&BinaryMetadata>) -> Vec<String> {
    let mut lines = vec![
        format!("Path: {}", path),
        format!("Size: {}", format_file_size(size)),
    ];
    if let Some(metadata) = metadata {
        lines.extend(
            metadata
                .fields()
                .into_iter()
                .map(|(key, value)| format!("{}: {}", key, value)),
        );
    }
    lines
}

/// Aggregate counters for a walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    pub included: usize,
    pub excluded: usize,
    pub excluded_by: BTreeMap<ExclusionCategory, usize>,
    pub text_files: usize,
    pub binary_files: usize,
    pub lossy_files: usize,
    pub total_size: u64,
    pub total_tokens: usize,
    /// Included files per lowercased extension ("(none)" when absent)
    pub by_extension: BTreeMap<String, usize>,
}

/// Ordered walk output plus counters
#[derive(Debug, Clone, Default)]
pub struct WalkResult {
    pub files: Vec<FileRecord>,
    pub excluded: Vec<ExcludedEntry>,
    pub stats: WalkStats,
}

impl WalkResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an included file and update the counters
    pub fn include(&mut self, record: FileRecord) {
        let stats = &mut self.stats;
        stats.included += 1;
        stats.total_size += record.size;
        stats.total_tokens += record.tokens;
        match &record.content {
            FileContent::Text { lossy, .. } => {
                stats.text_files += 1;
                if *lossy {
                    stats.lossy_files += 1;
                }
            }
            FileContent::Binary { .. } => stats.binary_files += 1,
        }
        let ext = record.extension().unwrap_or_else(|| "(none)".to_string());
        *stats.by_extension.entry(ext).or_insert(0) += 1;
        self.files.push(record);
    }

    /// Record an excluded entry and update the counters
    pub fn exclude(&mut self, path: impl Into<String>, is_dir: bool, reason: ExclusionReason) {
        self.stats.excluded += 1;
        *self.stats.excluded_by.entry(reason.category()).or_insert(0) += 1;
        self.excluded.push(ExcludedEntry {
            path: path.into(),
            is_dir,
            reason,
        });
    }

    /// Up to `n` included files, largest first (ties broken by path)
    pub fn largest_files(&self, n: usize) -> Vec<&FileRecord> {
        let mut files: Vec<&FileRecord> = self.files.iter().collect();
        files.sort_by(|a, b| {
            b.size
                .cmp(&a.size)
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        });
        files.truncate(n);
        files
    }

    #[cfg(test)]
    pub fn excluded_in(&self, category: ExclusionCategory) -> usize {
        self.stats.excluded_by.get(&category).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
