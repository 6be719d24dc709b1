//! Tree walker
//!
//! Depth-first walk with walkdir, entries sorted by file name at every level.
//! Excluded directories are pruned, so their subtrees are never read. Every
//! per-entry failure is recorded on the `WalkResult`; nothing here aborts.

use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::backends::metadata::MetadataExtractor;
use crate::core::file_reader::{classify_file, FileReadConfig};
use crate::core::model::{binary_lines, ExclusionReason, FileContent, FileRecord, WalkResult};
use crate::core::paths::make_relative;
use crate::core::patterns::PatternMatcher;
use crate::core::tokenizer::{estimate_tokens, TokenBudget};

/// Walk options
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Ceiling on the cumulative estimated tokens of included files
    pub max_tokens: Option<usize>,
    pub read_config: FileReadConfig,
}

/// What an entry turned out to be once links are resolved
enum EntryKind {
    Dir,
    File,
    SymlinkDir,
    Special,
    Dangling(String),
}

fn entry_kind(entry: &DirEntry) -> EntryKind {
    let file_type = entry.file_type();
    if file_type.is_dir() {
        return EntryKind::Dir;
    }
    if file_type.is_file() {
        return EntryKind::File;
    }
    if !file_type.is_symlink() {
        return EntryKind::Special;
    }
    match fs::metadata(entry.path()) {
        Ok(target) if target.is_dir() => EntryKind::SymlinkDir,
        Ok(target) if target.is_file() => EntryKind::File,
        Ok(_) => EntryKind::Special,
        Err(e) => EntryKind::Dangling(e.to_string()),
    }
}

/// Walk `root` and collect included files and exclusions in document order
pub fn walk(
    root: &Path,
    matcher: &PatternMatcher,
    options: &WalkOptions,
    extractor: &dyn MetadataExtractor,
) -> WalkResult {
    let mut result = WalkResult::new();
    let mut budget = TokenBudget::new(options.max_tokens);

    let mut entries = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let relative = err
                    .path()
                    .and_then(|p| make_relative(p, root))
                    .unwrap_or_default();
                let is_dir = err.path().map(|p| p.is_dir()).unwrap_or(false);
                debug!(path = %relative, error = %err, "unreadable entry");
                result.exclude(
                    relative,
                    is_dir,
                    ExclusionReason::Unreadable {
                        message: io_message(&err),
                    },
                );
                continue;
            }
        };

        let relative = match make_relative(entry.path(), root) {
            Some(r) if !r.is_empty() => r,
            _ => continue,
        };

        let kind = entry_kind(&entry);
        let is_dir = matches!(kind, EntryKind::Dir | EntryKind::SymlinkDir);

        if let Some(reason) = matcher.check(&relative, is_dir) {
            debug!(path = %relative, %reason, "excluded");
            result.exclude(relative, is_dir, reason);
            if matches!(kind, EntryKind::Dir) {
                entries.skip_current_dir();
            }
            continue;
        }

        match kind {
            EntryKind::Dir => {}
            EntryKind::SymlinkDir => {
                debug!(path = %relative, "symlinked directory not followed");
                result.exclude(relative, true, ExclusionReason::Symlink);
            }
            EntryKind::Special => {
                debug!(path = %relative, "not a regular file");
                result.exclude(relative, false, ExclusionReason::Special);
            }
            EntryKind::Dangling(message) => {
                debug!(path = %relative, %message, "dangling symlink");
                result.exclude(relative, false, ExclusionReason::Unreadable { message });
            }
            EntryKind::File => {
                include_file(&mut result, &mut budget, &entry, relative, options, extractor)
            }
        }
    }

    info!(
        included = result.stats.included,
        excluded = result.stats.excluded,
        tokens = result.stats.total_tokens,
        "walk complete"
    );
    result
}

fn include_file(
    result: &mut WalkResult,
    budget: &mut TokenBudget,
    entry: &DirEntry,
    relative: String,
    options: &WalkOptions,
    extractor: &dyn MetadataExtractor,
) {
    let classified = match classify_file(entry.path(), &options.read_config, extractor) {
        Ok(classified) => classified,
        Err(e) => {
            debug!(path = %relative, error = %e, "unreadable file");
            result.exclude(
                relative,
                false,
                ExclusionReason::Unreadable {
                    message: e.to_string(),
                },
            );
            return;
        }
    };

    let tokens = match &classified.content {
        FileContent::Text { body, .. } => estimate_tokens(body),
        FileContent::Binary { metadata, .. } => estimate_tokens(
            &binary_lines(&relative, classified.size, metadata.as_ref()).join("\n"),
        ),
    };

    let remaining = budget
        .limit()
        .map(|limit| limit.saturating_sub(budget.used()))
        .unwrap_or(usize::MAX);
    if !budget.try_consume(tokens) {
        debug!(path = %relative, tokens, remaining, "over token budget");
        result.exclude(
            relative,
            false,
            ExclusionReason::TokenBudget { tokens, remaining },
        );
        return;
    }

    result.include(FileRecord {
        relative_path: relative,
        absolute_path: entry.path().to_path_buf(),
        size: classified.size,
        tokens,
        content: classified.content,
    });
}

fn io_message(err: &walkdir::Error) -> String {
    match err.io_error() {
        Some(io) => io.to_string(),
        None => err.to_string(),
    }
}
