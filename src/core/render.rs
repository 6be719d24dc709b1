//! Document assembler
//!
//! Renders a `WalkResult` as the delimited plain-text context document. The
//! output depends only on the walk result, so identical trees render to
//! identical bytes.

use std::fmt::Write as _;

use crate::core::model::{binary_lines, FileContent, FileRecord, WalkResult};
use crate::core::util::{format_file_size, longest_backtick_run};

pub const CONTEXT_START: &str = "--- START PROJECT CONTEXT ---";
pub const CONTEXT_END: &str = "--- END PROJECT CONTEXT ---";
const STRUCTURE_START: &str = "--- PROJECT STRUCTURE ---";
const STRUCTURE_END: &str = "--- END PROJECT STRUCTURE ---";
const BINARY_HEADER: &str = "--- BINARY FILE METADATA ---";
const SUMMARY_START: &str = "--- PROJECT SUMMARY ---";
const SUMMARY_END: &str = "--- END PROJECT SUMMARY ---";

/// Default number of entries in the "Largest files" table
pub const DEFAULT_TOP_N: usize = 10;

/// Render options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emit the project structure block
    pub show_tree: bool,
    /// Append the breakdown tables to the summary
    pub verbose: bool,
    pub top_n: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_tree: true,
            verbose: false,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Renderer for walk results
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render the full document
    pub fn render(&self, result: &WalkResult) -> String {
        let mut output = String::new();
        output.push_str(CONTEXT_START);
        output.push('\n');

        if self.options.show_tree {
            self.render_tree(&mut output, &result.files);
        }

        for record in &result.files {
            self.render_file(&mut output, record);
        }

        self.render_summary(&mut output, result);
        output.push_str(CONTEXT_END);
        output.push('\n');
        output
    }

    /// Indented listing; directories are emitted the first time a file below
    /// them appears, so the listing follows walk order.
    fn render_tree(&self, output: &mut String, files: &[FileRecord]) {
        output.push_str(STRUCTURE_START);
        output.push('\n');

        let mut open_dirs: Vec<&str> = Vec::new();
        for record in files {
            let parts: Vec<&str> = record.relative_path.split('/').collect();
            let (name, dirs) = match parts.split_last() {
                Some(split) => split,
                None => continue,
            };

            let shared = open_dirs
                .iter()
                .zip(dirs.iter())
                .take_while(|(a, b)| a == b)
                .count();
            open_dirs.truncate(shared);
            for dir in &dirs[shared..] {
                let _ = writeln!(output, "{}{}/", "  ".repeat(open_dirs.len()), dir);
                open_dirs.push(*dir);
            }
            let _ = writeln!(output, "{}{}", "  ".repeat(dirs.len()), name);
        }

        output.push_str(STRUCTURE_END);
        output.push_str("\n\n");
    }

    fn render_file(&self, output: &mut String, record: &FileRecord) {
        let path = &record.relative_path;
        let _ = writeln!(output, "--- START FILE: {} ---", path);

        match &record.content {
            FileContent::Text { body, language, .. } => {
                let body = body.trim_end();
                let fence = "`".repeat((longest_backtick_run(body) + 1).max(3));
                let _ = writeln!(output, "{}{}", fence, language.unwrap_or(""));
                if !body.is_empty() {
                    output.push_str(body);
                    output.push('\n');
                }
                output.push_str(&fence);
                output.push('\n');
            }
            FileContent::Binary { metadata, .. } => {
                output.push_str(BINARY_HEADER);
                output.push('\n');
                for line in binary_lines(path, record.size, metadata.as_ref()) {
                    output.push_str(&line);
                    output.push('\n');
                }
            }
        }

        let _ = writeln!(output, "--- END FILE: {} ---", path);
        output.push('\n');
    }

    fn render_summary(&self, output: &mut String, result: &WalkResult) {
        let stats = &result.stats;
        output.push_str(SUMMARY_START);
        output.push('\n');
        let _ = writeln!(output, "Files included: {}", stats.included);
        let _ = writeln!(output, "Files excluded: {}", stats.excluded);
        let _ = writeln!(output, "Total size: {}", format_file_size(stats.total_size));
        let _ = writeln!(output, "Estimated tokens: {}", stats.total_tokens);

        if self.options.verbose {
            if !stats.excluded_by.is_empty() {
                output.push_str("Excluded by category:\n");
                for (category, count) in &stats.excluded_by {
                    let _ = writeln!(output, "  {}: {}", category, count);
                }
            }

            let largest = result.largest_files(self.options.top_n);
            if !largest.is_empty() {
                output.push_str("Largest files:\n");
                for record in largest {
                    let _ = writeln!(
                        output,
                        "  {} ({})",
                        record.relative_path,
                        format_file_size(record.size)
                    );
                }
            }

            if !stats.by_extension.is_empty() {
                output.push_str("Files by extension:\n");
                for (ext, count) in &stats.by_extension {
                    let _ = writeln!(output, "  {}: {}", ext, count);
                }
            }
        }

        output.push_str(SUMMARY_END);
        output.push('\n');
    }
}

/// Render with the given options
pub fn render(result: &WalkResult, options: &RenderOptions) -> String {
    Renderer::new(*options).render(result)
}
