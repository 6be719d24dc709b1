//! CLI module - Command-line interface definition and handler

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::backends::metadata::SignatureExtractor;
use crate::core::render::{RenderOptions, DEFAULT_TOP_N};
use crate::flows::context::{generate, ContextConfig};
use crate::flows::prompt::prompt_banner;
use crate::flows::report::{print_summary, write_output, write_stats_json};

/// llmcontext - concatenate a project into a single context document for an LLM.
#[derive(Parser, Debug)]
#[command(name = "llmcontext")]
#[command(
    author,
    version,
    about,
    long_about = r#"llmcontext walks a project directory and emits one plain-text document:
a structure listing, every included text file in a fenced block, metadata
for binary files (image dimensions, audio duration), and a summary footer.

Excluded by default: version control metadata, dependency and build
directories, caches, lock files, logs, secrets and editor cruft. Patterns
from ROOT/.gitignore and from --exclude are applied on top.

The document goes to OUTPUT when given, otherwise to stdout. The run summary
and warnings always go to stderr.

Examples:
    llmcontext
    llmcontext ./my-project context.txt
    llmcontext . -e "*.csv" -e "fixtures/" --max-tokens 100000
    llmcontext . out/context.txt --show-prompt
"#
)]
pub struct Cli {
    /// Project root to walk.
    #[arg(
        default_value = ".",
        value_name = "ROOT",
        long_help = "Project root to walk (defaults to the current directory).\n\n\
All paths in the document are relative to this root and use '/' separators."
    )]
    pub root: PathBuf,

    /// Write the document here instead of stdout.
    #[arg(
        value_name = "OUTPUT",
        long_help = "Write the document to this file instead of stdout.\n\n\
Missing parent directories are created. When the file lies inside ROOT it is\n\
always excluded from the walk, so a previous run never ends up in the next one."
    )]
    pub output: Option<PathBuf>,

    /// Additional exclude pattern (repeatable).
    #[arg(
        short = 'e',
        long = "exclude",
        value_name = "PATTERN",
        action = ArgAction::Append,
        long_help = "Exclude paths matching a glob pattern. May be given multiple times.\n\n\
A pattern without '/' is matched against every path component (e.g. \"*.csv\",\n\
\"fixtures\"); a pattern with '/' is matched against the path relative to ROOT\n\
(e.g. \"docs/*.md\", \"src/**/generated\"). A trailing '/' matches directories only."
    )]
    pub exclude: Vec<String>,

    /// Verbose mode (debug logs and summary tables).
    #[arg(
        short,
        long,
        long_help = "Enable debug logging on stderr (every exclusion and its reason) and\n\
append the per-category, largest-file and per-extension tables to the summary.\n\n\
RUST_LOG, when set, takes precedence for log filtering."
    )]
    pub verbose: bool,

    /// Stop including files once this many estimated tokens are used.
    #[arg(
        long,
        value_name = "N",
        env = "LLMCONTEXT_MAX_TOKENS",
        long_help = "Token budget for included files (estimate: one token per four characters).\n\n\
A file that would push the running total past N is skipped and counted as\n\
excluded; later, smaller files may still fit."
    )]
    pub max_tokens: Option<usize>,

    /// Omit the project structure block.
    #[arg(long)]
    pub no_tree: bool,

    /// Ignore ROOT/.gitignore.
    #[arg(long)]
    pub no_gitignore: bool,

    /// Disable the built-in exclude patterns.
    #[arg(
        long,
        long_help = "Disable the built-in exclude patterns (.git, node_modules, target, *.log, ...).\n\n\
Patterns from .gitignore and --exclude still apply."
    )]
    pub no_default_excludes: bool,

    /// Print a suggested review prompt on stderr.
    #[arg(long)]
    pub show_prompt: bool,

    /// Write a JSON run report to PATH.
    #[arg(
        long,
        value_name = "PATH",
        long_help = "Write a machine-readable JSON report of the run: counters, every included\n\
file with its size and token estimate, and every exclusion with its reason."
    )]
    pub stats_json: Option<PathBuf>,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Suppress the stderr summary line.
    #[arg(
        short,
        long,
        long_help = "Suppress the stderr summary line. Token threshold warnings and errors are\n\
still printed."
    )]
    pub quiet: bool,
}

impl Cli {
    /// Resolved configuration for the context flow
    pub fn context_config(&self) -> ContextConfig {
        ContextConfig {
            root: self.root.clone(),
            output: self.output.clone(),
            excludes: self.exclude.clone(),
            max_tokens: self.max_tokens,
            use_default_excludes: !self.no_default_excludes,
            use_ignore_file: !self.no_gitignore,
            render: RenderOptions {
                show_tree: !self.no_tree,
                verbose: self.verbose,
                top_n: DEFAULT_TOP_N,
            },
        }
    }
}

/// `RUST_LOG` wins when it parses; otherwise debug for this crate only under --verbose
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(if verbose { "llmcontext=debug" } else { "warn" }))
}

fn init_logging(verbose: bool, no_color: bool) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let ansi = !no_color && io::stderr().is_terminal();
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_ansi(ansi),
        )
        .with(log_filter(verbose, rust_log.as_deref()))
        .try_init();
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.no_color);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let report = generate(&cli.context_config(), &SignatureExtractor)?;

    match &report.output {
        Some(path) => {
            write_output(path, &report.document)?;
            info!(path = %path.display(), "output written");
            if cli.verbose {
                eprintln!("Output successfully written to: {}", path.display());
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(report.document.as_bytes())
                .and_then(|_| stdout.flush())
                .context("Failed to write the document to stdout")?;
        }
    }

    if let Some(path) = &cli.stats_json {
        write_stats_json(path, &report)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
    }

    print_summary(&report, cli.quiet);

    if cli.show_prompt {
        eprint!("{}", prompt_banner());
    }

    Ok(())
}
