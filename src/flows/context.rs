//! Context flow - walk a project and assemble the context document
//!
//! Validates the root, builds the exclusion rules from the enabled sources,
//! walks the tree and renders the result.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backends::metadata::MetadataExtractor;
use crate::backends::scan::{walk, WalkOptions};
use crate::core::error::{ContextError, Result};
use crate::core::model::WalkResult;
use crate::core::paths::{make_relative, resolve_lenient};
use crate::core::patterns::{ExclusionRuleSet, PatternMatcher, DEFAULT_EXCLUDES};
use crate::core::render::{render, RenderOptions};

/// Resolved configuration for one run
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub root: PathBuf,
    /// Destination file; `None` writes to stdout
    pub output: Option<PathBuf>,
    /// User exclude globs
    pub excludes: Vec<String>,
    pub max_tokens: Option<usize>,
    pub use_default_excludes: bool,
    pub use_ignore_file: bool,
    pub render: RenderOptions,
}

impl ContextConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output: None,
            excludes: Vec::new(),
            max_tokens: None,
            use_default_excludes: true,
            use_ignore_file: true,
            render: RenderOptions::default(),
        }
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct ContextReport {
    /// Canonical root that was walked
    pub root: PathBuf,
    /// Output path resolved to an absolute path
    pub output: Option<PathBuf>,
    pub document: String,
    pub result: WalkResult,
}

/// Canonical root directory, or the fatal error that ends the run
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    let metadata = fs::metadata(root).map_err(|source| ContextError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(ContextError::RootNotDirectory {
            path: root.to_path_buf(),
        });
    }
    root.canonicalize()
        .map_err(|source| ContextError::RootNotFound {
            path: root.to_path_buf(),
            source,
        })
}

/// Build the rule set from the sources enabled in `config`
pub fn build_rules(config: &ContextConfig, root: &Path) -> ExclusionRuleSet {
    let mut rules = ExclusionRuleSet::new();
    if config.use_default_excludes {
        rules = rules.with_defaults(DEFAULT_EXCLUDES);
    }
    if config.use_ignore_file {
        rules = rules.with_ignore_file(root);
    }
    rules.with_user_patterns(&config.excludes)
}

/// Generate the context document
pub fn generate(config: &ContextConfig, extractor: &dyn MetadataExtractor) -> Result<ContextReport> {
    let root = resolve_root(&config.root)?;
    let output = config.output.as_deref().map(resolve_lenient);
    let output_relative = output.as_deref().and_then(|out| make_relative(out, &root));

    let rules = build_rules(config, &root);
    let matcher = PatternMatcher::compile(&rules, &root)?.with_output_file(output_relative);

    info!(root = %root.display(), "walking project");
    let options = WalkOptions {
        max_tokens: config.max_tokens,
        ..Default::default()
    };
    let result = walk(&root, &matcher, &options, extractor);
    let document = render(&result, &config.render);

    Ok(ContextReport {
        root,
        output,
        document,
        result,
    })
}
