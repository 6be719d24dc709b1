//! Exclusion rules and the compiled pattern matcher
//!
//! Three rule sources are OR-combined, evaluated in this order:
//! - default: a fixed table of well-known noise (VCS, dependencies, build output)
//! - ignore-file: `.gitignore` in the scan root (gitignore semantics, `!` supported)
//! - user: `--exclude` globs, matched against the relative path and the basename
//!
//! A rule that matches a directory also matches everything beneath it, so the
//! walker can prune at the directory and never read the subtree.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{ContextError, Result};
use crate::core::model::ExclusionReason;

/// Ignore file consulted in the scan root (nested ones are not merged)
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Matching follows the usual case sensitivity of the platform's filesystem
const CASE_INSENSITIVE: bool = cfg!(any(windows, target_os = "macos"));

/// Well-known noise, passed explicitly to `ExclusionRuleSet::with_defaults`
#[rustfmt::skip]
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Version control
    ".git", ".gitignore", ".gitattributes", ".gitmodules",
    ".svn", ".hg", ".bzr",
    // Python
    "__pycache__", "*.pyc", "*.pyo", "*.pyd", "*.egg-info",
    ".pytest_cache", ".mypy_cache", ".ruff_cache", ".tox",
    ".venv", "venv", "ENV", "env", "virtualenv", "venv.bak", "env.bak",
    // Node / Ruby / PHP
    "node_modules", "package-lock.json", "yarn.lock", "pnpm-lock.yaml",
    ".bundle", "vendor", "Gemfile.lock", "composer.lock",
    // Compiled artifacts
    "*.so", "*.o", "*.a", "*.dylib", "*.dll", "*.exe",
    "*.class", "*.jar", "*.war", "*.ear",
    // Build outputs
    "build", "dist", "target", "out", "bin", "release", "Debug", "Release",
    // Secrets
    ".env", ".env.*", "*.pem", "*.key",
    // Temporary files
    "*.log", "*.log.*", "*.tmp", "*.temp", "*.swp", "*.swo", "*.bak", "*.old",
    // OS cruft
    ".DS_Store", "Thumbs.db", "desktop.ini",
    // IDE configuration
    ".idea", ".vscode", "*.sublime-workspace", "*.sublime-project",
    ".project", ".classpath", ".settings", "nbproject",
    // Coverage and generated docs
    "coverage", ".coverage", "docs/_build", "site",
];

/// Where an exclusion rule came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleOrigin {
    Default,
    IgnoreFile,
    User,
}

impl RuleOrigin {
    /// Short label used in exclusion reasons
    pub fn label(&self) -> &'static str {
        match self {
            RuleOrigin::Default => "Default",
            RuleOrigin::IgnoreFile => IGNORE_FILE_NAME,
            RuleOrigin::User => "CLI",
        }
    }
}

/// A single pattern tagged with its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    pub pattern: String,
    pub origin: RuleOrigin,
}

/// Ordered collection of exclusion rules for one run
#[derive(Debug, Clone, Default)]
pub struct ExclusionRuleSet {
    rules: Vec<ExclusionRule>,
    ignore_file: Option<PathBuf>,
}

impl ExclusionRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default-rule table (normally `DEFAULT_EXCLUDES`)
    pub fn with_defaults(mut self, table: &[&str]) -> Self {
        self.push_all(table.iter().copied(), RuleOrigin::Default);
        self
    }

    /// Read `<root>/.gitignore` if present.
    ///
    /// An unreadable ignore file is reported and otherwise treated as absent.
    pub fn with_ignore_file(mut self, root: &Path) -> Self {
        let path = root.join(IGNORE_FILE_NAME);
        if !path.is_file() {
            return self;
        }
        match fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!("Reading ignore patterns from {}", path.display());
                let content = String::from_utf8_lossy(&bytes).into_owned();
                self.ignore_file = Some(path);
                self.with_ignore_file_lines(&content)
            }
            Err(e) => {
                tracing::warn!("Could not read {}: {}", path.display(), e);
                self
            }
        }
    }

    /// Add ignore-file rules from text; blank lines and `#` comments are skipped
    pub fn with_ignore_file_lines(mut self, content: &str) -> Self {
        let lines = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));
        self.push_all(lines, RuleOrigin::IgnoreFile);
        self
    }

    /// Add user-supplied globs
    pub fn with_user_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Self {
        self.push_all(
            patterns
                .iter()
                .map(|p| p.as_ref().trim())
                .filter(|p| !p.is_empty()),
            RuleOrigin::User,
        );
        self
    }

    fn push_all<'a>(&mut self, patterns: impl Iterator<Item = &'a str>, origin: RuleOrigin) {
        self.rules.extend(patterns.map(|pattern| ExclusionRule {
            pattern: pattern.to_string(),
            origin,
        }));
    }

    #[cfg(test)]
    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    pub fn count(&self, origin: RuleOrigin) -> usize {
        self.rules.iter().filter(|r| r.origin == origin).count()
    }

    fn patterns(&self, origin: RuleOrigin) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .filter(move |r| r.origin == origin)
            .map(|r| r.pattern.as_str())
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: String,
    dir_only: bool,
}

/// Glob rules split by what they are compared against
#[derive(Debug, Clone)]
struct GlobRules {
    origin: RuleOrigin,
    /// Patterns without '/' (compared with each path segment)
    names: GlobSet,
    name_rules: Vec<CompiledRule>,
    /// Patterns with '/' or a leading '/' (compared with each path prefix)
    paths: GlobSet,
    path_rules: Vec<CompiledRule>,
}

impl GlobRules {
    fn compile<'a>(origin: RuleOrigin, patterns: impl Iterator<Item = &'a str>) -> Result<Self> {
        let mut names = GlobSetBuilder::new();
        let mut paths = GlobSetBuilder::new();
        let mut name_rules = Vec::new();
        let mut path_rules = Vec::new();

        for raw in patterns {
            let dir_only = raw.ends_with('/');
            let trimmed = raw.trim_end_matches('/');
            let anchored = trimmed.starts_with('/');
            let body = trimmed.trim_start_matches('/');
            if body.is_empty() {
                continue;
            }

            let glob = GlobBuilder::new(body)
                .literal_separator(true)
                .case_insensitive(CASE_INSENSITIVE)
                .build()
                .map_err(|e| ContextError::invalid_pattern(raw, e))?;

            let rule = CompiledRule {
                pattern: raw.to_string(),
                dir_only,
            };
            if anchored || body.contains('/') {
                paths.add(glob);
                path_rules.push(rule);
            } else {
                names.add(glob);
                name_rules.push(rule);
            }
        }

        Ok(Self {
            origin,
            names: names
                .build()
                .map_err(|e| ContextError::invalid_pattern("<set>", e))?,
            name_rules,
            paths: paths
                .build()
                .map_err(|e| ContextError::invalid_pattern("<set>", e))?,
            path_rules,
        })
    }

    fn is_empty(&self) -> bool {
        self.name_rules.is_empty() && self.path_rules.is_empty()
    }

    /// First rule matching the path or one of its ancestor directories
    fn find(&self, relative_path: &str, is_dir: bool) -> Option<&CompiledRule> {
        if self.is_empty() {
            return None;
        }
        for (prefix, name, candidate_is_dir) in candidates(relative_path, is_dir) {
            let by_name = self
                .names
                .matches(name)
                .into_iter()
                .map(|idx| &self.name_rules[idx]);
            let by_path = self
                .paths
                .matches(prefix)
                .into_iter()
                .map(|idx| &self.path_rules[idx]);
            if let Some(rule) = by_name
                .chain(by_path)
                .find(|rule| !rule.dir_only || candidate_is_dir)
            {
                return Some(rule);
            }
        }
        None
    }
}

/// `(prefix, segment, is_dir)` for every ancestor of the path, then the path itself
fn candidates(relative_path: &str, is_dir: bool) -> Vec<(&str, &str, bool)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, _) in relative_path.match_indices('/') {
        out.push((&relative_path[..idx], &relative_path[start..idx], true));
        start = idx + 1;
    }
    out.push((relative_path, &relative_path[start..], is_dir));
    out
}

/// Compiled, immutable form of an `ExclusionRuleSet`
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    output_file: Option<String>,
    defaults: GlobRules,
    ignore_file: Option<Gitignore>,
    user: GlobRules,
}

impl PatternMatcher {
    /// Compile the rule set. Invalid default or user globs are fatal; invalid
    /// ignore-file lines are skipped with a warning.
    pub fn compile(rules: &ExclusionRuleSet, root: &Path) -> Result<Self> {
        let defaults = GlobRules::compile(RuleOrigin::Default, rules.patterns(RuleOrigin::Default))?;
        let user = GlobRules::compile(RuleOrigin::User, rules.patterns(RuleOrigin::User))?;
        let ignore_file = compile_ignore_file(rules, root);

        tracing::debug!(
            "Compiled {} default, {} ignore-file, {} user rules",
            rules.count(RuleOrigin::Default),
            rules.count(RuleOrigin::IgnoreFile),
            rules.count(RuleOrigin::User)
        );

        Ok(Self {
            output_file: None,
            defaults,
            ignore_file,
            user,
        })
    }

    /// Always exclude this root-relative path (the run's own output file)
    pub fn with_output_file(mut self, relative_path: Option<String>) -> Self {
        self.output_file = relative_path;
        self
    }

    /// Why `relative_path` is excluded, or `None` if it is not
    pub fn check(&self, relative_path: &str, is_dir: bool) -> Option<ExclusionReason> {
        if relative_path.is_empty() {
            return None;
        }

        if !is_dir && self.output_file.as_deref() == Some(relative_path) {
            return Some(ExclusionReason::OutputFile);
        }

        if let Some(reason) = glob_reason(&self.defaults, relative_path, is_dir) {
            return Some(reason);
        }

        if let Some(gitignore) = &self.ignore_file {
            if let Match::Ignore(glob) =
                gitignore.matched_path_or_any_parents(Path::new(relative_path), is_dir)
            {
                return Some(ExclusionReason::Pattern {
                    origin: RuleOrigin::IgnoreFile,
                    pattern: glob.original().to_string(),
                });
            }
        }

        glob_reason(&self.user, relative_path, is_dir)
    }

    #[cfg(test)]
    pub fn is_excluded(&self, relative_path: &str, is_dir: bool) -> bool {
        self.check(relative_path, is_dir).is_some()
    }
}

fn glob_reason(rules: &GlobRules, relative_path: &str, is_dir: bool) -> Option<ExclusionReason> {
    rules
        .find(relative_path, is_dir)
        .map(|rule| ExclusionReason::Pattern {
            origin: rules.origin,
            pattern: rule.pattern.clone(),
        })
}

fn compile_ignore_file(rules: &ExclusionRuleSet, root: &Path) -> Option<Gitignore> {
    if rules.count(RuleOrigin::IgnoreFile) == 0 {
        return None;
    }

    let mut builder = GitignoreBuilder::new(root);
    if let Err(e) = builder.case_insensitive(CASE_INSENSITIVE) {
        tracing::warn!("Could not configure ignore matcher: {}", e);
    }
    let source = rules.ignore_file.clone();
    for line in rules.patterns(RuleOrigin::IgnoreFile) {
        if let Err(e) = builder.add_line(source.clone(), line) {
            tracing::warn!("Skipping invalid {} pattern '{}': {}", IGNORE_FILE_NAME, line, e);
        }
    }

    match builder.build() {
        Ok(gitignore) => Some(gitignore),
        Err(e) => {
            tracing::warn!("Ignoring {}: {}", IGNORE_FILE_NAME, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const ROOT: &str = "/project";

    fn matcher(rules: ExclusionRuleSet) -> PatternMatcher {
        PatternMatcher::compile(&rules, Path::new(ROOT)).unwrap()
    }

    fn defaults() -> PatternMatcher {
        matcher(ExclusionRuleSet::new().with_defaults(DEFAULT_EXCLUDES))
    }

    fn gitignore(content: &str) -> PatternMatcher {
        matcher(ExclusionRuleSet::new().with_ignore_file_lines(content))
    }

    fn user(patterns: &[&str]) -> PatternMatcher {
        matcher(ExclusionRuleSet::new().with_user_patterns(patterns))
    }

    fn origin_of(m: &PatternMatcher, path: &str, is_dir: bool) -> Option<RuleOrigin> {
        match m.check(path, is_dir) {
            Some(ExclusionReason::Pattern { origin, .. }) => Some(origin),
            _ => None,
        }
    }

    // ==================== Default rules ====================

    #[test]
    fn test_default_excludes_exact_directory() {
        let m = defaults();
        assert_eq!(origin_of(&m, ".git", true), Some(RuleOrigin::Default));
        assert!(m.is_excluded("node_modules", true));
        assert!(m.is_excluded("src/node_modules", true));
    }

    #[test]
    fn test_default_excludes_glob_pattern() {
        let m = defaults();
        assert!(m.is_excluded("module.pyc", false));
        assert!(m.is_excluded("logs/server.log", false));
        assert!(m.is_excluded(".env.local", false));
        assert!(!m.is_excluded("src/main.rs", false));
        assert!(!m.is_excluded("README.md", false));
    }

    #[test]
    fn test_default_excludes_everything_inside_excluded_dir() {
        let m = defaults();
        assert!(m.is_excluded("__pycache__/module.cpython-39.pyc", false));
        assert!(m.is_excluded(".git/HEAD", false));
        assert!(m.is_excluded("target/debug/build/out.txt", false));
        let reason = m.check(".git/objects/ab/cdef", false).unwrap();
        assert_eq!(reason.to_string(), "Default exclude: .git");
    }

    #[test]
    fn test_default_path_pattern_is_anchored() {
        let m = defaults();
        assert!(m.is_excluded("docs/_build", true));
        assert!(m.is_excluded("docs/_build/index.html", false));
        assert!(!m.is_excluded("api/docs/_build_notes.md", false));
    }

    #[test]
    fn test_alternate_default_table() {
        let m = matcher(ExclusionRuleSet::new().with_defaults(&["*.secret"]));
        assert!(m.is_excluded("a/b/c.secret", false));
        assert!(!m.is_excluded(".git", true));
    }

    #[test]
    fn test_default_matching_is_case_sensitive() {
        if CASE_INSENSITIVE {
            return;
        }
        let m = defaults();
        assert!(m.is_excluded("Release", true));
        assert!(!m.is_excluded("RELEASE", true));
    }

    // ==================== Ignore file ====================

    #[test]
    fn test_gitignore_blank_and_comment_lines_ignored() {
        let rules = ExclusionRuleSet::new().with_ignore_file_lines("\n   \n# comment\n*.log\n");
        assert_eq!(rules.count(RuleOrigin::IgnoreFile), 1);
        let m = matcher(rules);
        assert!(!m.is_excluded("file.txt", false));
        assert_eq!(origin_of(&m, "c.log", false), Some(RuleOrigin::IgnoreFile));
    }

    #[test]
    fn test_gitignore_glob_directory_pattern() {
        let m = gitignore("*.egg-info/");
        assert!(m.is_excluded("llmcontext.egg-info", true));
        assert!(m.is_excluded("llmcontext.egg-info/PKG-INFO", false));
        // Directory-only: a plain file with that name survives
        assert!(!m.is_excluded("notes.egg-info", false));
    }

    #[test]
    fn test_gitignore_character_class_pattern() {
        let m = gitignore("*.py[cod]");
        for ext in ["pyc", "pyo", "pyd"] {
            assert!(m.is_excluded(&format!("module.{}", ext), false));
        }
        assert!(!m.is_excluded("module.py", false));
    }

    #[test]
    fn test_gitignore_anchored_patterns() {
        let m = gitignore("/build/\n/build*/");
        assert!(m.is_excluded("build", true));
        assert!(m.is_excluded("build/output.txt", false));
        assert!(m.is_excluded("build-output", true));
        assert!(!m.is_excluded("src/build", true));
    }

    #[test]
    fn test_gitignore_doublestar_patterns() {
        let m = gitignore("**/node_cache/\ndist/**\nsrc/**/fixtures/");
        assert!(m.is_excluded("node_cache", true));
        assert!(m.is_excluded("a/b/node_cache", true));
        assert!(m.is_excluded("dist/bundle.js", false));
        assert!(m.is_excluded("src/fixtures", true));
        assert!(m.is_excluded("src/foo/bar/fixtures", true));
        assert!(!m.is_excluded("lib/fixtures", true));
    }

    #[test]
    fn test_gitignore_negation_within_ignore_file() {
        let m = gitignore("*.txt\n!keep.txt");
        assert!(m.is_excluded("notes.txt", false));
        assert!(!m.is_excluded("keep.txt", false));
    }

    #[test]
    fn test_gitignore_negation_does_not_override_other_sources() {
        let rules = ExclusionRuleSet::new()
            .with_defaults(DEFAULT_EXCLUDES)
            .with_ignore_file_lines("!*.log")
            .with_user_patterns(&["*.md"]);
        let m = matcher(rules);
        assert_eq!(origin_of(&m, "server.log", false), Some(RuleOrigin::Default));

        let rules = ExclusionRuleSet::new()
            .with_ignore_file_lines("!README.md")
            .with_user_patterns(&["*.md"]);
        let m = matcher(rules);
        assert_eq!(origin_of(&m, "README.md", false), Some(RuleOrigin::User));
    }

    #[test]
    fn test_with_ignore_file_reads_root_gitignore() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(IGNORE_FILE_NAME), "# generated\nsecret/\n*.cache\n").unwrap();

        let rules = ExclusionRuleSet::new().with_ignore_file(temp.path());
        assert_eq!(rules.count(RuleOrigin::IgnoreFile), 2);

        let m = PatternMatcher::compile(&rules, temp.path()).unwrap();
        assert!(m.is_excluded("secret", true));
        assert!(m.is_excluded("deep/x.cache", false));
        assert!(!m.is_excluded("src/lib.rs", false));
    }

    #[test]
    fn test_with_ignore_file_missing_is_empty() {
        let temp = tempdir().unwrap();
        let rules = ExclusionRuleSet::new().with_ignore_file(temp.path());
        assert!(rules.rules().is_empty());
    }

    // ==================== User patterns ====================

    #[test]
    fn test_user_pattern_matches_basename_or_path() {
        let m = user(&["*.md", "src/generated/*.rs"]);
        assert_eq!(origin_of(&m, "docs/guide.md", false), Some(RuleOrigin::User));
        assert!(m.is_excluded("src/generated/api.rs", false));
        assert!(!m.is_excluded("src/generated/nested/api.rs", false));
        assert!(!m.is_excluded("src/main.rs", false));
    }

    #[test]
    fn test_user_pattern_doublestar() {
        let m = user(&["**/secret.txt"]);
        assert!(m.is_excluded("secret.txt", false));
        assert!(m.is_excluded("a/b/secret.txt", false));
        let reason = m.check("a/b/secret.txt", false).unwrap();
        assert_eq!(reason.to_string(), "CLI exclude: **/secret.txt");
    }

    #[test]
    fn test_user_pattern_question_mark_and_class() {
        let m = user(&["file?.txt", "data[0-9].csv"]);
        assert!(m.is_excluded("file1.txt", false));
        assert!(!m.is_excluded("file10.txt", false));
        assert!(m.is_excluded("data7.csv", false));
        assert!(!m.is_excluded("dataX.csv", false));
    }

    #[test]
    fn test_user_directory_only_pattern() {
        let m = user(&["fixtures/"]);
        assert!(m.is_excluded("fixtures", true));
        assert!(m.is_excluded("tests/fixtures/a.json", false));
        assert!(!m.is_excluded("fixtures", false));
    }

    #[test]
    fn test_invalid_user_pattern_is_fatal() {
        let rules = ExclusionRuleSet::new().with_user_patterns(&["[abc"]);
        let err = PatternMatcher::compile(&rules, Path::new(ROOT)).unwrap_err();
        assert!(matches!(err, ContextError::InvalidPattern { .. }));
    }

    #[test]
    fn test_invalid_ignore_line_is_skipped() {
        let m = gitignore("[abc\n*.tmpx");
        assert!(m.is_excluded("a.tmpx", false));
    }

    // ==================== Output file ====================

    #[test]
    fn test_output_file_always_excluded() {
        let m = matcher(ExclusionRuleSet::new())
            .with_output_file(Some("out/context.txt".to_string()));
        assert_eq!(
            m.check("out/context.txt", false),
            Some(ExclusionReason::OutputFile)
        );
        assert!(!m.is_excluded("out/other.txt", false));
        assert!(!m.is_excluded("out", true));
    }

    #[test]
    fn test_empty_path_is_never_excluded() {
        assert!(!defaults().is_excluded("", true));
    }

    #[test]
    fn test_candidates_walks_ancestors_first() {
        let c = candidates("a/b/c.txt", false);
        assert_eq!(
            c,
            vec![
                ("a", "a", true),
                ("a/b", "b", true),
                ("a/b/c.txt", "c.txt", false)
            ]
        );
    }
}
