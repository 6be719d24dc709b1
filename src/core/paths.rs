//! Path normalization utilities
//!
//! Ensures all paths are normalized to use '/' as separator and are relative to root.

use std::path::{Component, Path, PathBuf};

/// Normalize a path to use '/' as separator (for cross-platform consistency)
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Make a path relative to the root directory
pub fn make_relative(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(normalize_path)
}

/// Lowercased extension of a relative path, without the dot
pub fn extension_of(path: &str) -> Option<String> {
    let name = file_name(path);
    match name.rfind('.') {
        // ".bashrc" is a hidden file, not an extension
        Some(0) | None => None,
        Some(idx) if idx + 1 < name.len() => Some(name[idx + 1..].to_lowercase()),
        Some(_) => None,
    }
}

/// Last segment of a '/'-separated relative path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Drop `.` and fold `..` into its parent without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` at the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a possibly-nonexistent path to an absolute one.
///
/// The deepest existing ancestor is canonicalized (resolving symlinks such as
/// `/tmp` on macOS) and the missing tail is appended verbatim. When the path
/// does not exist, `.` and `..` are folded lexically first.
pub fn resolve_lenient(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    if let Ok(canonical) = absolute.canonicalize() {
        return canonical;
    }
    let absolute = normalize_lexically(&absolute);

    let mut tail = Vec::new();
    let mut current = absolute.as_path();
    while let Some(parent) = current.parent() {
        if let Some(name) = current.file_name() {
            tail.push(name.to_os_string());
        }
        if let Ok(canonical) = parent.canonicalize() {
            let mut resolved = canonical;
            for name in tail.iter().rev() {
                resolved.push(name);
            }
            return resolved;
        }
        current = parent;
    }
    absolute
}
