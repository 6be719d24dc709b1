//! Extension → markdown fence hint

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::core::paths::extension_of;

static LANGUAGE_HINTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("rs", "rust"),
        ("py", "python"),
        ("pyi", "python"),
        ("js", "javascript"),
        ("mjs", "javascript"),
        ("cjs", "javascript"),
        ("jsx", "jsx"),
        ("ts", "typescript"),
        ("tsx", "tsx"),
        ("go", "go"),
        ("java", "java"),
        ("kt", "kotlin"),
        ("kts", "kotlin"),
        ("scala", "scala"),
        ("c", "c"),
        ("h", "c"),
        ("cc", "cpp"),
        ("cpp", "cpp"),
        ("cxx", "cpp"),
        ("hpp", "cpp"),
        ("cs", "csharp"),
        ("swift", "swift"),
        ("rb", "ruby"),
        ("php", "php"),
        ("lua", "lua"),
        ("pl", "perl"),
        ("r", "r"),
        ("dart", "dart"),
        ("ex", "elixir"),
        ("exs", "elixir"),
        ("erl", "erlang"),
        ("hs", "haskell"),
        ("ml", "ocaml"),
        ("clj", "clojure"),
        ("zig", "zig"),
        ("sh", "bash"),
        ("bash", "bash"),
        ("zsh", "zsh"),
        ("fish", "fish"),
        ("ps1", "powershell"),
        ("bat", "batch"),
        ("sql", "sql"),
        ("html", "html"),
        ("htm", "html"),
        ("css", "css"),
        ("scss", "scss"),
        ("sass", "sass"),
        ("less", "less"),
        ("vue", "vue"),
        ("svelte", "svelte"),
        ("json", "json"),
        ("jsonc", "json"),
        ("yaml", "yaml"),
        ("yml", "yaml"),
        ("toml", "toml"),
        ("ini", "ini"),
        ("cfg", "ini"),
        ("xml", "xml"),
        ("svg", "xml"),
        ("md", "markdown"),
        ("markdown", "markdown"),
        ("rst", "rst"),
        ("tex", "latex"),
        ("graphql", "graphql"),
        ("proto", "protobuf"),
        ("tf", "hcl"),
        ("dockerfile", "dockerfile"),
        ("cmake", "cmake"),
        ("gradle", "groovy"),
        ("groovy", "groovy"),
    ]
    .into_iter()
    .collect()
});

/// Fence hint for a path, or `None` for unknown extensions
pub fn language_hint(relative_path: &str) -> Option<&'static str> {
    let ext = extension_of(relative_path)?;
    LANGUAGE_HINTS.get(ext.as_str()).copied()
}
