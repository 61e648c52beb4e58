use crate::aggregate::FilePairKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Language of a file pair, judged by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
    Unknown,
}

impl Language {
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("py" | "pyx") => Language::Python,
            Some("js" | "jsx") => Language::JavaScript,
            Some("ts" | "tsx") => Language::TypeScript,
            Some("rs") => Language::Rust,
            Some("go") => Language::Go,
            _ => Language::Unknown,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Unknown => "unknown",
        }
    }

    /// Reviewer agent for this language; `cto` covers everything without a
    /// dedicated expert.
    pub const fn expert(self) -> &'static str {
        match self {
            Language::Python => "python-expert",
            Language::JavaScript | Language::TypeScript => "typescript-expert",
            Language::Rust | Language::Go | Language::Unknown => "cto",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FilePairKey {
    /// Most common known language of the two files. Ties go to the first
    /// file; `Unknown` when neither extension is recognised.
    pub fn language(&self) -> Language {
        let first = Language::from_path(self.first());
        let second = Language::from_path(self.second());
        match (first, second) {
            (Language::Unknown, other) => other,
            (known, _) => known,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn extensions_map_to_languages() {
        assert_eq!(Language::from_path("src/app.py"), Language::Python);
        assert_eq!(Language::from_path("lib/fast.PYX"), Language::Python);
        assert_eq!(Language::from_path("web/view.jsx"), Language::JavaScript);
        assert_eq!(Language::from_path("web/view.tsx"), Language::TypeScript);
        assert_eq!(Language::from_path("src/main.rs"), Language::Rust);
        assert_eq!(Language::from_path("cmd/main.go"), Language::Go);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
    }

    #[test]
    fn pair_language_prefers_a_known_extension() {
        assert_eq!(FilePairKey::new("a.py", "b.py").language(), Language::Python);
        assert_eq!(FilePairKey::new("a.txt", "b.ts").language(), Language::TypeScript);
        assert_eq!(FilePairKey::new("a.go", "b.py").language(), Language::Go);
        assert_eq!(FilePairKey::new("a.md", "b.txt").language(), Language::Unknown);
    }

    #[test]
    fn experts_by_language() {
        assert_eq!(Language::Python.expert(), "python-expert");
        assert_eq!(Language::JavaScript.expert(), "typescript-expert");
        assert_eq!(Language::TypeScript.expert(), "typescript-expert");
        assert_eq!(Language::Rust.expert(), "cto");
        assert_eq!(Language::Unknown.expert(), "cto");
    }
}
