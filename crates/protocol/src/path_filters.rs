use crate::RawFinding;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Paths whose findings never reach the decision matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PathExclusions {
    /// Directory names or prefixes, matched on whole path segments anywhere in the path
    pub directories: Vec<String>,
    /// File globs, matched against the file name and the full relative path
    pub files: Vec<String>,
    /// Extra path globs
    pub patterns: Vec<String>,
}

impl PathExclusions {
    pub fn is_active(&self) -> bool {
        self.directories
            .iter()
            .any(|p| !normalize_filter_path(p).is_empty())
            || self.files.iter().any(|p| !p.trim().is_empty())
            || self.patterns.iter().any(|p| !p.trim().is_empty())
    }

    pub fn excludes(&self, rel_path: &str) -> bool {
        let rel_path = normalize_filter_path(rel_path);
        if rel_path.is_empty() {
            return false;
        }

        for dir in &self.directories {
            let normalized = normalize_filter_path(dir);
            if normalized.is_empty() {
                continue;
            }
            if directory_matches_normalized(&normalized, &rel_path) {
                return true;
            }
        }

        self.files
            .iter()
            .chain(self.patterns.iter())
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .any(|pattern| matches_file_pattern(&rel_path, pattern))
    }

    /// First file of `finding` that falls under an exclusion.
    pub fn excluded_file<'a>(&self, finding: &'a RawFinding) -> Option<&'a str> {
        if !self.is_active() {
            return None;
        }
        finding
            .evidence
            .files()
            .into_iter()
            .find(|file| self.excludes(file))
    }
}

fn normalize_filter_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while value.starts_with("./") {
        value = value[2..].to_string();
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

fn directory_matches_normalized(dir: &str, path: &str) -> bool {
    if path.starts_with(dir) && path.as_bytes().get(dir.len()) == Some(&b'/') {
        return true;
    }
    path.match_indices(dir).any(|(idx, _)| {
        idx > 0
            && path.as_bytes()[idx - 1] == b'/'
            && path.as_bytes().get(idx + dir.len()) == Some(&b'/')
    })
}

fn matches_file_pattern(path: &str, pattern: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);

    if !pattern.contains('*') && !pattern.contains('?') && !pattern.contains('[') {
        return file_name == pattern || path == pattern;
    }

    glob::Pattern::new(pattern)
        .map(|p| p.matches(path) || p.matches(file_name))
        .unwrap_or(false)
}
