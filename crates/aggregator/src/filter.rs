use crate::error::{AggregatorError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use triage_protocol::{RawFinding, SymbolRef};

// LSP SymbolKind numbers
const LSP_MODULE: u32 = 2;
const LSP_METHOD: u32 = 6;
const LSP_PROPERTY: u32 = 7;
const LSP_CONSTRUCTOR: u32 = 9;
const LSP_FUNCTION: u32 = 12;
const LSP_CONSTANT: u32 = 14;
const LSP_ENUM_MEMBER: u32 = 22;

const GENERIC_NAMES: &[&str] = &["i", "j", "k", "x", "y", "z", "n", "m", "e", "f", "v"];

/// Why a raw finding was dropped before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterReason {
    ModuleImport,
    ConstantOrEnumMember,
    Constructor,
    Boilerplate,
    Property,
    TooShort,
    SingleCharacterName,
    GenericName,
    SameFileOrMissing,
}

impl FilterReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            FilterReason::ModuleImport => "module_import",
            FilterReason::ConstantOrEnumMember => "constant_or_enum_member",
            FilterReason::Constructor => "constructor",
            FilterReason::Boilerplate => "boilerplate",
            FilterReason::Property => "property",
            FilterReason::TooShort => "too_short",
            FilterReason::SingleCharacterName => "single_character_name",
            FilterReason::GenericName => "generic_name",
            FilterReason::SameFileOrMissing => "same_file_or_missing",
        }
    }
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `filter` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub enabled: bool,
    /// Symbol-name globs treated as boilerplate unless similarity is very high
    pub boilerplate_patterns: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            boilerplate_patterns: ["__*__", "get_*", "set_*", "toString", "constructor", "main"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Findings that survived the filter plus per-reason drop counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    pub kept: Vec<RawFinding>,
    pub dropped: BTreeMap<FilterReason, usize>,
}

impl FilterOutcome {
    pub fn dropped_total(&self) -> usize {
        self.dropped.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct MeaningfulFilter {
    enabled: bool,
    boilerplate: Option<GlobSet>,
}

impl MeaningfulFilter {
    pub fn new(settings: &FilterSettings) -> Result<Self> {
        let patterns: Vec<&str> = settings
            .boilerplate_patterns
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();

        let boilerplate = if patterns.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in patterns {
                let glob = Glob::new(pattern).map_err(|source| AggregatorError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
                builder.add(glob);
            }
            Some(builder.build().map_err(|source| AggregatorError::InvalidPattern {
                pattern: settings.boilerplate_patterns.join(","),
                source,
            })?)
        };

        Ok(Self {
            enabled: settings.enabled,
            boilerplate,
        })
    }

    /// First rule that drops `finding`, or `None` when it is worth dispatching.
    pub fn check(&self, finding: &RawFinding) -> Option<FilterReason> {
        let evidence = &finding.evidence;
        let blank = SymbolRef::default();
        let orig = evidence.original_symbol.as_ref().unwrap_or(&blank);
        let dup = evidence.duplicate_symbol.as_ref().unwrap_or(&blank);
        let similarity = evidence.similarity();

        let orig_kind = orig.lsp_kind.unwrap_or(0);
        let dup_kind = dup.lsp_kind.unwrap_or(0);
        let either = |kinds: &[u32]| kinds.contains(&orig_kind) || kinds.contains(&dup_kind);

        if either(&[LSP_MODULE]) {
            return Some(FilterReason::ModuleImport);
        }
        if either(&[LSP_CONSTANT, LSP_ENUM_MEMBER]) {
            return Some(FilterReason::ConstantOrEnumMember);
        }
        if either(&[LSP_CONSTRUCTOR]) && similarity < 0.95 {
            return Some(FilterReason::Constructor);
        }
        if similarity < 0.90 && (self.is_boilerplate(&orig.name) || self.is_boilerplate(&dup.name))
        {
            return Some(FilterReason::Boilerplate);
        }
        if either(&[LSP_PROPERTY]) && similarity < 0.90 {
            return Some(FilterReason::Property);
        }
        if is_short(orig) && is_short(dup) && similarity < 1.0 && !either(&[LSP_FUNCTION, LSP_METHOD])
        {
            return Some(FilterReason::TooShort);
        }
        if orig.name.chars().count() <= 1 || dup.name.chars().count() <= 1 {
            return Some(FilterReason::SingleCharacterName);
        }
        if is_generic(&orig.name) || is_generic(&dup.name) {
            return Some(FilterReason::GenericName);
        }
        match (orig.file(), dup.file()) {
            (Some(a), Some(b)) if a != b => None,
            _ => Some(FilterReason::SameFileOrMissing),
        }
    }

    /// Like [`check`](Self::check), but a disabled filter drops nothing.
    pub fn drop_reason(&self, finding: &RawFinding) -> Option<FilterReason> {
        if self.enabled {
            self.check(finding)
        } else {
            None
        }
    }

    pub fn apply(&self, findings: Vec<RawFinding>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for finding in findings {
            match self.drop_reason(&finding) {
                Some(reason) => {
                    log::trace!("Filtered {} ({reason})", finding.finding_id);
                    *outcome.dropped.entry(reason).or_default() += 1;
                }
                None => outcome.kept.push(finding),
            }
        }

        for (reason, count) in &outcome.dropped {
            log::debug!("Filtered out {count} finding(s): {reason}");
        }
        outcome
    }

    fn is_boilerplate(&self, name: &str) -> bool {
        self.boilerplate
            .as_ref()
            .is_some_and(|set| !name.is_empty() && set.is_match(name))
    }
}

fn is_short(symbol: &SymbolRef) -> bool {
    matches!(symbol.line_count, Some(n) if n > 0 && n < 3)
}

fn is_generic(name: &str) -> bool {
    let lower = name.to_lowercase();
    GENERIC_NAMES.contains(&lower.as_str())
}
