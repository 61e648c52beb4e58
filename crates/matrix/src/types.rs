use crate::eligibility::AutoFixScenario;
use crate::error::{MatrixError, Result};
use crate::reason::{Concern, Reason, SkipRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Normalized feature vector describing one duplicate-code finding.
///
/// Built once by [`crate::ContextOptions::resolve`] and only ever read
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicationContext {
    /// Semantic similarity between the duplicate pair, 0.0..=1.0
    pub similarity_score: f64,

    /// Files spanned by the duplication (at least 2)
    pub file_count: u32,

    pub total_line_count: u32,

    /// Lowercased symbol kinds (function, method, class, variable, ...)
    pub symbol_types: BTreeSet<String>,

    pub cross_module_impact: bool,

    /// 0.0..=100.0
    pub test_coverage_percentage: f64,

    pub cyclomatic_complexity: u32,
    pub dependency_count: u32,
    pub is_public_api: bool,
    pub has_documentation: bool,
    pub last_modified_days_ago: u32,
}

impl DuplicationContext {
    pub fn has_symbol_type(&self, kind: &str) -> bool {
        self.symbol_types.contains(kind)
    }

    /// True when the only symbol kind involved is `kind`.
    pub fn only_symbol_type(&self, kind: &str) -> bool {
        self.symbol_types.len() == 1 && self.has_symbol_type(kind)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_score) {
            return Err(MatrixError::out_of_range(
                "similarity_score",
                self.similarity_score,
                "0.0..=1.0",
            ));
        }
        if self.file_count < 2 {
            return Err(MatrixError::out_of_range("file_count", self.file_count, ">= 2"));
        }
        if !(0.0..=100.0).contains(&self.test_coverage_percentage) {
            return Err(MatrixError::out_of_range(
                "test_coverage_percentage",
                self.test_coverage_percentage,
                "0.0..=100.0",
            ));
        }
        if let Some(kind) = self.symbol_types.iter().find(|k| k.trim().is_empty()) {
            return Err(MatrixError::InvalidSymbolType(kind.clone()));
        }
        Ok(())
    }
}

/// What to do with a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    AutomaticFix,
    HumanReview,
    Skip,
}

impl Action {
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::AutomaticFix => "automatic_fix",
            Action::HumanReview => "human_review",
            Action::Skip => "skip",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certainty that the duplication is real and safely actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Confidence {
    pub const fn as_str(self) -> &'static str {
        match self {
            Confidence::VeryHigh => "very_high",
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refactoring approach recommended alongside an automatic fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixApproach {
    ExtractToSharedUtility,
    CreateCommonModule,
    ExtractToBaseClass,
    CreateSharedMixin,
    ExtractToConstants,
    RefactorToSharedComponent,
    NoAction,
}

impl FixApproach {
    pub const fn as_str(self) -> &'static str {
        match self {
            FixApproach::ExtractToSharedUtility => "extract_to_shared_utility",
            FixApproach::CreateCommonModule => "create_common_module",
            FixApproach::ExtractToBaseClass => "extract_to_base_class",
            FixApproach::CreateSharedMixin => "create_shared_mixin",
            FixApproach::ExtractToConstants => "extract_to_constants",
            FixApproach::RefactorToSharedComponent => "refactor_to_shared_component",
            FixApproach::NoAction => "no_action",
        }
    }
}

impl fmt::Display for FixApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured extras attached to a decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_approach: Option<FixApproach>,

    /// Positive scenario that made the finding eligible for an automatic fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<AutoFixScenario>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_rule: Option<SkipRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concerns: Vec<Concern>,
}

/// Output of the decision matrix for one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,

    /// Prose rendering of `reasons`
    pub justification: String,

    pub reasons: Vec<Reason>,
    pub metadata: DecisionMetadata,
    pub confidence: Confidence,

    /// 0.0..=100.0; always 0.0 for skips
    pub risk_score: f64,
}

impl Decision {
    pub(crate) fn new(
        action: Action,
        reasons: Vec<Reason>,
        metadata: DecisionMetadata,
        confidence: Confidence,
        risk_score: f64,
    ) -> Self {
        Self {
            action,
            justification: Reason::render(&reasons),
            reasons,
            metadata,
            confidence,
            risk_score,
        }
    }
}
