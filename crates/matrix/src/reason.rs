use crate::types::Confidence;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Skip-filter rule that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipRule {
    /// Fewer than 5 lines
    TrivialSize,
    /// Similarity below 0.80 on fewer than 20 lines
    WeakSmallMatch,
    /// Only variables, fewer than 10 lines
    SmallVariable,
    /// Every symbol kind is test or fixture scaffolding
    TestScaffolding,
}

impl SkipRule {
    pub const fn as_str(self) -> &'static str {
        match self {
            SkipRule::TrivialSize => "trivial_size",
            SkipRule::WeakSmallMatch => "weak_small_match",
            SkipRule::SmallVariable => "small_variable",
            SkipRule::TestScaffolding => "test_scaffolding",
        }
    }
}

impl fmt::Display for SkipRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipRule::TrivialSize => "fewer than 5 lines",
            SkipRule::WeakSmallMatch => "similarity below 0.80 on fewer than 20 lines",
            SkipRule::SmallVariable => "variable-only duplication under 10 lines",
            SkipRule::TestScaffolding => "test or fixture scaffolding",
        })
    }
}

/// Reason code behind a decision. Rendered to prose only for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Reason {
    BelowThreshold { rule: SkipRule },
    AutoFixApproved { risk_score: f64, confidence: Confidence },
    ReviewRequired { risk_score: f64, confidence: Confidence },
    NearIdentical,
    StrongCoverage { coverage: f64 },
    SingleModule,
    MinimalDependencies,
    PublicApi,
    CrossModule,
    HighDependencyCount { count: u32 },
    LowCoverage { coverage: f64 },
    HighComplexity { complexity: u32 },
    LargeScope { files: u32 },
}

impl Reason {
    pub fn render(reasons: &[Reason]) -> String {
        reasons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::BelowThreshold { rule } => {
                write!(f, "Duplication below actionable threshold ({rule}).")
            }
            Reason::AutoFixApproved {
                risk_score,
                confidence,
            } => write!(
                f,
                "Automatic fix approved: risk_score={risk_score:.1}, confidence={confidence}."
            ),
            Reason::ReviewRequired {
                risk_score,
                confidence,
            } => write!(
                f,
                "Human review required: risk_score={risk_score:.1}, confidence={confidence}."
            ),
            Reason::NearIdentical => f.write_str("Near-identical code duplication detected."),
            Reason::StrongCoverage { coverage } => write!(
                f,
                "Strong test coverage ({coverage:.0}%) provides safety net."
            ),
            Reason::SingleModule => f.write_str("Changes isolated to single module."),
            Reason::MinimalDependencies => f.write_str("Minimal dependency impact."),
            Reason::PublicApi => f.write_str("PUBLIC API CHANGE - requires careful consideration."),
            Reason::CrossModule => {
                f.write_str("Cross-module refactoring impacts system architecture.")
            }
            Reason::HighDependencyCount { count } => write!(
                f,
                "High dependency count ({count}) requires impact analysis."
            ),
            Reason::LowCoverage { coverage } => {
                write!(f, "Low test coverage ({coverage:.0}%) increases risk.")
            }
            Reason::HighComplexity { complexity } => write!(
                f,
                "High complexity (CC={complexity}) suggests careful refactoring needed."
            ),
            Reason::LargeScope { files } => {
                write!(f, "Large scope ({files} files) requires coordinated changes.")
            }
        }
    }
}

/// Concern listed on a human-review decision and copied into the issue body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concern {
    BreakingApiChanges,
    ArchitecturalBoundaries,
    RippleEffects,
    InsufficientTestSafetyNet,
    ComplexLogic,
    RecentlyModified,
    HighOverallRisk,
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Concern::BreakingApiChanges => "Breaking API changes possible",
            Concern::ArchitecturalBoundaries => "Architectural boundaries may be violated",
            Concern::RippleEffects => "Ripple effects across multiple components",
            Concern::InsufficientTestSafetyNet => "Insufficient test safety net",
            Concern::ComplexLogic => "Complex logic requires careful extraction",
            Concern::RecentlyModified => {
                "Recently modified code - may conflict with ongoing work"
            }
            Concern::HighOverallRisk => "High overall risk - consider phased approach",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_joins_fragments_with_spaces() {
        let text = Reason::render(&[
            Reason::AutoFixApproved {
                risk_score: 12.0,
                confidence: Confidence::High,
            },
            Reason::StrongCoverage { coverage: 85.4 },
            Reason::SingleModule,
        ]);
        assert_eq!(
            text,
            "Automatic fix approved: risk_score=12.0, confidence=high. \
             Strong test coverage (85%) provides safety net. \
             Changes isolated to single module."
        );
    }

    #[test]
    fn reasons_serialize_as_tagged_codes() {
        let value = serde_json::to_value(Reason::HighDependencyCount { count: 8 }).unwrap();
        assert_eq!(value["code"], "high_dependency_count");
        assert_eq!(value["count"], 8);

        let value = serde_json::to_value(Reason::BelowThreshold {
            rule: SkipRule::TrivialSize,
        })
        .unwrap();
        assert_eq!(value["rule"], "trivial_size");
    }
}
