use crate::types::{Confidence, DuplicationContext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positive scenario under which a finding may be fixed without a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoFixScenario {
    SimpleExtraction,
    PrivateMethodConsolidation,
    ConstantExtraction,
    WellTestedUtility,
}

impl AutoFixScenario {
    pub const ALL: [AutoFixScenario; 4] = [
        AutoFixScenario::SimpleExtraction,
        AutoFixScenario::PrivateMethodConsolidation,
        AutoFixScenario::ConstantExtraction,
        AutoFixScenario::WellTestedUtility,
    ];

    pub fn holds(self, ctx: &DuplicationContext, risk_score: f64) -> bool {
        let sim = ctx.similarity_score;
        let cov = ctx.test_coverage_percentage;
        match self {
            AutoFixScenario::SimpleExtraction => {
                sim >= 0.90
                    && ctx.has_symbol_type("function")
                    && !ctx.cross_module_impact
                    && ctx.file_count <= 3
                    && cov >= 70.0
            }
            AutoFixScenario::PrivateMethodConsolidation => {
                sim >= 0.85
                    && ctx.has_symbol_type("method")
                    && !ctx.cross_module_impact
                    && !ctx.is_public_api
                    && ctx.dependency_count <= 3
            }
            AutoFixScenario::ConstantExtraction => {
                sim >= 0.95
                    && ctx.has_symbol_type("variable")
                    && ctx.total_line_count <= 50
                    && ctx.cyclomatic_complexity <= 3
            }
            AutoFixScenario::WellTestedUtility => {
                cov >= 90.0 && sim >= 0.88 && ctx.dependency_count <= 5 && risk_score <= 20.0
            }
        }
    }
}

impl fmt::Display for AutoFixScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AutoFixScenario::SimpleExtraction => "simple extraction",
            AutoFixScenario::PrivateMethodConsolidation => "private method consolidation",
            AutoFixScenario::ConstantExtraction => "constant extraction",
            AutoFixScenario::WellTestedUtility => "well-tested utility",
        })
    }
}

/// Hard exclusion that rules out an automatic fix whatever the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    PublicApi,
    CrossModuleWithoutVeryHighConfidence,
}

/// Largest risk score tolerated for an automatic fix at each confidence level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskCeilings {
    pub very_high: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for RiskCeilings {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl RiskCeilings {
    pub const STANDARD: RiskCeilings = RiskCeilings {
        very_high: 40.0,
        high: 25.0,
        medium: 15.0,
        low: 0.0,
    };

    pub const fn ceiling(&self, confidence: Confidence) -> f64 {
        match confidence {
            Confidence::VeryHigh => self.very_high,
            Confidence::High => self.high,
            Confidence::Medium => self.medium,
            Confidence::Low => self.low,
        }
    }
}

/// Outcome of the auto-fix gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Eligibility {
    Eligible(AutoFixScenario),
    Excluded(Exclusion),
    OverRiskBudget { risk_score: f64, ceiling: f64 },
    NoScenario,
}

impl Eligibility {
    pub fn scenario(&self) -> Option<AutoFixScenario> {
        match self {
            Eligibility::Eligible(scenario) => Some(*scenario),
            _ => None,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.scenario().is_some()
    }
}

pub(crate) fn check(
    ctx: &DuplicationContext,
    risk_score: f64,
    confidence: Confidence,
    ceilings: &RiskCeilings,
) -> Eligibility {
    if ctx.is_public_api {
        return Eligibility::Excluded(Exclusion::PublicApi);
    }
    if ctx.cross_module_impact && confidence != Confidence::VeryHigh {
        return Eligibility::Excluded(Exclusion::CrossModuleWithoutVeryHighConfidence);
    }

    let ceiling = ceilings.ceiling(confidence);
    if risk_score > ceiling {
        return Eligibility::OverRiskBudget {
            risk_score,
            ceiling,
        };
    }

    AutoFixScenario::ALL
        .into_iter()
        .find(|scenario| scenario.holds(ctx, risk_score))
        .map_or(Eligibility::NoScenario, Eligibility::Eligible)
}

/// Auto-fix gate under the standard risk ceilings.
pub fn auto_fix_eligibility(
    ctx: &DuplicationContext,
    risk_score: f64,
    confidence: Confidence,
) -> Eligibility {
    check(ctx, risk_score, confidence, &RiskCeilings::STANDARD)
}
