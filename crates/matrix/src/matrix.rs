use crate::confidence::confidence;
use crate::eligibility::{self, Eligibility, RiskCeilings};
use crate::reason::{Concern, Reason, SkipRule};
use crate::risk::RiskWeights;
use crate::skip::skip_rule;
use crate::types::{Action, Confidence, Decision, DecisionMetadata, DuplicationContext, FixApproach};

const HIGH_OVERALL_RISK: f64 = 60.0;

/// Constant weight and ceiling tables. Holds no mutable state, so a single
/// instance can be shared freely across workers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecisionMatrix {
    pub weights: RiskWeights,
    pub ceilings: RiskCeilings,
}

impl DecisionMatrix {
    pub const STANDARD: DecisionMatrix = DecisionMatrix {
        weights: RiskWeights::STANDARD,
        ceilings: RiskCeilings::STANDARD,
    };

    pub fn evaluate(&self, ctx: &DuplicationContext) -> Decision {
        if let Some(rule) = skip_rule(ctx) {
            return skip_decision(rule);
        }

        let risk = self.weights.score(ctx);
        let confidence = confidence(ctx);

        match eligibility::check(ctx, risk, confidence, &self.ceilings) {
            Eligibility::Eligible(scenario) => {
                let mut reasons = vec![Reason::AutoFixApproved {
                    risk_score: risk,
                    confidence,
                }];
                reasons.extend(positive_evidence(ctx));
                let metadata = DecisionMetadata {
                    recommended_approach: Some(fix_approach(ctx)),
                    scenario: Some(scenario),
                    ..DecisionMetadata::default()
                };
                Decision::new(Action::AutomaticFix, reasons, metadata, confidence, risk)
            }
            gate => {
                log::trace!("Auto-fix gate rejected finding: {gate:?}");
                let mut reasons = vec![Reason::ReviewRequired {
                    risk_score: risk,
                    confidence,
                }];
                reasons.extend(risk_evidence(ctx));
                let metadata = DecisionMetadata {
                    concerns: concerns(ctx, risk),
                    ..DecisionMetadata::default()
                };
                Decision::new(Action::HumanReview, reasons, metadata, confidence, risk)
            }
        }
    }
}

/// Evaluate under the standard tables.
pub fn evaluate(ctx: &DuplicationContext) -> Decision {
    DecisionMatrix::STANDARD.evaluate(ctx)
}

fn skip_decision(rule: SkipRule) -> Decision {
    let metadata = DecisionMetadata {
        recommended_approach: Some(FixApproach::NoAction),
        skip_rule: Some(rule),
        ..DecisionMetadata::default()
    };
    Decision::new(
        Action::Skip,
        vec![Reason::BelowThreshold { rule }],
        metadata,
        Confidence::High,
        0.0,
    )
}

fn positive_evidence(ctx: &DuplicationContext) -> Vec<Reason> {
    let mut reasons = Vec::new();
    if ctx.similarity_score >= 0.95 {
        reasons.push(Reason::NearIdentical);
    }
    if ctx.test_coverage_percentage >= 80.0 {
        reasons.push(Reason::StrongCoverage {
            coverage: ctx.test_coverage_percentage,
        });
    }
    if !ctx.cross_module_impact {
        reasons.push(Reason::SingleModule);
    }
    if ctx.dependency_count <= 2 {
        reasons.push(Reason::MinimalDependencies);
    }
    reasons
}

fn risk_evidence(ctx: &DuplicationContext) -> Vec<Reason> {
    let mut reasons = Vec::new();
    if ctx.is_public_api {
        reasons.push(Reason::PublicApi);
    }
    if ctx.cross_module_impact {
        reasons.push(Reason::CrossModule);
    }
    if ctx.dependency_count > 5 {
        reasons.push(Reason::HighDependencyCount {
            count: ctx.dependency_count,
        });
    }
    if ctx.test_coverage_percentage < 50.0 {
        reasons.push(Reason::LowCoverage {
            coverage: ctx.test_coverage_percentage,
        });
    }
    if ctx.cyclomatic_complexity > 10 {
        reasons.push(Reason::HighComplexity {
            complexity: ctx.cyclomatic_complexity,
        });
    }
    if ctx.file_count > 5 {
        reasons.push(Reason::LargeScope {
            files: ctx.file_count,
        });
    }
    reasons
}

fn concerns(ctx: &DuplicationContext, risk: f64) -> Vec<Concern> {
    let checks = [
        (ctx.is_public_api, Concern::BreakingApiChanges),
        (ctx.cross_module_impact, Concern::ArchitecturalBoundaries),
        (ctx.dependency_count > 5, Concern::RippleEffects),
        (
            ctx.test_coverage_percentage < 50.0,
            Concern::InsufficientTestSafetyNet,
        ),
        (ctx.cyclomatic_complexity > 10, Concern::ComplexLogic),
        (ctx.last_modified_days_ago < 7, Concern::RecentlyModified),
        (risk > HIGH_OVERALL_RISK, Concern::HighOverallRisk),
    ];
    checks
        .into_iter()
        .filter_map(|(hit, concern)| hit.then_some(concern))
        .collect()
}

fn fix_approach(ctx: &DuplicationContext) -> FixApproach {
    if ctx.has_symbol_type("function") {
        if ctx.file_count == 2 {
            FixApproach::ExtractToSharedUtility
        } else {
            FixApproach::CreateCommonModule
        }
    } else if ctx.has_symbol_type("method") {
        if ctx.cross_module_impact {
            FixApproach::CreateSharedMixin
        } else {
            FixApproach::ExtractToBaseClass
        }
    } else if ctx.has_symbol_type("variable") {
        FixApproach::ExtractToConstants
    } else {
        FixApproach::RefactorToSharedComponent
    }
}
