use crate::types::{Confidence, DuplicationContext};

const NEAR_IDENTICAL: f64 = 0.95;
const STRONG_SIMILARITY: f64 = 0.85;
const STRONG_COVERAGE: f64 = 80.0;
const FAIR_COVERAGE: f64 = 50.0;

/// Similarity × coverage ladder.
pub fn confidence(ctx: &DuplicationContext) -> Confidence {
    let sim = ctx.similarity_score;
    let cov = ctx.test_coverage_percentage;

    if sim >= NEAR_IDENTICAL {
        if cov >= STRONG_COVERAGE {
            Confidence::VeryHigh
        } else if cov >= FAIR_COVERAGE {
            Confidence::High
        } else {
            Confidence::Medium
        }
    } else if sim >= STRONG_SIMILARITY {
        if cov >= STRONG_COVERAGE {
            Confidence::High
        } else {
            Confidence::Medium
        }
    } else {
        Confidence::Low
    }
}
