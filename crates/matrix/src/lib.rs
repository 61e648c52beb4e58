//! # Triage Matrix
//!
//! Policy core deciding what happens to a semantically detected duplicate:
//! fix it automatically, escalate it to a human, or drop it.
//!
//! ## Architecture
//!
//! ```text
//! RawFinding.evidence
//!     │
//!     ├──> ContextOptions (named optional fields)
//!     │      └─ resolve(ContextDefaults) → DuplicationContext
//!     │
//!     └──> DecisionMatrix::evaluate
//!            ├─ Skip filter (short-circuits with risk 0, confidence high)
//!            ├─ Risk scorer (additive, clamped to 0..=100)
//!            ├─ Confidence estimator (similarity × coverage ladder)
//!            ├─ Auto-fix eligibility (exclusions, risk budget, scenarios)
//!            └─ Decision { action, reasons, metadata, confidence, risk }
//! ```
//!
//! Everything here is pure: the matrix holds only constant tables, so the same
//! context always yields the same decision and evaluation is safe from any
//! number of threads.

mod confidence;
mod context;
mod eligibility;
mod error;
mod matrix;
mod reason;
mod risk;
mod skip;
mod types;

pub use confidence::confidence;
pub use context::{ContextDefaults, ContextOptions};
pub use eligibility::{auto_fix_eligibility, AutoFixScenario, Eligibility, Exclusion, RiskCeilings};
pub use error::{MatrixError, Result};
pub use matrix::{evaluate, DecisionMatrix};
pub use reason::{Concern, Reason, SkipRule};
pub use risk::{risk_breakdown, risk_score, RiskContribution, RiskFactor, RiskTier, RiskWeights};
pub use skip::skip_rule;
pub use types::{Action, Confidence, Decision, DecisionMetadata, DuplicationContext, FixApproach};
