use crate::types::DuplicationContext;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_RISK: f64 = 100.0;

const CROSS_MODULE_TIERS: &[RiskTier] = &[RiskTier::new(0.0, 20.0)];
const PUBLIC_API_TIERS: &[RiskTier] = &[RiskTier::new(0.0, 25.0)];
const DEPENDENCY_TIERS: &[RiskTier] = &[RiskTier::new(5.0, 15.0), RiskTier::new(2.0, 8.0)];
const COVERAGE_TIERS: &[RiskTier] = &[RiskTier::new(50.0, 15.0), RiskTier::new(80.0, 8.0)];
const COMPLEXITY_TIERS: &[RiskTier] = &[RiskTier::new(10.0, 10.0), RiskTier::new(5.0, 5.0)];
const RECENCY_TIERS: &[RiskTier] = &[RiskTier::new(7.0, 10.0), RiskTier::new(30.0, 5.0)];
const SCOPE_TIERS: &[RiskTier] = &[RiskTier::new(10.0, 15.0), RiskTier::new(5.0, 8.0)];

/// Risk dimension scored by the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    CrossModule,
    PublicApi,
    Dependencies,
    TestCoverage,
    Complexity,
    Recency,
    Scope,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 7] = [
        RiskFactor::CrossModule,
        RiskFactor::PublicApi,
        RiskFactor::Dependencies,
        RiskFactor::TestCoverage,
        RiskFactor::Complexity,
        RiskFactor::Recency,
        RiskFactor::Scope,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RiskFactor::CrossModule => "cross_module",
            RiskFactor::PublicApi => "public_api",
            RiskFactor::Dependencies => "dependencies",
            RiskFactor::TestCoverage => "test_coverage",
            RiskFactor::Complexity => "complexity",
            RiskFactor::Recency => "recency",
            RiskFactor::Scope => "scope",
        }
    }

    /// Coverage and age are risky when low; everything else when high.
    const fn lower_is_riskier(self) -> bool {
        matches!(self, RiskFactor::TestCoverage | RiskFactor::Recency)
    }

    fn value(self, ctx: &DuplicationContext) -> f64 {
        match self {
            RiskFactor::CrossModule => flag(ctx.cross_module_impact),
            RiskFactor::PublicApi => flag(ctx.is_public_api),
            RiskFactor::Dependencies => f64::from(ctx.dependency_count),
            RiskFactor::TestCoverage => ctx.test_coverage_percentage,
            RiskFactor::Complexity => f64::from(ctx.cyclomatic_complexity),
            RiskFactor::Recency => f64::from(ctx.last_modified_days_ago),
            RiskFactor::Scope => f64::from(ctx.file_count),
        }
    }

    /// Tiers ordered from most to least severe; the first one crossed applies.
    pub const fn tiers(self) -> &'static [RiskTier] {
        match self {
            RiskFactor::CrossModule => CROSS_MODULE_TIERS,
            RiskFactor::PublicApi => PUBLIC_API_TIERS,
            RiskFactor::Dependencies => DEPENDENCY_TIERS,
            RiskFactor::TestCoverage => COVERAGE_TIERS,
            RiskFactor::Complexity => COMPLEXITY_TIERS,
            RiskFactor::Recency => RECENCY_TIERS,
            RiskFactor::Scope => SCOPE_TIERS,
        }
    }

    fn crossed(self, value: f64) -> Option<RiskTier> {
        self.tiers().iter().copied().find(|tier| {
            if self.lower_is_riskier() {
                value < tier.threshold
            } else {
                value > tier.threshold
            }
        })
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Strict threshold and the base points earned for crossing it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskTier {
    pub threshold: f64,
    pub points: f64,
}

impl RiskTier {
    pub const fn new(threshold: f64, points: f64) -> Self {
        Self { threshold, points }
    }
}

/// Multiplier applied to each factor's tier points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub cross_module: f64,
    pub public_api: f64,
    pub dependencies: f64,
    pub test_coverage: f64,
    pub complexity: f64,
    pub recency: f64,
    pub scope: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl RiskWeights {
    pub const STANDARD: RiskWeights = RiskWeights {
        cross_module: 3.0,
        public_api: 4.0,
        dependencies: 2.5,
        test_coverage: 2.0,
        complexity: 1.5,
        recency: 1.5,
        scope: 2.0,
    };

    pub const fn weight(&self, factor: RiskFactor) -> f64 {
        match factor {
            RiskFactor::CrossModule => self.cross_module,
            RiskFactor::PublicApi => self.public_api,
            RiskFactor::Dependencies => self.dependencies,
            RiskFactor::TestCoverage => self.test_coverage,
            RiskFactor::Complexity => self.complexity,
            RiskFactor::Recency => self.recency,
            RiskFactor::Scope => self.scope,
        }
    }

    /// Contributions of every factor that crossed a tier, in factor order.
    pub fn breakdown(&self, ctx: &DuplicationContext) -> Vec<RiskContribution> {
        RiskFactor::ALL
            .into_iter()
            .filter_map(|factor| {
                let value = factor.value(ctx);
                let tier = factor.crossed(value)?;
                let weight = self.weight(factor);
                Some(RiskContribution {
                    factor,
                    value,
                    weight,
                    points: tier.points,
                    contribution: weight * tier.points,
                })
            })
            .collect()
    }

    pub fn score(&self, ctx: &DuplicationContext) -> f64 {
        let total: f64 = self.breakdown(ctx).iter().map(|c| c.contribution).sum();
        total.clamp(0.0, MAX_RISK)
    }
}

/// One factor's share of the raw (unclamped) risk total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    pub factor: RiskFactor,
    pub value: f64,
    pub weight: f64,
    pub points: f64,
    pub contribution: f64,
}

pub fn risk_breakdown(ctx: &DuplicationContext) -> Vec<RiskContribution> {
    RiskWeights::STANDARD.breakdown(ctx)
}

/// Additive risk score in 0.0..=100.0 under the standard weights.
pub fn risk_score(ctx: &DuplicationContext) -> f64 {
    RiskWeights::STANDARD.score(ctx)
}
