use crate::error::{MatrixError, Result};
use crate::types::DuplicationContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use triage_protocol::Evidence;

/// Values substituted for evidence fields the detector did not report.
///
/// The stock table is optimistic (good coverage, low complexity, private,
/// old code), so sparse evidence leans towards automatic fixes. Pipelines
/// that want a conservative stance override it in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextDefaults {
    pub similarity_score: f64,
    pub file_count: u32,
    pub total_line_count: u32,
    pub symbol_types: Vec<String>,
    pub cross_module_impact: bool,
    pub test_coverage_percentage: f64,
    pub cyclomatic_complexity: u32,
    pub dependency_count: u32,
    pub is_public_api: bool,
    pub has_documentation: bool,
    pub last_modified_days_ago: u32,
}

impl Default for ContextDefaults {
    fn default() -> Self {
        Self {
            similarity_score: 0.0,
            file_count: 2,
            total_line_count: 50,
            symbol_types: vec!["function".to_string()],
            cross_module_impact: false,
            test_coverage_percentage: 85.0,
            cyclomatic_complexity: 3,
            dependency_count: 1,
            is_public_api: false,
            has_documentation: true,
            last_modified_days_ago: 60,
        }
    }
}

impl ContextDefaults {
    pub fn validate(&self) -> Result<()> {
        self.apply(ContextOptions::default()).validate()
    }

    fn apply(&self, options: ContextOptions) -> DuplicationContext {
        let symbol_types = options
            .symbol_types
            .filter(|types| !types.is_empty())
            .unwrap_or_else(|| self.symbol_types.clone());

        DuplicationContext {
            similarity_score: options.similarity_score.unwrap_or(self.similarity_score),
            file_count: options.file_count.unwrap_or(self.file_count),
            total_line_count: options.total_line_count.unwrap_or(self.total_line_count),
            symbol_types: normalize_symbol_types(symbol_types),
            cross_module_impact: options
                .cross_module_impact
                .unwrap_or(self.cross_module_impact),
            test_coverage_percentage: options
                .test_coverage_percentage
                .unwrap_or(self.test_coverage_percentage),
            cyclomatic_complexity: options
                .cyclomatic_complexity
                .unwrap_or(self.cyclomatic_complexity),
            dependency_count: options.dependency_count.unwrap_or(self.dependency_count),
            is_public_api: options.is_public_api.unwrap_or(self.is_public_api),
            has_documentation: options.has_documentation.unwrap_or(self.has_documentation),
            last_modified_days_ago: options
                .last_modified_days_ago
                .unwrap_or(self.last_modified_days_ago),
        }
    }
}

fn normalize_symbol_types(types: Vec<String>) -> BTreeSet<String> {
    types
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Builder for [`DuplicationContext`]: every field is named and optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextOptions {
    similarity_score: Option<f64>,
    file_count: Option<u32>,
    total_line_count: Option<u32>,
    symbol_types: Option<Vec<String>>,
    cross_module_impact: Option<bool>,
    test_coverage_percentage: Option<f64>,
    cyclomatic_complexity: Option<u32>,
    dependency_count: Option<u32>,
    is_public_api: Option<bool>,
    has_documentation: Option<bool>,
    last_modified_days_ago: Option<u32>,
}

impl ContextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_evidence(evidence: &Evidence) -> Self {
        Self {
            similarity_score: evidence.similarity_score,
            file_count: evidence.file_count,
            total_line_count: evidence.total_lines,
            symbol_types: evidence.symbol_types.clone(),
            cross_module_impact: evidence.cross_module,
            test_coverage_percentage: evidence.test_coverage,
            cyclomatic_complexity: evidence.complexity,
            dependency_count: evidence.dependencies,
            is_public_api: evidence.is_public,
            has_documentation: evidence.documented,
            last_modified_days_ago: evidence.last_modified_days,
        }
    }

    pub fn similarity_score(mut self, value: f64) -> Self {
        self.similarity_score = Some(value);
        self
    }

    pub fn file_count(mut self, value: u32) -> Self {
        self.file_count = Some(value);
        self
    }

    pub fn total_line_count(mut self, value: u32) -> Self {
        self.total_line_count = Some(value);
        self
    }

    pub fn symbol_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbol_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn cross_module_impact(mut self, value: bool) -> Self {
        self.cross_module_impact = Some(value);
        self
    }

    pub fn test_coverage_percentage(mut self, value: f64) -> Self {
        self.test_coverage_percentage = Some(value);
        self
    }

    pub fn cyclomatic_complexity(mut self, value: u32) -> Self {
        self.cyclomatic_complexity = Some(value);
        self
    }

    pub fn dependency_count(mut self, value: u32) -> Self {
        self.dependency_count = Some(value);
        self
    }

    pub fn is_public_api(mut self, value: bool) -> Self {
        self.is_public_api = Some(value);
        self
    }

    pub fn has_documentation(mut self, value: bool) -> Self {
        self.has_documentation = Some(value);
        self
    }

    pub fn last_modified_days_ago(mut self, value: u32) -> Self {
        self.last_modified_days_ago = Some(value);
        self
    }

    /// Strict resolution: out-of-range values are rejected.
    pub fn build(self, defaults: &ContextDefaults) -> Result<DuplicationContext> {
        let context = defaults.apply(self);
        context.validate()?;
        Ok(context)
    }

    /// Lenient resolution used for detector evidence: out-of-range values are
    /// clamped into their domain instead of failing the finding.
    pub fn resolve(self, defaults: &ContextDefaults) -> DuplicationContext {
        let mut context = defaults.apply(self);

        let similarity = if context.similarity_score.is_nan() {
            0.0
        } else {
            context.similarity_score.clamp(0.0, 1.0)
        };
        if similarity != context.similarity_score {
            log::debug!(
                "Clamped similarity_score {} to {similarity}",
                context.similarity_score
            );
            context.similarity_score = similarity;
        }

        let coverage = if context.test_coverage_percentage.is_nan() {
            0.0
        } else {
            context.test_coverage_percentage.clamp(0.0, 100.0)
        };
        if coverage != context.test_coverage_percentage {
            log::debug!(
                "Clamped test_coverage_percentage {} to {coverage}",
                context.test_coverage_percentage
            );
            context.test_coverage_percentage = coverage;
        }

        if context.file_count < 2 {
            log::debug!("Raised file_count {} to 2", context.file_count);
            context.file_count = 2;
        }

        context
    }
}

impl TryFrom<ContextOptions> for DuplicationContext {
    type Error = MatrixError;

    fn try_from(options: ContextOptions) -> Result<Self> {
        options.build(&ContextDefaults::default())
    }
}
