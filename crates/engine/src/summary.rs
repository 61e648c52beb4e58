use crate::expert::{ExpertAction, ExpertReview};
use crate::outcome::{FindingOutcome, OutcomeAction};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use triage_aggregator::AggregatedFinding;

const MANY_DUPLICATES: usize = 20;

/// Tallies over the per-finding outcomes and expert reviews of one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSummary {
    pub expert_reviews: usize,
    pub automatic_fixes: usize,
    pub github_issues: usize,
    pub skipped: usize,
    pub errors: usize,
    pub successes: usize,
    pub agents_used: BTreeSet<String>,
    /// Seconds
    pub total_processing_time: f64,
    pub total_findings: usize,
}

impl ProcessingSummary {
    pub fn from_outcomes(outcomes: &[FindingOutcome], elapsed: Duration) -> Self {
        let mut summary = Self {
            total_processing_time: elapsed.as_secs_f64(),
            total_findings: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            match outcome.action {
                OutcomeAction::AutomaticFix => summary.automatic_fixes += 1,
                OutcomeAction::GithubIssue => summary.github_issues += 1,
                OutcomeAction::Skipped => summary.skipped += 1,
                OutcomeAction::Error => {}
            }
            if outcome.is_error() {
                summary.errors += 1;
            }
            if outcome.is_success() {
                summary.successes += 1;
            }
            if let Some(agent) = outcome.agent.as_deref().filter(|a| !a.is_empty()) {
                summary.agents_used.insert(agent.to_string());
            }
        }
        summary
    }

    /// Adds language-batch reviews; they count toward errors, successes and
    /// agents but not toward `total_findings`.
    pub fn record_expert_reviews(&mut self, reviews: &[ExpertReview]) {
        for review in reviews {
            if review.action == ExpertAction::ExpertReview {
                self.expert_reviews += 1;
            }
            if review.is_error() {
                self.errors += 1;
            }
            if review.is_success() {
                self.successes += 1;
            }
            self.agents_used.insert(review.agent.clone());
        }
    }
}

/// Shape of the input after aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputAnalysis {
    pub total_file_pairs: usize,
    pub total_duplicates: usize,
    pub severity_breakdown: BTreeMap<String, usize>,
    pub avg_duplicates_per_pair: f64,
}

impl InputAnalysis {
    pub fn from_groups(groups: &[AggregatedFinding]) -> Self {
        let total_duplicates: usize = groups.iter().map(|g| g.duplicate_count).sum();
        let mut severity_breakdown = BTreeMap::new();
        for group in groups {
            *severity_breakdown.entry(group.severity.clone()).or_insert(0) += 1;
        }
        let avg_duplicates_per_pair = if groups.is_empty() {
            0.0
        } else {
            total_duplicates as f64 / groups.len() as f64
        };
        Self {
            total_file_pairs: groups.len(),
            total_duplicates,
            severity_breakdown,
            avg_duplicates_per_pair,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub input_analysis: InputAnalysis,
    pub processing_results: ProcessingSummary,
    pub recommendations: Vec<String>,
}

impl FindingsSummary {
    pub fn new(
        groups: &[AggregatedFinding],
        outcomes: &[FindingOutcome],
        reviews: &[ExpertReview],
        elapsed: Duration,
    ) -> Self {
        let mut processing_results = ProcessingSummary::from_outcomes(outcomes, elapsed);
        processing_results.record_expert_reviews(reviews);
        Self {
            input_analysis: InputAnalysis::from_groups(groups),
            processing_results,
            recommendations: recommendations(groups, outcomes),
        }
    }

    /// Summary of a batch whose input could not be read.
    pub fn input_error(elapsed: Duration) -> Self {
        let mut summary = Self::new(&[], &[], &[], elapsed);
        summary.processing_results.errors = 1;
        summary
    }
}

pub fn recommendations(groups: &[AggregatedFinding], outcomes: &[FindingOutcome]) -> Vec<String> {
    if groups.is_empty() {
        return vec!["No duplicate code detected. Keep up the good work!".to_string()];
    }

    let mut out = Vec::new();
    let high = groups.iter().filter(|g| g.is_high_severity()).count();
    if high > 0 {
        out.push(format!(
            "{high} high-severity duplicate patterns detected. \
             Consider prioritizing these for immediate refactoring."
        ));
    }

    let total: usize = groups.iter().map(|g| g.duplicate_count).sum();
    if total > MANY_DUPLICATES {
        out.push(format!(
            "{total} total duplicates found. \
             Consider implementing shared utility modules to reduce code duplication."
        ));
    }

    let fixed = outcomes
        .iter()
        .filter(|o| o.action == OutcomeAction::AutomaticFix && o.is_success())
        .count();
    if fixed > 0 {
        out.push(format!("{fixed} automatic fixes were applied successfully."));
    }

    let issues = outcomes
        .iter()
        .filter(|o| o.action == OutcomeAction::GithubIssue)
        .count();
    if issues > 0 {
        out.push(format!(
            "{issues} items require manual review via GitHub issues."
        ));
    }
    out
}
