use crate::config::{TriageConfig, MAX_CONCURRENCY};
use crate::dispatch::DecisionEngine;
use crate::error::Result;
use crate::expert::ExpertReview;
use crate::outcome::FindingOutcome;
use crate::pool::dispatch_all;
use crate::report::AnalysisReport;
use crate::summary::FindingsSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use triage_aggregator::{aggregate, AggregatedFinding, MeaningfulFilter};
use triage_protocol::{FindingRecord, RawFinding};

const EXCLUDED_REASON: &str = "excluded_path";
const NO_DUPLICATES: &str = "no_duplicates_found";
const INPUT_ERROR: &str = "input_error";

/// Where the batch report goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportTarget {
    /// `reports_dir` from the configuration, stamped plus latest
    #[default]
    Default,
    Path(PathBuf),
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Success,
    Error,
}

impl BatchStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Success => "success",
            BatchStatus::Error => "error",
        }
    }
}

/// Everything the `process` command prints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Input records, each with exactly one entry in `results`
    pub findings_processed: usize,
    /// Dropped by path exclusions or the meaningful-duplicate filter
    pub filtered_out: usize,
    /// Records that were not readable findings
    pub rejected: usize,
    pub aggregated: Vec<AggregatedFinding>,
    pub results: Vec<FindingOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expert_reviews: Vec<ExpertReview>,
    pub summary: FindingsSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl BatchResult {
    /// Batch whose input could not be read at all.
    pub fn failed(error: impl Into<String>, summary: FindingsSummary) -> Self {
        Self {
            status: BatchStatus::Error,
            action: Some(INPUT_ERROR.to_string()),
            error: Some(error.into()),
            findings_processed: 0,
            filtered_out: 0,
            rejected: 0,
            aggregated: Vec::new(),
            results: Vec::new(),
            expert_reviews: Vec::new(),
            summary,
            report_path: None,
        }
    }
}

/// Exclusions, filter, aggregation, dispatch, expert review, summary and
/// report for one batch.
pub struct TriagePipeline {
    config: TriageConfig,
    project_root: PathBuf,
    engine: Arc<DecisionEngine>,
    filter: MeaningfulFilter,
    concurrency: usize,
    report: ReportTarget,
}

impl TriagePipeline {
    pub fn new(config: TriageConfig, project_root: &Path) -> Result<Self> {
        let engine = DecisionEngine::from_config(&config, project_root);
        Self::with_engine(config, project_root, engine)
    }

    /// Uses a prepared engine, e.g. one wired to custom collaborators.
    pub fn with_engine(
        config: TriageConfig,
        project_root: &Path,
        engine: DecisionEngine,
    ) -> Result<Self> {
        config.validate()?;
        let filter = MeaningfulFilter::new(&config.filter)?;
        let concurrency = config.engine.effective_concurrency();
        Ok(Self {
            config,
            project_root: project_root.to_path_buf(),
            engine: Arc::new(engine),
            filter,
            concurrency,
            report: ReportTarget::Default,
        })
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_CONCURRENCY);
        self
    }

    pub fn report_target(mut self, target: ReportTarget) -> Self {
        self.report = target;
        self
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub async fn run(&self, findings: Vec<RawFinding>) -> BatchResult {
        self.run_records(findings.into_iter().map(Ok).collect()).await
    }

    /// Runs a batch as parsed record by record. Every record yields exactly
    /// one result, in input order: unreadable records become errors, excluded
    /// and filtered findings become skips.
    pub async fn run_records(&self, records: Vec<FindingRecord>) -> BatchResult {
        let started = Instant::now();
        let received = records.len();

        let mut slots: Vec<Option<FindingOutcome>> = Vec::with_capacity(received);
        let mut kept = Vec::new();
        let mut kept_at = Vec::new();
        let mut rejected = 0usize;
        let mut filtered_out = 0usize;

        for (idx, record) in records.into_iter().enumerate() {
            let outcome = match record {
                Err(bad) => {
                    log::warn!("Rejected {}: {}", bad.finding_id, bad.error);
                    rejected += 1;
                    Some(FindingOutcome::failed(&bad.finding_id, bad.error))
                }
                Ok(finding) => match self.drop_reason(&finding) {
                    Some(outcome) => {
                        filtered_out += 1;
                        Some(outcome)
                    }
                    None => {
                        kept_at.push(idx);
                        kept.push(finding);
                        None
                    }
                },
            };
            slots.push(outcome);
        }
        log::info!(
            "{} of {received} finding(s) kept after filtering",
            kept.len()
        );

        let action = kept.is_empty().then_some(NO_DUPLICATES);
        let groups = aggregate(&kept);
        if !kept.is_empty() {
            log::info!(
                "Aggregated {} finding(s) into {} file pair(s)",
                kept.len(),
                groups.len()
            );
            let dispatched =
                dispatch_all(Arc::clone(&self.engine), kept, &groups, self.concurrency).await;
            for (idx, outcome) in kept_at.into_iter().zip(dispatched) {
                slots[idx] = Some(outcome);
            }
        }
        let results: Vec<FindingOutcome> = slots.into_iter().flatten().collect();

        let expert_reviews = if self.config.expert.enabled && !groups.is_empty() {
            self.engine.review_groups(&groups).await
        } else {
            Vec::new()
        };

        let summary = FindingsSummary::new(&groups, &results, &expert_reviews, started.elapsed());
        let processing = &summary.processing_results;
        log::info!(
            "Processed {} finding(s): {} fixes, {} issues, {} skipped, {} errors",
            processing.total_findings,
            processing.automatic_fixes,
            processing.github_issues,
            processing.skipped,
            processing.errors
        );

        let now = Utc::now();
        let report = self
            .report(now, BatchStatus::Success, action, results.clone(), summary.clone())
            .with_expert_reviews(expert_reviews.clone());
        let report_path = self.persist(&report, now);
        BatchResult {
            status: BatchStatus::Success,
            action: action.map(str::to_string),
            error: None,
            findings_processed: results.len(),
            filtered_out,
            rejected,
            aggregated: groups,
            results,
            expert_reviews,
            summary,
            report_path,
        }
    }

    /// Batch for input that could not be read at all. The error report is
    /// still persisted.
    pub fn input_error(&self, error: impl Into<String>) -> BatchResult {
        let error = error.into();
        let summary = FindingsSummary::input_error(Duration::ZERO);
        let now = Utc::now();
        let report = self
            .report(now, BatchStatus::Error, Some(INPUT_ERROR), Vec::new(), summary.clone())
            .with_error(error.clone());
        BatchResult {
            report_path: self.persist(&report, now),
            ..BatchResult::failed(error, summary)
        }
    }

    /// Skip outcome for a finding dropped by path exclusion or the filter.
    fn drop_reason(&self, finding: &RawFinding) -> Option<FindingOutcome> {
        let id = finding.finding_id.as_str();
        if let Some(file) = self.config.exclusions.excluded_file(finding) {
            log::debug!("Excluded {id}: {file}");
            return Some(FindingOutcome::skipped(
                id,
                EXCLUDED_REASON,
                format!("Excluded by path filter: {file}"),
            ));
        }
        let reason = self.filter.drop_reason(finding)?;
        log::debug!("Filtered {id}: {reason}");
        Some(FindingOutcome::skipped(
            id,
            reason.as_str(),
            format!("Not a meaningful duplicate: {reason}"),
        ))
    }

    fn report(
        &self,
        now: DateTime<Utc>,
        status: BatchStatus,
        action: Option<&str>,
        findings: Vec<FindingOutcome>,
        summary: FindingsSummary,
    ) -> AnalysisReport {
        AnalysisReport::new(
            now,
            status.as_str(),
            action,
            findings,
            summary,
            &self.config,
            &self.project_root,
        )
    }

    fn persist(&self, report: &AnalysisReport, now: DateTime<Utc>) -> Option<PathBuf> {
        let saved = match &self.report {
            ReportTarget::Disabled => return None,
            ReportTarget::Path(path) => report.save_to_path(path),
            ReportTarget::Default => report.save_to_dir(
                &self.config.engine.reports_dir_in(&self.project_root),
                now,
            ),
        };
        match saved {
            Ok(path) => Some(path),
            Err(err) => {
                log::warn!("Failed to save report: {err}");
                None
            }
        }
    }
}
