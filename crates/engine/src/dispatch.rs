use crate::collaborator::{ExpertRequest, ExpertReviewer, FixExecutor, FixRequest, IssueReporter};
use crate::config::TriageConfig;
use crate::error::{EngineError, Result};
use crate::expert::{batches_by_language, expert_brief, ExpertAction, ExpertReview};
use crate::issue::issue_draft;
use crate::outcome::{FindingOutcome, OutcomeAction};
use crate::plan::{implementation_plan, write_markdown, write_plan};
use crate::process::{CommandExpertReviewer, CommandFixExecutor, GhIssueReporter};
use crate::simulated::{SimulatedExpertReviewer, SimulatedFixExecutor, SimulatedIssueReporter};
use crate::state::{FindingState, Lifecycle, TerminalState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use triage_aggregator::{AggregatedFinding, Language};
use triage_matrix::{
    Action, ContextDefaults, ContextOptions, Decision, DecisionMatrix, DuplicationContext,
};
use triage_protocol::{ExecutorResponse, ExternalStatus, IssueResponse, RawFinding};

/// Routes each finding to the fix executor, the issue reporter or a skip, and
/// aggregated file pairs to language experts.
///
/// Holds only shared, read-only state; clone the surrounding `Arc` to use it
/// from several workers.
pub struct DecisionEngine {
    matrix: DecisionMatrix,
    defaults: ContextDefaults,
    executor: Arc<dyn FixExecutor>,
    reporter: Arc<dyn IssueReporter>,
    expert: Arc<dyn ExpertReviewer>,
    project_root: PathBuf,
    fix_timeout: Duration,
    issue_timeout: Duration,
    expert_timeout: Duration,
    labels: Vec<String>,
    plan_dir: Option<PathBuf>,
}

impl DecisionEngine {
    pub fn new(
        executor: Arc<dyn FixExecutor>,
        reporter: Arc<dyn IssueReporter>,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        let config = TriageConfig::default();
        Self {
            matrix: DecisionMatrix::STANDARD,
            defaults: config.context_defaults,
            executor,
            reporter,
            expert: Arc::new(CommandExpertReviewer::new(&config.expert)),
            project_root: project_root.into(),
            fix_timeout: config.executor.timeout(),
            issue_timeout: config.reporter.timeout(),
            expert_timeout: config.expert.timeout(),
            labels: config.reporter.labels,
            plan_dir: None,
        }
    }

    /// Process-backed collaborators, or simulated ones in test mode.
    pub fn from_config(config: &TriageConfig, project_root: &Path) -> Self {
        let (executor, reporter, expert): (
            Arc<dyn FixExecutor>,
            Arc<dyn IssueReporter>,
            Arc<dyn ExpertReviewer>,
        ) = if config.engine.test_mode {
            log::info!("Test mode: external collaborators are simulated");
            (
                Arc::new(SimulatedFixExecutor::new()),
                Arc::new(SimulatedIssueReporter::new()),
                Arc::new(SimulatedExpertReviewer::new()),
            )
        } else {
            (
                Arc::new(CommandFixExecutor::new(&config.executor)),
                Arc::new(GhIssueReporter::new(&config.reporter, project_root)),
                Arc::new(CommandExpertReviewer::new(&config.expert)),
            )
        };

        Self::new(executor, reporter, project_root)
            .with_expert(expert, config.expert.timeout())
            .with_defaults(config.context_defaults.clone())
            .with_timeouts(config.executor.timeout(), config.reporter.timeout())
            .with_labels(config.reporter.labels.clone())
    }

    pub fn with_expert(mut self, expert: Arc<dyn ExpertReviewer>, deadline: Duration) -> Self {
        self.expert = expert;
        self.expert_timeout = deadline;
        self
    }

    pub fn with_defaults(mut self, defaults: ContextDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_matrix(mut self, matrix: DecisionMatrix) -> Self {
        self.matrix = matrix;
        self
    }

    pub fn with_timeouts(mut self, fix: Duration, issue: Duration) -> Self {
        self.fix_timeout = fix;
        self.issue_timeout = issue;
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Directory for plan files; the system temp dir when unset.
    pub fn with_plan_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plan_dir = Some(dir.into());
        self
    }

    pub fn context_for(&self, finding: &RawFinding) -> DuplicationContext {
        ContextOptions::from_evidence(&finding.evidence).resolve(&self.defaults)
    }

    /// Decision without any collaborator call.
    pub fn decide(&self, finding: &RawFinding) -> Decision {
        self.matrix.evaluate(&self.context_for(finding))
    }

    /// Never fails: every error is folded into the returned outcome.
    pub async fn process_single_finding(
        &self,
        finding: &RawFinding,
        group: Option<&AggregatedFinding>,
    ) -> FindingOutcome {
        match self.try_process(finding, group).await {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("Failed to process {}: {err}", finding.finding_id);
                FindingOutcome::failed(&finding.finding_id, err.to_string())
            }
        }
    }

    async fn try_process(
        &self,
        finding: &RawFinding,
        group: Option<&AggregatedFinding>,
    ) -> Result<FindingOutcome> {
        let id = finding.finding_id.as_str();
        let mut lifecycle = Lifecycle::new(id);
        if group.is_some() {
            lifecycle.advance(FindingState::Aggregated)?;
        }

        let ctx = self.context_for(finding);
        lifecycle.advance(FindingState::Contextualized)?;

        let decision = self.matrix.evaluate(&ctx);
        lifecycle.advance(FindingState::Decided(decision.action))?;
        log::debug!(
            "{id}: {} (risk {:.1}, confidence {}) {}",
            decision.action,
            decision.risk_score,
            decision.confidence,
            decision.justification
        );

        match decision.action {
            Action::Skip => {
                let state = lifecycle.finish(TerminalState::Skipped)?;
                Ok(FindingOutcome {
                    reason: Some(decision.justification.clone()),
                    decision: Some(decision),
                    ..FindingOutcome::new(OutcomeAction::Skipped, id, state)
                })
            }
            Action::AutomaticFix => self.automatic_fix(finding, &ctx, decision, lifecycle).await,
            Action::HumanReview => {
                self.human_review(finding, &ctx, decision, group, lifecycle)
                    .await
            }
        }
    }

    async fn automatic_fix(
        &self,
        finding: &RawFinding,
        ctx: &DuplicationContext,
        decision: Decision,
        mut lifecycle: Lifecycle,
    ) -> Result<FindingOutcome> {
        let id = finding.finding_id.as_str();
        let plan = implementation_plan(finding, ctx, &decision);
        let plan_file = match write_plan(&plan, self.plan_dir.as_deref()) {
            Ok(file) => file,
            Err(err) => {
                log::warn!("{id}: could not write plan: {err}");
                let state = lifecycle.finish(TerminalState::Error)?;
                return Ok(FindingOutcome {
                    status: Some(ExternalStatus::Error),
                    error: Some(err.to_string()),
                    decision: Some(decision),
                    ..FindingOutcome::new(OutcomeAction::AutomaticFix, id, state)
                });
            }
        };

        lifecycle.advance(FindingState::Executing)?;
        let request = FixRequest {
            finding_id: id.to_string(),
            plan_path: plan_file.path().to_path_buf(),
            project_root: self.project_root.clone(),
        };
        log::info!(
            "Executing automatic fix for {}",
            finding.title_or("duplicate")
        );

        let response = match timeout(self.fix_timeout, self.executor.execute(&request)).await {
            Ok(response) => response,
            Err(_) => ExecutorResponse {
                status: ExternalStatus::Timeout,
                stdout: None,
                stderr: None,
                returncode: None,
                error: None,
                message: format!(
                    "{} timed out after {}",
                    self.executor.agent(),
                    human_duration(self.fix_timeout)
                ),
            },
        };
        drop(plan_file);

        let terminal = match response.status {
            status if status.is_success() => TerminalState::AutoFixSucceeded,
            ExternalStatus::Timeout => TerminalState::AutoFixTimedOut,
            _ => TerminalState::AutoFixFailed,
        };
        if terminal != TerminalState::AutoFixSucceeded {
            log::warn!("{id}: automatic fix {}: {}", response.status.as_str(), response.message);
        }
        let state = lifecycle.finish(terminal)?;

        Ok(FindingOutcome {
            status: Some(response.status),
            agent: Some(self.executor.agent().to_string()),
            error: response.error.clone(),
            message: Some(response.message.clone()),
            decision: Some(decision),
            result_detail: Some(serde_json::to_value(&response).map_err(EngineError::from)?),
            ..FindingOutcome::new(OutcomeAction::AutomaticFix, id, state)
        })
    }

    async fn human_review(
        &self,
        finding: &RawFinding,
        ctx: &DuplicationContext,
        decision: Decision,
        group: Option<&AggregatedFinding>,
        mut lifecycle: Lifecycle,
    ) -> Result<FindingOutcome> {
        let id = finding.finding_id.as_str();
        let draft = issue_draft(finding, ctx, &decision, group, &self.labels);

        let response =
            match timeout(self.issue_timeout, self.reporter.create_issue(id, &draft)).await {
                Ok(response) => response,
                Err(_) => IssueResponse {
                    status: ExternalStatus::Timeout,
                    issue_url: None,
                    returncode: None,
                    stderr: None,
                    error: None,
                    message: format!(
                        "{} timed out after {}",
                        self.reporter.agent(),
                        human_duration(self.issue_timeout)
                    ),
                },
            };

        let terminal = if response.status.is_success() {
            TerminalState::IssueCreated
        } else {
            log::warn!("{id}: issue creation {}: {}", response.status.as_str(), response.message);
            TerminalState::IssueCreationFailed
        };
        let state = lifecycle.finish(terminal)?;
        log::trace!("{id}: finished in state {:?}", lifecycle.state());

        Ok(FindingOutcome {
            status: Some(response.status),
            agent: Some(self.reporter.agent().to_string()),
            error: response.error.clone(),
            message: Some(response.message.clone()),
            issue_url: response.issue_url.clone(),
            decision: Some(decision),
            result_detail: Some(serde_json::to_value(&response).map_err(EngineError::from)?),
            ..FindingOutcome::new(OutcomeAction::GithubIssue, id, state)
        })
    }
}

impl DecisionEngine {
    /// One expert call per file-pair language. Never fails: errors are folded
    /// into the returned reviews.
    pub async fn review_groups(&self, groups: &[AggregatedFinding]) -> Vec<ExpertReview> {
        let mut reviews = Vec::new();
        for (language, batch) in batches_by_language(groups) {
            reviews.push(self.review_batch(language, &batch).await);
        }
        reviews
    }

    async fn review_batch(&self, language: Language, batch: &[&AggregatedFinding]) -> ExpertReview {
        let agent = language.expert();
        let brief = expert_brief(language, batch);
        let brief_file = match write_markdown("dupe-brief-", &brief, self.plan_dir.as_deref()) {
            Ok(file) => file,
            Err(err) => {
                log::warn!("Expert batch review failed for {language}: {err}");
                return ExpertReview {
                    action: ExpertAction::ExpertReviewError,
                    error: Some(err.to_string()),
                    ..ExpertReview::for_batch(
                        language,
                        batch,
                        ExternalStatus::Error,
                        format!("Expert batch review failed for {language}: {err}"),
                    )
                };
            }
        };

        let average_similarity = if batch.is_empty() {
            0.0
        } else {
            batch.iter().map(|g| g.average_similarity).sum::<f64>() / batch.len() as f64
        };
        let request = ExpertRequest {
            agent: agent.to_string(),
            language,
            group_ids: batch.iter().map(|g| g.finding_id.clone()).collect(),
            average_similarity,
            brief_path: brief_file.path().to_path_buf(),
            project_root: self.project_root.clone(),
        };
        log::info!(
            "Passing {} file pair(s) to {agent} for {language} review",
            batch.len()
        );

        let response = match timeout(self.expert_timeout, self.expert.review(&request)).await {
            Ok(response) => response,
            Err(_) => ExecutorResponse {
                status: ExternalStatus::Timeout,
                stdout: None,
                stderr: None,
                returncode: None,
                error: None,
                message: format!(
                    "{agent} timed out after {}",
                    human_duration(self.expert_timeout)
                ),
            },
        };
        drop(brief_file);
        if !response.status.is_success() {
            log::warn!("{agent} review {}: {}", response.status.as_str(), response.message);
        }

        ExpertReview {
            error: response.error.clone(),
            result_detail: serde_json::to_value(&response).ok(),
            ..ExpertReview::for_batch(language, batch, response.status, response.message.clone())
        }
    }
}

fn human_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        format!("{minutes} minute{}", if minutes == 1 { "" } else { "s" })
    } else if secs > 0 {
        format!("{secs}s")
    } else {
        format!("{}ms", duration.as_millis())
    }
}
