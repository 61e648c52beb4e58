use async_trait::async_trait;
use std::path::PathBuf;
use triage_aggregator::Language;
use triage_protocol::{ExecutorResponse, IssueDraft, IssueResponse};

/// Plan handed to the fix executor for one finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRequest {
    pub finding_id: String,
    pub plan_path: PathBuf,
    pub project_root: PathBuf,
}

/// Applies a refactoring plan. Implementations report failures through the
/// response status rather than an `Err`; the dispatcher enforces the deadline.
#[async_trait]
pub trait FixExecutor: Send + Sync {
    /// Name recorded as the outcome's agent.
    fn agent(&self) -> &str;

    async fn execute(&self, request: &FixRequest) -> ExecutorResponse;
}

/// Files an issue for human review.
#[async_trait]
pub trait IssueReporter: Send + Sync {
    fn agent(&self) -> &str;

    async fn create_issue(&self, finding_id: &str, draft: &IssueDraft) -> IssueResponse;
}

/// All aggregated file pairs of one language, briefed for a single expert.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpertRequest {
    /// Expert agent, e.g. `python-expert`
    pub agent: String,
    pub language: Language,
    pub group_ids: Vec<String>,
    pub average_similarity: f64,
    pub brief_path: PathBuf,
    pub project_root: PathBuf,
}

/// Reviews a language batch. Same error contract as [`FixExecutor`].
#[async_trait]
pub trait ExpertReviewer: Send + Sync {
    async fn review(&self, request: &ExpertRequest) -> ExecutorResponse;
}
