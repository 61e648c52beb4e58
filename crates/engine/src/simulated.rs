use crate::collaborator::{ExpertRequest, ExpertReviewer, FixExecutor, FixRequest, IssueReporter};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use triage_protocol::{ExecutorResponse, ExternalStatus, IssueDraft, IssueResponse};

pub const SIMULATED_AGENT: &str = "simulated";
pub const SIMULATED_ISSUE_URL: &str = "https://github.com/test/repo/issues/123";

const CONFIDENT_SIMILARITY: f64 = 0.8;

/// Scripted behaviour for one finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Return this status immediately
    Status(ExternalStatus),
    /// Never answer within any sane deadline
    Hang,
}

/// Deterministic fix executor for test mode. Succeeds unless a finding has a
/// scripted behaviour.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFixExecutor {
    script: HashMap<String, Scripted>,
}

impl SimulatedFixExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, finding_id: impl Into<String>, behaviour: Scripted) -> Self {
        self.script.insert(finding_id.into(), behaviour);
        self
    }
}

#[async_trait]
impl FixExecutor for SimulatedFixExecutor {
    fn agent(&self) -> &str {
        SIMULATED_AGENT
    }

    async fn execute(&self, request: &FixRequest) -> ExecutorResponse {
        let status = match self.script.get(&request.finding_id) {
            None => ExternalStatus::SimulatedSuccess,
            Some(Scripted::Status(status)) => *status,
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                ExternalStatus::Timeout
            }
        };

        match status {
            ExternalStatus::SimulatedSuccess => ExecutorResponse {
                status,
                stdout: Some("Simulated todo-orchestrate execution completed".to_string()),
                stderr: None,
                returncode: Some(0),
                error: None,
                message: "Simulated todo-orchestrate completed successfully".to_string(),
            },
            ExternalStatus::Error => ExecutorResponse {
                status,
                stdout: None,
                stderr: None,
                returncode: None,
                error: Some("simulated executor error".to_string()),
                message: "Simulated todo-orchestrate error".to_string(),
            },
            other => ExecutorResponse {
                status: other,
                stdout: None,
                stderr: None,
                returncode: (other == ExternalStatus::Failure).then_some(1),
                error: None,
                message: format!("Simulated todo-orchestrate {}", other.as_str()),
            },
        }
    }
}

/// Deterministic issue reporter for test mode.
#[derive(Debug, Clone, Default)]
pub struct SimulatedIssueReporter {
    script: HashMap<String, Scripted>,
}

impl SimulatedIssueReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, finding_id: impl Into<String>, behaviour: Scripted) -> Self {
        self.script.insert(finding_id.into(), behaviour);
        self
    }
}

#[async_trait]
impl IssueReporter for SimulatedIssueReporter {
    fn agent(&self) -> &str {
        SIMULATED_AGENT
    }

    async fn create_issue(&self, finding_id: &str, _draft: &IssueDraft) -> IssueResponse {
        let status = match self.script.get(finding_id) {
            None => ExternalStatus::SimulatedSuccess,
            Some(Scripted::Status(status)) => *status,
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                ExternalStatus::Timeout
            }
        };

        if status.is_success() {
            return IssueResponse {
                status,
                issue_url: Some(SIMULATED_ISSUE_URL.to_string()),
                returncode: None,
                stderr: None,
                error: None,
                message: "Simulated GitHub issue creation completed".to_string(),
            };
        }
        IssueResponse {
            status,
            issue_url: None,
            returncode: (status == ExternalStatus::Failure).then_some(1),
            stderr: None,
            error: (status == ExternalStatus::Error)
                .then(|| "simulated reporter error".to_string()),
            message: format!("Simulated GitHub issue {}", status.as_str()),
        }
    }
}

/// Deterministic expert reviewer for test mode. Scripts are keyed by expert
/// agent name.
#[derive(Debug, Clone, Default)]
pub struct SimulatedExpertReviewer {
    script: HashMap<String, Scripted>,
}

impl SimulatedExpertReviewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, agent: impl Into<String>, behaviour: Scripted) -> Self {
        self.script.insert(agent.into(), behaviour);
        self
    }
}

#[async_trait]
impl ExpertReviewer for SimulatedExpertReviewer {
    async fn review(&self, request: &ExpertRequest) -> ExecutorResponse {
        let agent = request.agent.as_str();
        let status = match self.script.get(agent) {
            None => ExternalStatus::SimulatedSuccess,
            Some(Scripted::Status(status)) => *status,
            Some(Scripted::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                ExternalStatus::Timeout
            }
        };

        if status.is_success() {
            let recommendation = if request.average_similarity > CONFIDENT_SIMILARITY {
                "Proceed with automatic refactoring"
            } else {
                "Escalate to human review"
            };
            return ExecutorResponse {
                status,
                stdout: Some(recommendation.to_string()),
                stderr: None,
                returncode: Some(0),
                error: None,
                message: format!("Simulated {agent} review completed"),
            };
        }
        ExecutorResponse {
            status,
            stdout: None,
            stderr: None,
            returncode: (status == ExternalStatus::Failure).then_some(1),
            error: (status == ExternalStatus::Error).then(|| "simulated expert error".to_string()),
            message: format!("Simulated {agent} review {}", status.as_str()),
        }
    }
}
