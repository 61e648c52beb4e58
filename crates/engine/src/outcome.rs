use crate::state::TerminalState;
use serde::{Deserialize, Serialize};
use std::fmt;
use triage_matrix::Decision;
use triage_protocol::ExternalStatus;

/// Action recorded for a finding in the batch result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeAction {
    AutomaticFix,
    GithubIssue,
    Skipped,
    Error,
}

impl OutcomeAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            OutcomeAction::AutomaticFix => "automatic_fix",
            OutcomeAction::GithubIssue => "github_issue",
            OutcomeAction::Skipped => "skipped",
            OutcomeAction::Error => "error",
        }
    }
}

impl fmt::Display for OutcomeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-finding result of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingOutcome {
    pub action: OutcomeAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ExternalStatus>,
    pub finding_id: String,
    /// Collaborator that handled the finding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    /// Skip justification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    /// Raw collaborator response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_detail: Option<serde_json::Value>,
    pub state: TerminalState,
}

impl FindingOutcome {
    pub(crate) fn new(action: OutcomeAction, finding_id: &str, state: TerminalState) -> Self {
        Self {
            action,
            status: None,
            finding_id: finding_id.to_string(),
            agent: None,
            reason: None,
            error: None,
            message: None,
            issue_url: None,
            decision: None,
            result_detail: None,
            state,
        }
    }

    /// Outcome for a finding whose processing failed outside any collaborator.
    pub fn failed(finding_id: &str, error: impl Into<String>) -> Self {
        Self {
            status: Some(ExternalStatus::Error),
            error: Some(error.into()),
            ..Self::new(OutcomeAction::Error, finding_id, TerminalState::Error)
        }
    }

    /// Finding dropped before the decision matrix.
    pub(crate) fn skipped(finding_id: &str, reason: &str, message: String) -> Self {
        Self {
            reason: Some(reason.to_string()),
            message: Some(message),
            ..Self::new(OutcomeAction::Skipped, finding_id, TerminalState::Skipped)
        }
    }

    /// Error actions and failed, errored or timed-out collaborator calls.
    pub fn is_error(&self) -> bool {
        self.action == OutcomeAction::Error
            || matches!(
            self.status,
            Some(ExternalStatus::Error | ExternalStatus::Failure | ExternalStatus::Timeout)
        )
    }

    pub fn is_success(&self) -> bool {
        self.status.is_some_and(ExternalStatus::is_success)
    }
}
