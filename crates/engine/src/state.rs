use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use triage_matrix::Action;

/// Final state of a dispatched finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Skipped,
    AutoFixSucceeded,
    AutoFixFailed,
    AutoFixTimedOut,
    IssueCreated,
    IssueCreationFailed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingState {
    New,
    Aggregated,
    Contextualized,
    Decided(Action),
    Executing,
    Done(TerminalState),
}

impl FindingState {
    pub const fn name(self) -> &'static str {
        match self {
            FindingState::New => "new",
            FindingState::Aggregated => "aggregated",
            FindingState::Contextualized => "contextualized",
            FindingState::Decided(Action::Skip) => "decided_skip",
            FindingState::Decided(Action::AutomaticFix) => "decided_auto_fix",
            FindingState::Decided(Action::HumanReview) => "decided_human_review",
            FindingState::Executing => "executing",
            FindingState::Done(TerminalState::Skipped) => "skipped",
            FindingState::Done(TerminalState::AutoFixSucceeded) => "auto_fix_succeeded",
            FindingState::Done(TerminalState::AutoFixFailed) => "auto_fix_failed",
            FindingState::Done(TerminalState::AutoFixTimedOut) => "auto_fix_timed_out",
            FindingState::Done(TerminalState::IssueCreated) => "issue_created",
            FindingState::Done(TerminalState::IssueCreationFailed) => "issue_creation_failed",
            FindingState::Done(TerminalState::Error) => "error",
        }
    }

    pub fn can_transition_to(self, next: FindingState) -> bool {
        use FindingState::*;
        match (self, next) {
            (Done(_), _) => false,
            // Any live state may fail
            (_, Done(TerminalState::Error)) => true,
            (New, Aggregated | Contextualized) => true,
            (Aggregated, Contextualized) => true,
            (Contextualized, Decided(_)) => true,
            (Decided(Action::Skip), Done(TerminalState::Skipped)) => true,
            (Decided(Action::AutomaticFix), Executing) => true,
            (
                Executing,
                Done(
                    TerminalState::AutoFixSucceeded
                    | TerminalState::AutoFixFailed
                    | TerminalState::AutoFixTimedOut,
                ),
            ) => true,
            (
                Decided(Action::HumanReview),
                Done(TerminalState::IssueCreated | TerminalState::IssueCreationFailed),
            ) => true,
            _ => false,
        }
    }
}

/// Walks one finding through its lifecycle, rejecting illegal jumps.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    finding_id: String,
    state: FindingState,
}

impl Lifecycle {
    pub(crate) fn new(finding_id: &str) -> Self {
        Self {
            finding_id: finding_id.to_string(),
            state: FindingState::New,
        }
    }

    pub(crate) fn state(&self) -> FindingState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: FindingState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                finding_id: self.finding_id.clone(),
                from: self.state.name(),
                to: next.name(),
            });
        }
        log::trace!(
            "{}: {} -> {}",
            self.finding_id,
            self.state.name(),
            next.name()
        );
        self.state = next;
        Ok(())
    }

    pub(crate) fn finish(&mut self, terminal: TerminalState) -> Result<TerminalState> {
        self.advance(FindingState::Done(terminal))?;
        Ok(terminal)
    }
}
