//! Dispatch side of duplicate triage: routes each finding to the fix
//! executor, the issue reporter or a skip, optionally hands file pairs to
//! language experts, then summarizes and persists the batch.

mod collaborator;
mod config;
mod dispatch;
mod error;
mod expert;
mod issue;
mod outcome;
mod pipeline;
mod plan;
mod pool;
mod process;
mod report;
mod simulated;
mod state;
mod summary;

pub use collaborator::{ExpertRequest, ExpertReviewer, FixExecutor, FixRequest, IssueReporter};
pub use config::{
    EngineSettings, ExecutorSettings, ExpertSettings, LoadedConfig, ReporterSettings, Thresholds,
    TriageConfig, CONCURRENCY_ENV, DISCOVERED_CONFIG_FILES, MAX_CONCURRENCY,
};
pub use dispatch::DecisionEngine;
pub use error::{EngineError, Result};
pub use expert::{batches_by_language, expert_brief, ExpertAction, ExpertReview};
pub use issue::{batch_code_snippets, code_snippets, issue_draft, manual_review_reasons};
pub use outcome::{FindingOutcome, OutcomeAction};
pub use pipeline::{BatchResult, BatchStatus, ReportTarget, TriagePipeline};
pub use plan::{implementation_plan, write_plan};
pub use pool::dispatch_all;
pub use process::{CommandExpertReviewer, CommandFixExecutor, GhIssueReporter};
pub use report::{AnalysisReport, ReportConfig, ReportMetadata, LATEST_REPORT};
pub use simulated::{
    Scripted, SimulatedExpertReviewer, SimulatedFixExecutor, SimulatedIssueReporter,
    SIMULATED_AGENT, SIMULATED_ISSUE_URL,
};
pub use state::{FindingState, TerminalState};
pub use summary::{recommendations, FindingsSummary, InputAnalysis, ProcessingSummary};
