use crate::issue::{batch_code_snippets, file_name};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use triage_aggregator::{AggregatedFinding, Language};
use triage_protocol::ExternalStatus;

const BRIEF_SYMBOLS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertAction {
    ExpertReview,
    /// The batch never reached the expert
    ExpertReviewError,
}

impl ExpertAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            ExpertAction::ExpertReview => "expert_review",
            ExpertAction::ExpertReviewError => "expert_review_error",
        }
    }
}

impl fmt::Display for ExpertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of sending one language batch of aggregated findings to its expert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertReview {
    pub action: ExpertAction,
    pub agent: String,
    pub language: Language,
    pub status: ExternalStatus,
    /// Aggregated file pairs in the batch
    pub findings_count: usize,
    pub total_duplicates: usize,
    pub group_ids: Vec<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_detail: Option<serde_json::Value>,
}

impl ExpertReview {
    pub(crate) fn for_batch(
        language: Language,
        batch: &[&AggregatedFinding],
        status: ExternalStatus,
        message: String,
    ) -> Self {
        Self {
            action: ExpertAction::ExpertReview,
            agent: language.expert().to_string(),
            language,
            status,
            findings_count: batch.len(),
            total_duplicates: batch.iter().map(|g| g.duplicate_count).sum(),
            group_ids: batch.iter().map(|g| g.finding_id.clone()).collect(),
            message,
            error: None,
            result_detail: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.action == ExpertAction::ExpertReviewError
            || matches!(
                self.status,
                ExternalStatus::Error | ExternalStatus::Failure | ExternalStatus::Timeout
            )
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Aggregated findings grouped by file-pair language, languages in order of
/// first appearance.
pub fn batches_by_language(
    groups: &[AggregatedFinding],
) -> Vec<(Language, Vec<&AggregatedFinding>)> {
    let mut batches: Vec<(Language, Vec<&AggregatedFinding>)> = Vec::new();
    for group in groups {
        let language = group.file_pair.language();
        match batches.iter_mut().find(|(known, _)| *known == language) {
            Some((_, members)) => members.push(group),
            None => batches.push((language, vec![group])),
        }
    }
    batches
}

/// Markdown brief for one language batch.
pub fn expert_brief(language: Language, batch: &[&AggregatedFinding]) -> String {
    let total_duplicates: usize = batch.iter().map(|g| g.duplicate_count).sum();

    let mut brief = String::new();
    let _ = writeln!(brief, "# Code Duplication Review: {language} batch\n");
    let _ = writeln!(brief, "## Context");
    let _ = writeln!(
        brief,
        "Review every duplicate pattern below as a whole and settle on one coordinated refactoring strategy for this {language} code.\n"
    );
    let _ = writeln!(brief, "## Overview");
    let _ = writeln!(brief, "**Language**: {language}");
    let _ = writeln!(brief, "**Total File Pairs**: {}", batch.len());
    let _ = writeln!(brief, "**Total Duplicates Found**: {total_duplicates}\n");

    let _ = writeln!(brief, "### File Pairs");
    for group in batch {
        let _ = writeln!(
            brief,
            "- **{} ↔ {}**: {} duplicates (avg similarity: {:.2})",
            file_name(group.file_pair.first()),
            file_name(group.file_pair.second()),
            group.duplicate_count,
            group.average_similarity
        );
    }

    let symbols: Vec<_> = batch.iter().flat_map(|g| &g.duplicate_symbols).collect();
    let _ = writeln!(brief, "\n### Duplicate Patterns");
    for symbol in symbols.iter().take(BRIEF_SYMBOLS) {
        let _ = writeln!(
            brief,
            "- {} ↔ {} (similarity: {:.2})",
            symbol.original, symbol.duplicate, symbol.similarity
        );
    }
    if symbols.len() > BRIEF_SYMBOLS {
        let _ = writeln!(
            brief,
            "... and {} more duplicates across all file pairs",
            symbols.len() - BRIEF_SYMBOLS
        );
    }

    let _ = writeln!(brief, "\n{}", batch_code_snippets(batch));

    brief.push_str(
        "## Review Requirements
1. Look for themes shared across pairs that point at a missing abstraction or shared utility.
2. Refactor related duplicates together, in an order that avoids conflicts.
3. Weigh dependencies and test coverage before touching public APIs.
4. Either apply the coordinated refactoring or open an issue with the full analysis.
",
    );
    brief
}
