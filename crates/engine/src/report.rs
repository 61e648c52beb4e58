use crate::config::TriageConfig;
use crate::error::{EngineError, Result};
use crate::expert::ExpertReview;
use crate::outcome::FindingOutcome;
use crate::summary::FindingsSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LATEST_REPORT: &str = "latest-analysis.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub similarity_threshold: f64,
    pub project_root: String,
    pub analysis_mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub analysis_type: String,
    pub workflow_trigger: String,
    pub findings_processed: usize,
    pub action: String,
}

/// Persisted record of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Unix seconds
    pub timestamp: f64,
    pub analysis_date: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// One entry per input finding, in input order
    pub findings: Vec<FindingOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expert_reviews: Vec<ExpertReview>,
    pub summary: FindingsSummary,
    pub config: ReportConfig,
    pub metadata: ReportMetadata,
}

impl AnalysisReport {
    pub fn new(
        now: DateTime<Utc>,
        status: &str,
        action: Option<&str>,
        findings: Vec<FindingOutcome>,
        summary: FindingsSummary,
        config: &TriageConfig,
        project_root: &Path,
    ) -> Self {
        let findings_processed = findings.len();
        Self {
            timestamp: now.timestamp_millis() as f64 / 1000.0,
            analysis_date: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            status: status.to_string(),
            error: None,
            findings,
            expert_reviews: Vec::new(),
            summary,
            config: ReportConfig {
                similarity_threshold: config.thresholds.high,
                project_root: project_root.display().to_string(),
                analysis_mode: "github_actions".to_string(),
            },
            metadata: ReportMetadata {
                analysis_type: "duplicate_detection".to_string(),
                workflow_trigger: "github_actions".to_string(),
                findings_processed,
                action: action.unwrap_or("analysis_completed").to_string(),
            },
        }
    }

    pub fn with_expert_reviews(mut self, reviews: Vec<ExpertReview>) -> Self {
        self.expert_reviews = reviews;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Writes `analysis_<stamp>.json` and refreshes `latest-analysis.json`.
    /// Returns the timestamped path.
    pub fn save_to_dir(&self, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let bytes = serde_json::to_vec_pretty(self)?;

        let stamped = dir.join(format!("analysis_{}.json", now.format("%Y%m%d_%H%M%S")));
        write_atomic(&stamped, &bytes)?;
        write_atomic(&dir.join(LATEST_REPORT), &bytes)?;
        log::info!("Report saved to {}", stamped.display());
        Ok(stamped)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_atomic(path, &serde_json::to_vec_pretty(self)?)?;
        log::info!("Report saved to {}", path.display());
        Ok(path.to_path_buf())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| EngineError::Other(format!("{} has no parent", path.display())))?;
    let tmp = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("report"),
        std::process::id()
    ));

    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp, path)?;
    Ok(())
}
