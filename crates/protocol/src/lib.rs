use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod lenient;
pub mod path_filters;

pub use path_filters::PathExclusions;

pub const FINDING_SCHEMA_VERSION: u32 = 1;

const UNKNOWN_ID: &str = "unknown";

fn unknown_id() -> String {
    UNKNOWN_ID.to_string()
}

/// One side of a duplicate pair as reported by the upstream detector.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct SymbolRef {
    pub file: String,
    #[serde(
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub line: Option<u32>,
    pub name: String,
    /// Symbol kind (function, method, class, variable, ...)
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    #[serde(
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_count: Option<u32>,
    /// LSP `SymbolKind` number, when the extractor knows it
    #[serde(
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub lsp_kind: Option<u32>,
}

impl SymbolRef {
    pub fn file(&self) -> Option<&str> {
        let file = self.file.trim();
        (!file.is_empty()).then_some(file)
    }

    pub fn kind_or_unknown(&self) -> &str {
        let kind = self.kind.trim();
        if kind.is_empty() {
            UNKNOWN_ID
        } else {
            kind
        }
    }
}

/// Evidence attached to a raw finding.
///
/// Every context field is optional; missing values are resolved by the
/// context builder's default table rather than here. Numeric and boolean
/// fields of the wrong shape read as missing.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Evidence {
    #[serde(
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub similarity_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_symbol: Option<SymbolRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_symbol: Option<SymbolRef>,
    #[serde(
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_type: Option<String>,
    #[serde(
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_count: Option<u32>,
    #[serde(
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_lines: Option<u32>,
    #[serde(
        deserialize_with = "lenient::strings",
        skip_serializing_if = "Option::is_none"
    )]
    pub symbol_types: Option<Vec<String>>,
    #[serde(
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub cross_module: Option<bool>,
    #[serde(
        deserialize_with = "lenient::number",
        skip_serializing_if = "Option::is_none"
    )]
    pub test_coverage: Option<f64>,
    #[serde(
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub complexity: Option<u32>,
    #[serde(
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub dependencies: Option<u32>,
    #[serde(
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_public: Option<bool>,
    #[serde(
        deserialize_with = "lenient::flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub documented: Option<bool>,
    #[serde(
        deserialize_with = "lenient::count",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_modified_days: Option<u32>,
}

impl Evidence {
    pub fn similarity(&self) -> f64 {
        self.similarity_score.unwrap_or(0.0)
    }

    /// Files of the original and duplicate symbols, in that order.
    pub fn files(&self) -> Vec<&str> {
        [&self.original_symbol, &self.duplicate_symbol]
            .into_iter()
            .flatten()
            .filter_map(SymbolRef::file)
            .collect()
    }
}

/// Raw pairwise duplicate finding produced by the upstream detector.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct RawFinding {
    #[serde(default = "unknown_id")]
    pub finding_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default)]
    pub evidence: Evidence,
}

impl RawFinding {
    pub fn title_or(&self, fallback: &str) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Status reported by an external collaborator call.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExternalStatus {
    Success,
    SimulatedSuccess,
    Failure,
    Timeout,
    Error,
}

impl ExternalStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ExternalStatus::Success => "success",
            ExternalStatus::SimulatedSuccess => "simulated_success",
            ExternalStatus::Failure => "failure",
            ExternalStatus::Timeout => "timeout",
            ExternalStatus::Error => "error",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(
            self,
            ExternalStatus::Success | ExternalStatus::SimulatedSuccess
        )
    }
}

/// Result of handing a refactoring plan to the fix executor.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ExecutorResponse {
    pub status: ExternalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

/// Issue handed to the issue reporter.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Result of asking the issue reporter to open an issue.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct IssueResponse {
    pub status: ExternalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returncode: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

/// JSON schema for the batch input (`[RawFinding, ...]`).
pub fn finding_schema() -> Result<serde_json::Value> {
    let schema = schemars::schema_for!(Vec<RawFinding>);
    serde_json::to_value(schema).map_err(Into::into)
}

/// Input record that could not be read as a finding.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RejectedFinding {
    pub finding_id: String,
    pub error: String,
}

/// One element of the batch input, read independently of its neighbours.
pub type FindingRecord = std::result::Result<RawFinding, RejectedFinding>;

/// Reads one input element. A record that is not a finding keeps its
/// `finding_id` when it has a string one.
pub fn read_record(value: serde_json::Value) -> FindingRecord {
    let finding_id = value
        .get("finding_id")
        .and_then(serde_json::Value::as_str)
        .unwrap_or(UNKNOWN_ID)
        .to_string();
    serde_json::from_value(value).map_err(|err| RejectedFinding {
        finding_id,
        error: format!("invalid finding: {err}"),
    })
}

/// Accepts a JSON array of findings, a `{"findings": [...]}` wrapper or a
/// single finding object. Only the outer shape can fail; each element is
/// read with [`read_record`].
pub fn parse_findings(raw: &str) -> Result<Vec<FindingRecord>> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) if map.contains_key("findings") => {
            match map.remove("findings") {
                Some(serde_json::Value::Array(items)) => items,
                Some(other) => anyhow::bail!("expected \"findings\" to be an array, got {other}"),
                None => Vec::new(),
            }
        }
        object @ serde_json::Value::Object(_) => vec![object],
        other => anyhow::bail!("expected a finding object or array, got {other}"),
    };
    Ok(items.into_iter().map(read_record).collect())
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}
