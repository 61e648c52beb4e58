use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use triage_aggregator::FilterSettings;
use triage_matrix::ContextDefaults;
use triage_protocol::PathExclusions;

pub const CONCURRENCY_ENV: &str = "DUPE_TRIAGE_CONCURRENCY";
pub const MAX_CONCURRENCY: usize = 32;
const MAX_DEFAULT_CONCURRENCY: usize = 8;

/// Config files looked up under the project root when `--config` is not given.
pub const DISCOVERED_CONFIG_FILES: &[&str] =
    &[".ci-registry/ci_config.json", ".ci-registry/triage.toml"];

/// Similarity thresholds of the upstream detector. Consumed here only as
/// report metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub exact: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            exact: 1.0,
            high: 0.85,
            medium: 0.75,
            low: 0.45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub program: String,
    /// `{plan}` is replaced by the plan file path
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            args: vec!["/todo-orchestrate {plan}".to_string()],
            timeout_secs: 300,
        }
    }
}

impl ExecutorSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterSettings {
    pub program: String,
    pub labels: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ReporterSettings {
    fn default() -> Self {
        Self {
            program: "gh".to_string(),
            labels: vec!["code-duplication".to_string(), "technical-debt".to_string()],
            timeout_secs: 30,
        }
    }
}

impl ReporterSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Per-language expert review of aggregated file pairs. Off by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpertSettings {
    pub enabled: bool,
    pub program: String,
    /// `{agent}` is replaced by the expert name, `{brief}` by the brief file path
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ExpertSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "claude".to_string(),
            args: vec![
                "--agent".to_string(),
                "{agent}".to_string(),
                "{brief}".to_string(),
            ],
            timeout_secs: 600,
        }
    }
}

impl ExpertSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Worker count; unset means `DUPE_TRIAGE_CONCURRENCY` or a CPU-derived default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    pub test_mode: bool,
    /// Relative paths resolve against the project root
    pub reports_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: None,
            test_mode: false,
            reports_dir: PathBuf::from(".ci-registry/reports"),
        }
    }
}

impl EngineSettings {
    pub fn effective_concurrency(&self) -> usize {
        if let Some(explicit) = self.concurrency {
            return explicit.clamp(1, MAX_CONCURRENCY);
        }
        let raw = std::env::var(CONCURRENCY_ENV).ok();
        parse_concurrency(raw.as_deref(), default_concurrency())
    }

    pub fn reports_dir_in(&self, project_root: &Path) -> PathBuf {
        if self.reports_dir.is_absolute() {
            self.reports_dir.clone()
        } else {
            project_root.join(&self.reports_dir)
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_DEFAULT_CONCURRENCY)
}

fn parse_concurrency(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_CONCURRENCY)
}

fn default_exclusions() -> PathExclusions {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
    PathExclusions {
        directories: owned(&["node_modules", ".git", "__pycache__", "dist", "build", "target"]),
        files: owned(&["*.min.js", "*.bundle.js", "*.map"]),
        patterns: Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub thresholds: Thresholds,
    pub context_defaults: ContextDefaults,
    pub exclusions: PathExclusions,
    pub filter: FilterSettings,
    pub executor: ExecutorSettings,
    pub reporter: ReporterSettings,
    pub expert: ExpertSettings,
    pub engine: EngineSettings,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            context_defaults: ContextDefaults::default(),
            exclusions: default_exclusions(),
            filter: FilterSettings::default(),
            executor: ExecutorSettings::default(),
            reporter: ReporterSettings::default(),
            expert: ExpertSettings::default(),
            engine: EngineSettings::default(),
        }
    }
}

/// Configuration plus the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TriageConfig,
    pub source: Option<PathBuf>,
}

impl TriageConfig {
    /// Parses JSON, falling back to TOML.
    pub fn from_bytes(path: &Path, bytes: &[u8]) -> Result<Self> {
        let parse_error = |message: String| EngineError::ConfigParse {
            path: path.to_path_buf(),
            message,
        };

        let value: serde_json::Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(json_err) => {
                let utf8 = std::str::from_utf8(bytes)
                    .map_err(|err| parse_error(format!("{json_err}; {err}")))?;
                let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                    parse_error(format!(
                        "not valid JSON ({json_err}) or TOML ({toml_err})"
                    ))
                })?;
                serde_json::to_value(toml_value).map_err(|err| parse_error(err.to_string()))?
            }
        };

        let config: TriageConfig =
            serde_json::from_value(value).map_err(|err| parse_error(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path first, then the discovered files, then built-in defaults.
    ///
    /// An explicit path that cannot be read or parsed is an error; a broken
    /// discovered file only logs a warning.
    pub fn load(project_root: &Path, explicit: Option<&Path>) -> Result<LoadedConfig> {
        if let Some(path) = explicit {
            let bytes = std::fs::read(path)?;
            let config = Self::from_bytes(path, &bytes)?;
            log::info!("Loaded configuration from {}", path.display());
            return Ok(LoadedConfig {
                config,
                source: Some(path.to_path_buf()),
            });
        }

        for candidate in DISCOVERED_CONFIG_FILES {
            let path = project_root.join(candidate);
            if !path.is_file() {
                continue;
            }
            let loaded = std::fs::read(&path)
                .map_err(EngineError::from)
                .and_then(|bytes| Self::from_bytes(&path, &bytes));
            match loaded {
                Ok(config) => {
                    log::info!("Loaded configuration from {}", path.display());
                    return Ok(LoadedConfig {
                        config,
                        source: Some(path),
                    });
                }
                Err(err) => {
                    log::warn!("Ignoring {}: {err}", path.display());
                    break;
                }
            }
        }

        log::info!("No triage configuration found, using defaults");
        Ok(LoadedConfig {
            config: TriageConfig::default(),
            source: None,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        for (name, value) in [
            ("exact", t.exact),
            ("high", t.high),
            ("medium", t.medium),
            ("low", t.low),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidConfig(format!(
                    "thresholds.{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }

        self.context_defaults.validate()?;

        if self.executor.program.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "executor.program must not be empty".to_string(),
            ));
        }
        if self.reporter.program.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "reporter.program must not be empty".to_string(),
            ));
        }
        if self.executor.timeout_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "executor.timeout_secs must be positive".to_string(),
            ));
        }
        if self.reporter.timeout_secs == 0 {
            return Err(EngineError::InvalidConfig(
                "reporter.timeout_secs must be positive".to_string(),
            ));
        }
        if self.expert.enabled {
            if self.expert.program.trim().is_empty() {
                return Err(EngineError::InvalidConfig(
                    "expert.program must not be empty".to_string(),
                ));
            }
            if self.expert.timeout_secs == 0 {
                return Err(EngineError::InvalidConfig(
                    "expert.timeout_secs must be positive".to_string(),
                ));
            }
        }
        if self.engine.concurrency == Some(0) {
            return Err(EngineError::InvalidConfig(
                "engine.concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
