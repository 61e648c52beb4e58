use crate::collaborator::{ExpertRequest, ExpertReviewer, FixExecutor, FixRequest, IssueReporter};
use crate::config::{ExecutorSettings, ExpertSettings, ReporterSettings};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use triage_protocol::{ExecutorResponse, ExternalStatus, IssueDraft, IssueResponse};

const PLAN_PLACEHOLDER: &str = "{plan}";
const AGENT_PLACEHOLDER: &str = "{agent}";
const BRIEF_PLACEHOLDER: &str = "{brief}";

async fn run_agent(program: &str, args: &[String], cwd: &Path) -> io::Result<Output> {
    log::info!("Executing: {program} {}", args.join(" "));
    Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
}

fn agent_response(label: &str, output: io::Result<Output>) -> ExecutorResponse {
    match output {
        Ok(out) if out.status.success() => ExecutorResponse {
            status: ExternalStatus::Success,
            stdout: Some(String::from_utf8_lossy(&out.stdout).into_owned()),
            stderr: None,
            returncode: Some(0),
            error: None,
            message: format!("{label} completed successfully"),
        },
        Ok(out) => ExecutorResponse {
            status: ExternalStatus::Failure,
            stdout: Some(String::from_utf8_lossy(&out.stdout).into_owned()),
            stderr: Some(String::from_utf8_lossy(&out.stderr).into_owned()),
            returncode: out.status.code(),
            error: None,
            message: format!("{label} failed"),
        },
        Err(err) => ExecutorResponse {
            status: ExternalStatus::Error,
            stdout: None,
            stderr: None,
            returncode: None,
            error: Some(err.to_string()),
            message: format!("Failed to execute {label}"),
        },
    }
}

/// Runs an external agent (by default `claude "/todo-orchestrate <plan>"`)
/// in the project root.
#[derive(Debug, Clone)]
pub struct CommandFixExecutor {
    program: String,
    args: Vec<String>,
}

impl CommandFixExecutor {
    pub fn new(settings: &ExecutorSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
        }
    }

    fn render_args(&self, plan: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(PLAN_PLACEHOLDER, plan))
            .collect()
    }
}

#[async_trait]
impl FixExecutor for CommandFixExecutor {
    fn agent(&self) -> &str {
        &self.program
    }

    async fn execute(&self, request: &FixRequest) -> ExecutorResponse {
        let plan = request.plan_path.to_string_lossy();
        let args = self.render_args(&plan);
        let output = run_agent(&self.program, &args, &request.project_root).await;
        agent_response(&self.program, output)
    }
}

/// Hands a language brief to an expert agent (by default
/// `claude --agent <expert> <brief>`).
#[derive(Debug, Clone)]
pub struct CommandExpertReviewer {
    program: String,
    args: Vec<String>,
}

impl CommandExpertReviewer {
    pub fn new(settings: &ExpertSettings) -> Self {
        Self {
            program: settings.program.clone(),
            args: settings.args.clone(),
        }
    }

    fn render_args(&self, agent: &str, brief: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace(AGENT_PLACEHOLDER, agent)
                    .replace(BRIEF_PLACEHOLDER, brief)
            })
            .collect()
    }
}

#[async_trait]
impl ExpertReviewer for CommandExpertReviewer {
    async fn review(&self, request: &ExpertRequest) -> ExecutorResponse {
        let brief = request.brief_path.to_string_lossy();
        let args = self.render_args(&request.agent, &brief);
        let output = run_agent(&self.program, &args, &request.project_root).await;
        agent_response(&request.agent, output)
    }
}

/// Opens issues through the GitHub CLI (`gh issue create`).
#[derive(Debug, Clone)]
pub struct GhIssueReporter {
    program: String,
    project_root: PathBuf,
}

impl GhIssueReporter {
    pub fn new(settings: &ReporterSettings, project_root: impl Into<PathBuf>) -> Self {
        Self {
            program: settings.program.clone(),
            project_root: project_root.into(),
        }
    }
}

#[async_trait]
impl IssueReporter for GhIssueReporter {
    fn agent(&self) -> &str {
        &self.program
    }

    async fn create_issue(&self, finding_id: &str, draft: &IssueDraft) -> IssueResponse {
        log::info!("Creating issue for {finding_id}: {}", draft.title);

        let mut cmd = Command::new(&self.program);
        cmd.args([
            "issue",
            "create",
            "--title",
            draft.title.as_str(),
            "--body",
            draft.body.as_str(),
        ]);
        if !draft.labels.is_empty() {
            cmd.arg("--label").arg(draft.labels.join(","));
        }
        let output = cmd
            .current_dir(&self.project_root)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                let url = String::from_utf8_lossy(&out.stdout).trim().to_string();
                IssueResponse {
                    status: ExternalStatus::Success,
                    message: format!("GitHub issue created: {url}"),
                    issue_url: Some(url),
                    returncode: Some(0),
                    stderr: None,
                    error: None,
                }
            }
            Ok(out) => IssueResponse {
                status: ExternalStatus::Failure,
                issue_url: None,
                returncode: out.status.code(),
                stderr: Some(String::from_utf8_lossy(&out.stderr).into_owned()),
                error: None,
                message: "Failed to create GitHub issue".to_string(),
            },
            Err(err) => IssueResponse {
                status: ExternalStatus::Error,
                issue_url: None,
                returncode: None,
                stderr: None,
                error: Some(err.to_string()),
                message: "Error creating GitHub issue".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_placeholder_is_substituted() {
        let executor = CommandFixExecutor::new(&ExecutorSettings::default());
        assert_eq!(
            executor.render_args("/tmp/plan.md"),
            vec!["/todo-orchestrate /tmp/plan.md".to_string()]
        );
        assert_eq!(executor.agent(), "claude");
    }

    #[test]
    fn expert_placeholders_are_substituted() {
        let reviewer = CommandExpertReviewer::new(&ExpertSettings::default());
        assert_eq!(
            reviewer.render_args("python-expert", "/tmp/brief.md"),
            vec!["--agent", "python-expert", "/tmp/brief.md"]
        );
    }

    #[tokio::test]
    async fn missing_expert_program_reports_error_status() {
        let reviewer = CommandExpertReviewer::new(&ExpertSettings {
            program: "dupe-triage-test-no-such-binary".to_string(),
            ..ExpertSettings::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let response = reviewer
            .review(&ExpertRequest {
                agent: "cto".to_string(),
                language: triage_aggregator::Language::Unknown,
                group_ids: vec!["aggregated_000".to_string()],
                average_similarity: 0.9,
                brief_path: dir.path().join("brief.md"),
                project_root: dir.path().to_path_buf(),
            })
            .await;
        assert_eq!(response.status, ExternalStatus::Error);
        assert_eq!(response.message, "Failed to execute cto");
    }

    #[tokio::test]
    async fn missing_program_reports_error_status() {
        let executor = CommandFixExecutor::new(&ExecutorSettings {
            program: "dupe-triage-test-no-such-binary".to_string(),
            ..ExecutorSettings::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let response = executor
            .execute(&FixRequest {
                finding_id: "f1".to_string(),
                plan_path: dir.path().join("plan.md"),
                project_root: dir.path().to_path_buf(),
            })
            .await;
        assert_eq!(response.status, ExternalStatus::Error);
        assert!(response.error.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_failure() {
        let executor = CommandFixExecutor::new(&ExecutorSettings {
            program: "false".to_string(),
            args: Vec::new(),
            ..ExecutorSettings::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let response = executor
            .execute(&FixRequest {
                finding_id: "f1".to_string(),
                plan_path: dir.path().join("plan.md"),
                project_root: dir.path().to_path_buf(),
            })
            .await;
        assert_eq!(response.status, ExternalStatus::Failure);
        assert_eq!(response.returncode, Some(1));
    }
}
