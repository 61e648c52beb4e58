use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use triage_aggregator::{aggregate, MeaningfulFilter};
use triage_engine::{
    BatchStatus, DecisionEngine, LoadedConfig, ReportTarget, TriageConfig, TriagePipeline,
};
use triage_matrix::{risk_breakdown, Decision, DuplicationContext, RiskContribution};
use triage_protocol::{finding_schema, parse_findings, serialize_json, FindingRecord, RawFinding};

const TEST_MODE_ENV: &str = "DUPE_TRIAGE_TEST_MODE";

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serialize_json(value)?
    };
    print_stdout(&output)
}

#[derive(Parser)]
#[command(name = "dupe-triage")]
#[command(about = "Triage duplicate-code findings into fixes, issues or skips", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Project the findings refer to
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Configuration file (JSON or TOML); discovered under .ci-registry/ when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use simulated collaborators instead of external processes (env: DUPE_TRIAGE_TEST_MODE)
    #[arg(long, global = true)]
    test_mode: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full triage pipeline over a batch of findings
    Process(ProcessArgs),

    /// Print the decision for each finding without calling any collaborator
    Evaluate(InputArgs),

    /// Print findings grouped by file pair
    Aggregate(InputArgs),

    /// Print the JSON schema of the finding input
    Schema,

    /// Print the resolved configuration
    Config,
}

#[derive(Args)]
struct InputArgs {
    /// JSON file with findings (stdin when omitted)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ProcessArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Findings dispatched at once (env: DUPE_TRIAGE_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Skip writing the analysis report
    #[arg(long, conflicts_with = "output")]
    no_report: bool,

    /// Write the report to this path instead of the reports directory
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct EvaluatedFinding<'a> {
    finding_id: &'a str,
    context: DuplicationContext,
    risk_breakdown: Vec<RiskContribution>,
    decision: Decision,
}

#[derive(Serialize)]
struct ConfigOutput<'a> {
    source: Option<&'a Path>,
    config: &'a TriageConfig,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    if matches!(cli.command, Commands::Schema) {
        return print_json(&finding_schema()?, true);
    }

    let root = cli
        .project_root
        .canonicalize()
        .with_context(|| format!("Invalid project root {}", cli.project_root.display()))?;
    let LoadedConfig { mut config, source } = TriageConfig::load(&root, cli.config.as_deref())
        .context("Failed to load configuration")?;
    if cli.test_mode || env_truthy(TEST_MODE_ENV) {
        config.engine.test_mode = true;
    }

    match cli.command {
        Commands::Process(args) => run_process(args, config, &root).await?,
        Commands::Evaluate(args) => run_evaluate(args, &config, &root)?,
        Commands::Aggregate(args) => run_aggregate(args, &config)?,
        Commands::Config => print_json(
            &ConfigOutput {
                source: source.as_deref(),
                config: &config,
            },
            true,
        )?,
        Commands::Schema => {}
    }

    Ok(())
}

async fn run_process(args: ProcessArgs, config: TriageConfig, root: &Path) -> Result<()> {
    let target = match (args.no_report, args.output) {
        (true, _) => ReportTarget::Disabled,
        (false, Some(path)) => ReportTarget::Path(path),
        (false, None) => ReportTarget::Default,
    };

    let mut pipeline = TriagePipeline::new(config, root)
        .context("Invalid configuration")?
        .report_target(target);
    if let Some(concurrency) = args.concurrency {
        pipeline = pipeline.concurrency(concurrency);
    }

    let batch = match read_findings(args.input.file.as_deref()) {
        Ok(records) => pipeline.run_records(records).await,
        Err(err) => {
            log::error!("{err:#}");
            pipeline.input_error(format!("{err:#}"))
        }
    };
    print_json(&batch, args.input.pretty)?;

    if batch.status == BatchStatus::Error {
        std::process::exit(1);
    }
    Ok(())
}

fn run_evaluate(args: InputArgs, config: &TriageConfig, root: &Path) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    let findings = readable_findings(read_findings(args.file.as_deref())?);
    let engine = DecisionEngine::from_config(config, root);

    let evaluated: Vec<EvaluatedFinding<'_>> = findings
        .iter()
        .map(|finding| {
            let context = engine.context_for(finding);
            let decision = engine.decide(finding);
            EvaluatedFinding {
                finding_id: &finding.finding_id,
                risk_breakdown: risk_breakdown(&context),
                context,
                decision,
            }
        })
        .collect();
    print_json(&evaluated, args.pretty)
}

fn run_aggregate(args: InputArgs, config: &TriageConfig) -> Result<()> {
    let findings = readable_findings(read_findings(args.file.as_deref())?);
    let filter = MeaningfulFilter::new(&config.filter).context("Invalid filter settings")?;

    let (excluded, findings): (Vec<RawFinding>, Vec<RawFinding>) = findings
        .into_iter()
        .partition(|f| config.exclusions.excluded_file(f).is_some());
    if !excluded.is_empty() {
        log::info!("Excluded {} finding(s) by path", excluded.len());
    }

    let outcome = filter.apply(findings);
    if outcome.dropped_total() > 0 {
        log::info!("Filtered out {} finding(s)", outcome.dropped_total());
    }
    print_json(&aggregate(&outcome.kept), args.pretty)
}

/// Accepted findings of a parsed batch; unreadable records are logged and dropped.
fn readable_findings(records: Vec<FindingRecord>) -> Vec<RawFinding> {
    records
        .into_iter()
        .filter_map(|record| match record {
            Ok(finding) => Some(finding),
            Err(bad) => {
                log::warn!("Skipping {}: {}", bad.finding_id, bad.error);
                None
            }
        })
        .collect()
}

fn read_findings(file: Option<&Path>) -> Result<Vec<FindingRecord>> {
    let raw = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read findings from {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read findings from stdin")?;
            buffer
        }
    };

    if raw.trim().is_empty() {
        anyhow::bail!("Findings input is empty. Provide --file or pipe JSON via stdin.");
    }
    parse_findings(&raw).context("Invalid findings JSON")
}

fn env_truthy(var: &str) -> bool {
    env::var(var)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
