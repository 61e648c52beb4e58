use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use triage_engine::{
    AnalysisReport, BatchStatus, DecisionEngine, ExpertAction, OutcomeAction, ReportTarget,
    Scripted, SimulatedExpertReviewer, SimulatedFixExecutor, SimulatedIssueReporter,
    TerminalState, TriageConfig, TriagePipeline, LATEST_REPORT,
};
use triage_protocol::{parse_findings, ExternalStatus, RawFinding};

fn finding(id: &str, value: Value) -> RawFinding {
    let mut value = value;
    value["finding_id"] = json!(id);
    serde_json::from_value(value).unwrap()
}

fn auto_fixable(id: &str, left: &str, right: &str) -> RawFinding {
    finding(
        id,
        json!({
            "title": format!("{id} duplicated"),
            "evidence": {
                "similarity_score": 0.92,
                "total_lines": 25,
                "symbol_types": ["function"],
                "test_coverage": 85.0,
                "original_symbol": {"file": left, "name": "parse_rows", "type": "function", "lsp_kind": 12},
                "duplicate_symbol": {"file": right, "name": "parse_lines", "type": "function", "lsp_kind": 12}
            }
        }),
    )
}

fn needs_review(id: &str) -> RawFinding {
    finding(
        id,
        json!({
            "title": "Shared client",
            "severity": "high",
            "evidence": {
                "similarity_score": 0.88,
                "total_lines": 150,
                "file_count": 8,
                "symbol_types": ["class", "method"],
                "cross_module": true,
                "test_coverage": 45.0,
                "complexity": 12,
                "dependencies": 8,
                "is_public": true,
                "last_modified_days": 3,
                "original_symbol": {"file": "api/client.py", "name": "ApiClient", "content": "class ApiClient:"},
                "duplicate_symbol": {"file": "web/client.py", "name": "WebClient", "content": "class WebClient:"}
            }
        }),
    )
}

fn trivial(id: &str) -> RawFinding {
    finding(
        id,
        json!({
            "evidence": {
                "similarity_score": 0.95,
                "total_lines": 4,
                "original_symbol": {"file": "src/x.py", "name": "helper", "lsp_kind": 12},
                "duplicate_symbol": {"file": "src/y.py", "name": "helper2", "lsp_kind": 12}
            }
        }),
    )
}

fn simulated_engine(executor: SimulatedFixExecutor) -> DecisionEngine {
    DecisionEngine::new(
        Arc::new(executor),
        Arc::new(SimulatedIssueReporter::new()),
        std::env::temp_dir(),
    )
    .with_timeouts(Duration::from_millis(200), Duration::from_millis(200))
}

#[tokio::test]
async fn mixed_batch_routes_every_finding() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = TriagePipeline::with_engine(
        TriageConfig::default(),
        dir.path(),
        simulated_engine(SimulatedFixExecutor::new()),
    )
    .unwrap()
    .concurrency(2);

    let batch = pipeline
        .run(vec![
            auto_fixable("f1", "src/a.py", "src/b.py"),
            needs_review("f2"),
            trivial("f3"),
        ])
        .await;

    assert_eq!(batch.status, BatchStatus::Success);
    assert_eq!(batch.findings_processed, 3);
    assert_eq!(batch.filtered_out, 0);
    let actions: Vec<OutcomeAction> = batch.results.iter().map(|r| r.action).collect();
    assert_eq!(
        actions,
        vec![
            OutcomeAction::AutomaticFix,
            OutcomeAction::GithubIssue,
            OutcomeAction::Skipped
        ]
    );

    let processing = &batch.summary.processing_results;
    assert_eq!(processing.automatic_fixes, 1);
    assert_eq!(processing.github_issues, 1);
    assert_eq!(processing.skipped, 1);
    assert_eq!(processing.errors, 0);
    assert_eq!(processing.successes, 2);
    assert_eq!(batch.summary.input_analysis.total_file_pairs, 3);

    let report_path = batch.report_path.expect("report saved");
    assert!(report_path.starts_with(dir.path().join(".ci-registry/reports")));
    let latest = dir.path().join(".ci-registry/reports").join(LATEST_REPORT);
    let report: AnalysisReport =
        serde_json::from_slice(&std::fs::read(latest).unwrap()).unwrap();
    assert_eq!(report.findings.len(), 3);
    assert_eq!(report.metadata.findings_processed, 3);
    assert_eq!(report.status, "success");
}

#[tokio::test]
async fn executor_timeout_counts_one_error_and_spares_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let executor = SimulatedFixExecutor::new().script("slow", Scripted::Hang);
    let pipeline = TriagePipeline::with_engine(
        TriageConfig::default(),
        dir.path(),
        simulated_engine(executor),
    )
    .unwrap()
    .report_target(ReportTarget::Disabled);

    let batch = pipeline
        .run(vec![
            auto_fixable("fast1", "src/a.py", "src/b.py"),
            auto_fixable("slow", "src/c.py", "src/d.py"),
            auto_fixable("fast2", "src/e.py", "src/f.py"),
            needs_review("review"),
        ])
        .await;

    assert_eq!(batch.results.len(), 4);
    let slow = &batch.results[1];
    assert_eq!(slow.finding_id, "slow");
    assert_eq!(slow.status, Some(ExternalStatus::Timeout));
    assert_eq!(slow.state, TerminalState::AutoFixTimedOut);

    assert_eq!(batch.summary.processing_results.errors, 1);
    for other in [&batch.results[0], &batch.results[2], &batch.results[3]] {
        assert!(other.is_success(), "{} should succeed", other.finding_id);
    }
    assert!(batch.report_path.is_none());
}

#[tokio::test]
async fn nothing_meaningful_reports_no_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("result.json");
    let pipeline = TriagePipeline::with_engine(
        TriageConfig::default(),
        dir.path(),
        simulated_engine(SimulatedFixExecutor::new()),
    )
    .unwrap()
    .report_target(ReportTarget::Path(out.clone()));

    let same_file = finding(
        "same",
        json!({"evidence": {
            "similarity_score": 0.99,
            "original_symbol": {"file": "a.py", "name": "load"},
            "duplicate_symbol": {"file": "a.py", "name": "load_again"}
        }}),
    );
    let vendored = auto_fixable("vendored", "node_modules/lib/a.js", "src/a.js");

    let batch = pipeline.run(vec![same_file, vendored]).await;

    assert_eq!(batch.status, BatchStatus::Success);
    assert_eq!(batch.action.as_deref(), Some("no_duplicates_found"));
    assert_eq!(batch.filtered_out, 2);
    assert_eq!(batch.findings_processed, 2);
    assert!(batch.aggregated.is_empty());

    let reasons: Vec<(&str, Option<&str>)> = batch
        .results
        .iter()
        .map(|r| (r.finding_id.as_str(), r.reason.as_deref()))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("same", Some("same_file_or_missing")),
            ("vendored", Some("excluded_path"))
        ]
    );
    assert!(batch
        .results
        .iter()
        .all(|r| r.action == OutcomeAction::Skipped && r.state == TerminalState::Skipped));
    assert_eq!(batch.summary.processing_results.skipped, 2);
    assert_eq!(
        batch.summary.recommendations,
        vec!["No duplicate code detected. Keep up the good work!"]
    );
    assert_eq!(batch.report_path.as_deref(), Some(out.as_path()));

    let report: Value = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(report["metadata"]["action"], "no_duplicates_found");
    assert_eq!(report["findings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn report_has_one_entry_per_input_even_when_filtered() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("result.json");
    let pipeline = TriagePipeline::with_engine(
        TriageConfig::default(),
        dir.path(),
        simulated_engine(SimulatedFixExecutor::new()),
    )
    .unwrap()
    .report_target(ReportTarget::Path(out.clone()));

    let same_file = finding(
        "same",
        json!({"evidence": {
            "similarity_score": 0.99,
            "original_symbol": {"file": "a.py", "name": "load"},
            "duplicate_symbol": {"file": "a.py", "name": "load_again"}
        }}),
    );
    let inputs = vec![
        auto_fixable("cross", "src/a.py", "src/b.py"),
        same_file,
        auto_fixable("vendored", "web/node_modules/x.js", "src/x.js"),
        needs_review("review"),
    ];
    let input_ids: Vec<String> = inputs.iter().map(|f| f.finding_id.clone()).collect();

    let batch = pipeline.run(inputs).await;
    assert_eq!(batch.action, None);
    assert_eq!(batch.filtered_out, 2);
    assert_eq!(batch.aggregated.len(), 2);

    let report: AnalysisReport = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(report.findings.len(), input_ids.len());
    let report_ids: Vec<String> = report.findings.iter().map(|f| f.finding_id.clone()).collect();
    assert_eq!(report_ids, input_ids);

    let actions: Vec<OutcomeAction> = report.findings.iter().map(|f| f.action).collect();
    assert_eq!(
        actions,
        vec![
            OutcomeAction::AutomaticFix,
            OutcomeAction::Skipped,
            OutcomeAction::Skipped,
            OutcomeAction::GithubIssue
        ]
    );
    assert_eq!(
        report.findings[2].message.as_deref(),
        Some("Excluded by path filter: web/node_modules/x.js")
    );
    assert_eq!(report.summary.processing_results.skipped, 2);
    assert_eq!(report.summary.processing_results.total_findings, 4);
}

#[tokio::test]
async fn sloppy_or_broken_records_do_not_sink_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("result.json");
    let pipeline = TriagePipeline::with_engine(
        TriageConfig::default(),
        dir.path(),
        simulated_engine(SimulatedFixExecutor::new()),
    )
    .unwrap()
    .report_target(ReportTarget::Path(out.clone()));

    let raw = json!([
        {
            "finding_id": "good",
            "evidence": {
                "similarity_score": 0.92, "total_lines": 25, "symbol_types": ["function"],
                "original_symbol": {"file": "src/a.py", "name": "parse_rows", "lsp_kind": 12},
                "duplicate_symbol": {"file": "src/b.py", "name": "parse_lines", "lsp_kind": 12}
            }
        },
        {
            "finding_id": "float-lines",
            "evidence": {
                "similarity_score": 0.92, "total_lines": 30.0, "symbol_types": ["function"],
                "original_symbol": {"file": "src/c.py", "name": "load_rows", "line": 3.0, "lsp_kind": 12},
                "duplicate_symbol": {"file": "src/d.py", "name": "load_lines", "lsp_kind": 12}
            }
        },
        {
            "finding_id": "negative",
            "evidence": {
                "similarity_score": 0.92, "total_lines": 25, "complexity": -1,
                "original_symbol": {"file": "src/e.py", "name": "save_rows", "lsp_kind": 12},
                "duplicate_symbol": {"file": "src/f.py", "name": "save_lines", "lsp_kind": 12}
            }
        },
        {"finding_id": "broken", "evidence": "not an object"}
    ])
    .to_string();

    let records = parse_findings(&raw).unwrap();
    let engine = pipeline.engine();
    let float_lines = records[1].as_ref().unwrap();
    assert_eq!(engine.context_for(float_lines).total_line_count, 30);
    let negative = records[2].as_ref().unwrap();
    assert_eq!(engine.context_for(negative).cyclomatic_complexity, 3);

    let batch = pipeline.run_records(records).await;
    assert_eq!(batch.status, BatchStatus::Success);
    assert_eq!(batch.findings_processed, 4);
    assert_eq!(batch.rejected, 1);

    for outcome in &batch.results[..3] {
        assert!(!outcome.is_error(), "{} should not fail", outcome.finding_id);
    }
    let broken = &batch.results[3];
    assert_eq!(broken.finding_id, "broken");
    assert_eq!(broken.action, OutcomeAction::Error);
    assert!(broken
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("invalid finding:")));
    assert_eq!(batch.summary.processing_results.errors, 1);

    let report: AnalysisReport = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(report.findings.len(), 4);
}

#[tokio::test]
async fn unreadable_input_still_leaves_an_error_report() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = TriagePipeline::with_engine(
        TriageConfig::default(),
        dir.path(),
        simulated_engine(SimulatedFixExecutor::new()),
    )
    .unwrap();

    let batch = pipeline.input_error("Invalid findings JSON: expected value");
    assert_eq!(batch.status, BatchStatus::Error);
    assert_eq!(batch.summary.processing_results.errors, 1);

    let latest = dir.path().join(".ci-registry/reports").join(LATEST_REPORT);
    assert!(batch.report_path.is_some());
    let report: AnalysisReport = serde_json::from_slice(&std::fs::read(latest).unwrap()).unwrap();
    assert_eq!(report.status, "error");
    assert_eq!(report.error.as_deref(), Some("Invalid findings JSON: expected value"));
    assert_eq!(report.metadata.action, "input_error");
    assert_eq!(report.summary.processing_results.errors, 1);
}

#[tokio::test]
async fn enabled_expert_review_covers_each_language() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("result.json");
    let mut config = TriageConfig::default();
    config.expert.enabled = true;
    let engine = simulated_engine(SimulatedFixExecutor::new())
        .with_expert(Arc::new(SimulatedExpertReviewer::new()), Duration::from_millis(200));
    let pipeline = TriagePipeline::with_engine(config, dir.path(), engine)
        .unwrap()
        .report_target(ReportTarget::Path(out.clone()));

    let batch = pipeline
        .run(vec![
            auto_fixable("py", "src/a.py", "src/b.py"),
            auto_fixable("ts", "web/a.ts", "web/b.ts"),
            auto_fixable("py2", "lib/c.py", "lib/d.py"),
        ])
        .await;

    let agents: Vec<&str> = batch.expert_reviews.iter().map(|r| r.agent.as_str()).collect();
    assert_eq!(agents, vec!["python-expert", "typescript-expert"]);
    assert!(batch
        .expert_reviews
        .iter()
        .all(|r| r.action == ExpertAction::ExpertReview && r.is_success()));
    assert_eq!(batch.expert_reviews[0].findings_count, 2);

    let processing = &batch.summary.processing_results;
    assert_eq!(processing.expert_reviews, 2);
    assert_eq!(processing.total_findings, 3);
    assert!(processing.agents_used.contains("python-expert"));
    assert!(processing.agents_used.contains("typescript-expert"));

    let report: AnalysisReport = serde_json::from_slice(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(report.expert_reviews.len(), 2);
    assert_eq!(report.findings.len(), 3);
}

#[tokio::test]
async fn expert_review_stays_off_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = TriagePipeline::with_engine(
        TriageConfig::default(),
        dir.path(),
        simulated_engine(SimulatedFixExecutor::new()),
    )
    .unwrap()
    .report_target(ReportTarget::Disabled);

    let batch = pipeline
        .run(vec![auto_fixable("py", "src/a.py", "src/b.py")])
        .await;
    assert!(batch.expert_reviews.is_empty());
    assert_eq!(batch.summary.processing_results.expert_reviews, 0);
}

#[tokio::test]
async fn duplicates_of_one_file_pair_share_a_group() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = TriagePipeline::with_engine(
        TriageConfig::default(),
        dir.path(),
        simulated_engine(SimulatedFixExecutor::new()),
    )
    .unwrap()
    .report_target(ReportTarget::Disabled);

    let batch = pipeline
        .run(vec![
            auto_fixable("f1", "src/a.py", "src/b.py"),
            auto_fixable("f2", "src/b.py", "src/a.py"),
        ])
        .await;

    assert_eq!(batch.aggregated.len(), 1);
    assert_eq!(batch.aggregated[0].finding_id, "aggregated_000");
    assert_eq!(batch.aggregated[0].duplicate_count, 2);
    assert_eq!(batch.results.len(), 2);
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let mut config = TriageConfig::default();
    config.executor.timeout_secs = 0;
    let engine = simulated_engine(SimulatedFixExecutor::new());
    assert!(TriagePipeline::with_engine(config, std::path::Path::new("."), engine).is_err());
}
