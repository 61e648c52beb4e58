use std::fmt::Write as _;
use std::path::Path;
use tempfile::NamedTempFile;
use triage_matrix::{Decision, DuplicationContext};
use triage_protocol::{Evidence, RawFinding};

pub(crate) fn percent(score: f64) -> String {
    format!("{:.0}%", score * 100.0)
}

pub(crate) fn file_list(evidence: &Evidence) -> String {
    let lines: Vec<String> = [&evidence.original_symbol, &evidence.duplicate_symbol]
        .into_iter()
        .flatten()
        .map(|symbol| format!("- {}", symbol.file().unwrap_or("unknown")))
        .collect();
    if lines.is_empty() {
        "- Files will be identified during analysis".to_string()
    } else {
        lines.join("\n")
    }
}

/// Markdown implementation plan handed to the fix executor.
pub fn implementation_plan(
    finding: &RawFinding,
    ctx: &DuplicationContext,
    decision: &Decision,
) -> String {
    let evidence = &finding.evidence;
    let priority = if ctx.similarity_score > 0.8 {
        "High"
    } else {
        "Medium"
    };
    let description = finding
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("Duplicate code patterns detected that should be consolidated.");

    let mut plan = String::new();
    let _ = writeln!(plan, "# Code Duplication Refactoring Plan\n");
    let _ = writeln!(plan, "## Overview");
    let _ = writeln!(
        plan,
        "**Finding**: {}",
        finding.title_or("Code Duplication Detected")
    );
    let _ = writeln!(
        plan,
        "**Similarity Score**: {}",
        percent(evidence.similarity())
    );
    let _ = writeln!(plan, "**Files Affected**: {}", ctx.file_count);
    let _ = writeln!(plan, "**Priority**: {priority}");
    if let Some(approach) = decision.metadata.recommended_approach {
        let _ = writeln!(plan, "**Recommended Approach**: {approach}");
    }
    let _ = writeln!(plan, "\n## Description\n{description}\n");

    plan.push_str(
        "## Implementation Tasks

### Phase 1: Analysis and Planning
- [ ] Identify all instances of the duplicate code pattern
- [ ] Analyze dependencies and usage patterns
- [ ] Determine optimal refactoring approach (extract method, create shared utility, etc.)

### Phase 2: Refactoring Implementation
- [ ] Create shared component/function to consolidate duplicate code
- [ ] Update all affected files to use the shared implementation
- [ ] Ensure consistent parameter passing and return values

### Phase 3: Validation
- [ ] Run all existing tests to ensure no regressions
- [ ] Add tests for the new shared component if needed
- [ ] Verify code still functions as expected

",
    );

    let _ = writeln!(plan, "## Files to Review\n{}\n", file_list(evidence));

    plan.push_str(
        "## Acceptance Criteria
- [ ] All duplicate code consolidated into shared component
- [ ] No functional changes to existing behavior
- [ ] All tests passing
- [ ] Code quality gates satisfied

## Quality Gates
- All existing tests must pass
- No linting errors
- Code coverage maintained or improved
",
    );
    plan
}

/// Writes the plan to a `.md` temp file removed when the handle drops.
pub fn write_plan(plan: &str, dir: Option<&Path>) -> std::io::Result<NamedTempFile> {
    write_markdown("dupe-plan-", plan, dir)
}

pub(crate) fn write_markdown(
    prefix: &str,
    text: &str,
    dir: Option<&Path>,
) -> std::io::Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(prefix).suffix(".md");
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    std::io::Write::write_all(&mut file, text.as_bytes())?;
    std::io::Write::flush(&mut file)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use triage_matrix::{evaluate, ContextDefaults, ContextOptions};

    fn finding() -> RawFinding {
        serde_json::from_value(json!({
            "finding_id": "f1",
            "title": "parse_row duplicated",
            "evidence": {
                "similarity_score": 0.92,
                "original_symbol": {"file": "src/a.py", "name": "parse_row"},
                "duplicate_symbol": {"file": "src/b.py", "name": "parse_line"},
            }
        }))
        .unwrap()
    }

    #[test]
    fn plan_has_overview_tasks_and_files() {
        let finding = finding();
        let ctx = ContextOptions::from_evidence(&finding.evidence)
            .resolve(&ContextDefaults::default());
        let plan = implementation_plan(&finding, &ctx, &evaluate(&ctx));

        assert!(plan.starts_with("# Code Duplication Refactoring Plan"));
        assert!(plan.contains("**Finding**: parse_row duplicated"));
        assert!(plan.contains("**Similarity Score**: 92%"));
        assert!(plan.contains("**Files Affected**: 2"));
        assert!(plan.contains("**Priority**: High"));
        assert!(plan.contains("**Recommended Approach**: extract_to_shared_utility"));
        assert!(plan.contains(
            "Duplicate code patterns detected that should be consolidated."
        ));
        assert!(plan.contains("### Phase 3: Validation"));
        assert!(plan.contains("- src/a.py\n- src/b.py"));
        assert!(plan.contains("## Quality Gates"));
    }

    #[test]
    fn file_list_placeholder_without_symbols() {
        assert_eq!(
            file_list(&Evidence::default()),
            "- Files will be identified during analysis"
        );
    }

    #[test]
    fn plan_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_plan("# plan", Some(dir.path())).unwrap();
        let path = file.path().to_path_buf();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# plan");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("md"));
        drop(file);
        assert!(!path.exists());
    }
}
