use crate::plan::{file_list, percent};
use std::fmt::Write as _;
use std::path::Path;
use triage_aggregator::AggregatedFinding;
use triage_matrix::{Decision, DuplicationContext};
use triage_protocol::{IssueDraft, RawFinding};

const SNIPPETS_PER_PAIR: usize = 5;
const MAX_SNIPPETS: usize = 10;
const SNIPPET_CHARS: usize = 200;

/// Plain-language reasons a finding needs a human.
pub fn manual_review_reasons(ctx: &DuplicationContext) -> Vec<&'static str> {
    let checks = [
        (ctx.cross_module_impact, "Cross-module impact detected"),
        (ctx.is_public_api, "Public API affected"),
        (ctx.test_coverage_percentage < 70.0, "Low test coverage"),
        (ctx.cyclomatic_complexity > 5, "High complexity"),
        (
            ctx.similarity_score < 0.8,
            "Moderate similarity requiring analysis",
        ),
    ];
    let reasons: Vec<&'static str> = checks
        .into_iter()
        .filter_map(|(hit, reason)| hit.then_some(reason))
        .collect();
    if reasons.is_empty() {
        vec!["Complexity requires human judgment"]
    } else {
        reasons
    }
}

fn truncate(content: &str) -> String {
    match content.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

pub(crate) fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Side-by-side snippets for the findings of one file pair.
pub fn code_snippets(group: &AggregatedFinding) -> String {
    snippet_section(group, SNIPPETS_PER_PAIR).0
}

/// Snippet sections for several file pairs: up to five per pair and
/// ten overall. Pairs past the budget are left out.
pub fn batch_code_snippets(groups: &[&AggregatedFinding]) -> String {
    let mut out = String::new();
    let mut budget = MAX_SNIPPETS;
    for group in groups {
        if budget == 0 {
            break;
        }
        let (section, used) = snippet_section(group, budget.min(SNIPPETS_PER_PAIR));
        out.push_str(&section);
        out.push('\n');
        budget -= used;
    }
    out
}

fn snippet_section(group: &AggregatedFinding, limit: usize) -> (String, usize) {
    let left = file_name(group.file_pair.first());
    let right = file_name(group.file_pair.second());

    let mut out = format!("### Code Snippets: {left} ↔ {right}\n");
    let mut count = 0usize;
    for individual in &group.individual_findings {
        if count >= limit {
            break;
        }
        let evidence = &individual.evidence;
        let (Some(orig), Some(dup)) = (&evidence.original_symbol, &evidence.duplicate_symbol)
        else {
            continue;
        };
        if orig.content.is_empty() || dup.content.is_empty() {
            continue;
        }
        count += 1;
        let line = |l: Option<u32>| l.map(|n| n.to_string()).unwrap_or_default();
        let _ = write!(
            out,
            "\n**Duplicate {count}** (similarity: {:.2}):\n```\n{left}:{} | {}\n{right}:{} | {}\n```\n",
            evidence.similarity(),
            line(orig.line),
            truncate(&orig.content),
            line(dup.line),
            truncate(&dup.content),
        );
    }
    if count == 0 {
        out.push_str("*Code snippets not available*\n");
    }
    (out, count)
}

/// Issue title and body for a human-review finding.
pub fn issue_draft(
    finding: &RawFinding,
    ctx: &DuplicationContext,
    decision: &Decision,
    group: Option<&AggregatedFinding>,
    labels: &[String],
) -> IssueDraft {
    let evidence = &finding.evidence;
    let title = format!(
        "Code Duplication Review: {}",
        finding.title_or("Duplicate Code Detected")
    );
    let severity = finding
        .severity
        .as_deref()
        .unwrap_or("unknown")
        .to_uppercase();
    let description = finding
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or("Duplicate code patterns detected that require manual review.");

    let mut body = String::from("## Code Duplication Detected\n\n");
    let _ = writeln!(body, "**Similarity Score**: {}", percent(evidence.similarity()));
    let _ = writeln!(body, "**Severity**: {severity}");
    let _ = writeln!(body, "**Files Affected**: {}\n", ctx.file_count);
    let _ = writeln!(body, "### Description\n{description}\n");

    let _ = writeln!(body, "### Evidence");
    let _ = writeln!(
        body,
        "- **Similarity Score**: {}",
        percent(evidence.similarity())
    );
    let _ = writeln!(
        body,
        "- **Confidence**: {:.2}",
        evidence.confidence.unwrap_or(0.0)
    );
    let _ = writeln!(
        body,
        "- **Comparison Type**: {}\n",
        evidence.comparison_type.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(body, "### Files Involved\n{}\n", file_list(evidence));

    let _ = writeln!(body, "### Recommended Action");
    let _ = writeln!(body, "Manual review is recommended because:");
    for reason in manual_review_reasons(ctx) {
        let _ = writeln!(body, "- {reason}");
    }
    body.push('\n');

    if !decision.metadata.concerns.is_empty() {
        let _ = writeln!(body, "### Concerns");
        for concern in &decision.metadata.concerns {
            let _ = writeln!(body, "- {concern}");
        }
        body.push('\n');
    }

    let _ = writeln!(
        body,
        "### Decision\n{} (risk {:.1}, confidence {})\n",
        decision.justification, decision.risk_score, decision.confidence
    );

    body.push_str(
        "### Next Steps
1. Review the duplicate code patterns
2. Determine if consolidation is appropriate
3. If consolidating, create implementation plan
4. Test thoroughly due to complexity/risk factors

",
    );

    if let Some(group) = group {
        body.push_str(&code_snippets(group));
        body.push('\n');
    }

    body.push_str(
        "---\n*This issue was automatically created by the continuous improvement duplicate triage.*\n",
    );

    IssueDraft {
        title,
        body,
        labels: labels.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use triage_aggregator::aggregate;
    use triage_matrix::{evaluate, ContextDefaults, ContextOptions};

    fn risky_finding() -> RawFinding {
        serde_json::from_value(json!({
            "finding_id": "f9",
            "title": "Shared client setup",
            "severity": "high",
            "evidence": {
                "similarity_score": 0.88,
                "confidence": 0.91,
                "comparison_type": "semantic",
                "original_symbol": {"file": "api/a.py", "name": "Client", "line": 10,
                                    "content": "class Client:\n    pass"},
                "duplicate_symbol": {"file": "web/b.py", "name": "Client", "line": 20,
                                     "content": "class Client:\n    ..."},
                "cross_module": true,
                "is_public": true,
                "test_coverage": 45.0
            }
        }))
        .unwrap()
    }

    #[test]
    fn reasons_default_when_nothing_stands_out() {
        let ctx = ContextOptions::new()
            .similarity_score(0.9)
            .resolve(&ContextDefaults::default());
        assert_eq!(
            manual_review_reasons(&ctx),
            vec!["Complexity requires human judgment"]
        );
    }

    #[test]
    fn body_lists_evidence_reasons_concerns_and_snippets() {
        let finding = risky_finding();
        let ctx = ContextOptions::from_evidence(&finding.evidence)
            .resolve(&ContextDefaults::default());
        let decision = evaluate(&ctx);
        let groups = aggregate(std::slice::from_ref(&finding));
        let labels = vec!["code-duplication".to_string()];

        let draft = issue_draft(&finding, &ctx, &decision, groups.first(), &labels);
        assert_eq!(draft.title, "Code Duplication Review: Shared client setup");
        assert_eq!(draft.labels, labels);

        let body = &draft.body;
        assert!(body.contains("**Similarity Score**: 88%"));
        assert!(body.contains("**Severity**: HIGH"));
        assert!(body.contains("- **Confidence**: 0.91"));
        assert!(body.contains("- **Comparison Type**: semantic"));
        assert!(body.contains("- api/a.py\n- web/b.py"));
        assert!(body.contains("- Cross-module impact detected\n- Public API affected\n- Low test coverage"));
        assert!(body.contains("- Breaking API changes possible"));
        assert!(body.contains("### Code Snippets: a.py ↔ b.py"));
        assert!(body.contains("a.py:10 | class Client:"));
        assert!(body.contains("4. Test thoroughly due to complexity/risk factors"));
    }

    #[test]
    fn long_snippets_are_truncated() {
        let long = "x".repeat(250);
        assert_eq!(truncate(&long).len(), 203);
        assert!(truncate(&long).ends_with("..."));
        assert_eq!(truncate("short"), "short");
        assert_eq!(truncate(&"é".repeat(200)), "é".repeat(200));
    }

    fn pair_group(left: &str, right: &str, findings: usize) -> AggregatedFinding {
        let findings: Vec<RawFinding> = (0..findings)
            .map(|i| {
                serde_json::from_value(json!({
                    "finding_id": format!("{left}-{i}"),
                    "evidence": {
                        "similarity_score": 0.9,
                        "original_symbol": {"file": left, "name": format!("a{i}"), "content": format!("def a{i}(): pass")},
                        "duplicate_symbol": {"file": right, "name": format!("b{i}"), "content": format!("def b{i}(): pass")}
                    }
                }))
                .unwrap()
            })
            .collect();
        aggregate(&findings).remove(0)
    }

    #[test]
    fn one_pair_shows_at_most_five_snippets() {
        let snippets = code_snippets(&pair_group("a.py", "b.py", 7));
        assert_eq!(snippets.matches("**Duplicate ").count(), 5);
        assert!(snippets.contains("**Duplicate 5**"));
        assert!(!snippets.contains("**Duplicate 6**"));
    }

    #[test]
    fn batches_stop_at_ten_snippets_overall() {
        let groups = [
            pair_group("a.py", "b.py", 7),
            pair_group("c.py", "d.py", 4),
            pair_group("e.py", "f.py", 3),
            pair_group("g.py", "h.py", 2),
        ];
        let refs: Vec<&AggregatedFinding> = groups.iter().collect();
        let snippets = batch_code_snippets(&refs);

        assert_eq!(snippets.matches("**Duplicate ").count(), 10);
        assert!(snippets.contains("### Code Snippets: e.py ↔ f.py"));
        assert!(!snippets.contains("### Code Snippets: g.py ↔ h.py"));
    }

    #[test]
    fn snippet_placeholder_without_content() {
        let finding: RawFinding = serde_json::from_value(json!({
            "evidence": {
                "similarity_score": 0.9,
                "original_symbol": {"file": "a.py", "name": "load"},
                "duplicate_symbol": {"file": "b.py", "name": "load"}
            }
        }))
        .unwrap();
        let groups = aggregate(&[finding]);
        assert!(code_snippets(&groups[0]).contains("*Code snippets not available*"));
    }
}
