use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use triage_protocol::RawFinding;

const HIGH_SEVERITY_SIMILARITY: f64 = 0.85;

/// Order-independent file pair: `(a, b)` and `(b, a)` produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilePairKey(String, String);

impl FilePairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    /// Key for a finding whose symbols both name a file.
    pub fn of(finding: &RawFinding) -> Option<Self> {
        match finding.evidence.files().as_slice() {
            [a, b] => Some(Self::new(a, b)),
            _ => None,
        }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }

    pub fn contains(&self, file: &str) -> bool {
        self.0 == file || self.1 == file
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSymbol {
    pub original: String,
    pub duplicate: String,
    pub similarity: f64,
}

/// All raw findings sharing one file pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedFinding {
    pub finding_id: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub file_pair: FilePairKey,
    pub duplicate_count: usize,
    pub average_similarity: f64,
    pub symbol_types: BTreeSet<String>,
    pub duplicate_symbols: Vec<DuplicateSymbol>,
    pub individual_findings: Vec<RawFinding>,
}

impl AggregatedFinding {
    pub fn is_high_severity(&self) -> bool {
        self.severity == "high"
    }

    fn build(file_pair: FilePairKey, findings: Vec<RawFinding>) -> Self {
        let count = findings.len();
        let total: f64 = findings.iter().map(|f| f.evidence.similarity()).sum();
        let average_similarity = if count == 0 { 0.0 } else { total / count as f64 };

        let mut symbol_types = BTreeSet::new();
        let mut duplicate_symbols = Vec::with_capacity(count);
        for finding in &findings {
            let evidence = &finding.evidence;
            let orig = evidence.original_symbol.clone().unwrap_or_default();
            let dup = evidence.duplicate_symbol.clone().unwrap_or_default();
            symbol_types.insert(orig.kind_or_unknown().to_string());
            symbol_types.insert(dup.kind_or_unknown().to_string());
            duplicate_symbols.push(DuplicateSymbol {
                original: orig.name,
                duplicate: dup.name,
                similarity: evidence.similarity(),
            });
        }

        Self {
            finding_id: String::new(),
            title: format!(
                "Multiple duplicates between {} and {}",
                file_name(file_pair.first()),
                file_name(file_pair.second())
            ),
            description: format!(
                "Found {count} duplicate patterns between files with average similarity {average_similarity:.2}"
            ),
            severity: if average_similarity >= HIGH_SEVERITY_SIMILARITY {
                "high"
            } else {
                "medium"
            }
            .to_string(),
            file_pair,
            duplicate_count: count,
            average_similarity,
            symbol_types,
            duplicate_symbols,
            individual_findings: findings,
        }
    }
}

fn file_name(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
}

/// Groups findings by file pair, strongest clusters first.
///
/// Findings without both files are ignored. Identifiers are assigned after
/// sorting, so `aggregated_000` is always the top cluster.
pub fn aggregate(findings: &[RawFinding]) -> Vec<AggregatedFinding> {
    let mut groups: BTreeMap<FilePairKey, Vec<RawFinding>> = BTreeMap::new();
    for finding in findings {
        match FilePairKey::of(finding) {
            Some(key) => groups.entry(key).or_default().push(finding.clone()),
            None => log::trace!("Not aggregating {}: missing file", finding.finding_id),
        }
    }

    let mut aggregated: Vec<AggregatedFinding> = groups
        .into_iter()
        .map(|(key, group)| AggregatedFinding::build(key, group))
        .collect();

    aggregated.sort_by(|a, b| rank(a, b).then_with(|| a.file_pair.cmp(&b.file_pair)));
    for (idx, finding) in aggregated.iter_mut().enumerate() {
        finding.finding_id = format!("aggregated_{idx:03}");
    }

    log::debug!(
        "Aggregated {} finding(s) into {} file pair(s)",
        findings.len(),
        aggregated.len()
    );
    aggregated
}

/// Descending `(average_similarity, duplicate_count)`.
fn rank(a: &AggregatedFinding, b: &AggregatedFinding) -> Ordering {
    b.average_similarity
        .total_cmp(&a.average_similarity)
        .then_with(|| b.duplicate_count.cmp(&a.duplicate_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn finding(id: &str, a: &str, b: &str, sim: f64, kinds: (&str, &str)) -> RawFinding {
        serde_json::from_value(json!({
            "finding_id": id,
            "evidence": {
                "similarity_score": sim,
                "original_symbol": {"file": a, "name": format!("{id}_orig"), "type": kinds.0},
                "duplicate_symbol": {"file": b, "name": format!("{id}_dup"), "type": kinds.1},
            }
        }))
        .unwrap()
    }

    #[test]
    fn swapped_pairs_share_one_group() {
        let findings = vec![
            finding("f1", "src/a.py", "src/b.py", 0.9, ("function", "function")),
            finding("f2", "src/b.py", "src/a.py", 0.8, ("method", "")),
        ];
        let groups = aggregate(&findings);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.finding_id, "aggregated_000");
        assert_eq!(group.duplicate_count, 2);
        assert!((group.average_similarity - 0.85).abs() < 1e-9);
        assert_eq!(group.severity, "high");
        assert_eq!(group.title, "Multiple duplicates between a.py and b.py");
        assert_eq!(
            group.description,
            "Found 2 duplicate patterns between files with average similarity 0.85"
        );
        assert_eq!(
            group.symbol_types,
            BTreeSet::from([
                "function".to_string(),
                "method".to_string(),
                "unknown".to_string()
            ])
        );
        assert_eq!(
            group.duplicate_symbols[1],
            DuplicateSymbol {
                original: "f2_orig".to_string(),
                duplicate: "f2_dup".to_string(),
                similarity: 0.8,
            }
        );
    }

    #[test]
    fn groups_sorted_by_similarity_then_count() {
        let findings = vec![
            finding("f1", "a.py", "b.py", 0.8, ("function", "function")),
            finding("f2", "c.py", "d.py", 0.95, ("function", "function")),
            finding("f3", "e.py", "f.py", 0.8, ("function", "function")),
            finding("f4", "e.py", "f.py", 0.8, ("function", "function")),
        ];
        let groups = aggregate(&findings);
        let pairs: Vec<(&str, usize)> = groups
            .iter()
            .map(|g| (g.file_pair.first(), g.duplicate_count))
            .collect();
        assert_eq!(pairs, vec![("c.py", 1), ("e.py", 2), ("a.py", 1)]);
        assert_eq!(groups[2].finding_id, "aggregated_002");
        assert_eq!(groups[2].severity, "medium");
        assert!(groups.windows(2).all(|w| rank(&w[0], &w[1]).is_le()));
    }

    #[test]
    fn findings_without_both_files_are_ignored() {
        let mut orphan = finding("f1", "a.py", "b.py", 0.9, ("function", "function"));
        orphan.evidence.duplicate_symbol = None;
        assert!(aggregate(&[orphan]).is_empty());
    }
}
