use crate::dispatch::DecisionEngine;
use crate::outcome::FindingOutcome;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use triage_aggregator::{AggregatedFinding, FilePairKey};
use triage_protocol::RawFinding;

/// Dispatches findings with at most `concurrency` in flight.
///
/// Results come back in input order. A worker that panics or is cancelled
/// yields an error outcome for its finding; the batch itself never fails.
pub async fn dispatch_all(
    engine: Arc<DecisionEngine>,
    findings: Vec<RawFinding>,
    groups: &[AggregatedFinding],
    concurrency: usize,
) -> Vec<FindingOutcome> {
    let concurrency = concurrency.max(1);
    let by_pair: HashMap<&FilePairKey, &AggregatedFinding> =
        groups.iter().map(|g| (&g.file_pair, g)).collect();

    let ids: Vec<String> = findings.iter().map(|f| f.finding_id.clone()).collect();
    let mut slots: Vec<Option<FindingOutcome>> = vec![None; findings.len()];
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut tasks = JoinSet::new();

    log::info!(
        "Dispatching {} findings with concurrency {concurrency}",
        findings.len()
    );

    for (index, finding) in findings.into_iter().enumerate() {
        let group = FilePairKey::of(&finding)
            .and_then(|key| by_pair.get(&key).map(|g| (*g).clone()));
        let engine = Arc::clone(&engine);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // Closed only on drop, which cannot happen while tasks hold a clone
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = engine
                .process_single_finding(&finding, group.as_ref())
                .await;
            (index, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(outcome);
                }
            }
            Err(err) => log::error!("Worker task failed: {err}"),
        }
    }

    slots
        .into_iter()
        .zip(ids)
        .map(|(slot, id)| {
            slot.unwrap_or_else(|| {
                FindingOutcome::failed(&id, "worker task failed before producing a result")
            })
        })
        .collect()
}
