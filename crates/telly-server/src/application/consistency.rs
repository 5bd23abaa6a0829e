//! Record set / vector index reconciliation run on load.

use std::collections::HashSet;

use serde::Serialize;

use telly::{DomainError, VectorIndex};

use super::Deadline;

/// Outcome of verifying that every vector belongs to a record and every
/// embeddable record has a vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub records: usize,
    pub vectors: usize,
    /// Vectors whose record no longer exists
    pub orphans_removed: usize,
    /// Records whose vector was missing and was rebuilt from the stored embedding
    pub reindexed: usize,
    /// Records with no usable embedding and no vector
    pub unindexed: usize,
}

/// Reload `index` and repair it against `records` (id, stored embedding).
/// Records may carry an empty embedding; those are kept if the index already
/// has a vector for them.
pub async fn reconcile(
    store: &str,
    index: &dyn VectorIndex,
    deadline: &Deadline,
    records: Vec<(String, Vec<f32>)>,
) -> Result<ConsistencyReport, DomainError> {
    deadline.run("vector.load", || index.load()).await?;
    let indexed: HashSet<String> = deadline
        .run("vector.ids", || index.ids())
        .await?
        .into_iter()
        .collect();

    let mut report = ConsistencyReport {
        records: records.len(),
        ..Default::default()
    };
    let known: HashSet<&str> = records.iter().map(|(id, _)| id.as_str()).collect();

    for orphan in indexed.iter().filter(|id| !known.contains(id.as_str())) {
        deadline.run("vector.remove", || index.remove(orphan)).await?;
        report.orphans_removed += 1;
    }

    for (id, embedding) in &records {
        if indexed.contains(id) {
            continue;
        }
        if embedding.len() == index.dimension() {
            deadline
                .run("vector.add", || index.add(id, embedding.clone()))
                .await?;
            report.reindexed += 1;
        } else {
            report.unindexed += 1;
        }
    }

    if report.orphans_removed > 0 || report.reindexed > 0 {
        deadline.run("vector.persist", || index.persist()).await?;
    }
    report.vectors = deadline.run("vector.len", || index.len()).await?;

    tracing::info!(
        store,
        backend = index.backend(),
        records = report.records,
        vectors = report.vectors,
        orphans_removed = report.orphans_removed,
        reindexed = report.reindexed,
        unindexed = report.unindexed,
        "Vector index verified"
    );
    Ok(report)
}
