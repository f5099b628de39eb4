use tracing::debug;

use crate::capability::{EmbeddingMetadata, VectorIndex};
use crate::error::PrecheckError;

// Only the checked document is indexed.
pub const SOLE_DOCUMENT_BASELINE: f64 = 0.75;
// Every neighbor was an exact self-match.
pub const NO_PEER_FALLBACK: f64 = 0.8;
pub const NEIGHBOR_LIMIT: usize = 5;
const SELF_MATCH_EPSILON: f64 = 1e-9;

pub fn similarity_score(
    index: &dyn VectorIndex,
    task_id: &str,
    embedding: &[f32],
    metadata: &EmbeddingMetadata,
) -> Result<f64, PrecheckError> {
    if embedding.is_empty() {
        return Ok(0.0);
    }

    index
        .upsert(task_id, embedding, metadata)
        .map_err(|err| PrecheckError::capability("vector index", err))?;

    let keys = index
        .list_keys()
        .map_err(|err| PrecheckError::capability("vector index", err))?;
    if keys.len() <= 1 {
        debug!(task_id = %task_id, "no peer documents indexed, using baseline");
        return Ok(SOLE_DOCUMENT_BASELINE);
    }

    let neighbors = index
        .query_nearest(embedding, NEIGHBOR_LIMIT.min(keys.len()))
        .map_err(|err| PrecheckError::capability("vector index", err))?;

    let distances = neighbors
        .iter()
        .map(|hit| hit.distance)
        .filter(|distance| *distance > SELF_MATCH_EPSILON)
        .collect::<Vec<f64>>();
    debug!(
        task_id = %task_id,
        indexed = keys.len(),
        neighbors = neighbors.len(),
        peers = distances.len(),
        "similarity neighbors collected"
    );

    Ok(score_from_distances(&distances))
}

pub(crate) fn score_from_distances(distances: &[f64]) -> f64 {
    if distances.is_empty() {
        return NO_PEER_FALLBACK;
    }

    let total = distances
        .iter()
        .map(|distance| 1.0 / (1.0 + distance))
        .sum::<f64>();
    (total / distances.len() as f64).clamp(0.0, 1.0)
}
