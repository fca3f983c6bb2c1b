//! User-user similarity over shared rating history.

use std::collections::BTreeMap;

use crate::model::NodeId;

/// A candidate neighbor: another user sharing rated items with the target.
#[derive(Debug, Clone)]
pub struct Neighbor {
    /// Internal node id of the neighbor.
    pub id: NodeId,
    /// External user identifier, used for deterministic tie-breaking.
    pub key: String,
    /// Cosine similarity over the shared items.
    pub similarity: f64,
    /// Number of items rated by both users.
    pub shared_items: usize,
    /// The neighbor's own mean rating, the anchor for deviation scoring.
    pub mean_rating: f64,
}

/// Cosine similarity of two rating vectors restricted to their shared items.
///
/// Returns `(similarity, shared item count)`, or `None` when the users share
/// no items or a restricted vector has zero norm. Unlike Pearson correlation
/// this stays well-defined for a single shared item, which is why the
/// tie-breaks on shared count and user id matter on small catalogs.
pub fn cosine_over_shared(
    a: &BTreeMap<NodeId, f64>,
    b: &BTreeMap<NodeId, f64>,
) -> Option<(f64, usize)> {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut dot = 0.0;
    let mut norm_small = 0.0;
    let mut norm_large = 0.0;
    let mut shared = 0usize;
    for (item, rs) in small {
        if let Some(rl) = large.get(item) {
            dot += rs * rl;
            norm_small += rs * rs;
            norm_large += rl * rl;
            shared += 1;
        }
    }
    if shared == 0 {
        return None;
    }
    let denom = norm_small.sqrt() * norm_large.sqrt();
    if denom == 0.0 {
        return None;
    }
    Some((dot / denom, shared))
}

/// Orders neighbors by similarity descending, then larger shared-item count,
/// then ascending user id.
pub fn order_neighbors(neighbors: &mut [Neighbor]) {
    neighbors.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| b.shared_items.cmp(&a.shared_items))
            .then_with(|| a.key.cmp(&b.key))
    });
}
