//! Memory-based collaborative filtering.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::similarity::{cosine_over_shared, order_neighbors, Neighbor};
use super::{rank_items, Config, ScoredItem};
use crate::error::Result;
use crate::model::{NodeId, NodeKind};
use crate::store::PropertyGraph;

/// Neighborhood collaborative filtering.
///
/// Finds the `k` users most similar to the target over shared rating
/// history, then predicts a score for every item rated by a neighbor but not
/// by the target: the global baseline plus the similarity-weighted average of
/// each rating's deviation from that neighbor's own mean.
pub fn recommend(
    graph: &PropertyGraph,
    baseline: f64,
    config: &Config,
    user_id: &str,
    k: usize,
    top_n: usize,
) -> Result<Vec<ScoredItem>> {
    let target = graph.node_id(NodeKind::User, user_id)?;
    if k == 0 || top_n == 0 {
        return Ok(Vec::new());
    }
    let target_ratings = graph.ratings_of(target);
    if target_ratings.is_empty() {
        debug!(user = user_id, "no rating history, no collaborative signal");
        return Ok(Vec::new());
    }

    let neighbors = neighborhood(graph, config, target, target_ratings, k);
    if neighbors.is_empty() {
        return Ok(Vec::new());
    }
    debug!(
        user = user_id,
        neighborhood = neighbors.len(),
        top = neighbors[0].similarity,
        "cf neighborhood selected"
    );

    // Weighted mean deviation per candidate item, over neighbors who rated it.
    let mut accumulated: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for neighbor in &neighbors {
        for (item, rating) in graph.ratings_of(neighbor.id) {
            if target_ratings.contains_key(item) {
                continue;
            }
            let Some(node) = graph.node_by_id(*item) else {
                continue;
            };
            let entry = accumulated.entry(node.key.clone()).or_insert((0.0, 0.0));
            entry.0 += neighbor.similarity * (rating - neighbor.mean_rating);
            entry.1 += neighbor.similarity.abs();
        }
    }

    let mut scored: Vec<ScoredItem> = accumulated
        .into_iter()
        .filter(|(_, (_, weight))| *weight > 0.0)
        .map(|(item, (deviation, weight))| ScoredItem {
            item,
            score: baseline + deviation / weight,
        })
        .collect();
    rank_items(&mut scored);
    scored.truncate(top_n);
    Ok(scored)
}

/// The `k` most similar users sharing at least one rated item with the
/// target. Each similarity reads only the two rating vectors involved.
fn neighborhood(
    graph: &PropertyGraph,
    config: &Config,
    target: NodeId,
    target_ratings: &BTreeMap<NodeId, f64>,
    k: usize,
) -> Vec<Neighbor> {
    let mut candidates: BTreeSet<NodeId> = BTreeSet::new();
    for item in target_ratings.keys() {
        for other in graph.raters_of(*item).keys() {
            if *other != target {
                candidates.insert(*other);
            }
        }
    }

    let mut neighbors = Vec::new();
    for other in candidates {
        let Some((similarity, shared_items)) =
            cosine_over_shared(target_ratings, graph.ratings_of(other))
        else {
            continue;
        };
        if similarity <= config.min_similarity {
            continue;
        }
        let Some(node) = graph.node_by_id(other) else {
            continue;
        };
        let Some(mean_rating) = graph.mean_rating_of(other) else {
            continue;
        };
        neighbors.push(Neighbor {
            id: other,
            key: node.key.clone(),
            similarity,
            shared_items,
            mean_rating,
        });
    }
    order_neighbors(&mut neighbors);
    neighbors.truncate(k);
    neighbors
}
