//! Hybrid fusion of collaborative and contextual rankings.

use std::collections::BTreeMap;

use super::{cf, contextual, rank_items, Config, ScoredItem};
use crate::error::Result;
use crate::model::{NodeKind, PropertyValue};
use crate::profile::UserProfile;
use crate::store::PropertyGraph;

/// Fuses collaborative and contextual rankings into one list.
///
/// Both signals are computed over a pool wider than `top_n` so enough
/// candidates survive fusion, then min-max normalized per list. Predicted
/// ratings and match counts live on unrelated scales; summing them raw would
/// let one signal starve the other. An item present in only one list
/// contributes zero for the missing signal.
pub fn recommend(
    graph: &PropertyGraph,
    baseline: f64,
    config: &Config,
    user_id: &str,
    item_props: &BTreeMap<String, PropertyValue>,
    profile: Option<&UserProfile>,
    k: usize,
    top_n: usize,
) -> Result<Vec<ScoredItem>> {
    if k == 0 || top_n == 0 {
        // Still resolve the user so unknown identifiers stay an error.
        graph.node_id(NodeKind::User, user_id)?;
        return Ok(Vec::new());
    }
    let pool = top_n.saturating_mul(config.candidate_pool_factor);
    let collaborative = cf::recommend(graph, baseline, config, user_id, k, pool)?;
    let contextual = contextual::recommend(graph, user_id, item_props, profile, pool)?;

    let mut fused: BTreeMap<String, f64> = BTreeMap::new();
    for entry in normalize(collaborative) {
        *fused.entry(entry.item).or_insert(0.0) += entry.score;
    }
    for entry in normalize(contextual) {
        *fused.entry(entry.item).or_insert(0.0) += entry.score;
    }

    let mut scored: Vec<ScoredItem> = fused
        .into_iter()
        .map(|(item, score)| ScoredItem { item, score })
        .collect();
    rank_items(&mut scored);
    scored.truncate(top_n);
    Ok(scored)
}

/// Min-max normalization to [0, 1]. A list whose scores are all equal maps
/// every entry to 1.0 so a degenerate signal still contributes instead of
/// vanishing.
fn normalize(mut list: Vec<ScoredItem>) -> Vec<ScoredItem> {
    let Some(first) = list.first() else {
        return list;
    };
    let mut min = first.score;
    let mut max = first.score;
    for entry in &list {
        min = min.min(entry.score);
        max = max.max(entry.score);
    }
    for entry in &mut list {
        entry.score = if max > min {
            (entry.score - min) / (max - min)
        } else {
            1.0
        };
    }
    list
}
