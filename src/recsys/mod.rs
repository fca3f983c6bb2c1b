//! The recommendation engine: collaborative filtering, contextual filtering,
//! hybrid fusion, and explanation generation over a shared property graph.

mod cf;
mod contextual;
mod explain;
mod hybrid;
mod similarity;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::Dataset;
use crate::error::{acquire_read, acquire_write, Result};
use crate::model::{NodeKind, PropertyValue};
use crate::profile::UserProfile;
use crate::store::PropertyGraph;

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct Config {
    /// How much wider than `top_n` the per-signal candidate pool is during
    /// hybrid fusion, so enough overlap survives the merge.
    pub candidate_pool_factor: usize,
    /// Similarity a user must exceed to qualify as a CF neighbor.
    pub min_similarity: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            candidate_pool_factor: 3,
            min_similarity: 0.0,
        }
    }
}

/// One entry of a ranked recommendation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    /// External item identifier.
    pub item: String,
    /// Predicted rating (CF), match score (contextual), or fused score.
    pub score: f64,
}

/// Orders a scored list: score descending, ties by item id ascending.
pub(crate) fn rank_items(items: &mut [ScoredItem]) {
    items.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.item.cmp(&b.item)));
}

/// A recommendation engine instance bound to one property graph.
///
/// Each instance owns its graph; multiple isolated instances can coexist in
/// one process. Recommendation calls are read-only and may run concurrently;
/// mutating calls serialize on the write side of the store lock. The only
/// cross-call state beyond the graph is the rarely-refreshed global baseline.
#[derive(Debug)]
pub struct Recommender {
    graph: RwLock<PropertyGraph>,
    baseline: RwLock<f64>,
    config: Config,
}

impl Recommender {
    /// Creates an engine over an empty graph.
    pub fn new(config: Config) -> Self {
        Self {
            graph: RwLock::new(PropertyGraph::new()),
            baseline: RwLock::new(0.0),
            config,
        }
    }

    /// Loads `<dir>/<name>.user`, `<name>.item` and `<name>.inter`, seeds the
    /// graph from them and fixes the global baseline to the mean of the
    /// loaded ratings.
    pub fn from_dataset(name: &str, dir: impl AsRef<Path>, config: Config) -> Result<Self> {
        let dataset = Dataset::load(name, dir)?;
        let mut graph = PropertyGraph::new();
        for user in dataset.users {
            graph.create_user(&user.key);
            graph.set_properties(NodeKind::User, &user.key, user.properties)?;
        }
        for item in dataset.items {
            graph.create_item(&item.key);
            graph.set_properties(NodeKind::Item, &item.key, item.properties)?;
        }
        for interaction in dataset.interactions {
            graph.create_user(&interaction.user);
            graph.create_item(&interaction.item);
            graph.add_interaction(&interaction.user, &interaction.item, interaction.rating)?;
        }
        let baseline = graph.global_mean().unwrap_or(0.0);
        info!(
            dataset = name,
            users = graph.user_count(),
            items = graph.item_count(),
            ratings = graph.rating_count(),
            baseline,
            "dataset loaded"
        );
        Ok(Self {
            graph: RwLock::new(graph),
            baseline: RwLock::new(baseline),
            config,
        })
    }

    /// The global mean rating used as the CF bias term.
    pub fn global_baseline(&self) -> Result<f64> {
        Ok(*acquire_read(&self.baseline)?)
    }

    /// Recomputes the global baseline from the current ratings. The baseline
    /// is fixed at load time and does not track later interactions; callers
    /// that keep ingesting invoke this at their own cadence.
    pub fn refresh_baseline(&self) -> Result<f64> {
        let mean = acquire_read(&self.graph)?.global_mean().unwrap_or(0.0);
        *acquire_write(&self.baseline)? = mean;
        Ok(mean)
    }

    /// Creates a User node, or leaves an existing one untouched.
    pub fn create_user(&self, user_id: &str) -> Result<String> {
        acquire_write(&self.graph)?.create_user(user_id);
        Ok(user_id.to_string())
    }

    /// Merges properties onto an existing user.
    pub fn add_user_properties(
        &self,
        user_id: &str,
        props: BTreeMap<String, PropertyValue>,
    ) -> Result<()> {
        acquire_write(&self.graph)?.set_properties(NodeKind::User, user_id, props)
    }

    /// Merges properties onto an existing item.
    pub fn add_item_properties(
        &self,
        item_id: &str,
        props: BTreeMap<String, PropertyValue>,
    ) -> Result<()> {
        acquire_write(&self.graph)?.set_properties(NodeKind::Item, item_id, props)
    }

    /// Records rating interactions for an existing user. Unknown items are
    /// created on first interaction; re-rating an item updates the edge
    /// weight instead of duplicating it.
    pub fn add_user_interactions(&self, user_id: &str, interactions: &[(&str, f64)]) -> Result<()> {
        let mut graph = acquire_write(&self.graph)?;
        graph.node_id(NodeKind::User, user_id)?;
        for (item_id, rating) in interactions {
            graph.create_item(item_id);
            graph.add_interaction(user_id, item_id, *rating)?;
        }
        Ok(())
    }

    /// Items the user has rated.
    pub fn get_items_by_user(&self, user_id: &str) -> Result<BTreeSet<String>> {
        acquire_read(&self.graph)?.items_rated_by(user_id)
    }

    /// Users who rated the item.
    pub fn get_users_by_item(&self, item_id: &str) -> Result<BTreeSet<String>> {
        acquire_read(&self.graph)?.users_who_rated(item_id)
    }

    /// Distinct values of an attribute across all nodes of a kind, with
    /// multi-valued attributes split into individual tokens.
    pub fn get_unique_feat_values(
        &self,
        kind: NodeKind,
        attribute: &str,
    ) -> Result<Vec<PropertyValue>> {
        Ok(acquire_read(&self.graph)?
            .distinct_values(kind, attribute)
            .into_iter()
            .map(|(value, _)| value)
            .collect())
    }

    /// Collaborative-filtering recommendations: top `top_n` unseen items
    /// scored from the `k` most similar users.
    pub fn recommend_cf(&self, user_id: &str, k: usize, top_n: usize) -> Result<Vec<ScoredItem>> {
        let graph = acquire_read(&self.graph)?;
        let baseline = *acquire_read(&self.baseline)?;
        cf::recommend(&graph, baseline, &self.config, user_id, k, top_n)
    }

    /// Contextual recommendations: unseen items ranked by match against
    /// `item_props`, weighted by the profile when one is supplied.
    pub fn recommend_contextual(
        &self,
        user_id: &str,
        item_props: &BTreeMap<String, PropertyValue>,
        profile: Option<&UserProfile>,
        top_n: usize,
    ) -> Result<Vec<ScoredItem>> {
        let graph = acquire_read(&self.graph)?;
        contextual::recommend(&graph, user_id, item_props, profile, top_n)
    }

    /// Hybrid recommendations: both signals over a widened pool, min-max
    /// normalized and summed.
    pub fn recommend_hybrid(
        &self,
        user_id: &str,
        item_props: &BTreeMap<String, PropertyValue>,
        profile: Option<&UserProfile>,
        k: usize,
        top_n: usize,
    ) -> Result<Vec<ScoredItem>> {
        let graph = acquire_read(&self.graph)?;
        let baseline = *acquire_read(&self.baseline)?;
        hybrid::recommend(
            &graph, baseline, &self.config, user_id, item_props, profile, k, top_n,
        )
    }

    /// Peer-evidence explanations for a recommended item. An empty result
    /// means no traceable evidence, not an error.
    pub fn explain_blackbox_recs(
        &self,
        user_id: &str,
        item_id: &str,
        shared_props: &[&str],
        min_rating: f64,
    ) -> Result<Vec<String>> {
        let graph = acquire_read(&self.graph)?;
        explain::explain(&graph, user_id, item_id, shared_props, min_rating)
    }
}
