use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{RecError, Result};
use crate::model::{Node, NodeId, NodeKind, PropertyValue};

/// Adjacency-indexed property graph of User and Item nodes joined by RATED
/// edges.
///
/// Nodes live in a flat table keyed by internal id, with one external-key
/// index per node kind. RATED edges are held in both directions
/// (user → {item: weight} and item → {user: weight}) so shared-item lookups
/// and rater enumeration are direct index reads. At most one RATED edge
/// exists per (user, item) pair; re-adding updates the weight in place.
#[derive(Debug, Default)]
pub struct PropertyGraph {
    nodes: FxHashMap<NodeId, Node>,
    user_index: FxHashMap<String, NodeId>,
    item_index: FxHashMap<String, NodeId>,
    rated_out: FxHashMap<NodeId, BTreeMap<NodeId, f64>>,
    rated_in: FxHashMap<NodeId, BTreeMap<NodeId, f64>>,
    next_node_id: NodeId,
}

impl PropertyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    fn index_for(&self, kind: NodeKind) -> &FxHashMap<String, NodeId> {
        match kind {
            NodeKind::User => &self.user_index,
            NodeKind::Item => &self.item_index,
        }
    }

    fn not_found(kind: NodeKind) -> RecError {
        match kind {
            NodeKind::User => RecError::NotFound("user"),
            NodeKind::Item => RecError::NotFound("item"),
        }
    }

    fn create_node(&mut self, kind: NodeKind, key: &str) -> NodeId {
        if let Some(&id) = self.index_for(kind).get(key) {
            return id;
        }
        self.next_node_id += 1;
        let id = self.next_node_id;
        self.nodes.insert(id, Node::new(id, kind, key));
        match kind {
            NodeKind::User => self.user_index.insert(key.to_string(), id),
            NodeKind::Item => self.item_index.insert(key.to_string(), id),
        };
        debug!(kind = %kind, key, id, "node created");
        id
    }

    /// Creates a User node, or returns the existing one for this key.
    pub fn create_user(&mut self, key: &str) -> NodeId {
        self.create_node(NodeKind::User, key)
    }

    /// Creates an Item node, or returns the existing one for this key.
    pub fn create_item(&mut self, key: &str) -> NodeId {
        self.create_node(NodeKind::Item, key)
    }

    /// Resolves an external key to its internal node id.
    pub fn node_id(&self, kind: NodeKind, key: &str) -> Result<NodeId> {
        self.index_for(kind)
            .get(key)
            .copied()
            .ok_or_else(|| Self::not_found(kind))
    }

    /// Looks up a node by kind and external key.
    pub fn node(&self, kind: NodeKind, key: &str) -> Result<&Node> {
        let id = self.node_id(kind, key)?;
        Ok(&self.nodes[&id])
    }

    /// Looks up a node by internal id.
    pub fn node_by_id(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Merges properties onto an existing node. Missing nodes are an error,
    /// never silently created.
    pub fn set_properties(
        &mut self,
        kind: NodeKind,
        key: &str,
        props: BTreeMap<String, PropertyValue>,
    ) -> Result<()> {
        let id = self.node_id(kind, key)?;
        let node = self.nodes.get_mut(&id).ok_or_else(|| Self::not_found(kind))?;
        for (name, value) in props {
            node.properties.insert(name, value);
        }
        Ok(())
    }

    /// Upserts the RATED edge between an existing user and an existing item.
    pub fn add_interaction(&mut self, user_key: &str, item_key: &str, weight: f64) -> Result<()> {
        if !weight.is_finite() {
            return Err(RecError::InvalidArgument(format!(
                "rating for item '{item_key}' is not finite"
            )));
        }
        let user = self.node_id(NodeKind::User, user_key)?;
        let item = self.node_id(NodeKind::Item, item_key)?;
        self.rated_out.entry(user).or_default().insert(item, weight);
        self.rated_in.entry(item).or_default().insert(user, weight);
        Ok(())
    }

    /// External keys of the items a user has rated.
    pub fn items_rated_by(&self, user_key: &str) -> Result<BTreeSet<String>> {
        let user = self.node_id(NodeKind::User, user_key)?;
        Ok(self
            .ratings_of(user)
            .keys()
            .map(|item| self.nodes[item].key.clone())
            .collect())
    }

    /// External keys of the users who rated an item.
    pub fn users_who_rated(&self, item_key: &str) -> Result<BTreeSet<String>> {
        let item = self.node_id(NodeKind::Item, item_key)?;
        Ok(self
            .raters_of(item)
            .keys()
            .map(|user| self.nodes[user].key.clone())
            .collect())
    }

    /// Outgoing rating vector of a user (item id → weight).
    pub fn ratings_of(&self, user: NodeId) -> &BTreeMap<NodeId, f64> {
        static EMPTY: BTreeMap<NodeId, f64> = BTreeMap::new();
        self.rated_out.get(&user).unwrap_or(&EMPTY)
    }

    /// Incoming rating vector of an item (user id → weight).
    pub fn raters_of(&self, item: NodeId) -> &BTreeMap<NodeId, f64> {
        static EMPTY: BTreeMap<NodeId, f64> = BTreeMap::new();
        self.rated_in.get(&item).unwrap_or(&EMPTY)
    }

    /// Weight of the RATED edge between a user and an item, if present.
    pub fn rating(&self, user: NodeId, item: NodeId) -> Option<f64> {
        self.rated_out.get(&user).and_then(|r| r.get(&item)).copied()
    }

    /// Mean of a user's rating weights, `None` for a user with no history.
    pub fn mean_rating_of(&self, user: NodeId) -> Option<f64> {
        let ratings = self.ratings_of(user);
        if ratings.is_empty() {
            return None;
        }
        Some(ratings.values().sum::<f64>() / ratings.len() as f64)
    }

    /// Mean of all RATED weights, `None` for a graph with no ratings.
    pub fn global_mean(&self) -> Option<f64> {
        let mut sum = 0.0;
        let mut count = 0usize;
        for ratings in self.rated_out.values() {
            sum += ratings.values().sum::<f64>();
            count += ratings.len();
        }
        (count > 0).then(|| sum / count as f64)
    }

    /// Internal ids of all items, ordered by external key.
    pub fn item_ids(&self) -> Vec<NodeId> {
        let mut entries: Vec<(&String, NodeId)> =
            self.item_index.iter().map(|(k, &id)| (k, id)).collect();
        entries.sort();
        entries.into_iter().map(|(_, id)| id).collect()
    }

    /// Internal ids of all users, ordered by external key.
    pub fn user_ids(&self) -> Vec<NodeId> {
        let mut entries: Vec<(&String, NodeId)> =
            self.user_index.iter().map(|(k, &id)| (k, id)).collect();
        entries.sort();
        entries.into_iter().map(|(_, id)| id).collect()
    }

    /// Number of User nodes.
    pub fn user_count(&self) -> usize {
        self.user_index.len()
    }

    /// Number of Item nodes.
    pub fn item_count(&self) -> usize {
        self.item_index.len()
    }

    /// Number of RATED edges.
    pub fn rating_count(&self) -> usize {
        self.rated_out.values().map(|r| r.len()).sum()
    }

    /// Multiset of the distinct values carried by an attribute across all
    /// nodes of a kind, as (value, occurrence count) pairs.
    ///
    /// Multi-valued (`Tokens`) attribute values are split into individual
    /// tokens before counting; scalar values pass through untouched.
    /// Downstream recommender logic assumes category-like attributes arrive
    /// pre-tokenized.
    pub fn distinct_values(&self, kind: NodeKind, attribute: &str) -> Vec<(PropertyValue, usize)> {
        let ids = match kind {
            NodeKind::User => self.user_ids(),
            NodeKind::Item => self.item_ids(),
        };
        let mut observed: Vec<PropertyValue> = Vec::new();
        for id in ids {
            match self.nodes[&id].properties.get(attribute) {
                Some(PropertyValue::Tokens(tokens)) => {
                    observed.extend(tokens.iter().cloned().map(PropertyValue::Str));
                }
                Some(value) => observed.push(value.clone()),
                None => {}
            }
        }
        observed.sort_by(|a, b| {
            variant_rank(a)
                .cmp(&variant_rank(b))
                .then_with(|| a.cmp_value(b).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut out: Vec<(PropertyValue, usize)> = Vec::new();
        for value in observed {
            match out.last_mut() {
                Some((last, count)) if *last == value => *count += 1,
                _ => out.push((value, 1)),
            }
        }
        out
    }
}

fn variant_rank(value: &PropertyValue) -> u8 {
    match value {
        PropertyValue::Bool(_) => 0,
        PropertyValue::Int(_) => 1,
        PropertyValue::Float(_) => 2,
        PropertyValue::Str(_) => 3,
        PropertyValue::Tokens(_) => 4,
    }
}
