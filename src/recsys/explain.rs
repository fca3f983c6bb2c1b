//! Evidence-backed explanations for a recommended (user, item) pair.

use tracing::debug;

use crate::error::Result;
use crate::model::{Node, NodeId, NodeKind, PropertyValue};
use crate::store::PropertyGraph;

/// Explains why `item_id` suits `user_id` in terms of peer evidence.
///
/// Walks the users who rated `item_id` at or above `min_rating`, the items
/// each of them shares with the target's history, and the `shared_props`
/// attribute values carried by both the shared item and the recommended one.
/// Every qualifying (peer, shared item, attribute value) triple yields one
/// sentence. No overlap is a valid outcome: the result is empty, not an
/// error.
pub fn explain(
    graph: &PropertyGraph,
    user_id: &str,
    item_id: &str,
    shared_props: &[&str],
    min_rating: f64,
) -> Result<Vec<String>> {
    let target = graph.node_id(NodeKind::User, user_id)?;
    let item = graph.node_id(NodeKind::Item, item_id)?;
    let Some(recommended) = graph.node_by_id(item) else {
        return Ok(Vec::new());
    };
    let target_ratings = graph.ratings_of(target);

    let mut peers: Vec<(String, NodeId)> = graph
        .raters_of(item)
        .iter()
        .filter(|(peer, weight)| **peer != target && **weight >= min_rating)
        .filter_map(|(peer, _)| graph.node_by_id(*peer).map(|n| (n.key.clone(), *peer)))
        .collect();
    peers.sort();

    let mut sentences = Vec::new();
    for (_, peer) in peers {
        let peer_ratings = graph.ratings_of(peer);
        let mut shared: Vec<(String, NodeId)> = target_ratings
            .keys()
            .filter(|liked| **liked != item && peer_ratings.contains_key(*liked))
            .filter_map(|liked| graph.node_by_id(*liked).map(|n| (n.key.clone(), *liked)))
            .collect();
        shared.sort();

        for (_, liked) in shared {
            let Some(liked_node) = graph.node_by_id(liked) else {
                continue;
            };
            for attribute in shared_props {
                let liked_tokens = attribute_tokens(liked_node, attribute);
                let mut values = attribute_tokens(recommended, attribute);
                values.retain(|v| liked_tokens.contains(v));
                values.sort();
                values.dedup();
                for value in values {
                    sentences.push(format!(
                        "You liked {}, and users who rated {} highly also liked items \
                         with similar {}: {}",
                        display_name(liked_node),
                        display_name(recommended),
                        attribute,
                        value
                    ));
                }
            }
        }
    }
    debug!(
        user = user_id,
        item = item_id,
        evidence = sentences.len(),
        "explanation generated"
    );
    Ok(sentences)
}

/// The comparable tokens of an attribute: a token list as-is, a scalar as its
/// rendered form, an absent attribute as nothing.
fn attribute_tokens(node: &Node, attribute: &str) -> Vec<String> {
    match node.properties.get(attribute) {
        Some(PropertyValue::Tokens(tokens)) => tokens.clone(),
        Some(value) => vec![value.to_string()],
        None => Vec::new(),
    }
}

fn display_name(node: &Node) -> &str {
    match node.properties.get("name") {
        Some(PropertyValue::Str(name)) => name,
        _ => &node.key,
    }
}
