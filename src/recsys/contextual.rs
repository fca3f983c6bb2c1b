//! Contextual filtering: match items against attribute constraints.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use super::{rank_items, ScoredItem};
use crate::error::Result;
use crate::model::{NodeKind, PropertyValue};
use crate::profile::UserProfile;
use crate::store::PropertyGraph;

/// Ranks the items the user has not rated by match against the caller's
/// attribute constraints.
///
/// A scalar constraint contributes one unit on exact equality; a token
/// constraint contributes one unit when the item's (possibly multi-valued)
/// attribute contains it. Each contribution is scaled by the profile's weight
/// for the matched value when a profile is supplied. Items with zero total
/// score are excluded.
pub fn recommend(
    graph: &PropertyGraph,
    user_id: &str,
    item_props: &BTreeMap<String, PropertyValue>,
    profile: Option<&UserProfile>,
    top_n: usize,
) -> Result<Vec<ScoredItem>> {
    let target = graph.node_id(NodeKind::User, user_id)?;
    if top_n == 0 {
        return Ok(Vec::new());
    }
    let rated = graph.ratings_of(target);

    let mut scored = Vec::new();
    for item in graph.item_ids() {
        if rated.contains_key(&item) {
            continue;
        }
        let Some(node) = graph.node_by_id(item) else {
            continue;
        };
        let mut score = 0.0;
        for (attribute, constraint) in item_props {
            let Some(value) = node.properties.get(attribute) else {
                continue;
            };
            match constraint {
                PropertyValue::Str(token) => {
                    if value.has_token(token) {
                        score += weight(profile, attribute, token);
                    }
                }
                PropertyValue::Tokens(tokens) => {
                    for token in tokens {
                        if value.has_token(token) {
                            score += weight(profile, attribute, token);
                        }
                    }
                }
                scalar => {
                    if value.cmp_value(scalar) == Some(Ordering::Equal) {
                        score += weight(profile, attribute, &scalar.to_string());
                    }
                }
            }
        }
        if score > 0.0 {
            scored.push(ScoredItem {
                item: node.key.clone(),
                score,
            });
        }
    }
    debug!(user = user_id, matched = scored.len(), "contextual match");
    rank_items(&mut scored);
    scored.truncate(top_n);
    Ok(scored)
}

fn weight(profile: Option<&UserProfile>, attribute: &str, token: &str) -> f64 {
    profile.map_or(1.0, |p| p.weight_for(attribute, token))
}
