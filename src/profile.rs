//! Session-scoped user preference model.
//!
//! A [`UserProfile`] is created and owned by the caller, mutated through its
//! own API, and discarded when the session ends. It is independent of the
//! graph store: `item_prefs` scores are client-local and unrelated to RATED
//! edge weights.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RecError, Result};

/// A typed preference over one context attribute.
///
/// `Dict` is the variant used for multi-valued attributes like genre: it maps
/// category tokens to an accept/reject flag. The tags are explicit so every
/// consumer handles all three shapes exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ContextPreference {
    /// On/off preference for the whole attribute.
    Bool(bool),
    /// Proportional weight for the attribute.
    Num(f64),
    /// Per-token preference for a multi-valued attribute.
    Dict(BTreeMap<String, bool>),
}

impl ContextPreference {
    /// Multiplicative weight this preference assigns to a matched token.
    ///
    /// `Bool` acts as 1/0, `Num` scales proportionally, `Dict` consults the
    /// matched token (absent tokens are neutral, not a veto).
    pub fn weight_for(&self, token: &str) -> f64 {
        match self {
            ContextPreference::Bool(true) => 1.0,
            ContextPreference::Bool(false) => 0.0,
            ContextPreference::Num(w) => *w,
            ContextPreference::Dict(entries) => match entries.get(token) {
                Some(true) | None => 1.0,
                Some(false) => 0.0,
            },
        }
    }
}

/// A user's declared contextual preferences and client-local item scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Identifier of the user this profile belongs to.
    pub user_id: String,
    /// Preference per context attribute. Keys are unique.
    pub context_prefs: BTreeMap<String, ContextPreference>,
    /// Item identifier → preference score, independent of RATED edges.
    pub item_prefs: BTreeMap<String, f64>,
}

impl UserProfile {
    /// Creates an empty profile for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            context_prefs: BTreeMap::new(),
            item_prefs: BTreeMap::new(),
        }
    }

    /// Defines a new context attribute preference. Redefining an existing
    /// attribute is an error; use [`UserProfile::update_context_preference`].
    pub fn add_context_def(&mut self, name: &str, pref: ContextPreference) -> Result<()> {
        if self.context_prefs.contains_key(name) {
            return Err(RecError::InvalidArgument(format!(
                "context '{name}' is already defined"
            )));
        }
        self.context_prefs.insert(name.to_string(), pref);
        Ok(())
    }

    /// Removes a context definition. Removing one that does not exist is an
    /// error, not a no-op.
    pub fn remove_context_def(&mut self, name: &str) -> Result<ContextPreference> {
        self.context_prefs
            .remove(name)
            .ok_or_else(|| RecError::InvalidArgument(format!("context '{name}' is not defined")))
    }

    /// Updates an existing context preference.
    ///
    /// Dict updates merge entry-by-entry; scalar updates replace the value.
    /// The variant must match the existing definition.
    pub fn update_context_preference(&mut self, name: &str, value: ContextPreference) -> Result<()> {
        let current = self.context_prefs.get_mut(name).ok_or_else(|| {
            RecError::InvalidArgument(format!("context '{name}' is not defined"))
        })?;
        match (current, value) {
            (ContextPreference::Dict(entries), ContextPreference::Dict(updates)) => {
                entries.extend(updates);
            }
            (ContextPreference::Bool(slot), ContextPreference::Bool(v)) => *slot = v,
            (ContextPreference::Num(slot), ContextPreference::Num(v)) => *slot = v,
            _ => {
                return Err(RecError::InvalidArgument(format!(
                    "context '{name}' update does not match its defined variant"
                )))
            }
        }
        Ok(())
    }

    /// Removes preference entries from a `Dict` context: the named tokens, or
    /// every token when `keys` is `None`.
    ///
    /// Scalar preferences have no empty state; dropping the definition via
    /// [`UserProfile::remove_context_def`] is the only removal for them.
    pub fn remove_context_preference(&mut self, name: &str, keys: Option<&[&str]>) -> Result<()> {
        let current = self.context_prefs.get_mut(name).ok_or_else(|| {
            RecError::InvalidArgument(format!("context '{name}' is not defined"))
        })?;
        let ContextPreference::Dict(entries) = current else {
            return Err(RecError::InvalidArgument(format!(
                "context '{name}' is scalar; remove its definition instead"
            )));
        };
        match keys {
            Some(keys) => {
                for key in keys {
                    entries.remove(*key);
                }
            }
            None => entries.clear(),
        }
        Ok(())
    }

    /// Adds or updates item preference scores. Scores must be finite.
    pub fn add_item_preferences(&mut self, prefs: &[(&str, f64)]) -> Result<()> {
        for (item, score) in prefs {
            if !score.is_finite() {
                return Err(RecError::InvalidArgument(format!(
                    "preference score for item '{item}' is not finite"
                )));
            }
        }
        for (item, score) in prefs {
            self.item_prefs.insert((*item).to_string(), *score);
        }
        Ok(())
    }

    /// Removes item preferences. Unknown items are skipped with a warning.
    pub fn remove_item_preferences(&mut self, items: &[&str]) {
        for item in items {
            if self.item_prefs.remove(*item).is_none() {
                warn!(item, "item not found in profile preferences");
            }
        }
    }

    /// Weight this profile assigns to a token matched under an attribute.
    /// Attributes without a declared preference are neutral.
    pub fn weight_for(&self, attribute: &str, token: &str) -> f64 {
        self.context_prefs
            .get(attribute)
            .map_or(1.0, |pref| pref.weight_for(token))
    }
}
