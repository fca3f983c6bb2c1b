//! Core data model: node handles, property values, nodes.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Internal node handle. External callers address nodes by string key.
pub type NodeId = u64;

/// The two node types of the rating graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A person who rates items.
    User,
    /// A rateable catalog entry.
    Item,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::User => f.write_str("User"),
            NodeKind::Item => f.write_str("Item"),
        }
    }
}

/// A typed property value carried by a node.
///
/// `Tokens` is the multi-valued variant, e.g. a category field holding
/// several tokens. Everything else is scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum PropertyValue {
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar (a single token).
    Str(String),
    /// Multi-valued attribute: an ordered list of tokens.
    Tokens(Vec<String>),
}

impl PropertyValue {
    /// Total ordering across same-variant values, `None` across variants.
    /// Floats order via `total_cmp` so values can be sorted and deduplicated.
    pub fn cmp_value(&self, other: &PropertyValue) -> Option<Ordering> {
        match (self, other) {
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => Some(a.cmp(b)),
            (PropertyValue::Int(a), PropertyValue::Int(b)) => Some(a.cmp(b)),
            (PropertyValue::Float(a), PropertyValue::Float(b)) => Some(a.total_cmp(b)),
            (PropertyValue::Str(a), PropertyValue::Str(b)) => Some(a.cmp(b)),
            (PropertyValue::Tokens(a), PropertyValue::Tokens(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// True when this value is, or contains, the given token.
    ///
    /// Scalar strings match by equality; token lists match by containment;
    /// other variants never match a token.
    pub fn has_token(&self, token: &str) -> bool {
        match self {
            PropertyValue::Str(s) => s == token,
            PropertyValue::Tokens(ts) => ts.iter().any(|t| t == token),
            _ => false,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Str(v) => f.write_str(v),
            PropertyValue::Tokens(vs) => f.write_str(&vs.join(" ")),
        }
    }
}

/// A node of the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Internal handle, assigned by the store.
    pub id: NodeId,
    /// Node type.
    pub kind: NodeKind,
    /// External string identifier, unique per kind, immutable once created.
    pub key: String,
    /// Scalar or multi-valued attributes.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Node {
    /// Builds a node with no properties. The store assigns the final id.
    pub fn new(id: NodeId, kind: NodeKind, key: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            key: key.into(),
            properties: BTreeMap::new(),
        }
    }
}
