//! # Recograph
//!
//! A graph-backed recommendation engine. Users, items and RATED edges live
//! in an adjacency-indexed in-memory property graph; on top of it the engine
//! offers memory-based collaborative filtering, contextual filtering against
//! attribute constraints weighted by a session-scoped user profile, hybrid
//! fusion of both signals, and evidence-backed textual explanations for any
//! recommended item.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recograph::{Config, Recommender};
//!
//! let engine = Recommender::from_dataset("movies", "./data", Config::default())?;
//! let recs = engine.recommend_cf("1", 5, 10)?;
//! let why = engine.explain_blackbox_recs("1", &recs[0].item, &["category"], 4.0)?;
//! ```
//!
//! Each [`Recommender`] owns its own graph; nothing is process-global.
//! Recommendation calls are read-only and safe to issue concurrently.

#![warn(missing_docs)]

pub mod dataset;
pub mod error;
pub mod model;
pub mod profile;
pub mod recsys;
pub mod store;

pub use error::{RecError, Result};
pub use model::{Node, NodeId, NodeKind, PropertyValue};
pub use profile::{ContextPreference, UserProfile};
pub use recsys::{Config, Recommender, ScoredItem};
pub use store::PropertyGraph;
