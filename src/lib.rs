// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # node-recommender
//!
//! Statistics-driven "what node comes next" recommendations for visual
//! workflow editors, built from historical usage triples
//! (predecessor → node → successor, with counts).
//!
//! ## Architecture
//!
//! - **Index construction** (`index::builder`): five ingestion rules turn a
//!   triple stream into context-keyed lists
//! - **Aggregation** (`index::aggregate`): running mean for node contexts,
//!   running sum for global ones
//! - **Queries** (`query`): successor/predecessor lookups using the node's workflow neighbors
//! - **Joining** (`join`): rank-synchronized merge of several sources for side-by-side display
//! - **Lifecycle** (`engine`, `snapshot`): atomic reloads and reload listeners
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use node_recommender::engine::Engine;
//! use node_recommender::index::Direction;
//! use node_recommender::node::{NodeId, NodeType, UsageTriple};
//! use node_recommender::query::Lookup;
//! use node_recommender::source::{MemorySource, StatisticsSource};
//!
//! let source: Arc<dyn StatisticsSource> = Arc::new(MemorySource::new(
//!     "local",
//!     vec![UsageTriple::new(None, Some("csv-reader"), Some("row-filter"), 12)],
//! ));
//! let engine = Engine::new(
//!     vec![source],
//!     Arc::new(|_: &str| Some(NodeType::Other)),
//! );
//! engine.reload().unwrap();
//!
//! if let Lookup::Loaded(per_source) = engine
//!     .recommend(&[NodeId::from("csv-reader")], Direction::Successors)
//!     .unwrap()
//! {
//!     for row in engine.join(&per_source) {
//!         println!("{row:?}");
//!     }
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod join;
pub mod node;
pub mod query;
pub mod snapshot;
pub mod source;
pub mod workflow;
