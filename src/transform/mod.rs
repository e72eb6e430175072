//! Hierarchical 2D transforms
//!
//! A forest of nodes, each positioned relative to its parent, with lazily
//! cached local/world matrices and coordinate conversion between any two
//! nodes.

mod cache;
mod error;
mod node;
mod query;
#[allow(clippy::module_inception)]
mod transform;
mod tree;

pub use cache::{CacheStats, NodeMatrices};
pub use error::{Result, TransformError};
pub use node::{NodeDesc, NodeId};
pub use transform::Transform2D;
pub use tree::{TransformTree, TreeConfig};
