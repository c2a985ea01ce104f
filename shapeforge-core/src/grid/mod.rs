//! Uniform spatial grids over the routing graph, used by the candidate
//! selector to find nodes/edges near a stop without a full scan.

pub mod edge_grid;
pub mod node_grid;

pub use edge_grid::EdgeGrid;
pub use node_grid::NodeGrid;
