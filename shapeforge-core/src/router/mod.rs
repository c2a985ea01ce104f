//! Candidate selection, cost model, turn restrictions, and the
//! edge-based shortest-path router.

pub mod cache;
pub mod candidate;
pub mod cost;
pub mod dijkstra;
pub mod restrictor;

pub use candidate::{build_candidate_groups, get_node_candidate_route, CandidateGroup, CandidateRoute, NodeCandidate};
pub use cost::{edge_cost, TraversalContext};
pub use dijkstra::{route, single_hop, single_hop_cached, Hop};
pub use restrictor::Restrictor;
