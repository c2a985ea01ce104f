//! Candidate types, owned by the graph side so a precomputed per-stop
//! candidate group can live on [`super::RoutingGraph`] itself and be
//! reached by a plain lookup, rather than a live spatial query re-run on
//! every match. Grounded on `node_candidate`/`node_candidate_group` in
//! `original_source/.../router/misc.h`.

use super::NodeIdx;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeCandidate {
    pub node: NodeIdx,
    pub penalty: f64,
}

pub type CandidateGroup = Vec<NodeCandidate>;
pub type CandidateRoute = Vec<CandidateGroup>;
