//! Turn restrictions: per via-node allow/deny pairs of `(from_edge,
//! to_edge)`, consulted by the router before relaxing an edge.

use hashbrown::{HashMap, HashSet};

use crate::trgraph::{EdgeIdx, NodeIdx};

#[derive(Debug, Default)]
pub struct Restrictor {
    /// via-node -> denied `(from, to)` edge pairs.
    denied: HashMap<NodeIdx, HashSet<(EdgeIdx, EdgeIdx)>>,
    /// via-node -> the only `(from, to)` pairs allowed, once any
    /// allow-rule exists for that node (an "only straight/right" sign).
    allowed_only: HashMap<NodeIdx, HashSet<(EdgeIdx, EdgeIdx)>>,
}

impl Restrictor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&mut self, via: NodeIdx, from: EdgeIdx, to: EdgeIdx) {
        self.denied.entry(via).or_default().insert((from, to));
    }

    pub fn allow_only(&mut self, via: NodeIdx, from: EdgeIdx, to: EdgeIdx) {
        self.allowed_only.entry(via).or_default().insert((from, to));
    }

    /// `true` if turning from `from` to `to` through `via` is permitted.
    ///
    /// An "only" rule at `via` restricts just the `from` edges it
    /// actually names — a `from` edge with no registered positive rule
    /// at this node is unaffected even when other edges through the
    /// same node carry one.
    #[must_use]
    pub fn may_turn(&self, via: NodeIdx, from: EdgeIdx, to: EdgeIdx) -> bool {
        if let Some(only) = self.allowed_only.get(&via) {
            let from_has_rule = only.iter().any(|&(f, _)| f == from);
            if from_has_rule && !only.contains(&(from, to)) {
                return false;
            }
        }
        !self
            .denied
            .get(&via)
            .is_some_and(|d| d.contains(&(from, to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_turn_is_rejected() {
        let mut r = Restrictor::new();
        let via = NodeIdx(0);
        let a = EdgeIdx(0);
        let b = EdgeIdx(1);
        assert!(r.may_turn(via, a, b));
        r.deny(via, a, b);
        assert!(!r.may_turn(via, a, b));
    }

    #[test]
    fn allow_only_rejects_other_turns() {
        let mut r = Restrictor::new();
        let via = NodeIdx(0);
        let a = EdgeIdx(0);
        let b = EdgeIdx(1);
        let c = EdgeIdx(2);
        r.allow_only(via, a, b);
        assert!(r.may_turn(via, a, b));
        assert!(!r.may_turn(via, a, c));
    }

    #[test]
    fn allow_only_does_not_block_unrelated_from_edges() {
        let mut r = Restrictor::new();
        let via = NodeIdx(0);
        let a = EdgeIdx(0);
        let b = EdgeIdx(1);
        let other_from = EdgeIdx(2);
        let other_to = EdgeIdx(3);
        r.allow_only(via, a, b);
        // other_from never had a positive rule registered at `via`, so
        // it must not be swept up by a's "only" restriction.
        assert!(r.may_turn(via, other_from, other_to));
    }
}
