//! Edge cost model. A linear combination of penalty terms, one per
//! violated preference (wrong line, one-way against travel, sharp turn,
//! pass-through station, low map-data quality); with every flag clear it
//! reduces to plain distance plus the caller-supplied reach penalty.

use crate::config::RoutingOptions;
use crate::trgraph::Edge;

/// Inputs to `edge_cost` that are not stored on the edge itself: context
/// about how this edge is being traversed on a specific hop.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraversalContext {
    /// Traveling against a one-way edge's allowed direction.
    pub against_one_way: bool,
    /// The trip's route has at least one line name and none of them
    /// appear in the edge's line set.
    pub line_unmatched: bool,
    /// The edge carries no line-name information at all.
    pub no_lines: bool,
    /// The turn taken onto this edge exceeds the configured full-turn
    /// angle threshold.
    pub full_turn: bool,
    /// This edge passes through an intermediate station node.
    pub pass_thru_station: bool,
    /// Extra penalty carried over from the node this edge starts at
    /// (e.g. an unmatched platform or distance-from-stop penalty).
    pub reach_penalty: f64,
}

/// Total cost of traversing `edge` under `opts` given `ctx`. Equal to
/// `edge.length_m + ctx.reach_penalty` when no penalty flag is set.
#[must_use]
pub fn edge_cost(edge: &Edge, opts: &RoutingOptions, ctx: &TraversalContext) -> f64 {
    let level = opts.level_punish[edge.level.min(7) as usize];
    let mut cost = edge.length_m * level;

    if ctx.against_one_way {
        cost += edge.length_m * opts.one_way_punish_fac;
        cost += opts.one_way_edge_punish;
    }
    if ctx.line_unmatched {
        cost += edge.length_m * opts.line_unmatched_punish_fact;
    }
    if ctx.no_lines {
        cost += edge.length_m * opts.no_lines_punish_fact;
    }
    if ctx.full_turn {
        cost += opts.full_turn_punish_fac;
    }
    if ctx.pass_thru_station {
        cost += opts.pass_thru_stations_punish;
    }

    cost + ctx.reach_penalty
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::trgraph::NodeIdx;

    fn plain_edge(length_m: f64) -> Edge {
        let mut e = Edge::new(NodeIdx(0), NodeIdx(1));
        e.length_m = length_m;
        e
    }

    #[test]
    fn reduces_to_distance_plus_reach_penalty_with_no_flags() {
        let opts = RoutingOptions::default();
        let edge = plain_edge(120.0);
        let ctx = TraversalContext {
            reach_penalty: 5.0,
            ..Default::default()
        };
        assert_relative_eq!(edge_cost(&edge, &opts, &ctx), 125.0, epsilon = 1e-9);
    }

    #[test]
    fn full_turn_adds_flat_penalty() {
        let opts = RoutingOptions::default();
        let edge = plain_edge(10.0);
        let base = edge_cost(&edge, &opts, &TraversalContext::default());
        let turned = edge_cost(
            &edge,
            &opts,
            &TraversalContext {
                full_turn: true,
                ..Default::default()
            },
        );
        assert_relative_eq!(turned - base, opts.full_turn_punish_fac, epsilon = 1e-9);
    }

    #[test]
    fn cost_is_never_nan() {
        let opts = RoutingOptions::default();
        let edge = plain_edge(0.0);
        let ctx = TraversalContext::default();
        assert!(!edge_cost(&edge, &opts, &ctx).is_nan());
    }
}
