//! Edge-based shortest-path routing between candidate node groups.
//!
//! State in the priority queue is `(node, incoming edge)` rather than
//! just `node`, because the cost model and the restrictor both need to
//! know which edge we arrived on: the restrictor to check the
//! `(incoming, outgoing)` turn pair, the cost model to measure the turn
//! angle. This generalizes `MinScored`-over-`BinaryHeap`, the pattern
//! used for the teacher's own (node-only, time-dependent) Dijkstra.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::hash_map::Entry::{Occupied, Vacant};
use hashbrown::{HashMap, HashSet};

use super::cache;
use super::candidate::CandidateRoute;
use super::cost::{edge_cost, TraversalContext};
use super::restrictor::Restrictor;
use crate::config::{RoutingOptions, SolveMethod};
use crate::error::{Error, Result};
use crate::geo_util::{ang_smaller, web_merc_meter_dist};
use crate::trgraph::{EdgeIdx, NodeIdx, RoutingGraph};

/// Selection-time cost assigned to an unreachable hop so no solver ever
/// prefers a straight-line fallback over a real, connected detour.
const UNREACHABLE_HOP_PENALTY: f64 = 1e12;

/// A single routed hop between two candidate nodes. `edges` is stored in
/// **reverse traversal order** (last edge taken first), matching the
/// router-graph edge payload convention: callers walk it back-to-front
/// when assembling a shape polyline. `reachable = false` marks a
/// straight-line fallback produced when Dijkstra could not connect
/// `start` to `end` at all — `edges` is empty and `cost` is the
/// straight-line distance, kept for shape-length bookkeeping but never
/// treated as a real path.
#[derive(Debug, Clone)]
pub struct Hop {
    pub edges: Vec<EdgeIdx>,
    pub start: NodeIdx,
    pub end: NodeIdx,
    pub cost: f64,
    pub reachable: bool,
}

impl Hop {
    /// Cost to use when comparing/ranking hops during candidate
    /// selection: the real cost when reachable, a large fixed penalty
    /// otherwise so an unreachable hop never looks like a cheap shortcut.
    #[must_use]
    pub fn selection_cost(&self) -> f64 {
        if self.reachable {
            self.cost
        } else {
            UNREACHABLE_HOP_PENALTY
        }
    }

    fn straight_line(start: NodeIdx, end: NodeIdx, graph: &RoutingGraph) -> Self {
        let cost = web_merc_meter_dist(graph.node(start).unwrap().geometry, graph.node(end).unwrap().geometry);
        Self {
            edges: Vec::new(),
            start,
            end,
            cost,
            reachable: false,
        }
    }
}

#[derive(Copy, Clone, PartialEq)]
struct MinScored<K>(f64, K);

impl<K: Eq> Eq for MinScored<K> {}

impl<K: PartialEq> PartialOrd for MinScored<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        other.0.partial_cmp(&self.0)
    }
}

impl<K: Eq> Ord for MinScored<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.partial_cmp(&self.0).unwrap_or(Ordering::Equal)
    }
}

type State = (NodeIdx, Option<EdgeIdx>);

/// Finds the cheapest path from `from` to `to`, both single nodes, with
/// turn penalties and restrictions applied edge by edge. When `to` is
/// unreachable from `from`, returns a straight-line fallback hop
/// (`reachable = false`, no edges) rather than failing — the caller
/// falls back to the direct stop-to-stop segment.
#[must_use]
pub fn single_hop(
    graph: &RoutingGraph,
    restrictor: &Restrictor,
    opts: &RoutingOptions,
    trip_lines: &HashSet<String>,
    from: NodeIdx,
    to: NodeIdx,
) -> Hop {
    if from == to {
        return Hop {
            edges: Vec::new(),
            start: from,
            end: to,
            cost: 0.0,
            reachable: true,
        };
    }

    let mut dist: HashMap<State, f64> = HashMap::new();
    let mut prev: HashMap<State, (State, EdgeIdx)> = HashMap::new();
    let mut visited: HashSet<State> = HashSet::new();
    let mut heap = BinaryHeap::new();

    let start = (from, None);
    dist.insert(start, 0.0);
    heap.push(MinScored(0.0, start));

    while let Some(MinScored(d, state)) = heap.pop() {
        if !visited.insert(state) {
            continue;
        }
        let (node, incoming) = state;
        if node == to {
            return reconstruct(&prev, state, d, from, to);
        }

        for &e in graph.out_edges(node) {
            let edge = graph.edge(e).unwrap();
            if opts.no_self_hops && edge.to == node {
                continue;
            }
            if let Some(in_edge) = incoming {
                if !restrictor.may_turn(node, in_edge, e) {
                    continue;
                }
            }

            let ctx = build_context(graph, opts, trip_lines, incoming, e, node);
            let step_cost = edge_cost(edge, opts, &ctx);
            let next_state = (edge.to, Some(e));
            if visited.contains(&next_state) {
                continue;
            }
            let next_dist = d + step_cost;

            match dist.entry(next_state) {
                Occupied(mut ent) => {
                    if next_dist < *ent.get() {
                        ent.insert(next_dist);
                        prev.insert(next_state, (state, e));
                        heap.push(MinScored(next_dist, next_state));
                    }
                }
                Vacant(ent) => {
                    ent.insert(next_dist);
                    prev.insert(next_state, (state, e));
                    heap.push(MinScored(next_dist, next_state));
                }
            }
        }
    }

    Hop::straight_line(from, to, graph)
}

/// Cached variant of [`single_hop`], keyed on `(from, to, trip_lines,
/// options)` so two trips routing the same node pair under different
/// line sets or routing options never share a cached hop.
#[must_use]
pub fn single_hop_cached(
    graph: &RoutingGraph,
    restrictor: &Restrictor,
    opts: &RoutingOptions,
    trip_lines: &HashSet<String>,
    from: NodeIdx,
    to: NodeIdx,
    use_caching: bool,
) -> Hop {
    let key = cache::cache_key(from, to, trip_lines, opts);
    cache::get_or_compute(key, use_caching, || single_hop(graph, restrictor, opts, trip_lines, from, to))
}

fn build_context(
    graph: &RoutingGraph,
    opts: &RoutingOptions,
    trip_lines: &HashSet<String>,
    incoming: Option<EdgeIdx>,
    outgoing: EdgeIdx,
    via: NodeIdx,
) -> TraversalContext {
    let out_edge = graph.edge(outgoing).unwrap();

    let against_one_way = matches!(out_edge.one_way, crate::trgraph::OneWay::Backward);
    let no_lines = out_edge.lines.is_empty();
    let line_unmatched = !no_lines && !trip_lines.is_empty() && trip_lines.is_disjoint(&out_edge.lines);

    let pass_thru_station = graph.node(via).is_some_and(crate::trgraph::Node::is_station)
        && incoming.is_some();

    let full_turn = incoming.is_some_and(|in_edge| {
        let in_edge = graph.edge(in_edge).unwrap();
        let before = prior_point(in_edge, via, graph);
        let after = next_point(out_edge, via, graph);
        let here = graph.node(via).unwrap().geometry;
        ang_smaller(before, here, after, opts.full_turn_angle)
    });

    TraversalContext {
        against_one_way,
        line_unmatched,
        no_lines,
        full_turn,
        pass_thru_station,
        reach_penalty: 0.0,
    }
}

fn prior_point(edge: &crate::trgraph::Edge, via: NodeIdx, graph: &RoutingGraph) -> geo::Point {
    if edge.geometry.len() >= 2 {
        edge.geometry[edge.geometry.len() - 2]
    } else {
        graph.node(edge.other_node(via)).unwrap().geometry
    }
}

fn next_point(edge: &crate::trgraph::Edge, _via: NodeIdx, graph: &RoutingGraph) -> geo::Point {
    if edge.geometry.len() >= 2 {
        edge.geometry[1]
    } else {
        graph.node(edge.to).unwrap().geometry
    }
}

fn reconstruct(
    prev: &HashMap<State, (State, EdgeIdx)>,
    mut state: State,
    cost: f64,
    from: NodeIdx,
    to: NodeIdx,
) -> Hop {
    let mut edges = Vec::new();
    while let Some(&(pred, edge)) = prev.get(&state) {
        edges.push(edge);
        state = pred;
    }
    Hop {
        edges,
        start: from,
        end: to,
        cost,
        reachable: true,
    }
}

/// Total penalized cost of hopping from candidate `from` to candidate
/// `to`, including both candidates' standing penalties. Uses
/// [`Hop::selection_cost`] so an unreachable hop never outranks a real
/// connected detour.
fn pair_cost(
    graph: &RoutingGraph,
    restrictor: &Restrictor,
    opts: &RoutingOptions,
    trip_lines: &HashSet<String>,
    use_caching: bool,
    from: super::candidate::NodeCandidate,
    to: super::candidate::NodeCandidate,
) -> (f64, Hop) {
    let hop = single_hop_cached(graph, restrictor, opts, trip_lines, from.node, to.node, use_caching);
    (from.penalty + hop.selection_cost() + to.penalty, hop)
}

/// Routes an entire candidate route (one candidate group per stop),
/// dispatching on the configured solve method. Fails if any consecutive
/// pair of stages cannot be connected at all.
pub fn route(
    graph: &RoutingGraph,
    restrictor: &Restrictor,
    opts: &RoutingOptions,
    trip_lines: &HashSet<String>,
    use_caching: bool,
    candidate_route: &CandidateRoute,
    method: SolveMethod,
) -> Result<Vec<Hop>> {
    match method {
        SolveMethod::Global => {
            route_global(graph, restrictor, opts, trip_lines, use_caching, candidate_route)
        }
        SolveMethod::Greedy => {
            route_greedy(graph, restrictor, opts, trip_lines, use_caching, candidate_route)
        }
        SolveMethod::Greedy2 => {
            route_greedy2(graph, restrictor, opts, trip_lines, use_caching, candidate_route)
        }
    }
}

/// Exact solve: forward DP over `(stage, candidate index)`. Stages form
/// a DAG so a single forward pass finds the true global optimum, the
/// same guarantee the original's combination-graph shortest path gives.
fn route_global(
    graph: &RoutingGraph,
    restrictor: &Restrictor,
    opts: &RoutingOptions,
    trip_lines: &HashSet<String>,
    use_caching: bool,
    candidate_route: &CandidateRoute,
) -> Result<Vec<Hop>> {
    if candidate_route.len() < 2 {
        return Ok(Vec::new());
    }

    let mut dp: Vec<f64> = candidate_route[0].iter().map(|c| c.penalty).collect();
    let mut back: Vec<Vec<Option<(usize, Hop)>>> = Vec::with_capacity(candidate_route.len());
    back.push(Vec::new());

    for stage in 1..candidate_route.len() {
        let prev_group = &candidate_route[stage - 1];
        let cur_group = &candidate_route[stage];
        let mut next_dp = vec![f64::INFINITY; cur_group.len()];
        let mut next_back = vec![None; cur_group.len()];

        for (ci, &cand) in cur_group.iter().enumerate() {
            for (pi, &prev_cand) in prev_group.iter().enumerate() {
                if !dp[pi].is_finite() {
                    continue;
                }
                let hop = single_hop_cached(
                    graph,
                    restrictor,
                    opts,
                    trip_lines,
                    prev_cand.node,
                    cand.node,
                    use_caching,
                );
                let total = dp[pi] + hop.selection_cost() + cand.penalty;
                if total < next_dp[ci] {
                    next_dp[ci] = total;
                    next_back[ci] = Some((pi, hop));
                }
            }
        }

        dp = next_dp;
        back.push(next_back);
    }

    let last_stage = candidate_route.len() - 1;
    let (best_idx, _) = dp
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .ok_or_else(|| Error::InconsistentSizes {
            what: "candidate route",
            expected: 1,
            actual: 0,
        })?;

    let mut hops = Vec::with_capacity(last_stage);
    let mut cur = best_idx;
    for stage in (1..=last_stage).rev() {
        let (pi, hop) = back[stage][cur].clone().unwrap();
        hops.push(hop);
        cur = pi;
    }
    hops.reverse();
    Ok(hops)
}

/// Per-stop independent candidate choice (least standing penalty), then
/// single-hop routing between the chosen nodes with no lookahead and no
/// backtracking.
fn route_greedy(
    graph: &RoutingGraph,
    restrictor: &Restrictor,
    opts: &RoutingOptions,
    trip_lines: &HashSet<String>,
    use_caching: bool,
    candidate_route: &CandidateRoute,
) -> Result<Vec<Hop>> {
    let chosen: Vec<_> = candidate_route
        .iter()
        .map(|group| {
            group
                .iter()
                .min_by(|a, b| a.penalty.total_cmp(&b.penalty))
                .copied()
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::InconsistentSizes {
            what: "candidate route",
            expected: candidate_route.len(),
            actual: 0,
        })?;

    let mut hops = Vec::with_capacity(chosen.len().saturating_sub(1));
    for pair in chosen.windows(2) {
        let hop = single_hop_cached(graph, restrictor, opts, trip_lines, pair[0].node, pair[1].node, use_caching);
        hops.push(hop);
    }
    Ok(hops)
}

/// One-stage lookahead: picks the current stop's candidate by minimizing
/// its own penalty plus the hop in from the already-fixed previous
/// candidate plus the cheapest hop out to any next-stage candidate, then
/// commits and moves on. Never revisits a previous choice.
fn route_greedy2(
    graph: &RoutingGraph,
    restrictor: &Restrictor,
    opts: &RoutingOptions,
    trip_lines: &HashSet<String>,
    use_caching: bool,
    candidate_route: &CandidateRoute,
) -> Result<Vec<Hop>> {
    if candidate_route.is_empty() {
        return Ok(Vec::new());
    }

    let mut prev_cand = *candidate_route[0]
        .iter()
        .min_by(|a, b| a.penalty.total_cmp(&b.penalty))
        .ok_or_else(|| Error::InconsistentSizes {
            what: "candidate route",
            expected: candidate_route.len(),
            actual: 0,
        })?;

    let mut hops = Vec::with_capacity(candidate_route.len().saturating_sub(1));

    for stage in 1..candidate_route.len() {
        let cur_group = &candidate_route[stage];
        let next_group = candidate_route.get(stage + 1);

        let mut best: Option<(f64, super::candidate::NodeCandidate, Hop)> = None;
        for &cand in cur_group {
            let (in_cost, in_hop) = pair_cost(graph, restrictor, opts, trip_lines, use_caching, prev_cand, cand);

            let lookahead = next_group.map_or(0.0, |next| {
                next.iter()
                    .map(|&n| pair_cost(graph, restrictor, opts, trip_lines, use_caching, cand, n).0)
                    .fold(f64::INFINITY, f64::min)
            });
            let total = in_cost + lookahead;

            let better = match &best {
                Some((b, _, _)) => total < *b,
                None => true,
            };
            if better {
                best = Some((total, cand, in_hop));
            }
        }

        let (_, cand, hop) = best.ok_or_else(|| Error::InconsistentSizes {
            what: "candidate route",
            expected: candidate_route.len(),
            actual: stage,
        })?;
        hops.push(hop);
        prev_cand = cand;
    }

    Ok(hops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::candidate::NodeCandidate;
    use crate::trgraph::{Edge, Node};
    use geo::Point;

    fn line_graph(n: usize) -> (RoutingGraph, Vec<NodeIdx>) {
        let mut g = RoutingGraph::new();
        let nodes: Vec<_> = (0..n)
            .map(|i| g.add_node(Node::new(Point::new(i as f64 * 100.0, 0.0))))
            .collect();
        for w in nodes.windows(2) {
            let mut e = Edge::new(w[0], w[1]);
            e.geometry = vec![
                g.node(w[0]).unwrap().geometry,
                g.node(w[1]).unwrap().geometry,
            ];
            e.length_m = 100.0;
            g.add_edge(w[0], w[1], e);
        }
        (g, nodes)
    }

    #[test]
    fn single_hop_finds_straight_path() {
        let (g, nodes) = line_graph(4);
        let restr = Restrictor::new();
        let opts = RoutingOptions::default();
        let hop = single_hop(&g, &restr, &opts, &HashSet::new(), nodes[0], nodes[3]);
        assert!(hop.reachable);
        assert_eq!(hop.edges.len(), 3);
        assert!((hop.cost - 300.0).abs() < 1e-6);
    }

    #[test]
    fn global_route_picks_cheapest_candidates() {
        let (g, nodes) = line_graph(3);
        let restr = Restrictor::new();
        let opts = RoutingOptions::default();
        let route = vec![
            vec![NodeCandidate {
                node: nodes[0],
                penalty: 0.0,
            }],
            vec![NodeCandidate {
                node: nodes[2],
                penalty: 0.0,
            }],
        ];
        let hops = route_global(&g, &restr, &opts, &HashSet::new(), false, &route).unwrap();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].edges.len(), 2);
    }

    #[test]
    fn restricted_turn_blocks_direct_hop_falls_back_to_straight_line() {
        let (g, nodes) = line_graph(3);
        let mut restr = Restrictor::new();
        let e0 = g.get_edge(nodes[0], nodes[1]).unwrap();
        let e1 = g.get_edge(nodes[1], nodes[2]).unwrap();
        restr.deny(nodes[1], e0, e1);
        let opts = RoutingOptions::default();
        let hop = single_hop(&g, &restr, &opts, &HashSet::new(), nodes[0], nodes[2]);
        assert!(!hop.reachable);
        assert!(hop.edges.is_empty());
        assert!((hop.cost - 200.0).abs() < 1e-6);
    }
}
