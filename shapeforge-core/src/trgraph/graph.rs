//! `RoutingGraph`: an index-addressed, tombstone-on-delete directed
//! graph plus the post-ingest cleanup pass.
//!
//! A `petgraph::DiGraph` was considered (as the rest of the workspace
//! uses it) but cleanup needs node/edge indices that stay valid across a
//! sequence of merges and deletions without the renumbering that
//! `petgraph`'s `remove_node`/`remove_edge` perform; a hand-rolled arena
//! with tombstones keeps indices stable for the whole cleanup pass.

use geo::{LineString, Simplify};
#[cfg(test)]
use geo::Point;
use hashbrown::HashMap;

use super::{CandidateGroup, Component, ComponentIdx, Edge, EdgeIdx, Node, NodeIdx};
use crate::feed::StopId;
use crate::geo_util::{ang_smaller, web_merc_dist_factor, web_merc_meter_dist};

#[derive(Debug, Default)]
pub struct RoutingGraph {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    out_adj: Vec<Vec<EdgeIdx>>,
    in_adj: Vec<Vec<EdgeIdx>>,
    components: Vec<Component>,
    /// Per-stop candidate groups, precomputed once (see
    /// `router::candidate::build_candidate_groups`) rather than
    /// recomputed per match — a pure lookup during routing.
    candidate_groups: HashMap<StopId, CandidateGroup>,
}

impl RoutingGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: Node) -> NodeIdx {
        let idx = NodeIdx(self.nodes.len());
        self.nodes.push(Some(node));
        self.out_adj.push(Vec::new());
        self.in_adj.push(Vec::new());
        idx
    }

    #[must_use]
    pub fn node(&self, idx: NodeIdx) -> Option<&Node> {
        self.nodes.get(idx.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, idx: NodeIdx) -> Option<&mut Node> {
        self.nodes.get_mut(idx.0).and_then(Option::as_mut)
    }

    #[must_use]
    pub fn edge(&self, idx: EdgeIdx) -> Option<&Edge> {
        self.edges.get(idx.0).and_then(Option::as_ref)
    }

    pub fn edge_mut(&mut self, idx: EdgeIdx) -> Option<&mut Edge> {
        self.edges.get_mut(idx.0).and_then(Option::as_mut)
    }

    #[must_use]
    pub fn node_indices(&self) -> Vec<NodeIdx> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|_| NodeIdx(i)))
            .collect()
    }

    #[must_use]
    pub fn edge_indices(&self) -> Vec<EdgeIdx> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|_| EdgeIdx(i)))
            .collect()
    }

    #[must_use]
    pub fn out_edges(&self, n: NodeIdx) -> &[EdgeIdx] {
        self.out_adj.get(n.0).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn in_edges(&self, n: NodeIdx) -> &[EdgeIdx] {
        self.in_adj.get(n.0).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn out_degree(&self, n: NodeIdx) -> usize {
        self.out_edges(n).len()
    }

    #[must_use]
    pub fn in_degree(&self, n: NodeIdx) -> usize {
        self.in_edges(n).len()
    }

    #[must_use]
    pub fn get_edge(&self, from: NodeIdx, to: NodeIdx) -> Option<EdgeIdx> {
        self.out_edges(from)
            .iter()
            .copied()
            .find(|&e| self.edge(e).is_some_and(|e| e.to == to))
    }

    /// Adds an edge, rejecting a duplicate `(from, to)` pair: this graph
    /// is never a multigraph.
    pub fn add_edge(&mut self, from: NodeIdx, to: NodeIdx, payload: Edge) -> Option<EdgeIdx> {
        if self.get_edge(from, to).is_some() {
            return None;
        }
        let idx = EdgeIdx(self.edges.len());
        self.edges.push(Some(payload));
        self.out_adj[from.0].push(idx);
        self.in_adj[to.0].push(idx);
        Some(idx)
    }

    pub fn del_edge(&mut self, from: NodeIdx, to: NodeIdx) -> Option<Edge> {
        let idx = self.get_edge(from, to)?;
        self.out_adj[from.0].retain(|&e| e != idx);
        self.in_adj[to.0].retain(|&e| e != idx);
        self.edges[idx.0].take()
    }

    pub fn del_node(&mut self, n: NodeIdx) {
        for e in self.out_edges(n).to_vec() {
            if let Some(edge) = self.edge(e) {
                let to = edge.to;
                self.in_adj[to.0].retain(|&x| x != e);
                self.edges[e.0] = None;
            }
        }
        for e in self.in_edges(n).to_vec() {
            if let Some(edge) = self.edge(e) {
                let from = edge.from;
                self.out_adj[from.0].retain(|&x| x != e);
                self.edges[e.0] = None;
            }
        }
        self.out_adj[n.0].clear();
        self.in_adj[n.0].clear();
        self.nodes[n.0] = None;
    }

    #[must_use]
    pub fn component(&self, idx: ComponentIdx) -> &Component {
        &self.components[idx.0]
    }

    pub fn set_candidate_group(&mut self, stop_id: StopId, group: CandidateGroup) {
        self.candidate_groups.insert(stop_id, group);
    }

    #[must_use]
    pub fn candidate_group(&self, stop_id: &str) -> Option<&CandidateGroup> {
        self.candidate_groups.get(stop_id)
    }

    /// Runs the full post-ingest cleanup pass, in the order the original
    /// graph construction runs it: establish geometry, drop unreachable
    /// nodes, collapse degree-2 chains, simplify, label components, add
    /// station self-edges, close small gaps, then drop remaining dangling
    /// edges.
    pub fn cleanup(&mut self, turn_angle: f64) {
        self.write_geometries();
        self.delete_orphan_nodes();
        self.collapse_edges();
        self.simplify_geometries();
        self.write_components();
        self.write_self_edges();
        self.fix_gaps();
        self.delete_orphan_edges(turn_angle);
    }

    fn write_geometries(&mut self) {
        for n in self.node_indices() {
            for e in self.out_edges(n).to_vec() {
                let (from_pt, to_pt, has_geom) = {
                    let edge = self.edge(e).unwrap();
                    (
                        self.node(edge.from).unwrap().geometry,
                        self.node(edge.to).unwrap().geometry,
                        !edge.geometry.is_empty(),
                    )
                };
                if has_geom {
                    continue;
                }
                let dist = web_merc_meter_dist(from_pt, to_pt);
                let edge = self.edge_mut(e).unwrap();
                edge.geometry.push(from_pt);
                edge.length_m = dist;
                edge.geometry.push(to_pt);
            }
        }
    }

    fn delete_orphan_nodes(&mut self) {
        for n in self.node_indices() {
            let degree0 = self.out_degree(n) + self.in_degree(n) == 0;
            let is_station = self.node(n).is_some_and(super::Node::is_station);
            if degree0 && !is_station {
                self.del_node(n);
            }
        }
    }

    fn collapse_edges(&mut self) {
        for n in self.node_indices() {
            let out_deg = self.out_degree(n);
            let in_deg = self.in_degree(n);
            if out_deg + in_deg != 2 {
                continue;
            }
            if self.node(n).is_some_and(super::Node::is_station) {
                continue;
            }

            let (ea, eb) = if out_deg == 2 {
                let v = self.out_edges(n);
                (v[0], v[1])
            } else if in_deg == 2 {
                let v = self.in_edges(n);
                (v[0], v[1])
            } else {
                (self.out_edges(n)[0], self.in_edges(n)[0])
            };

            let (ea_other, eb_other) = (
                self.edge(ea).unwrap().other_node(n),
                self.edge(eb).unwrap().other_node(n),
            );

            if self.get_edge(ea_other, eb_other).is_some() || self.get_edge(eb_other, ea_other).is_some() {
                continue;
            }

            if !Self::are_edges_similar(self.edge(ea).unwrap(), self.edge(eb).unwrap()) {
                continue;
            }

            let ea_payload = self.edge(ea).unwrap().clone();
            let eb_payload = self.edge(eb).unwrap().clone();

            let (new_from, new_to, merged) = if ea_payload.one_way() && ea_other != ea_payload.from {
                (eb_other, ea_other, Self::merge_edge_payload(&eb_payload, &ea_payload, n))
            } else {
                (ea_other, eb_other, Self::merge_edge_payload(&ea_payload, &eb_payload, n))
            };

            let (ea_from, ea_to) = (ea_payload.from, ea_payload.to);
            let (eb_from, eb_to) = (eb_payload.from, eb_payload.to);
            self.del_edge(ea_from, ea_to);
            self.del_edge(eb_from, eb_to);
            self.add_edge(new_from, new_to, merged);
        }
    }

    fn are_edges_similar(a: &Edge, b: &Edge) -> bool {
        if a.one_way() != b.one_way() {
            return false;
        }
        if a.level != b.level {
            return false;
        }
        if a.lines != b.lines {
            return false;
        }
        if a.one_way() && b.one_way() && a.from != b.to && a.to != b.from {
            return false;
        }
        if a.restricted || b.restricted {
            return false;
        }
        true
    }

    /// Merges `a` and `b`'s geometry and length into a new edge payload,
    /// orienting `b`'s geometry relative to the shared node `n` the way
    /// `graph.cpp::merge_edge_payload` does for each of the four possible
    /// incidence orientations.
    fn merge_edge_payload(a: &Edge, b: &Edge, n: NodeIdx) -> Edge {
        let mut geometry = a.geometry.clone();
        if a.to == n && b.to == n {
            geometry.extend(b.geometry.iter().rev());
        } else if a.to == n && b.from == n {
            geometry.extend(b.geometry.iter());
        } else if a.from == n && b.to == n {
            geometry.reverse();
            geometry.extend(b.geometry.iter().rev());
        } else {
            geometry.reverse();
            geometry.extend(b.geometry.iter());
        }

        let mut merged = a.clone();
        merged.geometry = geometry;
        merged.length_m = a.length_m + b.length_m;
        merged
    }

    fn simplify_geometries(&mut self) {
        for e in self.edge_indices() {
            let edge = self.edge_mut(e).unwrap();
            if edge.geometry.len() < 3 {
                continue;
            }
            let line = LineString::from(edge.geometry.clone());
            let simplified = line.simplify(&0.5);
            edge.geometry = simplified.points().collect();
        }
    }

    fn write_components(&mut self) -> u32 {
        self.components.clear();
        let mut counter = 0u32;

        for start in self.node_indices() {
            if self.node(start).unwrap().component.is_some() {
                continue;
            }

            let comp_idx = ComponentIdx(self.components.len());
            self.components.push(Component::default());

            let mut stack = vec![start];
            while let Some(cur) = stack.pop() {
                if self.node(cur).unwrap().component.is_some() {
                    continue;
                }
                self.node_mut(cur).unwrap().component = Some(comp_idx);

                for e in self.out_edges(cur).to_vec() {
                    let (level, other) = {
                        let edge = self.edge(e).unwrap();
                        (edge.level, edge.other_node(cur))
                    };
                    let comp = &mut self.components[comp_idx.0];
                    if level < comp.min_edge_level {
                        comp.min_edge_level = level;
                    }
                    if self.node(other).unwrap().component.is_none() {
                        stack.push(other);
                    }
                }
                for e in self.in_edges(cur).to_vec() {
                    let (level, other) = {
                        let edge = self.edge(e).unwrap();
                        (edge.level, edge.other_node(cur))
                    };
                    let comp = &mut self.components[comp_idx.0];
                    if level < comp.min_edge_level {
                        comp.min_edge_level = level;
                    }
                    if self.node(other).unwrap().component.is_none() {
                        stack.push(other);
                    }
                }
            }

            counter += 1;
        }

        counter
    }

    fn write_self_edges(&mut self) {
        for n in self.node_indices() {
            let is_station = self.node(n).is_some_and(super::Node::is_station);
            if is_station && self.out_degree(n) == 0 {
                self.add_edge(n, n, Edge::new(n, n));
            }
        }
    }

    /// Closes sub-meter gaps between dangling (degree-1) endpoints,
    /// bucketed into a 1-meter grid so the search stays local.
    fn fix_gaps(&mut self) {
        const GAP_M: f64 = 1.0;
        let dangling: Vec<NodeIdx> = self
            .node_indices()
            .into_iter()
            .filter(|&n| self.out_degree(n) + self.in_degree(n) == 1)
            .collect();

        let mut buckets: HashMap<(i64, i64), Vec<NodeIdx>> = HashMap::new();
        for &n in &dangling {
            let p = self.node(n).unwrap().geometry;
            let factor = web_merc_dist_factor(p);
            let cell = GAP_M / factor;
            let key = ((p.x() / cell) as i64, (p.y() / cell) as i64);
            buckets.entry(key).or_default().push(n);
        }

        for &n in &dangling {
            if self.node(n).is_none() {
                continue;
            }
            let p = self.node(n).unwrap().geometry;
            let factor = web_merc_dist_factor(p);
            let cell = GAP_M / factor;
            let cx = (p.x() / cell) as i64;
            let cy = (p.y() / cell) as i64;

            let mut neighbors = Vec::new();
            for dx in -1..=1 {
                for dy in -1..=1 {
                    if let Some(v) = buckets.get(&(cx + dx, cy + dy)) {
                        neighbors.extend(v.iter().copied());
                    }
                }
            }

            for nb in neighbors {
                if nb == n || self.node(nb).is_none() {
                    continue;
                }
                if self.out_degree(nb) + self.in_degree(nb) != 1 {
                    continue;
                }
                let nb_p = self.node(nb).unwrap().geometry;
                if web_merc_meter_dist(nb_p, p) > GAP_M {
                    continue;
                }

                let n_is_station = self.node(n).unwrap().is_station();
                let nb_is_station = self.node(nb).unwrap().is_station();

                if !n_is_station && !nb_is_station {
                    let nb_edge = self
                        .out_edges(nb)
                        .first()
                        .or_else(|| self.in_edges(nb).first())
                        .copied();
                    if let Some(e) = nb_edge {
                        let payload = self.edge(e).unwrap().clone();
                        let other = payload.other_node(nb);
                        let mut new_edge = payload.clone();
                        new_edge.from = other;
                        new_edge.to = n;
                        new_edge.geometry = vec![self.node(other).unwrap().geometry, p];
                        if self.add_edge(other, n, new_edge).is_some() {
                            self.del_node(nb);
                        }
                    }
                } else {
                    let nb_edge = self
                        .out_edges(nb)
                        .first()
                        .or_else(|| self.in_edges(nb).first())
                        .copied();
                    if let Some(e) = nb_edge {
                        let payload = self.edge(e).unwrap().clone();
                        self.add_edge(n, nb, payload);
                    }
                }
            }
        }
    }

    /// Removes degree-1 non-station nodes for three rounds, preserving a
    /// dangling edge when its removal would turn a sharp-angle
    /// intersection into an eligible degree-2 collapse point.
    fn delete_orphan_edges(&mut self, turn_angle: f64) {
        for _ in 0..3 {
            for n in self.node_indices() {
                if self.out_degree(n) + self.in_degree(n) != 1 {
                    continue;
                }
                if self.node(n).is_some_and(super::Node::is_station) {
                    continue;
                }
                if self.keep_full_turn(n, turn_angle) {
                    continue;
                }
                self.del_node(n);
            }
        }
    }

    fn keep_full_turn(&self, n: NodeIdx, ang: f64) -> bool {
        if self.out_degree(n) + self.in_degree(n) != 1 {
            return false;
        }
        let e = self
            .out_edges(n)
            .first()
            .or_else(|| self.in_edges(n).first())
            .copied()
            .unwrap();
        let other = self.edge(e).unwrap().other_node(n);

        if self.out_degree(other) + self.in_degree(other) != 3 {
            return false;
        }

        let mut a = None;
        let mut b = None;
        for &f in self.in_edges(other).iter().chain(self.out_edges(other).iter()) {
            if f == e {
                continue;
            }
            if a.is_none() {
                a = Some(f);
            } else if b.is_none() {
                b = Some(f);
            }
        }
        let (a, b) = match (a, b) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };

        let a_edge = self.edge(a).unwrap();
        let b_edge = self.edge(b).unwrap();
        let ap = if a_edge.to != other {
            // edge points away from `other`: use its far endpoint
            self.node(a_edge.to).unwrap().geometry
        } else {
            self.node(a_edge.from).unwrap().geometry
        };
        let bp = if b_edge.to != other {
            self.node(b_edge.to).unwrap().geometry
        } else {
            self.node(b_edge.from).unwrap().geometry
        };

        ang_smaller(ap, self.node(other).unwrap().geometry, bp, ang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn add_edge_rejects_duplicates() {
        let mut g = RoutingGraph::new();
        let a = g.add_node(Node::new(pt(0.0, 0.0)));
        let b = g.add_node(Node::new(pt(1.0, 0.0)));
        assert!(g.add_edge(a, b, Edge::new(a, b)).is_some());
        assert!(g.add_edge(a, b, Edge::new(a, b)).is_none());
    }

    #[test]
    fn delete_orphan_nodes_drops_isolated_non_station() {
        let mut g = RoutingGraph::new();
        let a = g.add_node(Node::new(pt(0.0, 0.0)));
        g.cleanup(45.0);
        assert!(g.node(a).is_none());
    }

    #[test]
    fn write_components_labels_disjoint_islands() {
        let mut g = RoutingGraph::new();
        let a = g.add_node(Node::new(pt(0.0, 0.0)));
        let b = g.add_node(Node::new(pt(1.0, 0.0)));
        g.add_edge(a, b, Edge::new(a, b));

        let c = g.add_node(Node::new(pt(100.0, 100.0)));
        let d = g.add_node(Node::new(pt(101.0, 100.0)));
        g.add_edge(c, d, Edge::new(c, d));

        g.write_components();
        assert_ne!(g.node(a).unwrap().component, g.node(c).unwrap().component);
        assert_eq!(g.node(a).unwrap().component, g.node(b).unwrap().component);
    }

    #[test]
    fn collapse_edges_merges_degree_two_chain() {
        let mut g = RoutingGraph::new();
        let a = g.add_node(Node::new(pt(0.0, 0.0)));
        let mid = g.add_node(Node::new(pt(1.0, 0.0)));
        let c = g.add_node(Node::new(pt(2.0, 0.0)));
        g.add_edge(a, mid, Edge::new(a, mid));
        g.add_edge(mid, c, Edge::new(mid, c));

        g.write_geometries();
        g.collapse_edges();

        assert!(g.get_edge(a, c).is_some());
        assert_eq!(g.out_degree(mid) + g.in_degree(mid), 0);
    }
}
