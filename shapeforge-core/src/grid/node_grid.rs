//! Uniform grid over graph nodes for radius queries.

use geo::Point;
use hashbrown::HashMap;

use crate::geo_util::{web_merc_dist_factor, web_merc_meter_dist};
use crate::trgraph::{NodeIdx, RoutingGraph};

/// Name similarity below this (Jaro-Winkler, 0..1) disqualifies a
/// station-info name match.
const NAME_SIM_THRESHOLD: f64 = 0.5;

type Cell = (i64, i64);

pub struct NodeGrid {
    cell_size_m: f64,
    buckets: HashMap<Cell, Vec<NodeIdx>>,
}

impl NodeGrid {
    #[must_use]
    pub fn build(graph: &RoutingGraph, cell_size_m: f64) -> Self {
        let mut buckets: HashMap<Cell, Vec<NodeIdx>> = HashMap::new();
        for n in graph.node_indices() {
            let p = graph.node(n).unwrap().geometry;
            buckets.entry(cell_of(p, cell_size_m)).or_default().push(n);
        }
        Self {
            cell_size_m,
            buckets,
        }
    }

    pub fn insert(&mut self, n: NodeIdx, p: Point) {
        self.buckets.entry(cell_of(p, self.cell_size_m)).or_default().push(n);
    }

    pub fn remove(&mut self, n: NodeIdx, p: Point) {
        if let Some(v) = self.buckets.get_mut(&cell_of(p, self.cell_size_m)) {
            v.retain(|&x| x != n);
        }
    }

    /// All nodes within `radius_m` meters of `center`, unordered.
    #[must_use]
    pub fn get_matching_nodes(&self, graph: &RoutingGraph, center: Point, radius_m: f64) -> Vec<NodeIdx> {
        let factor = web_merc_dist_factor(center);
        let cell_radius = ((radius_m * factor) / self.cell_size_m).ceil() as i64;
        let (cx, cy) = cell_of(center, self.cell_size_m);

        let mut out = Vec::new();
        for dx in -cell_radius..=cell_radius {
            for dy in -cell_radius..=cell_radius {
                if let Some(v) = self.buckets.get(&(cx + dx, cy + dy)) {
                    for &n in v {
                        let p = graph.node(n).unwrap().geometry;
                        if web_merc_meter_dist(p, center) <= radius_m {
                            out.push(n);
                        }
                    }
                }
            }
        }
        out
    }

    /// The single nearest *station* node within `radius_m`, ignoring name.
    #[must_use]
    pub fn get_distance_matching_node(
        &self,
        graph: &RoutingGraph,
        center: Point,
        radius_m: f64,
    ) -> Option<(NodeIdx, f64)> {
        self.get_matching_nodes(graph, center, radius_m)
            .into_iter()
            .filter(|&n| graph.node(n).unwrap().is_station())
            .map(|n| (n, web_merc_meter_dist(graph.node(n).unwrap().geometry, center)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// All nodes within `radius_m` whose station-info name similarity to
    /// `name` exceeds [`NAME_SIM_THRESHOLD`]. A node with no station info
    /// never matches.
    #[must_use]
    pub fn get_matching_nodes_set(&self, graph: &RoutingGraph, center: Point, name: &str, radius_m: f64) -> Vec<NodeIdx> {
        self.get_matching_nodes(graph, center, radius_m)
            .into_iter()
            .filter(|&n| name_similarity(graph, n, name) > NAME_SIM_THRESHOLD)
            .collect()
    }

    /// The single nearest node within `radius_m` passing the same
    /// name-similarity test as [`Self::get_matching_nodes_set`].
    #[must_use]
    pub fn get_matching_node(&self, graph: &RoutingGraph, center: Point, name: &str, radius_m: f64) -> Option<(NodeIdx, f64)> {
        self.get_matching_nodes_set(graph, center, name, radius_m)
            .into_iter()
            .map(|n| (n, web_merc_meter_dist(graph.node(n).unwrap().geometry, center)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Best similarity (Jaro-Winkler, 0..1) between `name` and any of `n`'s
/// station-info names; `0.0` if `n` carries no station info at all.
fn name_similarity(graph: &RoutingGraph, n: NodeIdx, name: &str) -> f64 {
    graph.node(n).unwrap().station_info.as_ref().map_or(0.0, |si| {
        si.names
            .iter()
            .map(|candidate| strsim::jaro_winkler(candidate, name))
            .fold(0.0, f64::max)
    })
}

fn cell_of(p: Point, cell_size_m: f64) -> Cell {
    let factor = web_merc_dist_factor(p);
    let cell = cell_size_m / factor;
    ((p.x() / cell) as i64, (p.y() / cell) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trgraph::{Node, StationInfo};

    #[test]
    fn finds_nearby_nodes() {
        let mut g = RoutingGraph::new();
        let a = g.add_node(Node::new(Point::new(0.0, 0.0)));
        let b = g.add_node(Node::new(Point::new(10_000.0, 0.0)));
        let grid = NodeGrid::build(&g, 500.0);

        let near = grid.get_matching_nodes(&g, Point::new(1.0, 0.0), 50.0);
        assert_eq!(near, vec![a]);
        let _ = b;
    }

    #[test]
    fn distance_matching_node_ignores_non_station_nodes() {
        let mut g = RoutingGraph::new();
        g.add_node(Node::new(Point::new(0.0, 0.0)));
        let station = g.add_node(Node::with_station(
            Point::new(5.0, 0.0),
            StationInfo {
                names: vec!["Central".to_string()],
                track: None,
                stops: vec![],
                from_map_data: true,
                lines: hashbrown::HashSet::new(),
            },
        ));
        let grid = NodeGrid::build(&g, 500.0);

        let found = grid.get_distance_matching_node(&g, Point::new(0.0, 0.0), 50.0);
        assert_eq!(found.unwrap().0, station);
    }

    #[test]
    fn matching_node_requires_name_similarity() {
        let mut g = RoutingGraph::new();
        let similar = g.add_node(Node::with_station(
            Point::new(0.0, 0.0),
            StationInfo {
                names: vec!["Central Station".to_string()],
                track: None,
                stops: vec![],
                from_map_data: true,
                lines: hashbrown::HashSet::new(),
            },
        ));
        g.add_node(Node::with_station(
            Point::new(1.0, 0.0),
            StationInfo {
                names: vec!["Zzyzx".to_string()],
                track: None,
                stops: vec![],
                from_map_data: true,
                lines: hashbrown::HashSet::new(),
            },
        ));
        let grid = NodeGrid::build(&g, 500.0);

        let hits = grid.get_matching_nodes_set(&g, Point::new(0.0, 0.0), "Central Station", 50.0);
        assert_eq!(hits, vec![similar]);
    }
}
