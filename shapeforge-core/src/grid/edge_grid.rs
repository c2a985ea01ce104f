//! Uniform grid over graph edges for radius queries, bucketed by the
//! cells each edge's bounding box touches.

use geo::Point;
use hashbrown::{HashMap, HashSet};

use crate::geo_util::web_merc_dist_factor;
use crate::trgraph::{EdgeIdx, RoutingGraph};

type Cell = (i64, i64);

pub struct EdgeGrid {
    cell_size_m: f64,
    buckets: HashMap<Cell, Vec<EdgeIdx>>,
}

impl EdgeGrid {
    #[must_use]
    pub fn build(graph: &RoutingGraph, cell_size_m: f64) -> Self {
        let mut buckets: HashMap<Cell, Vec<EdgeIdx>> = HashMap::new();
        for e in graph.edge_indices() {
            let edge = graph.edge(e).unwrap();
            for p in &edge.geometry {
                let cell = cell_of(*p, cell_size_m);
                let bucket = buckets.entry(cell).or_default();
                if !bucket.contains(&e) {
                    bucket.push(e);
                }
            }
        }
        Self {
            cell_size_m,
            buckets,
        }
    }

    /// Edges whose geometry passes within `radius_m` of `center`, closest
    /// perpendicular distance first.
    #[must_use]
    pub fn get_matching_edges(
        &self,
        graph: &RoutingGraph,
        center: Point,
        radius_m: f64,
    ) -> Vec<(EdgeIdx, f64)> {
        let factor = web_merc_dist_factor(center);
        let cell_radius = ((radius_m * factor) / self.cell_size_m).ceil() as i64;
        let (cx, cy) = cell_of(center, self.cell_size_m);

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for dx in -cell_radius..=cell_radius {
            for dy in -cell_radius..=cell_radius {
                if let Some(v) = self.buckets.get(&(cx + dx, cy + dy)) {
                    for &e in v {
                        if !seen.insert(e) {
                            continue;
                        }
                        let edge = graph.edge(e).unwrap();
                        let d = min_point_to_polyline_dist(center, &edge.geometry);
                        if d <= radius_m {
                            out.push((e, d));
                        }
                    }
                }
            }
        }
        out.sort_by(|a, b| a.1.total_cmp(&b.1));
        out
    }
}

fn min_point_to_polyline_dist(p: Point, line: &[Point]) -> f64 {
    line.windows(2)
        .map(|seg| point_to_segment_dist(p, seg[0], seg[1]))
        .fold(f64::INFINITY, f64::min)
}

fn point_to_segment_dist(p: Point, a: Point, b: Point) -> f64 {
    let (ax, ay, bx, by, px, py) = (a.x(), a.y(), b.x(), b.y(), p.x(), p.y());
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq < 1e-12 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

fn cell_of(p: Point, cell_size_m: f64) -> Cell {
    let factor = web_merc_dist_factor(p);
    let cell = cell_size_m / factor;
    ((p.x() / cell) as i64, (p.y() / cell) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trgraph::{Edge, Node};

    #[test]
    fn finds_edges_near_point() {
        let mut g = RoutingGraph::new();
        let a = g.add_node(Node::new(Point::new(0.0, 0.0)));
        let b = g.add_node(Node::new(Point::new(100.0, 0.0)));
        let mut edge = Edge::new(a, b);
        edge.geometry = vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)];
        g.add_edge(a, b, edge);

        let grid = EdgeGrid::build(&g, 200.0);
        let hits = grid.get_matching_edges(&g, Point::new(50.0, 5.0), 10.0);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].1 - 5.0).abs() < 1e-9);
    }
}
