//! Optional output graph: one node per visited station, one edge per
//! distinct routing-graph edge actually used by a built shape, annotated
//! with which routes/trips ran over it. Grounded on the original's
//! `write_transit_graph`/`build_transit_graph` dedup-by-canonical-edge
//! approach.

use hashbrown::{HashMap, HashSet};
use itertools::Itertools;

use crate::feed::{RouteId, TripId};
use crate::router::Hop;
use crate::trgraph::{EdgeIdx, RoutingGraph};

#[derive(Debug, Clone, Default)]
pub struct EdgeUsage {
    pub route_short_names: HashSet<String>,
    pub trip_short_names: HashSet<String>,
    pub trip_ids: HashSet<TripId>,
    pub num_trips: usize,
}

impl EdgeUsage {
    /// Route short names in sorted order, for stable output (e.g. a LINE
    /// label on a rendered edge) independent of hash-set iteration order.
    #[must_use]
    pub fn sorted_route_short_names(&self) -> Vec<&String> {
        self.route_short_names.iter().sorted().collect()
    }

    #[must_use]
    pub fn sorted_trip_short_names(&self) -> Vec<&String> {
        self.trip_short_names.iter().sorted().collect()
    }

    #[must_use]
    pub fn sorted_trip_ids(&self) -> Vec<&TripId> {
        self.trip_ids.iter().sorted().collect()
    }
}

#[derive(Debug, Default)]
pub struct TransitGraphOutput {
    /// Canonical (non-reversed) routing edge -> aggregated usage.
    pub edges: HashMap<EdgeIdx, EdgeUsage>,
}

impl TransitGraphOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalizes a reversed edge back to its forward counterpart
    /// before keying the incidence map, so a road traveled in both
    /// directions by different trips accumulates on one entry.
    fn canonical(&self, graph: &RoutingGraph, e: EdgeIdx) -> EdgeIdx {
        let edge = graph.edge(e).unwrap();
        if edge.reversed {
            graph.get_edge(edge.to, edge.from).unwrap_or(e)
        } else {
            e
        }
    }

    pub fn record_trip(
        &mut self,
        graph: &RoutingGraph,
        hops: &[Hop],
        route_id: &RouteId,
        route_short_name: Option<&str>,
        trip_id: &TripId,
        trip_short_name: Option<&str>,
    ) {
        let _ = route_id;
        for hop in hops {
            for &e in &hop.edges {
                let key = self.canonical(graph, e);
                let usage = self.edges.entry(key).or_default();
                usage.num_trips += 1;
                if let Some(name) = route_short_name {
                    usage.route_short_names.insert(name.to_string());
                }
                if let Some(name) = trip_short_name {
                    usage.trip_short_names.insert(name.to_string());
                }
                usage.trip_ids.insert(trip_id.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::Point;

    use super::*;
    use crate::router::Hop;
    use crate::trgraph::{Edge, Node};

    #[test]
    fn record_trip_aggregates_usage_and_sorts_names() {
        let mut graph = RoutingGraph::new();
        let a = graph.add_node(Node::new(Point::new(0.0, 0.0)));
        let b = graph.add_node(Node::new(Point::new(10.0, 0.0)));
        let e = graph.add_edge(a, b, Edge::new(a, b)).unwrap();

        let hop = Hop {
            edges: vec![e],
            start: a,
            end: b,
            cost: 10.0,
            reachable: true,
        };

        let mut out = TransitGraphOutput::new();
        out.record_trip(
            &graph,
            &[hop.clone()],
            &"R1".to_string(),
            Some("2"),
            &"T1".to_string(),
            Some("102"),
        );
        out.record_trip(&graph, &[hop], &"R1".to_string(), Some("1"), &"T2".to_string(), Some("101"));

        let usage = out.edges.get(&e).unwrap();
        assert_eq!(usage.num_trips, 2);
        assert_eq!(usage.sorted_route_short_names(), vec!["1", "2"]);
        assert_eq!(usage.sorted_trip_ids(), vec!["T1", "T2"]);
        assert_eq!(usage.sorted_trip_short_names(), vec!["101", "102"]);
    }
}
