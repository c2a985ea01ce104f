//! Bundles the pieces a caller builds from map data before handing the
//! engine a feed to route: the cleaned routing graph, its two spatial
//! indices, turn restrictions, and the per-stop candidate groups
//! precomputed against that graph. Building the graph itself (parsing
//! OSM data, running `cleanup`) is out of scope here — `MapData` is just
//! the shape the engine expects to receive it in, grounded on
//! `original_source`'s `shape_builder` constructor argument list (`_g`,
//! `_nGrid`, `_eGrid`, `_restr`).

use crate::config::RoutingOptions;
use crate::feed::FeedAccess;
use crate::grid::{EdgeGrid, NodeGrid};
use crate::router::{self, Restrictor};
use crate::trgraph::RoutingGraph;

pub struct MapData {
    pub graph: RoutingGraph,
    pub node_grid: NodeGrid,
    pub edge_grid: EdgeGrid,
    pub restrictor: Restrictor,
}

impl MapData {
    /// Builds the two spatial indices from an already-cleaned `graph`
    /// and precomputes every stop's candidate group against it, so
    /// matching a trip later is a pure lookup rather than a live query.
    #[must_use]
    pub fn new(
        mut graph: RoutingGraph,
        restrictor: Restrictor,
        feed: &impl FeedAccess,
        opts: &RoutingOptions,
        grid_cell_size_m: f64,
        candidate_radius_m: f64,
    ) -> Self {
        let node_grid = NodeGrid::build(&graph, grid_cell_size_m);
        let edge_grid = EdgeGrid::build(&graph, grid_cell_size_m);
        router::build_candidate_groups(feed, &mut graph, &node_grid, opts, candidate_radius_m);
        Self {
            graph,
            node_grid,
            edge_grid,
            restrictor,
        }
    }
}

#[cfg(test)]
mod tests {
    use geo::Point;

    use super::*;
    use crate::feed::{Route, Shape, Stop, StopTime, Trip};
    use crate::trgraph::Node;

    struct OneStopFeed {
        stops: Vec<Stop>,
    }

    impl FeedAccess for OneStopFeed {
        fn stops(&self) -> &[Stop] {
            &self.stops
        }
        fn routes(&self) -> &[Route] {
            &[]
        }
        fn trips(&self) -> &[Trip] {
            &[]
        }
        fn stop_times_for_trip(&self, _trip_id: &str) -> &[StopTime] {
            &[]
        }
        fn shape(&self, _shape_id: &str) -> Option<&Shape> {
            None
        }
    }

    #[test]
    fn new_indexes_the_graph_it_is_given() {
        let mut graph = RoutingGraph::new();
        let n = graph.add_node(Node::new(Point::new(0.0, 0.0)));
        let feed = OneStopFeed {
            stops: vec![Stop {
                id: "s1".into(),
                name: "Stop".into(),
                platform_code: None,
                geometry: Point::new(0.0, 0.0),
            }],
        };
        let opts = RoutingOptions::default();
        let map_data = MapData::new(graph, Restrictor::new(), &feed, &opts, 500.0, 50.0);
        let hits = map_data.node_grid.get_matching_nodes(&map_data.graph, Point::new(0.0, 0.0), 10.0);
        assert_eq!(hits, vec![n]);
        assert_eq!(map_data.graph.candidate_group("s1").unwrap().len(), 1);
    }
}
