/*!
# shapeforge-core

Reconstructs geographically accurate vehicle shapes for a transit
schedule by map-matching each trip's ordered stop sequence onto a
routing graph built from map data.

Parsing a GTFS feed into [`feed::FeedAccess`] and building the
[`trgraph::RoutingGraph`] from map data are both left to the caller —
this crate starts once both are in hand, clusters trips that would
produce the same shape, routes one representative per cluster, and
distributes the resulting polyline (with interpolated stop times) back
to every trip in the cluster.

# Example
```ignore
let graph = build_routing_graph_from_osm(...); // caller-provided
let restrictor = router::Restrictor::new();
let cfg = config::EngineConfig::default();
let map_data = map_data::MapData::new(graph, restrictor, &feed, &cfg.routing_options, 500.0, 80.0);
let normalizer = normalizer::Normalizer::default_station();

let result = shapes::build_all(&feed, &map_data, &normalizer, &cfg, 0);
for assignment in result.assignments {
    println!("{} -> {}", assignment.trip_id, assignment.shape_id);
}
```
*/

pub mod cluster;
pub mod config;
pub mod error;
pub mod eval;
pub mod feed;
pub mod geo_util;
pub mod grid;
pub mod map_data;
pub mod normalizer;
pub mod router;
pub mod shapes;
pub mod transit_graph;
pub mod trgraph;

pub use error::{Error, Result};
