//! Exercises `shapeforge_core` end to end against a small synthetic
//! fixture feed and graph. Full GTFS/OSM ingestion is out of scope for
//! this crate — building real `FeedAccess`/`RoutingGraph` instances is
//! left to a caller with an actual feed and map extract.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use geo::Point;
use hashbrown::HashMap;
use shapeforge_core::config::{EngineConfig, SolveMethod};
use shapeforge_core::feed::{FeedAccess, Route, Shape, Stop, StopTime, Trip};
use shapeforge_core::map_data::MapData;
use shapeforge_core::normalizer::Normalizer;
use shapeforge_core::router::Restrictor;
use shapeforge_core::trgraph::{Edge, Node, RoutingGraph};
use shapeforge_core::{shapes, Result};

#[derive(Parser, Debug)]
#[command(about = "Runs the shape-building engine against a fixture feed")]
struct Args {
    /// Candidate search radius, in meters.
    #[arg(long, default_value_t = 80.0)]
    radius_m: f64,

    /// Cluster processing order seed, for deterministic replay.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// One of global, greedy, greedy2.
    #[arg(long, default_value = "global")]
    solve_method: String,

    /// Optional GTFS feed directory (unused: ingestion is out of scope,
    /// kept here so the CLI's surface matches a real deployment's).
    #[arg(long)]
    gtfs_path: Option<PathBuf>,
}

struct FixtureFeed {
    stops: Vec<Stop>,
    routes: Vec<Route>,
    trips: Vec<Trip>,
    stop_times: HashMap<String, Vec<StopTime>>,
}

impl FeedAccess for FixtureFeed {
    fn stops(&self) -> &[Stop] {
        &self.stops
    }
    fn routes(&self) -> &[Route] {
        &self.routes
    }
    fn trips(&self) -> &[Trip] {
        &self.trips
    }
    fn stop_times_for_trip(&self, trip_id: &str) -> &[StopTime] {
        self.stop_times.get(trip_id).map_or(&[], Vec::as_slice)
    }
    fn shape(&self, _shape_id: &str) -> Option<&Shape> {
        None
    }
}

/// A short straight street with two stations at either end, one trip
/// between them — just enough to exercise candidate selection, routing
/// and shape assembly without a real map/feed.
fn build_fixture() -> (FixtureFeed, RoutingGraph) {
    let mut graph = RoutingGraph::new();
    let a = graph.add_node(Node::new(Point::new(0.0, 0.0)));
    let mid = graph.add_node(Node::new(Point::new(500.0, 0.0)));
    let b = graph.add_node(Node::new(Point::new(1000.0, 0.0)));

    let mut e1 = Edge::new(a, mid);
    e1.lines.insert("1".to_string());
    let mut e2 = Edge::new(mid, b);
    e2.lines.insert("1".to_string());
    graph.add_edge(a, mid, e1);
    graph.add_edge(mid, b, e2);
    graph.cleanup(45.0);

    let feed = FixtureFeed {
        stops: vec![
            Stop {
                id: "S1".into(),
                name: "Start".into(),
                platform_code: None,
                geometry: Point::new(0.0, 0.0),
            },
            Stop {
                id: "S2".into(),
                name: "End".into(),
                platform_code: None,
                geometry: Point::new(1000.0, 0.0),
            },
        ],
        routes: vec![Route {
            id: "R1".into(),
            short_name: Some("1".into()),
            long_name: None,
            route_type: 3,
        }],
        trips: vec![Trip {
            id: "T1".into(),
            route_id: "R1".into(),
            shape_id: None,
            trip_short_name: None,
        }],
        stop_times: [(
            "T1".to_string(),
            vec![
                StopTime {
                    trip_id: "T1".into(),
                    stop_id: "S1".into(),
                    sequence: 0,
                    arrival_time: 0,
                    departure_time: 0,
                    shape_dist_traveled: None,
                },
                StopTime {
                    trip_id: "T1".into(),
                    stop_id: "S2".into(),
                    sequence: 1,
                    arrival_time: 120,
                    departure_time: 120,
                    shape_dist_traveled: None,
                },
            ],
        )]
        .into_iter()
        .collect(),
    };

    (feed, graph)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let (feed, graph) = build_fixture();
    let mut cfg = EngineConfig::default();
    cfg.solve_method = SolveMethod::from_str(&args.solve_method)?;

    let map_data = MapData::new(
        graph,
        Restrictor::new(),
        &feed,
        &cfg.routing_options,
        500.0,
        args.radius_m,
    );
    let normalizer = Normalizer::default_station();

    let instant = std::time::Instant::now();
    let result = shapes::build_all(&feed, &map_data, &normalizer, &cfg, args.seed);
    log::info!("shape build time: {:?}", instant.elapsed());

    for assignment in &result.assignments {
        println!(
            "trip {} -> shape {} ({} stops)",
            assignment.trip_id,
            assignment.shape_id,
            assignment.stop_dist_traveled.len()
        );
    }
    for (trip_id, err) in &result.skipped {
        log::warn!("skipped trip {trip_id}: {err}");
    }

    Ok(())
}
