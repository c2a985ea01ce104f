//! Orchestrates the whole engine run: cluster trips, route one
//! representative per cluster, assemble a shape polyline, and distribute
//! it (with interpolated stop times) to every trip in the cluster.

use std::sync::Mutex;

use geo::Point;
use hashbrown::{HashMap, HashSet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::cluster::cluster_trips;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::feed::{FeedAccess, Shape, ShapeAssignment, ShapeId, ShapePoint, StopTime};
use crate::map_data::MapData;
use crate::normalizer::Normalizer;
use crate::router::{self, CandidateRoute, Hop};
use crate::trgraph::RoutingGraph;

const DWELL_SECONDS: u32 = 10;
const POINT_DEDUP_EPS_M: f64 = 0.01;

/// Registry of shapes built during a run, plus the shape-id free-counter
/// and the reference-count map used to drop unused input shapes.
pub struct ShapeRegistry {
    shapes: Mutex<HashMap<ShapeId, Shape>>,
    counters: Mutex<HashMap<String, u32>>,
}

impl Default for ShapeRegistry {
    fn default() -> Self {
        Self {
            shapes: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
        }
    }
}

impl ShapeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates `shp_<base>_<n>`, incrementing `n` until the id is not
    /// already taken — mirrors the original's mutex-guarded free-id loop.
    pub fn free_shape_id(&self, base: &str) -> ShapeId {
        let mut counters = self.counters.lock().unwrap();
        let shapes = self.shapes.lock().unwrap();
        let mut n = *counters.get(base).unwrap_or(&0);
        loop {
            let candidate = format!("shp_{base}_{n}");
            n += 1;
            if !shapes.contains_key(&candidate) {
                counters.insert(base.to_string(), n);
                return candidate;
            }
        }
    }

    pub fn insert(&self, shape: Shape) {
        self.shapes.lock().unwrap().insert(shape.id.clone(), shape);
    }

    #[must_use]
    pub fn into_inner(self) -> HashMap<ShapeId, Shape> {
        self.shapes.into_inner().unwrap()
    }
}

/// Walks a sequence of hops in travel order (hops store edges in reverse
/// traversal order, see [`Hop`]) and emits a deduplicated polyline,
/// skipping points closer than [`POINT_DEDUP_EPS_M`] to the last emitted
/// point. A hop with no edges (candidates snapped to the same node)
/// contributes nothing beyond its shared endpoint.
#[must_use]
pub fn build_gtfs_shape(graph: &RoutingGraph, hops: &[Hop]) -> Vec<Point> {
    let mut points: Vec<Point> = Vec::new();

    for hop in hops {
        for &edge_idx in hop.edges.iter().rev() {
            let edge = graph.edge(edge_idx).unwrap();
            let geom: Vec<Point> = if edge.reversed {
                edge.geometry.iter().rev().copied().collect()
            } else {
                edge.geometry.clone()
            };
            for p in geom {
                match points.last() {
                    Some(&last) if crate::geo_util::web_merc_meter_dist(last, p) < POINT_DEDUP_EPS_M => {}
                    _ => points.push(p),
                }
            }
        }
        if hop.edges.is_empty() {
            let p = graph.node(hop.end).unwrap().geometry;
            match points.last() {
                Some(&last) if crate::geo_util::web_merc_meter_dist(last, p) < POINT_DEDUP_EPS_M => {}
                _ => points.push(p),
            }
        }
    }

    points
}

/// Per-stop cumulative distance and, when `interpolate` is set, per-stop
/// `(arrival, departure)` times. Only intermediate stops receive the
/// fixed dwell; the first and last stop's times are taken verbatim from
/// `stop_times`.
pub fn set_shape(stop_times: &[StopTime], hop_lengths_m: &[f64], interpolate: bool) -> Result<(Vec<f64>, Option<Vec<(u32, u32)>>)> {
    if stop_times.len() != hop_lengths_m.len() + 1 {
        return Err(Error::InconsistentSizes {
            what: "stop_times vs hops",
            expected: hop_lengths_m.len() + 1,
            actual: stop_times.len(),
        });
    }

    let mut dist_traveled = Vec::with_capacity(stop_times.len());
    dist_traveled.push(0.0);
    for &len in hop_lengths_m {
        dist_traveled.push(dist_traveled.last().unwrap() + len);
    }
    let total_cost = *dist_traveled.last().unwrap();

    if !interpolate || stop_times.len() < 2 {
        return Ok((dist_traveled, None));
    }

    let first = &stop_times[0];
    let last = stop_times.last().unwrap();
    let span = f64::from(last.arrival_time.saturating_sub(first.departure_time));

    let mut times = Vec::with_capacity(stop_times.len());
    times.push((first.arrival_time, first.departure_time));
    for i in 1..stop_times.len() - 1 {
        let frac = if total_cost > 0.0 {
            dist_traveled[i] / total_cost
        } else {
            0.0
        };
        let arrival = first.departure_time + (span * frac).round() as u32;
        times.push((arrival, arrival + DWELL_SECONDS));
    }
    times.push((last.arrival_time, last.departure_time));

    Ok((dist_traveled, Some(times)))
}

/// Result of a full engine run.
#[derive(Default)]
pub struct EngineResult {
    pub assignments: Vec<ShapeAssignment>,
    pub shapes: HashMap<ShapeId, Shape>,
    pub skipped: Vec<(String, Error)>,
}

/// Clusters every droppable-shape trip in `feed`, routes one
/// representative per cluster, and distributes the resulting shape to
/// every trip in the cluster. Parallelized across clusters with `rayon`;
/// a cluster whose representative has no routable candidates is skipped
/// (logged) rather than aborting the whole run.
pub fn build_all(
    feed: &(impl FeedAccess + Sync),
    map_data: &MapData,
    normalizer: &Normalizer,
    cfg: &EngineConfig,
    shuffle_seed: u64,
) -> EngineResult {
    let mut clusters = cluster_trips(feed, normalizer, cfg.drop_shapes);

    if !cfg.mot_set.is_empty() {
        clusters.retain(|cluster| {
            feed.route(&feed.trips()[cluster[0]].route_id)
                .is_some_and(|r| cfg.mot_set.contains(&r.route_type))
        });
    }
    if let Some(only_trip) = &cfg.shape_trip_id {
        clusters.retain(|cluster| cluster.iter().any(|&idx| &feed.trips()[idx].id == only_trip));
    }

    let mut rng = StdRng::seed_from_u64(shuffle_seed);
    clusters.shuffle(&mut rng);

    let registry = ShapeRegistry::new();

    let per_cluster: Vec<Result<Vec<ShapeAssignment>>> = clusters
        .par_iter()
        .map(|cluster| process_cluster(feed, map_data, cfg, &registry, cluster))
        .collect();

    let mut result = EngineResult::default();
    for (cluster, outcome) in clusters.iter().zip(per_cluster) {
        match outcome {
            Ok(assignments) => result.assignments.extend(assignments),
            Err(e) => {
                let trip_id = feed.trips()[cluster[0]].id.clone();
                log::error!("skipping cluster represented by trip {trip_id}: {e}");
                result.skipped.push((trip_id, e));
            }
        }
    }
    result.shapes = registry.into_inner();
    result
}

fn process_cluster(
    feed: &impl FeedAccess,
    map_data: &MapData,
    cfg: &EngineConfig,
    registry: &ShapeRegistry,
    cluster: &[usize],
) -> Result<Vec<ShapeAssignment>> {
    let graph = &map_data.graph;
    let trips = feed.trips();
    let rep = &trips[cluster[0]];
    let rep_stop_times = feed.stop_times_for_trip(&rep.id);

    let candidate_route: CandidateRoute = router::get_node_candidate_route(graph, &rep.id, rep_stop_times)?;

    let route = feed.route(&rep.route_id);
    let trip_lines: HashSet<String> = route
        .and_then(|r| r.short_name.clone())
        .into_iter()
        .collect();

    let hops = router::route(
        graph,
        &map_data.restrictor,
        &cfg.routing_options,
        &trip_lines,
        cfg.use_caching,
        &candidate_route,
        cfg.solve_method,
    )?;

    let points = build_gtfs_shape(graph, &hops);
    let hop_lengths: Vec<f64> = hops
        .iter()
        .map(|h| h.edges.iter().map(|&e| graph.edge(e).unwrap().length_m).sum())
        .collect();

    let base = route
        .and_then(|r| r.short_name.clone().or_else(|| r.long_name.clone()))
        .unwrap_or_else(|| rep.id.clone());
    let shape_id = registry.free_shape_id(&base);

    let mut dist_traveled = 0.0;
    let mut prev: Option<Point> = None;
    let shape_points: Vec<ShapePoint> = points
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            if let Some(prev_p) = prev {
                dist_traveled += crate::geo_util::web_merc_meter_dist(prev_p, p);
            }
            prev = Some(p);
            ShapePoint {
                geometry: p,
                sequence: i as u32,
                dist_traveled,
            }
        })
        .collect();
    registry.insert(Shape {
        id: shape_id.clone(),
        points: shape_points,
    });

    let mut assignments = Vec::with_capacity(cluster.len());
    for &idx in cluster {
        let trip = &trips[idx];
        let stop_times = feed.stop_times_for_trip(&trip.id);
        let (dist_traveled, times) = set_shape(stop_times, &hop_lengths, cfg.interpolate_times)?;
        assignments.push(ShapeAssignment {
            trip_id: trip.id.clone(),
            shape_id: shape_id.clone(),
            stop_dist_traveled: dist_traveled,
            interpolated_times: times,
        });
    }

    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::StopTime;

    #[test]
    fn set_shape_rejects_mismatched_sizes() {
        let stop_times = vec![StopTime {
            trip_id: "T".into(),
            stop_id: "A".into(),
            sequence: 0,
            arrival_time: 0,
            departure_time: 0,
            shape_dist_traveled: None,
        }];
        let err = set_shape(&stop_times, &[1.0, 2.0], true).unwrap_err();
        assert!(matches!(err, Error::InconsistentSizes { .. }));
    }

    #[test]
    fn set_shape_keeps_endpoint_times_from_input() {
        let stop_times = vec![
            StopTime {
                trip_id: "T".into(),
                stop_id: "A".into(),
                sequence: 0,
                arrival_time: 0,
                departure_time: 0,
                shape_dist_traveled: None,
            },
            StopTime {
                trip_id: "T".into(),
                stop_id: "B".into(),
                sequence: 1,
                arrival_time: 50,
                departure_time: 55,
                shape_dist_traveled: None,
            },
            StopTime {
                trip_id: "T".into(),
                stop_id: "C".into(),
                sequence: 2,
                arrival_time: 100,
                departure_time: 100,
                shape_dist_traveled: None,
            },
        ];
        let (dist, times) = set_shape(&stop_times, &[50.0, 50.0], true).unwrap();
        assert_eq!(dist, vec![0.0, 50.0, 100.0]);
        let times = times.unwrap();
        assert_eq!(times[0], (0, 0));
        assert_eq!(times[2], (100, 100));
    }
}
