//! Candidate node selection: map each stop a trip visits to the set of
//! routing-graph nodes it could plausibly correspond to.
//!
//! Candidate groups are computed once, during map-data ingest, and
//! stored on [`RoutingGraph`] keyed by stop id — routing a trip is then
//! a pure lookup, matching `shape_builder.cpp`'s
//! `_stops.at(&s)->pl().get_si()->get_group()->get_node_candidates(&s)`,
//! a lookup through the node's station group rather than a live spatial
//! query re-run per match.

pub use crate::trgraph::{CandidateGroup, CandidateRoute, NodeCandidate};

use hashbrown::{HashMap, HashSet};

use crate::config::RoutingOptions;
use crate::error::{Error, Result};
use crate::feed::{FeedAccess, Stop, StopId, StopTime};
use crate::geo_util::web_merc_meter_dist;
use crate::grid::NodeGrid;
use crate::trgraph::RoutingGraph;

/// Builds the lines-served-per-stop index the candidate-selection-time
/// "unmatched line name" penalty needs: every route short name (falling
/// back to the route id) of any trip visiting the stop.
fn build_stop_lines(feed: &impl FeedAccess) -> HashMap<StopId, HashSet<String>> {
    let mut stop_lines: HashMap<StopId, HashSet<String>> = HashMap::new();
    for trip in feed.trips() {
        let Some(route) = feed.route(&trip.route_id) else {
            continue;
        };
        let line = route.short_name.clone().unwrap_or_else(|| route.id.clone());
        for st in feed.stop_times_for_trip(&trip.id) {
            stop_lines.entry(st.stop_id.clone()).or_default().insert(line.clone());
        }
    }
    stop_lines
}

/// Candidate nodes for a single stop: every graph node within
/// `radius_m` of the stop, penalized by distance, platform mismatch,
/// unmatched line name, station-group membership and non-map-data
/// origin. Empty when nothing is close enough — callers turn that into
/// a per-trip skip, never a panic.
#[must_use]
fn build_candidate_group(
    stop: &Stop,
    stop_lines: Option<&HashSet<String>>,
    graph: &RoutingGraph,
    grid: &NodeGrid,
    opts: &RoutingOptions,
    radius_m: f64,
) -> CandidateGroup {
    grid.get_matching_nodes(graph, stop.geometry, radius_m)
        .into_iter()
        .map(|node| {
            let n = graph.node(node).unwrap();
            let dist = web_merc_meter_dist(n.geometry, stop.geometry);
            let mut penalty = dist * opts.station_dist_pen_factor;

            match &n.station_info {
                Some(si) => {
                    if let (Some(want), Some(have)) = (&stop.platform_code, &si.track) {
                        if want != have {
                            penalty += opts.platform_unmatched_pen;
                        }
                    }
                    if !si.stops.iter().any(|s| s == &stop.id) {
                        penalty += opts.group_pen;
                    }
                    if let Some(lines) = stop_lines {
                        if !si.lines.is_empty() && si.lines.is_disjoint(lines) {
                            penalty += opts.group_line_unmatched_pen;
                        }
                    }
                }
                None => penalty += opts.non_osm_pen,
            }

            NodeCandidate { node, penalty }
        })
        .collect()
}

/// Precomputes and stores a candidate group for every stop in `feed`,
/// run once during ingest so matching never re-queries the grid.
pub fn build_candidate_groups(
    feed: &impl FeedAccess,
    graph: &mut RoutingGraph,
    grid: &NodeGrid,
    opts: &RoutingOptions,
    radius_m: f64,
) {
    let stop_lines = build_stop_lines(feed);
    for stop in feed.stops() {
        let group = build_candidate_group(stop, stop_lines.get(&stop.id), graph, grid, opts, radius_m);
        graph.set_candidate_group(stop.id.clone(), group);
    }
}

/// Candidate groups for every stop of a trip, in stop-sequence order,
/// looked up from the precomputed groups on `graph`. Fails fatally
/// (per-trip) the moment any stop has no candidates.
pub fn get_node_candidate_route(graph: &RoutingGraph, trip_id: &str, stop_times: &[StopTime]) -> Result<CandidateRoute> {
    let mut route = Vec::with_capacity(stop_times.len());
    for st in stop_times {
        let group = graph
            .candidate_group(&st.stop_id)
            .ok_or_else(|| Error::UnknownStop(st.stop_id.clone()))?;
        if group.is_empty() {
            return Err(Error::NoCandidatesForStop {
                trip_id: trip_id.to_string(),
                stop_id: st.stop_id.clone(),
            });
        }
        route.push(group.clone());
    }
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trgraph::Node;
    use geo::Point;

    #[test]
    fn empty_candidates_when_nothing_nearby() {
        let g = RoutingGraph::new();
        let grid = NodeGrid::build(&g, 500.0);
        let stop = Stop {
            id: "s1".into(),
            name: "Stop".into(),
            platform_code: None,
            geometry: Point::new(0.0, 0.0),
        };
        let group = build_candidate_group(&stop, None, &g, &grid, &RoutingOptions::default(), 50.0);
        assert!(group.is_empty());
    }

    #[test]
    fn finds_candidate_with_zero_penalty_when_platforms_match() {
        let mut g = RoutingGraph::new();
        let n = g.add_node(Node::new(Point::new(0.0, 0.0)));
        let grid = NodeGrid::build(&g, 500.0);
        let stop = Stop {
            id: "s1".into(),
            name: "Stop".into(),
            platform_code: None,
            geometry: Point::new(0.0, 0.0),
        };
        let group = build_candidate_group(&stop, None, &g, &grid, &RoutingOptions::default(), 50.0);
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].node, n);
    }

    #[test]
    fn station_group_mismatch_is_penalized() {
        use crate::trgraph::StationInfo;

        let mut g = RoutingGraph::new();
        let n = g.add_node(Node::with_station(
            Point::new(0.0, 0.0),
            StationInfo {
                names: vec!["Central".into()],
                track: None,
                stops: vec!["other_stop".into()],
                from_map_data: true,
                lines: HashSet::new(),
            },
        ));
        let grid = NodeGrid::build(&g, 500.0);
        let stop = Stop {
            id: "s1".into(),
            name: "Stop".into(),
            platform_code: None,
            geometry: Point::new(0.0, 0.0),
        };
        let mut opts = RoutingOptions::default();
        opts.group_pen = 50.0;
        let group = build_candidate_group(&stop, None, &g, &grid, &opts, 50.0);
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].node, n);
        assert!((group[0].penalty - 50.0).abs() < 1e-9);
    }

    #[test]
    fn build_candidate_groups_is_a_pure_lookup_afterwards() {
        let mut g = RoutingGraph::new();
        g.add_node(Node::new(Point::new(0.0, 0.0)));
        let grid = NodeGrid::build(&g, 500.0);

        struct OneStopFeed {
            stops: Vec<Stop>,
        }
        impl FeedAccess for OneStopFeed {
            fn stops(&self) -> &[Stop] {
                &self.stops
            }
            fn routes(&self) -> &[crate::feed::Route] {
                &[]
            }
            fn trips(&self) -> &[crate::feed::Trip] {
                &[]
            }
            fn stop_times_for_trip(&self, _trip_id: &str) -> &[StopTime] {
                &[]
            }
            fn shape(&self, _shape_id: &str) -> Option<&crate::feed::Shape> {
                None
            }
        }
        let feed = OneStopFeed {
            stops: vec![Stop {
                id: "s1".into(),
                name: "Stop".into(),
                platform_code: None,
                geometry: Point::new(0.0, 0.0),
            }],
        };

        build_candidate_groups(&feed, &mut g, &grid, &RoutingOptions::default(), 50.0);
        assert_eq!(g.candidate_group("s1").unwrap().len(), 1);
        assert!(g.candidate_group("missing").is_none());
    }
}
