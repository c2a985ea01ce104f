//! Groups trips that would produce the same shape, so the engine only
//! routes one representative trip per group.

use hashbrown::HashMap;

use crate::feed::{FeedAccess, Stop, Trip};
use crate::geo_util::web_merc_meter_dist;
use crate::normalizer::Normalizer;

/// The routing-relevant identity of a trip's route: short name (falling
/// back to long name) plus normalized terminal station names. Two trips
/// with equal attrs and positionally equal stops are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteAttrs {
    pub name: String,
    pub from: String,
    pub to: String,
}

#[must_use]
pub fn get_route_attrs(feed: &impl FeedAccess, normalizer: &Normalizer, trip: &Trip) -> Option<RouteAttrs> {
    let route = feed.route(&trip.route_id)?;
    let name = route
        .short_name
        .clone()
        .or_else(|| route.long_name.clone())
        .unwrap_or_default();

    let stop_times = feed.stop_times_for_trip(&trip.id);
    let first = feed.stop(&stop_times.first()?.stop_id)?;
    let last = feed.stop(&stop_times.last()?.stop_id)?;

    Some(RouteAttrs {
        name,
        from: normalizer.normalize(&first.name),
        to: normalizer.normalize(&last.name),
    })
}

fn stops_routing_equal(a: &Stop, b: &Stop, normalizer: &Normalizer) -> bool {
    if normalizer.normalize(&a.name) != normalizer.normalize(&b.name) {
        return false;
    }
    let pa = a.platform_code.as_deref().map(|p| normalizer.normalize(p));
    let pb = b.platform_code.as_deref().map(|p| normalizer.normalize(p));
    if pa != pb {
        return false;
    }
    web_merc_meter_dist(a.geometry, b.geometry) <= 1.0
}

/// `true` if `a` and `b` would route identically: same stop count, same
/// route attrs, and pairwise-equal stops in order.
#[must_use]
pub fn trips_routing_equal(feed: &impl FeedAccess, normalizer: &Normalizer, a: &Trip, b: &Trip) -> bool {
    let sta = feed.stop_times_for_trip(&a.id);
    let stb = feed.stop_times_for_trip(&b.id);
    if sta.len() != stb.len() || sta.len() < 2 {
        return false;
    }

    match (get_route_attrs(feed, normalizer, a), get_route_attrs(feed, normalizer, b)) {
        (Some(ra), Some(rb)) if ra == rb => {}
        _ => return false,
    }

    sta.iter().zip(stb.iter()).all(|(x, y)| {
        match (feed.stop(&x.stop_id), feed.stop(&y.stop_id)) {
            (Some(sx), Some(sy)) => stops_routing_equal(sx, sy, normalizer),
            _ => false,
        }
    })
}

/// Buckets trips by `(first stop, last stop)` and then groups each
/// bucket by routing equality, a linear scan within bucket matching the
/// original's own per-bucket approach. Trips that already carry a shape
/// are skipped unless `drop_shapes` is set; trips with fewer than two
/// stop times or an unresolvable route are skipped entirely.
#[must_use]
pub fn cluster_trips(feed: &impl FeedAccess, normalizer: &Normalizer, drop_shapes: bool) -> Vec<Vec<usize>> {
    let trips = feed.trips();
    let mut buckets: HashMap<(String, String), Vec<usize>> = HashMap::new();

    for (idx, trip) in trips.iter().enumerate() {
        if trip.shape_id.is_some() && !drop_shapes {
            continue;
        }
        let stop_times = feed.stop_times_for_trip(&trip.id);
        if stop_times.len() < 2 {
            continue;
        }
        if feed.route(&trip.route_id).is_none() {
            continue;
        }
        let key = (
            stop_times.first().unwrap().stop_id.clone(),
            stop_times.last().unwrap().stop_id.clone(),
        );
        buckets.entry(key).or_default().push(idx);
    }

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for members in buckets.into_values() {
        'member: for idx in members {
            for cluster in &mut clusters {
                let rep = cluster[0];
                if trips_routing_equal(feed, normalizer, &trips[rep], &trips[idx]) {
                    cluster.push(idx);
                    continue 'member;
                }
            }
            clusters.push(vec![idx]);
        }
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Route, Shape, StopTime};
    use geo::Point;

    struct TestFeed {
        stops: Vec<Stop>,
        routes: Vec<Route>,
        trips: Vec<Trip>,
        stop_times: HashMap<String, Vec<StopTime>>,
    }

    impl FeedAccess for TestFeed {
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

    fn feed_with_two_identical_trips() -> TestFeed {
        let stops = vec![
            Stop {
                id: "A".into(),
                name: "Alpha".into(),
                platform_code: None,
                geometry: Point::new(0.0, 0.0),
            },
            Stop {
                id: "B".into(),
                name: "Beta".into(),
                platform_code: None,
                geometry: Point::new(1.0, 1.0),
            },
        ];
        let routes = vec![Route {
            id: "R1".into(),
            short_name: Some("1".into()),
            long_name: None,
            route_type: 3,
        }];
        let trips = vec![
            Trip {
                id: "T1".into(),
                route_id: "R1".into(),
                shape_id: None,
                trip_short_name: None,
            },
            Trip {
                id: "T2".into(),
                route_id: "R1".into(),
                shape_id: None,
                trip_short_name: None,
            },
        ];
        let mut stop_times = HashMap::new();
        for tid in ["T1", "T2"] {
            stop_times.insert(
                tid.to_string(),
                vec![
                    StopTime {
                        trip_id: tid.into(),
                        stop_id: "A".into(),
                        sequence: 0,
                        arrival_time: 0,
                        departure_time: 0,
                        shape_dist_traveled: None,
                    },
                    StopTime {
                        trip_id: tid.into(),
                        stop_id: "B".into(),
                        sequence: 1,
                        arrival_time: 60,
                        departure_time: 60,
                        shape_dist_traveled: None,
                    },
                ],
            );
        }
        TestFeed {
            stops,
            routes,
            trips,
            stop_times,
        }
    }

    #[test]
    fn identical_trips_cluster_together() {
        let feed = feed_with_two_identical_trips();
        let normalizer = Normalizer::default_station();
        let clusters = cluster_trips(&feed, &normalizer, false);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 2);
    }
}
