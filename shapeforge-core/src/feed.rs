//! The transit-schedule side of the engine's input: trips, stops, routes,
//! stop times and shapes. Parsing GTFS CSVs into these types is out of
//! scope here — `FeedAccess` is the boundary a real loader implements.

use std::collections::BTreeSet;

use geo::Point;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::Serialize;
use serde_json::map::Map;

pub type StopId = String;
pub type TripId = String;
pub type RouteId = String;
pub type ShapeId = String;

/// GTFS `route_type` code, kept as the raw integer the spec treats it as.
pub type RouteType = i32;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub platform_code: Option<String>,
    pub geometry: Point,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Route {
    pub id: RouteId,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub route_type: RouteType,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StopTime {
    pub trip_id: TripId,
    pub stop_id: StopId,
    pub sequence: u32,
    pub arrival_time: u32,
    pub departure_time: u32,
    pub shape_dist_traveled: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Trip {
    pub id: TripId,
    pub route_id: RouteId,
    pub shape_id: Option<ShapeId>,
    /// GTFS `trip_short_name`, distinct from `id` (GTFS `trip_id`) — the
    /// rider-facing label shown on a transit-graph edge, when the feed
    /// carries one.
    pub trip_short_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShapePoint {
    pub geometry: Point,
    pub sequence: u32,
    pub dist_traveled: f64,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub points: Vec<ShapePoint>,
}

impl Shape {
    /// Renders the shape as a single-feature `LineString` GeoJSON, the way
    /// a caller would dump a built shape for inspection on a map.
    #[must_use]
    pub fn to_geojson(&self) -> geojson::GeoJson {
        let coords: Vec<Vec<f64>> = self
            .points
            .iter()
            .map(|p| vec![p.geometry.x(), p.geometry.y()])
            .collect();

        let mut properties = Map::new();
        properties.insert("id".to_string(), self.id.clone().into());

        let feature = Feature {
            geometry: Some(Geometry::new(Value::LineString(coords))),
            properties: Some(properties),
            id: None,
            bbox: None,
            foreign_members: None,
        };

        geojson::GeoJson::FeatureCollection(FeatureCollection {
            features: vec![feature],
            bbox: None,
            foreign_members: None,
        })
    }
}

/// Read-only view over a transit schedule. Implemented by whatever feed
/// loader a caller plugs in; `shapeforge-core` never parses GTFS itself.
pub trait FeedAccess {
    fn stops(&self) -> &[Stop];
    fn routes(&self) -> &[Route];
    fn trips(&self) -> &[Trip];
    fn stop_times_for_trip(&self, trip_id: &str) -> &[StopTime];
    fn shape(&self, shape_id: &str) -> Option<&Shape>;

    fn stop(&self, id: &str) -> Option<&Stop> {
        self.stops().iter().find(|s| s.id == id)
    }

    fn route(&self, id: &str) -> Option<&Route> {
        self.routes().iter().find(|r| r.id == id)
    }

    /// Trips whose route is one of `modes`, matching
    /// `shape_builder::get_gtfs_box`'s mode-of-transport filter.
    fn trips_for_modes(&self, modes: &BTreeSet<RouteType>) -> Vec<&Trip> {
        self.trips()
            .iter()
            .filter(|t| {
                self.route(&t.route_id)
                    .is_some_and(|r| modes.contains(&r.route_type))
            })
            .collect()
    }
}

/// Result of matching a feed against the engine: the shape assigned per
/// trip, plus the interpolated stop times when requested.
#[derive(Debug, Clone, Serialize)]
pub struct ShapeAssignment {
    pub trip_id: TripId,
    pub shape_id: ShapeId,
    pub stop_dist_traveled: Vec<f64>,
    pub interpolated_times: Option<Vec<(u32, u32)>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_to_geojson_emits_one_linestring_feature() {
        let shape = Shape {
            id: "shp_1_0".to_string(),
            points: vec![
                ShapePoint {
                    geometry: Point::new(0.0, 0.0),
                    sequence: 0,
                    dist_traveled: 0.0,
                },
                ShapePoint {
                    geometry: Point::new(10.0, 0.0),
                    sequence: 1,
                    dist_traveled: 10.0,
                },
            ],
        };

        let geojson::GeoJson::FeatureCollection(fc) = shape.to_geojson() else {
            panic!("expected a feature collection");
        };
        assert_eq!(fc.features.len(), 1);
        let geom = fc.features[0].geometry.as_ref().unwrap();
        assert!(matches!(geom.value, geojson::Value::LineString(_)));
    }
}
