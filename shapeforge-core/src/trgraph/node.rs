//! Node payload for the routing graph.

use geo::Point;
use hashbrown::HashSet;

use super::ComponentIdx;
use crate::feed::StopId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub usize);

/// Group of feed stops that snap to the same physical location, e.g. a
/// station's platforms. A node with `station_info` is never deleted as
/// an orphan and never treated as a mergeable "plain" node.
#[derive(Debug, Clone, PartialEq)]
pub struct StationInfo {
    pub names: Vec<String>,
    pub track: Option<String>,
    pub stops: Vec<StopId>,
    pub from_map_data: bool,
    /// Line refs this station is known (from map data) to serve, used by
    /// the candidate selector's unmatched-line-name penalty. Empty when
    /// the map source carries no line information for the station.
    pub lines: HashSet<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub geometry: Point,
    pub station_info: Option<StationInfo>,
    pub component: Option<ComponentIdx>,
    /// `true` if routing must never pass through this node (e.g. an
    /// access-restricted synthetic node). Map-data-derived station nodes
    /// are never blockers — enforced at construction, see `RoutingGraph::add_node`.
    pub blocker: bool,
}

impl Node {
    #[must_use]
    pub fn new(geometry: Point) -> Self {
        Self {
            geometry,
            station_info: None,
            component: None,
            blocker: false,
        }
    }

    #[must_use]
    pub fn with_station(geometry: Point, station_info: StationInfo) -> Self {
        let blocker = false;
        debug_assert!(
            !(station_info.from_map_data && blocker),
            "map-data nodes must not be blockers"
        );
        Self {
            geometry,
            station_info: Some(station_info),
            component: None,
            blocker,
        }
    }

    #[must_use]
    pub fn is_station(&self) -> bool {
        self.station_info.is_some()
    }
}
