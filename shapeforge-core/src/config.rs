//! Routing options and engine-level configuration.
//!
//! Field names and defaults mirror `routing_options` as used throughout
//! the original cost model and shape builder: a trip's shape quality is
//! entirely a function of these knobs plus the graph, so keeping them
//! named and defaulted the same way makes behavior easy to cross-check.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::feed::RouteType;

/// Per-level punishment factors, indexed by edge level `0..=7`
/// (0 = best-quality road data, 7 = worst / synthetic).
pub type LevelPunish = [f64; 8];

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingOptions {
    pub full_turn_punish_fac: f64,
    pub full_turn_angle: f64,
    pub pass_thru_stations_punish: f64,
    pub one_way_punish_fac: f64,
    pub one_way_edge_punish: f64,
    pub line_unmatched_punish_fact: f64,
    pub no_lines_punish_fact: f64,
    pub platform_unmatched_pen: f64,
    pub station_dist_pen_factor: f64,
    pub non_osm_pen: f64,
    /// Candidate-selection-time penalty for a node whose station serves
    /// none of the stop's lines, distinct from `line_unmatched_punish_fact`
    /// which applies per traversed edge during routing.
    pub group_line_unmatched_pen: f64,
    /// Candidate-selection-time penalty for a node that is not itself a
    /// member of the stop's own station group.
    pub group_pen: f64,
    pub level_punish: LevelPunish,
    pub pop_reach_edge: bool,
    pub no_self_hops: bool,
}

impl RoutingOptions {
    /// Hash of every field, used to key the router's hop cache so two
    /// trips routing the same node pair under different options never
    /// share a cached hop.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut h = DefaultHasher::new();
        self.full_turn_punish_fac.to_bits().hash(&mut h);
        self.full_turn_angle.to_bits().hash(&mut h);
        self.pass_thru_stations_punish.to_bits().hash(&mut h);
        self.one_way_punish_fac.to_bits().hash(&mut h);
        self.one_way_edge_punish.to_bits().hash(&mut h);
        self.line_unmatched_punish_fact.to_bits().hash(&mut h);
        self.no_lines_punish_fact.to_bits().hash(&mut h);
        self.platform_unmatched_pen.to_bits().hash(&mut h);
        self.station_dist_pen_factor.to_bits().hash(&mut h);
        self.non_osm_pen.to_bits().hash(&mut h);
        self.group_line_unmatched_pen.to_bits().hash(&mut h);
        self.group_pen.to_bits().hash(&mut h);
        for p in self.level_punish {
            p.to_bits().hash(&mut h);
        }
        self.pop_reach_edge.hash(&mut h);
        self.no_self_hops.hash(&mut h);
        h.finish()
    }
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            full_turn_punish_fac: 2000.0,
            full_turn_angle: 45.0,
            pass_thru_stations_punish: 100.0,
            one_way_punish_fac: 1.0,
            one_way_edge_punish: 0.0,
            line_unmatched_punish_fact: 0.5,
            no_lines_punish_fact: 0.0,
            platform_unmatched_pen: 0.0,
            station_dist_pen_factor: 0.0,
            non_osm_pen: 0.0,
            group_line_unmatched_pen: 0.0,
            group_pen: 0.0,
            level_punish: [1.0; 8],
            pop_reach_edge: true,
            no_self_hops: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    Global,
    Greedy,
    Greedy2,
}

impl std::str::FromStr for SolveMethod {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Self::Global),
            "greedy" => Ok(Self::Greedy),
            "greedy2" => Ok(Self::Greedy2),
            other => Err(crate::error::Error::UnknownSolveMethod(other.to_string())),
        }
    }
}

/// Engine-wide orchestration knobs, grounded on the shape builder's
/// constructor config plus the feed-wide flags it consults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub solve_method: SolveMethod,
    pub drop_shapes: bool,
    pub use_caching: bool,
    pub interpolate_times: bool,
    pub build_transit_graph: bool,
    pub evaluate: bool,
    /// Dump the per-trip combination graph (candidates + routed hops) for
    /// offline debugging. Producing the dump file is a caller concern;
    /// the engine only needs to know whether to retain the data.
    pub write_comb_graph: bool,
    /// Route only the named trip, for isolating one trip's shape build
    /// during debugging. `None` routes every eligible trip.
    pub shape_trip_id: Option<String>,
    /// Directory debug artifacts (e.g. `write_comb_graph` output) are
    /// written under, when set.
    pub dbg_output_path: Option<PathBuf>,
    /// Route types eligible for shape building; empty means all types.
    pub mot_set: BTreeSet<RouteType>,
    pub routing_options: RoutingOptions,
    pub num_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            solve_method: SolveMethod::Global,
            drop_shapes: false,
            use_caching: true,
            interpolate_times: true,
            build_transit_graph: false,
            evaluate: false,
            write_comb_graph: false,
            shape_trip_id: None,
            dbg_output_path: None,
            mot_set: BTreeSet::new(),
            routing_options: RoutingOptions::default(),
            num_threads: std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}
