//! Per-worker memoization for single-hop shortest paths.
//!
//! Each rayon worker thread gets its own cache partition (a
//! `thread_local!` `RefCell<HashMap>`), so concurrent cluster workers
//! never contend on a shared lock; the tradeoff is that the same hop may
//! be computed once per thread instead of once globally.

use std::cell::RefCell;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use hashbrown::{HashMap, HashSet};

use super::Hop;
use crate::config::RoutingOptions;
use crate::trgraph::NodeIdx;

/// `(from, to, trip-lines fingerprint, routing-options fingerprint)` —
/// two trips with different line sets or different options routing the
/// same node pair never share a cached hop.
pub type HopKey = (NodeIdx, NodeIdx, u64, u64);

thread_local! {
    static CACHE: RefCell<HashMap<HopKey, Hop>> = RefCell::new(HashMap::new());
}

/// Hashes `trip_lines` order-independently (sorted first) so the same
/// set of lines always fingerprints the same regardless of insertion
/// order.
fn lines_fingerprint(trip_lines: &HashSet<String>) -> u64 {
    let mut lines: Vec<&String> = trip_lines.iter().collect();
    lines.sort();
    let mut h = DefaultHasher::new();
    lines.hash(&mut h);
    h.finish()
}

#[must_use]
pub fn cache_key(from: NodeIdx, to: NodeIdx, trip_lines: &HashSet<String>, opts: &RoutingOptions) -> HopKey {
    (from, to, lines_fingerprint(trip_lines), opts.fingerprint())
}

/// Returns the cached hop for `key` if present, or computes it with
/// `compute` and caches the result. `enabled = false` bypasses the
/// cache entirely (used when `EngineConfig::use_caching` is off).
pub fn get_or_compute(key: HopKey, enabled: bool, compute: impl FnOnce() -> Hop) -> Hop {
    if !enabled {
        return compute();
    }

    if let Some(hit) = CACHE.with(|c| c.borrow().get(&key).cloned()) {
        return hit;
    }

    let result = compute();
    CACHE.with(|c| c.borrow_mut().insert(key, result.clone()));
    result
}

/// Clears this thread's cache partition. Useful between independent test
/// runs or engine invocations sharing a thread pool.
pub fn clear() {
    CACHE.with(|c| c.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_options_fingerprint_differently() {
        let a = RoutingOptions::default();
        let mut b = RoutingOptions::default();
        b.line_unmatched_punish_fact = 9.0;
        let lines = HashSet::new();
        assert_ne!(
            cache_key(NodeIdx(0), NodeIdx(1), &lines, &a),
            cache_key(NodeIdx(0), NodeIdx(1), &lines, &b)
        );
    }

    #[test]
    fn different_trip_lines_fingerprint_differently() {
        let opts = RoutingOptions::default();
        let mut lines_a: HashSet<String> = HashSet::new();
        lines_a.insert("1".to_string());
        let lines_b: HashSet<String> = HashSet::new();
        assert_ne!(
            cache_key(NodeIdx(0), NodeIdx(1), &lines_a, &opts),
            cache_key(NodeIdx(0), NodeIdx(1), &lines_b, &opts)
        );
    }
}
