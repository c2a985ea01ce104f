//! Error type for the shape-building engine.

use thiserror::Error;

/// Errors produced while building shapes for a trip, a cluster, or the
/// whole feed.
///
/// `NoCandidatesForStop` is recoverable at the trip level: callers should
/// log it and skip the trip rather than abort the run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no node candidates for stop {stop_id:?} on trip {trip_id:?}")]
    NoCandidatesForStop { trip_id: String, stop_id: String },

    #[error("unknown stop {0:?} referenced by a stop_time")]
    UnknownStop(String),

    #[error("unknown solve method: {0}")]
    UnknownSolveMethod(String),

    #[error("inconsistent sizes for {what}: expected {expected}, got {actual}")]
    InconsistentSizes {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid route type: {0}")]
    InvalidRouteType(i32),
}

pub type Result<T> = std::result::Result<T, Error>;
