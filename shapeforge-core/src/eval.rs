//! Optional per-trip evaluation report: the raw distances a built shape
//! implies, left for the caller to compare against a reference shape if
//! one exists. The comparison metric itself is out of scope (see
//! `DESIGN.md`'s Open Question notes) — this module only carries the
//! numbers a comparison would need.

use crate::feed::TripId;

#[derive(Debug, Clone)]
pub struct TripEvaluation {
    pub trip_id: TripId,
    pub built_length_m: f64,
    pub reference_length_m: Option<f64>,
}

#[derive(Debug, Default)]
pub struct EvaluationReport {
    pub trips: Vec<TripEvaluation>,
}

impl EvaluationReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, trip_id: TripId, built_length_m: f64, reference_length_m: Option<f64>) {
        self.trips.push(TripEvaluation {
            trip_id,
            built_length_m,
            reference_length_m,
        });
    }

    /// Average absolute difference against trips that had a reference
    /// shape, `None` if nothing in the report has a reference.
    #[must_use]
    pub fn mean_absolute_error_m(&self) -> Option<f64> {
        let diffs: Vec<f64> = self
            .trips
            .iter()
            .filter_map(|t| t.reference_length_m.map(|r| (t.built_length_m - r).abs()))
            .collect();
        if diffs.is_empty() {
            None
        } else {
            Some(diffs.iter().sum::<f64>() / diffs.len() as f64)
        }
    }
}
