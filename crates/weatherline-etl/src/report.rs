//! Results of a cycle and of a health check.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use weatherline_core::{Error, NewObservation, Observation, StaleLocation};

/// What happened to one location within a cycle.
#[derive(Debug)]
pub struct LocationOutcome {
  pub location: String,
  /// Number of fetch attempts made, including the successful one.
  pub attempts: u32,
  pub result:   Result<NewObservation, Error>,
}

/// A location skipped for this cycle.
#[derive(Debug, Clone, Serialize)]
pub struct LocationFailure {
  pub location: String,
  pub attempts: u32,
  pub error:    String,
}

/// Aggregate result of one pass over every configured location.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
  pub started_at:    DateTime<Utc>,
  #[serde(serialize_with = "as_millis")]
  pub duration:      Duration,
  /// Locations fetched (blank entries are not counted).
  pub attempted:     usize,
  /// Locations that produced a valid observation.
  pub succeeded:     usize,
  pub failed:        usize,
  /// Observations durably written; can be lower than `succeeded`.
  pub saved:         usize,
  pub archived:      usize,
  pub observations:  Vec<Observation>,
  pub failures:      Vec<LocationFailure>,
}

impl CycleReport {
  /// Partial success is success: the cycle only counts as failed when it had
  /// work to do and persisted nothing.
  pub fn is_success(&self) -> bool { self.attempted == 0 || self.saved > 0 }
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Freshness of the stored data.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
  pub generated_at:            DateTime<Utc>,
  pub total_observations:      u64,
  pub stale_threshold_minutes: u32,
  pub stale_locations:         Vec<StaleLocation>,
  pub latest_observations:     Vec<Observation>,
}

impl HealthReport {
  pub fn is_fresh(&self) -> bool { self.stale_locations.is_empty() }
}
