//! The `ObservationStore` trait.
//!
//! Implemented by storage backends (e.g. `weatherline-store-sqlite`). The
//! orchestrator and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::observation::{NewObservation, Observation, StaleLocation};

/// Append-only store of observations.
///
/// There is no update or delete path. All methods return `Send` futures so
/// the store can be shared across tokio worker threads.
pub trait ObservationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert a new row and return it with its assigned id. Either the whole
  /// row is written or nothing is.
  fn save(
    &self,
    observation: NewObservation,
  ) -> impl Future<Output = Result<Observation, Self::Error>> + Send + '_;

  /// For every distinct location starting with `prefix` (case-sensitive),
  /// its single newest row by `fetched_at`. Newest first, at most `limit`.
  fn latest<'a>(
    &'a self,
    prefix: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + 'a;

  /// The `limit` most recently fetched rows, regardless of location.
  fn recent(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Observation>, Self::Error>> + Send + '_;

  /// Locations whose newest `fetched_at` is strictly older than
  /// `now - threshold_minutes`. Locations with no rows never appear.
  fn stale_locations(
    &self,
    threshold_minutes: u32,
  ) -> impl Future<Output = Result<Vec<StaleLocation>, Self::Error>> + Send + '_;

  /// Total number of stored rows.
  fn count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
