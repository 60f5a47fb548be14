//! One ETL cycle: fetch → transform → validate → persist → archive, for
//! every configured location.

use std::time::{Duration, Instant};

use chrono::Utc;
use futures::{StreamExt as _, stream};
use tracing::{debug, error, info, warn};
use weatherline_core::{
  Error, NewObservation, Observation, ObservationStore, Result, Settings, Validator,
  WeatherSource,
  config::{HealthConfig, PipelineConfig},
};

use crate::{
  archive::{ArchiveBackend, ArchiveSink, archive_key},
  report::{CycleReport, HealthReport, LocationFailure, LocationOutcome},
};

/// Drives the pipeline for a fixed set of locations.
///
/// A location's failure never aborts the cycle, and a failed save or archive
/// of one observation never affects the others.
pub struct Orchestrator<S, T, A = ArchiveBackend> {
  source:    S,
  store:     T,
  archive:   Option<A>,
  validator: Validator,
  pipeline:  PipelineConfig,
  health:    HealthConfig,
}

impl<S, T> Orchestrator<S, T> {
  /// Build an orchestrator with archival disabled.
  pub fn new(source: S, store: T, settings: &Settings) -> Self {
    Self {
      source,
      store,
      archive: None,
      validator: Validator::new(&settings.validation),
      pipeline: settings.pipeline.clone(),
      health: settings.health.clone(),
    }
  }
}

impl<S, T, A> Orchestrator<S, T, A> {
  /// Forward each saved observation's raw payload to `archive`.
  pub fn with_archive<B>(self, archive: B) -> Orchestrator<S, T, B> {
    Orchestrator {
      source:    self.source,
      store:     self.store,
      archive:   Some(archive),
      validator: self.validator,
      pipeline:  self.pipeline,
      health:    self.health,
    }
  }

  pub fn source(&self) -> &S { &self.source }

  pub fn store(&self) -> &T { &self.store }

  pub fn archive(&self) -> Option<&A> { self.archive.as_ref() }

  pub fn locations(&self) -> impl Iterator<Item = &str> {
    self
      .pipeline
      .locations
      .iter()
      .map(|l| l.trim())
      .filter(|l| !l.is_empty())
  }
}

impl<S, T, A> Orchestrator<S, T, A>
where
  S: WeatherSource,
  T: ObservationStore,
  A: ArchiveSink,
{
  // ── Single location ───────────────────────────────────────────────────────

  /// Fetch, transform and validate one location, retrying transport and
  /// provider-status failures with a fixed delay.
  pub async fn fetch_location(&self, location: &str) -> LocationOutcome {
    let max_attempts = self.pipeline.max_retries.max(1);
    let delay = Duration::from_secs(self.pipeline.retry_delay_seconds);

    let mut attempts = 0;
    let result = loop {
      attempts += 1;
      match self.attempt(location).await {
        Ok(obs) => {
          info!(location, attempts, "fetched observation");
          break Ok(obs);
        }
        Err(e) if e.is_retryable() && attempts < max_attempts => {
          warn!(
            location,
            attempt = attempts,
            max_attempts,
            error = %e,
            "fetch failed; retrying in {}s",
            delay.as_secs()
          );
          tokio::time::sleep(delay).await;
        }
        Err(e) if e.is_retryable() => {
          error!(location, attempts, error = %e, "all fetch attempts failed; skipping");
          break Err(e);
        }
        Err(e) => {
          error!(location, attempt = attempts, error = %e, "non-retryable failure; skipping");
          break Err(e);
        }
      }
    };

    LocationOutcome { location: location.to_owned(), attempts, result }
  }

  async fn attempt(&self, location: &str) -> Result<NewObservation> {
    let payload = self.source.fetch(location).await?;
    let observation = self.source.transform(location, &payload);
    self.validator.validate(&observation)?;
    Ok(observation)
  }

  // ── Full cycle ────────────────────────────────────────────────────────────

  /// Run one complete cycle. Never fails: per-location and per-observation
  /// errors are logged and tallied in the report.
  pub async fn run_cycle(&self) -> CycleReport {
    let started_at = Utc::now();
    let clock = Instant::now();
    let locations: Vec<String> = self.locations().map(str::to_owned).collect();
    let attempted = locations.len();
    info!(locations = attempted, "starting ETL cycle");

    let outcomes: Vec<LocationOutcome> = stream::iter(locations)
      .map(|location| async move { self.fetch_location(&location).await })
      .buffered(self.pipeline.fetch_concurrency.max(1))
      .collect()
      .await;

    let mut fetched = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
      match outcome.result {
        Ok(obs) => fetched.push(obs),
        Err(e) => failures.push(LocationFailure {
          location: outcome.location,
          attempts: outcome.attempts,
          error:    e.to_string(),
        }),
      }
    }
    let succeeded = fetched.len();

    debug!(count = succeeded, "persisting observations");
    let mut saved = Vec::with_capacity(succeeded);
    let mut archived = 0;
    for obs in fetched {
      let location = obs.location.clone();
      match self.store.save(obs).await {
        Ok(row) => {
          if self.forward(&row).await {
            archived += 1;
          }
          saved.push(row);
        }
        Err(e) => {
          error!(location = %location, error = %Error::store(e), "failed to save observation");
        }
      }
    }

    let report = CycleReport {
      started_at,
      duration: clock.elapsed(),
      attempted,
      succeeded,
      failed: failures.len(),
      saved: saved.len(),
      archived,
      observations: saved,
      failures,
    };

    info!(
      attempted = report.attempted,
      succeeded = report.succeeded,
      failed = report.failed,
      saved = report.saved,
      archived = report.archived,
      duration_ms = report.duration.as_millis() as u64,
      "ETL cycle finished"
    );
    report
  }

  /// Best-effort archival of one saved row. Returns whether it was archived.
  async fn forward(&self, row: &Observation) -> bool {
    let Some(archive) = &self.archive else {
      return false;
    };
    let key = archive_key(&row.location, row.fetched_at);
    match archive.put(&key, &row.raw_payload).await {
      Ok(()) => {
        debug!(location = %row.location, destination = %archive.describe(&key), "archived raw payload");
        true
      }
      Err(e) => {
        error!(location = %row.location, key = %key, error = %e, "failed to archive raw payload");
        false
      }
    }
  }

  // ── Health ────────────────────────────────────────────────────────────────

  /// Recent observations plus every location whose newest row is older than
  /// the staleness threshold.
  pub async fn health_check(&self) -> Result<HealthReport> {
    let threshold = self.health.stale_threshold_minutes;

    let stale_locations = self
      .store
      .stale_locations(threshold)
      .await
      .map_err(Error::store)?;
    let latest_observations = self
      .store
      .recent(self.health.recent_limit)
      .await
      .map_err(Error::store)?;
    let total_observations = self.store.count().await.map_err(Error::store)?;

    if stale_locations.is_empty() {
      info!(threshold_minutes = threshold, "all locations fresh");
    } else {
      warn!(
        count = stale_locations.len(),
        threshold_minutes = threshold,
        locations = ?stale_locations.iter().map(|s| s.location.as_str()).collect::<Vec<_>>(),
        "stale data detected"
      );
    }

    Ok(HealthReport {
      generated_at: Utc::now(),
      total_observations,
      stale_threshold_minutes: threshold,
      stale_locations,
      latest_observations,
    })
  }
}
