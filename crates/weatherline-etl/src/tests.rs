//! Orchestrator behaviour against scripted sources, stores and archives.

use std::{collections::HashMap, sync::Mutex};

use chrono::{Duration as Age, Utc};
use serde_json::json;
use weatherline_core::{
  Error, NewObservation, Observation, ObservationStore, RawPayload, Result, Settings,
  StaleLocation, WeatherSource,
};
use weatherline_store_sqlite::SqliteStore;

use crate::{ArchiveSink, Orchestrator};

// ─── Scripted source ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Reply {
  Kelvin(f64),
  Body(serde_json::Value),
  Unavailable,
  Status(u16),
  Malformed,
}

/// Replies per location in order; the last reply repeats.
#[derive(Default)]
struct ScriptedSource {
  script: HashMap<String, Vec<Reply>>,
  calls:  Mutex<HashMap<String, u32>>,
}

impl ScriptedSource {
  fn new() -> Self { Self::default() }

  fn reply(mut self, location: &str, replies: &[Reply]) -> Self {
    self.script.insert(location.into(), replies.to_vec());
    self
  }

  fn calls(&self, location: &str) -> u32 {
    self.calls.lock().unwrap().get(location).copied().unwrap_or(0)
  }
}

fn owm_body(kelvin: f64) -> serde_json::Value {
  json!({
    "coord": { "lat": 6.93, "lon": 79.85 },
    "weather": [{ "main": "Clouds", "description": "broken clouds" }],
    "main": { "temp": kelvin, "feels_like": kelvin + 3.0, "humidity": 78, "pressure": 1009 },
    "wind": { "speed": 4.1, "deg": 250 },
    "dt": 1717000000
  })
}

impl WeatherSource for ScriptedSource {
  async fn fetch(&self, location: &str) -> Result<RawPayload> {
    let n = {
      let mut calls = self.calls.lock().unwrap();
      let n = calls.entry(location.to_owned()).or_default();
      *n += 1;
      *n as usize
    };
    let reply = self
      .script
      .get(location)
      .and_then(|r| r.get(n - 1).or(r.last()))
      .cloned()
      .unwrap_or(Reply::Status(404));

    match reply {
      Reply::Kelvin(k) => Ok(RawPayload::new(owm_body(k))),
      Reply::Body(body) => Ok(RawPayload::new(body)),
      Reply::Unavailable => Err(Error::SourceUnavailable("connection refused".into())),
      Reply::Status(status) => Err(Error::SourceError { status, body: "nope".into() }),
      Reply::Malformed => RawPayload::from_text("<html>"),
    }
  }

  fn transform(&self, location: &str, payload: &RawPayload) -> NewObservation {
    weatherline_owm::normalize(location, payload, Utc::now())
  }
}

// ─── Stores and sinks ────────────────────────────────────────────────────────

/// Wraps a real store and refuses saves for some locations.
struct PickyStore {
  inner:  SqliteStore,
  refuse: Vec<String>,
}

impl ObservationStore for PickyStore {
  type Error = weatherline_store_sqlite::Error;

  async fn save(&self, observation: NewObservation) -> Result<Observation, Self::Error> {
    if self.refuse.contains(&observation.location) {
      return Err(std::io::Error::other("disk full").into());
    }
    self.inner.save(observation).await
  }

  async fn latest(&self, prefix: &str, limit: usize) -> Result<Vec<Observation>, Self::Error> {
    self.inner.latest(prefix, limit).await
  }

  async fn recent(&self, limit: usize) -> Result<Vec<Observation>, Self::Error> {
    self.inner.recent(limit).await
  }

  async fn stale_locations(&self, minutes: u32) -> Result<Vec<StaleLocation>, Self::Error> {
    self.inner.stale_locations(minutes).await
  }

  async fn count(&self) -> Result<u64, Self::Error> { self.inner.count().await }
}

#[derive(Default)]
struct RecordingArchive {
  puts: Mutex<Vec<(String, String)>>,
}

impl ArchiveSink for RecordingArchive {
  async fn put(&self, key: &str, body: &str) -> Result<()> {
    self.puts.lock().unwrap().push((key.into(), body.into()));
    Ok(())
  }

  fn describe(&self, key: &str) -> String { format!("memory://{key}") }
}

struct DeniedArchive;

impl ArchiveSink for DeniedArchive {
  async fn put(&self, _key: &str, _body: &str) -> Result<()> {
    Err(Error::Archival("403 access denied".into()))
  }

  fn describe(&self, key: &str) -> String { format!("denied://{key}") }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn settings(locations: &[&str]) -> Settings {
  let mut s = Settings::default();
  s.source.api_key = "TEST_KEY".into();
  s.pipeline.locations = locations.iter().map(|l| l.to_string()).collect();
  s.pipeline.retry_delay_seconds = 0;
  s
}

async fn sqlite() -> SqliteStore { SqliteStore::open_in_memory().await.unwrap() }

fn row(location: &str, age: Age) -> NewObservation {
  let mut obs = weatherline_owm::normalize(
    location,
    &RawPayload::new(owm_body(300.0)),
    Utc::now() - age,
  );
  obs.observed_at = obs.fetched_at;
  obs
}

const COLOMBO: &str = "Colombo,Sri Lanka";
const KANDY: &str = "Kandy,Sri Lanka";

// ─── Cycle ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_location_failing_does_not_stop_the_others() {
  let source = ScriptedSource::new()
    .reply(COLOMBO, &[Reply::Kelvin(301.15)])
    .reply(KANDY, &[Reply::Unavailable]);
  let mut s = settings(&[COLOMBO, KANDY]);
  s.pipeline.max_retries = 2;
  let orch = Orchestrator::new(source, sqlite().await, &s);

  let report = orch.run_cycle().await;

  assert_eq!(report.attempted, 2);
  assert_eq!(report.succeeded, 1);
  assert_eq!(report.failed, 1);
  assert_eq!(report.saved, 1);
  assert!(report.is_success());

  assert_eq!(report.failures[0].location, KANDY);
  assert_eq!(report.failures[0].attempts, 2);
  assert!(report.failures[0].error.contains("connection refused"));

  let saved = &report.observations[0];
  assert_eq!(saved.location, COLOMBO);
  assert!((saved.temperature_c.unwrap() - 28.0).abs() < 1e-9);

  assert_eq!(orch.store().count().await.unwrap(), 1);
  assert_eq!(orch.source().calls(KANDY), 2);
  assert_eq!(orch.source().calls(COLOMBO), 1);
}

#[tokio::test]
async fn every_location_failing_is_a_failed_cycle() {
  let source = ScriptedSource::new()
    .reply(COLOMBO, &[Reply::Status(500)])
    .reply(KANDY, &[Reply::Malformed]);
  let orch = Orchestrator::new(source, sqlite().await, &settings(&[COLOMBO, KANDY]));

  let report = orch.run_cycle().await;
  assert_eq!(report.succeeded, 0);
  assert_eq!(report.failed, 2);
  assert!(!report.is_success());
  assert_eq!(orch.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn blank_locations_are_skipped() {
  let source = ScriptedSource::new().reply(COLOMBO, &[Reply::Kelvin(300.0)]);
  let orch = Orchestrator::new(source, sqlite().await, &settings(&["  ", COLOMBO, ""]));

  let report = orch.run_cycle().await;
  assert_eq!(report.attempted, 1);
  assert_eq!(report.saved, 1);
  assert_eq!(orch.source().calls(""), 0);
}

#[tokio::test]
async fn nothing_to_do_is_success() {
  let orch = Orchestrator::new(ScriptedSource::new(), sqlite().await, &settings(&[" "]));
  let report = orch.run_cycle().await;
  assert_eq!(report.attempted, 0);
  assert!(report.is_success());
}

#[tokio::test]
async fn concurrent_fetches_keep_configured_order() {
  let locations = ["A", "B", "C", "D"];
  let source = locations
    .iter()
    .fold(ScriptedSource::new(), |s, l| s.reply(l, &[Reply::Kelvin(290.0)]));
  let mut s = settings(&locations);
  s.pipeline.fetch_concurrency = 3;
  let orch = Orchestrator::new(source, sqlite().await, &s);

  let report = orch.run_cycle().await;
  let order: Vec<_> = report.observations.iter().map(|o| o.location.as_str()).collect();
  assert_eq!(order, locations);
}

// ─── Retry policy ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn retries_with_fixed_delay_then_gives_up() {
  let source = ScriptedSource::new().reply(KANDY, &[Reply::Unavailable]);
  let mut s = settings(&[KANDY]);
  s.pipeline.max_retries = 3;
  s.pipeline.retry_delay_seconds = 5;
  let orch = Orchestrator::new(source, sqlite().await, &s);

  let started = tokio::time::Instant::now();
  let outcome = orch.fetch_location(KANDY).await;

  assert_eq!(outcome.attempts, 3);
  assert!(matches!(outcome.result, Err(Error::SourceUnavailable(_))));
  assert_eq!(started.elapsed().as_secs(), 10);
}

#[tokio::test]
async fn provider_errors_are_retried() {
  let source =
    ScriptedSource::new().reply(COLOMBO, &[Reply::Status(503), Reply::Kelvin(300.0)]);
  let orch = Orchestrator::new(source, sqlite().await, &settings(&[COLOMBO]));

  let outcome = orch.fetch_location(COLOMBO).await;
  assert_eq!(outcome.attempts, 2);
  assert!(outcome.result.is_ok());
}

#[tokio::test]
async fn malformed_payloads_are_not_retried() {
  let source = ScriptedSource::new().reply(COLOMBO, &[Reply::Malformed]);
  let orch = Orchestrator::new(source, sqlite().await, &settings(&[COLOMBO]));

  let outcome = orch.fetch_location(COLOMBO).await;
  assert_eq!(outcome.attempts, 1);
  assert!(matches!(outcome.result, Err(Error::MalformedResponse(_))));
}

#[tokio::test]
async fn validation_failures_are_not_retried() {
  let source = ScriptedSource::new().reply(COLOMBO, &[Reply::Kelvin(301.15)]);
  let mut s = settings(&[COLOMBO]);
  s.validation.min_temp_c = -10.0;
  s.validation.max_temp_c = 10.0;
  let orch = Orchestrator::new(source, sqlite().await, &s);

  let report = orch.run_cycle().await;
  assert_eq!(report.failed, 1);
  assert!(report.failures[0].error.contains("validation failed"));
  assert_eq!(orch.source().calls(COLOMBO), 1);
  assert_eq!(orch.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn zero_max_retries_still_tries_once() {
  let source = ScriptedSource::new().reply(COLOMBO, &[Reply::Unavailable]);
  let mut s = settings(&[COLOMBO]);
  s.pipeline.max_retries = 0;
  let orch = Orchestrator::new(source, sqlite().await, &s);

  assert_eq!(orch.fetch_location(COLOMBO).await.attempts, 1);
}

// ─── Persistence and archival ────────────────────────────────────────────────

#[tokio::test]
async fn a_failed_save_only_loses_that_observation() {
  let source = ScriptedSource::new()
    .reply(COLOMBO, &[Reply::Kelvin(300.0)])
    .reply(KANDY, &[Reply::Kelvin(295.0)]);
  let store = PickyStore { inner: sqlite().await, refuse: vec![COLOMBO.into()] };
  let orch = Orchestrator::new(source, store, &settings(&[COLOMBO, KANDY]));

  let report = orch.run_cycle().await;
  assert_eq!(report.succeeded, 2);
  assert_eq!(report.saved, 1);
  assert_eq!(report.observations[0].location, KANDY);
  assert!(report.is_success());
  assert_eq!(orch.store().count().await.unwrap(), 1);
}

#[tokio::test]
async fn saved_rows_are_archived_verbatim() {
  let source = ScriptedSource::new()
    .reply(COLOMBO, &[Reply::Kelvin(300.0)])
    .reply(KANDY, &[Reply::Unavailable]);
  let mut s = settings(&[COLOMBO, KANDY]);
  s.pipeline.max_retries = 1;
  let orch = Orchestrator::new(source, sqlite().await, &s)
    .with_archive(RecordingArchive::default());

  let report = orch.run_cycle().await;
  assert_eq!(report.archived, 1);

  let puts = orch.archive().unwrap().puts.lock().unwrap().clone();
  assert_eq!(puts.len(), 1);
  let (key, body) = &puts[0];
  assert!(key.starts_with("weather_raw/Colombo,Sri_Lanka/"));
  assert!(key.ends_with("Z.json"));
  assert_eq!(body, &report.observations[0].raw_payload);
}

#[tokio::test]
async fn archive_failures_do_not_undo_saves() {
  let source = ScriptedSource::new().reply(COLOMBO, &[Reply::Kelvin(300.0)]);
  let orch = Orchestrator::new(source, sqlite().await, &settings(&[COLOMBO]))
    .with_archive(DeniedArchive);

  let report = orch.run_cycle().await;
  assert_eq!(report.saved, 1);
  assert_eq!(report.archived, 0);
  assert!(report.is_success());
  assert_eq!(orch.store().count().await.unwrap(), 1);
}

#[tokio::test]
async fn no_archive_means_nothing_archived() {
  let source = ScriptedSource::new().reply(COLOMBO, &[Reply::Kelvin(300.0)]);
  let orch = Orchestrator::new(source, sqlite().await, &settings(&[COLOMBO]));

  let report = orch.run_cycle().await;
  assert_eq!(report.saved, 1);
  assert_eq!(report.archived, 0);
}

#[tokio::test]
async fn far_future_provider_timestamp_keeps_store_readable() {
  let mut body = owm_body(300.0);
  body["dt"] = json!(300_000_000_000_i64);
  let source = ScriptedSource::new().reply(COLOMBO, &[Reply::Body(body)]);
  let store = sqlite().await;
  store.save(row(KANDY, Age::minutes(1))).await.unwrap();
  let orch = Orchestrator::new(source, store, &settings(&[COLOMBO]));

  let report = orch.run_cycle().await;
  assert_eq!(report.saved, 1);
  let saved = &report.observations[0];
  assert!(saved.observed_at <= Utc::now());

  assert_eq!(orch.store().count().await.unwrap(), 2);
  assert_eq!(orch.store().recent(10).await.unwrap().len(), 2);
  assert!(orch.health_check().await.is_ok());
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check_flags_stale_locations() {
  let store = sqlite().await;
  store.save(row("Old Town", Age::hours(3))).await.unwrap();
  store.save(row(COLOMBO, Age::minutes(10))).await.unwrap();
  store.save(row(COLOMBO, Age::hours(5))).await.unwrap();

  let orch = Orchestrator::new(ScriptedSource::new(), store, &settings(&[COLOMBO]));
  let health = orch.health_check().await.unwrap();

  assert_eq!(health.total_observations, 3);
  assert_eq!(health.stale_threshold_minutes, 90);
  assert!(!health.is_fresh());
  let stale: Vec<_> = health.stale_locations.iter().map(|s| s.location.as_str()).collect();
  assert_eq!(stale, ["Old Town"]);

  let recent: Vec<_> = health.latest_observations.iter().map(|o| o.location.as_str()).collect();
  assert_eq!(recent, [COLOMBO, "Old Town", COLOMBO]);
}

#[tokio::test]
async fn health_check_on_empty_store_is_fresh() {
  let orch = Orchestrator::new(ScriptedSource::new(), sqlite().await, &settings(&[COLOMBO]));
  let health = orch.health_check().await.unwrap();
  assert_eq!(health.total_observations, 0);
  assert!(health.is_fresh());
  assert!(health.latest_observations.is_empty());
}

#[tokio::test]
async fn recent_limit_caps_latest_observations() {
  let store = sqlite().await;
  for minutes in 0..8 {
    store.save(row(COLOMBO, Age::minutes(minutes))).await.unwrap();
  }
  let mut s = settings(&[COLOMBO]);
  s.health.recent_limit = 5;
  let orch = Orchestrator::new(ScriptedSource::new(), store, &s);

  let health = orch.health_check().await.unwrap();
  assert_eq!(health.latest_observations.len(), 5);
}

// ─── End to end ──────────────────────────────────────────────────────────────

mod end_to_end {
  use axum::{Json, Router, extract::Query, http::StatusCode, response::IntoResponse, routing::get};
  use tokio::net::TcpListener;
  use weatherline_core::config::SourceConfig;
  use weatherline_owm::OpenWeatherClient;

  use super::*;
  use crate::archive::DirArchive;

  async fn provider() -> String {
    let app = Router::new().route(
      "/weather",
      get(|Query(q): Query<HashMap<String, String>>| async move {
        match q.get("q").map(String::as_str) {
          Some(COLOMBO) => Json(owm_body(301.15)).into_response(),
          _ => (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response(),
        }
      }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/weather")
  }

  #[tokio::test]
  async fn fetches_saves_and_archives() {
    let client = OpenWeatherClient::new(&SourceConfig {
      api_key:         "TEST_KEY".into(),
      base_url:        provider().await,
      timeout_seconds: 5,
    })
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db").join("weather.db");
    let store = SqliteStore::open(&db).await.unwrap();

    let mut s = settings(&[COLOMBO, KANDY]);
    s.pipeline.max_retries = 2;
    let orch = Orchestrator::new(client, store, &s)
      .with_archive(DirArchive::new(dir.path().join("archive"), "raw"));

    let report = orch.run_cycle().await;
    assert_eq!(report.saved, 1);
    assert_eq!(report.archived, 1);
    assert_eq!(report.failures[0].location, KANDY);
    assert_eq!(report.failures[0].attempts, 2);
    assert!(report.failures[0].error.contains("503"));

    let saved = &report.observations[0];
    let archived_dir = dir.path().join("archive/raw/weather_raw/Colombo,Sri_Lanka");
    let files: Vec<_> = std::fs::read_dir(&archived_dir).unwrap().collect();
    assert_eq!(files.len(), 1);
    let body = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
    assert_eq!(body, saved.raw_payload);

    let latest = orch.store().latest("Colombo", 10).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, saved.id);
  }
}
