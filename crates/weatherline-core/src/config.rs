//! Runtime configuration.
//!
//! [`Settings`] is built once at startup (the binary layers a TOML file under
//! `WEATHERLINE_*` environment variables) and then handed to each component
//! constructor. Nothing reads configuration from ambient state.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer};

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

// ─── Sections ────────────────────────────────────────────────────────────────

/// Upstream weather provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
  #[serde(default)]
  pub api_key:         String,
  #[serde(default = "default_base_url")]
  pub base_url:        String,
  /// Bound on every provider request, connect to last byte.
  #[serde(default = "default_timeout_seconds")]
  pub timeout_seconds: u64,
}

/// Which locations to fetch and how hard to try.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
  /// Accepts a list or a single `;`-separated string.
  #[serde(default = "default_locations", deserialize_with = "locations")]
  pub locations:           Vec<String>,
  #[serde(default = "default_max_retries")]
  pub max_retries:         u32,
  #[serde(default = "default_retry_delay_seconds")]
  pub retry_delay_seconds: u64,
  /// Number of locations fetched at once; 1 means sequential.
  #[serde(default = "default_fetch_concurrency")]
  pub fetch_concurrency:   usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
  #[serde(default = "default_min_temp_c")]
  pub min_temp_c: f64,
  #[serde(default = "default_max_temp_c")]
  pub max_temp_c: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
  #[serde(default = "default_interval_minutes")]
  pub interval_minutes:     u64,
  /// How long `stop` waits for the background task before giving up on it.
  #[serde(default = "default_join_timeout_seconds")]
  pub join_timeout_seconds: u64,
  /// Run a cycle immediately instead of after the first interval.
  #[serde(default)]
  pub run_on_start:         bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
  #[serde(default = "default_stale_threshold_minutes")]
  pub stale_threshold_minutes: u32,
  #[serde(default = "default_recent_limit")]
  pub recent_limit:            usize,
}

/// Best-effort copy of raw payloads to blob storage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveConfig {
  #[serde(default)]
  pub enabled:  bool,
  pub bucket:   Option<String>,
  /// `http(s)://` for an object-store gateway, `file://` for a local
  /// directory.
  pub endpoint: Option<String>,
}

impl ArchiveConfig {
  /// Archival runs only when switched on and given somewhere to write.
  pub fn is_active(&self) -> bool {
    self.enabled && self.bucket.as_deref().is_some_and(|b| !b.is_empty())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  #[serde(default = "default_store_path")]
  pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
}

/// Log output. `RUST_LOG`, when set, overrides `level`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Also append plain-text logs here.
  pub file:  Option<PathBuf>,
}

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
  #[serde(default)]
  pub source:     SourceConfig,
  #[serde(default)]
  pub pipeline:   PipelineConfig,
  #[serde(default)]
  pub validation: ValidationConfig,
  #[serde(default)]
  pub schedule:   ScheduleConfig,
  #[serde(default)]
  pub health:     HealthConfig,
  #[serde(default)]
  pub archive:    ArchiveConfig,
  #[serde(default)]
  pub store:      StoreConfig,
  #[serde(default)]
  pub server:     ServerConfig,
  #[serde(default)]
  pub log:        LogConfig,
}

impl Settings {
  /// Reject configurations the pipeline cannot run with.
  ///
  /// Archival switched on without a bucket is not fatal; it is reported and
  /// archival stays off.
  pub fn validate(&self) -> Result<()> {
    if self.source.api_key.trim().is_empty() {
      return Err(Error::Config(
        "source.api_key is required (WEATHERLINE_SOURCE__API_KEY)".into(),
      ));
    }
    if self.pipeline.locations.is_empty() {
      return Err(Error::Config("pipeline.locations must not be empty".into()));
    }
    if self.validation.min_temp_c > self.validation.max_temp_c {
      return Err(Error::Config(format!(
        "validation.min_temp_c ({}) exceeds validation.max_temp_c ({})",
        self.validation.min_temp_c, self.validation.max_temp_c
      )));
    }
    if self.schedule.interval_minutes == 0 {
      return Err(Error::Config("schedule.interval_minutes must be at least 1".into()));
    }
    const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];
    if !LEVELS.contains(&self.log.level.to_ascii_lowercase().as_str()) {
      return Err(Error::Config(format!(
        "log.level must be one of {}, got {:?}",
        LEVELS.join(", "),
        self.log.level
      )));
    }
    if self.archive.enabled && !self.archive.is_active() {
      tracing::warn!("archive.enabled is set but archive.bucket is empty; archival disabled");
    }
    Ok(())
  }
}

// ─── Defaults ────────────────────────────────────────────────────────────────

fn default_base_url() -> String { DEFAULT_BASE_URL.to_owned() }
fn default_timeout_seconds() -> u64 { 20 }
fn default_locations() -> Vec<String> {
  split_locations("Colombo,Sri Lanka;Kandy,Sri Lanka;Anuradhapura,Sri Lanka;London,UK")
}
fn default_max_retries() -> u32 { 3 }
fn default_retry_delay_seconds() -> u64 { 5 }
fn default_fetch_concurrency() -> usize { 1 }
fn default_min_temp_c() -> f64 { -100.0 }
fn default_max_temp_c() -> f64 { 100.0 }
fn default_interval_minutes() -> u64 { 60 }
fn default_join_timeout_seconds() -> u64 { 5 }
fn default_stale_threshold_minutes() -> u32 { 90 }
fn default_recent_limit() -> usize { 5 }
fn default_store_path() -> PathBuf { PathBuf::from("./db/weather.db") }
fn default_host() -> String { "0.0.0.0".to_owned() }
fn default_port() -> u16 { 5000 }
fn default_log_level() -> String { "info".to_owned() }

impl Default for SourceConfig {
  fn default() -> Self {
    Self {
      api_key:         String::new(),
      base_url:        default_base_url(),
      timeout_seconds: default_timeout_seconds(),
    }
  }
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      locations:           default_locations(),
      max_retries:         default_max_retries(),
      retry_delay_seconds: default_retry_delay_seconds(),
      fetch_concurrency:   default_fetch_concurrency(),
    }
  }
}

impl Default for ValidationConfig {
  fn default() -> Self {
    Self { min_temp_c: default_min_temp_c(), max_temp_c: default_max_temp_c() }
  }
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      interval_minutes:     default_interval_minutes(),
      join_timeout_seconds: default_join_timeout_seconds(),
      run_on_start:         false,
    }
  }
}

impl Default for HealthConfig {
  fn default() -> Self {
    Self {
      stale_threshold_minutes: default_stale_threshold_minutes(),
      recent_limit:            default_recent_limit(),
    }
  }
}

impl Default for StoreConfig {
  fn default() -> Self { Self { path: default_store_path() } }
}

impl Default for LogConfig {
  fn default() -> Self { Self { level: default_log_level(), file: None } }
}

impl Default for ServerConfig {
  fn default() -> Self { Self { host: default_host(), port: default_port() } }
}

// ─── Location list parsing ───────────────────────────────────────────────────

fn split_locations(joined: &str) -> Vec<String> {
  joined
    .split(';')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
    .collect()
}

fn locations<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    List(Vec<String>),
    Joined(String),
  }

  Ok(match Raw::deserialize(deserializer)? {
    Raw::List(list) => list
      .into_iter()
      .map(|s| s.trim().to_owned())
      .filter(|s| !s.is_empty())
      .collect(),
    Raw::Joined(joined) => split_locations(&joined),
  })
}
