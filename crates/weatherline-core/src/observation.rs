//! Observation records: one normalized weather reading for a location.
//!
//! Observations are immutable. A new fetch always produces a new row; the
//! store never updates or deletes one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Raw payload ─────────────────────────────────────────────────────────────

/// The provider's response body, decoded but otherwise untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(serde_json::Value);

impl RawPayload {
  pub fn new(value: serde_json::Value) -> Self { Self(value) }

  /// Decode a response body. Anything that is not a JSON object is rejected.
  pub fn from_text(body: &str) -> Result<Self> {
    let value: serde_json::Value = serde_json::from_str(body)
      .map_err(|e| Error::MalformedResponse(e.to_string()))?;
    if !value.is_object() {
      return Err(Error::MalformedResponse(format!(
        "expected a JSON object, got {}",
        json_kind(&value)
      )));
    }
    Ok(Self(value))
  }

  pub fn as_value(&self) -> &serde_json::Value { &self.0 }

  /// Compact JSON text, as stored in the `raw_payload` column.
  pub fn to_text(&self) -> String { self.0.to_string() }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
  match value {
    serde_json::Value::Null => "null",
    serde_json::Value::Bool(_) => "a boolean",
    serde_json::Value::Number(_) => "a number",
    serde_json::Value::String(_) => "a string",
    serde_json::Value::Array(_) => "an array",
    serde_json::Value::Object(_) => "an object",
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// An observation that has been transformed but not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObservation {
  pub location:              String,
  pub latitude:              Option<f64>,
  pub longitude:             Option<f64>,
  /// When the reading was taken, as reported by the provider.
  pub observed_at:           DateTime<Utc>,
  /// When this pipeline retrieved it.
  pub fetched_at:            DateTime<Utc>,
  pub temperature_c:         Option<f64>,
  pub temperature_k:         Option<f64>,
  pub feels_like_c:          Option<f64>,
  pub humidity_pct:          Option<i64>,
  pub pressure_hpa:          Option<i64>,
  pub wind_speed_ms:         Option<f64>,
  pub wind_direction_deg:    Option<i64>,
  pub condition_main:        Option<String>,
  pub condition_description: Option<String>,
  /// Verbatim provider response, kept for fields not normalized above.
  pub raw_payload:           String,
}

/// A persisted observation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
  /// Store-assigned, monotonically increasing.
  pub id:                    i64,
  pub location:              String,
  pub latitude:              Option<f64>,
  pub longitude:             Option<f64>,
  pub observed_at:           DateTime<Utc>,
  pub fetched_at:            DateTime<Utc>,
  pub temperature_c:         Option<f64>,
  pub temperature_k:         Option<f64>,
  pub feels_like_c:          Option<f64>,
  pub humidity_pct:          Option<i64>,
  pub pressure_hpa:          Option<i64>,
  pub wind_speed_ms:         Option<f64>,
  pub wind_direction_deg:    Option<i64>,
  pub condition_main:        Option<String>,
  pub condition_description: Option<String>,
  pub raw_payload:           String,
}

impl Observation {
  /// Attach a store-assigned id to a freshly inserted record.
  pub fn from_new(id: i64, new: NewObservation) -> Self {
    Self {
      id,
      location: new.location,
      latitude: new.latitude,
      longitude: new.longitude,
      observed_at: new.observed_at,
      fetched_at: new.fetched_at,
      temperature_c: new.temperature_c,
      temperature_k: new.temperature_k,
      feels_like_c: new.feels_like_c,
      humidity_pct: new.humidity_pct,
      pressure_hpa: new.pressure_hpa,
      wind_speed_ms: new.wind_speed_ms,
      wind_direction_deg: new.wind_direction_deg,
      condition_main: new.condition_main,
      condition_description: new.condition_description,
      raw_payload: new.raw_payload,
    }
  }

  /// Decode the stored raw payload. Rows written by older tooling may hold
  /// garbage here; callers get `None` rather than an error.
  pub fn raw_json(&self) -> Option<serde_json::Value> {
    serde_json::from_str(&self.raw_payload).ok()
  }
}

/// A location whose newest observation is older than the staleness cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleLocation {
  pub location:        String,
  pub last_fetched_at: DateTime<Utc>,
}
