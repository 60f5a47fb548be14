//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with millisecond
//! precision and a `Z` suffix, the same shape SQLite's own
//! `strftime('%Y-%m-%dT%H:%M:%fZ')` produces. Fixed width keeps string order
//! identical to time order, which the `MAX(fetched_at)` and cutoff
//! comparisons rely on.

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use weatherline_core::Observation;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Like [`encode_dt`], but refuses instants whose year needs more than four
/// digits; those would break the fixed-width ordering and fail to decode.
pub fn encode_storable_dt(dt: DateTime<Utc>) -> Result<String> {
  if !(0..=9999).contains(&dt.year()) {
    return Err(Error::OutOfRange(dt.to_rfc3339_opts(SecondsFormat::Secs, true)));
  }
  Ok(encode_dt(dt))
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// Column list shared by every query that returns whole rows. The order
/// matches [`RawObservation::from_row`].
pub const COLUMNS: &str = "id, location, latitude, longitude, observed_at, fetched_at,
   temperature_c, temperature_k, feels_like_c, humidity_pct, pressure_hpa,
   wind_speed_ms, wind_direction_deg, condition_main, condition_description,
   raw_payload";

/// Values read directly from an `observations` row.
pub struct RawObservation {
  pub id:                    i64,
  pub location:              String,
  pub latitude:              Option<f64>,
  pub longitude:             Option<f64>,
  pub observed_at:           String,
  pub fetched_at:            String,
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

impl RawObservation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                    row.get(0)?,
      location:              row.get(1)?,
      latitude:              row.get(2)?,
      longitude:             row.get(3)?,
      observed_at:           row.get(4)?,
      fetched_at:            row.get(5)?,
      temperature_c:         row.get(6)?,
      temperature_k:         row.get(7)?,
      feels_like_c:          row.get(8)?,
      humidity_pct:          row.get(9)?,
      pressure_hpa:          row.get(10)?,
      wind_speed_ms:         row.get(11)?,
      wind_direction_deg:    row.get(12)?,
      condition_main:        row.get(13)?,
      condition_description: row.get(14)?,
      raw_payload:           row.get(15)?,
    })
  }

  pub fn into_observation(self) -> Result<Observation> {
    Ok(Observation {
      id:                    self.id,
      location:              self.location,
      latitude:              self.latitude,
      longitude:             self.longitude,
      observed_at:           decode_dt(&self.observed_at)?,
      fetched_at:            decode_dt(&self.fetched_at)?,
      temperature_c:         self.temperature_c,
      temperature_k:         self.temperature_k,
      feels_like_c:          self.feels_like_c,
      humidity_pct:          self.humidity_pct,
      pressure_hpa:          self.pressure_hpa,
      wind_speed_ms:         self.wind_speed_ms,
      wind_direction_deg:    self.wind_direction_deg,
      condition_main:        self.condition_main,
      condition_description: self.condition_description,
      raw_payload:           self.raw_payload,
    })
  }
}
