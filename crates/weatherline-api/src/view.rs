//! The dashboard-facing shape of an observation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use weatherline_core::Observation;

/// Reported when the provider omits `visibility`.
pub const DEFAULT_VISIBILITY_METERS: i64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherView {
  pub id:                  i64,
  /// City part of the location, e.g. `Colombo` for `Colombo,Sri Lanka`.
  pub location:            String,
  pub full_location:       String,
  /// When the provider took the reading.
  pub timestamp:           DateTime<Utc>,
  pub fetched_at:          DateTime<Utc>,
  pub temperature_celsius: Option<f64>,
  pub feels_like_celsius:  Option<f64>,
  pub humidity_percent:    Option<i64>,
  pub pressure_hpa:        Option<i64>,
  pub wind_speed_ms:       Option<f64>,
  pub wind_direction_deg:  Option<i64>,
  pub weather_main:        Option<String>,
  pub weather_description: Option<String>,
  pub visibility_meters:   i64,
  pub clouds_percent:      i64,
  pub rain_1h_mm:          Option<f64>,
  pub snow_1h_mm:          Option<f64>,
}

/// Text before the first comma, or `Unknown` when that is empty.
pub fn display_location(location: &str) -> String {
  let city = location.split_once(',').map_or(location, |(city, _)| city).trim();
  if city.is_empty() { "Unknown".into() } else { city.into() }
}

impl From<&Observation> for WeatherView {
  fn from(obs: &Observation) -> Self {
    let raw = obs.raw_json().unwrap_or(Value::Null);
    let extra = |pointer: &str| raw.pointer(pointer);

    Self {
      id:                  obs.id,
      location:            display_location(&obs.location),
      full_location:       obs.location.clone(),
      timestamp:           obs.observed_at,
      fetched_at:          obs.fetched_at,
      temperature_celsius: obs.temperature_c,
      feels_like_celsius:  obs.feels_like_c,
      humidity_percent:    obs.humidity_pct,
      pressure_hpa:        obs.pressure_hpa,
      wind_speed_ms:       obs.wind_speed_ms,
      wind_direction_deg:  obs.wind_direction_deg,
      weather_main:        obs.condition_main.clone(),
      weather_description: obs.condition_description.clone(),
      visibility_meters:   extra("/visibility")
        .and_then(Value::as_i64)
        .unwrap_or(DEFAULT_VISIBILITY_METERS),
      clouds_percent:      extra("/clouds/all").and_then(Value::as_i64).unwrap_or(0),
      rain_1h_mm:          extra("/rain/1h").and_then(Value::as_f64),
      snow_1h_mm:          extra("/snow/1h").and_then(Value::as_f64),
    }
  }
}
