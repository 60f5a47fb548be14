//! Mapping from the OpenWeatherMap "current weather" shape to
//! [`NewObservation`].
//!
//! The payload looks like:
//!
//! ```json
//! { "coord":   { "lat": 6.93, "lon": 79.85 },
//!   "weather": [{ "main": "Clouds", "description": "broken clouds" }],
//!   "main":    { "temp": 301.2, "feels_like": 305.1, "humidity": 78, "pressure": 1009 },
//!   "wind":    { "speed": 4.1, "deg": 250 },
//!   "dt":      1717000000 }
//! ```
//!
//! Every nested object is optional. A missing or mistyped field becomes
//! `None`; normalisation itself never fails.

use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use weatherline_core::{NewObservation, RawPayload};

const KELVIN_OFFSET: f64 = 273.15;

pub fn kelvin_to_celsius(k: f64) -> f64 { k - KELVIN_OFFSET }

/// Normalise `payload` for `location`, stamping `fetched_at` with `now`.
pub fn normalize(
  location: &str,
  payload: &RawPayload,
  now: DateTime<Utc>,
) -> NewObservation {
  let raw = payload.as_value();

  let temperature_k = float_at(raw, "/main/temp");
  let feels_like_k = float_at(raw, "/main/feels_like");

  let observed_at = raw
    .get("dt")
    .and_then(Value::as_i64)
    .and_then(|ts| DateTime::from_timestamp(ts, 0))
    .filter(|dt| (0..=9999).contains(&dt.year()))
    .unwrap_or(now);

  NewObservation {
    location: location.to_owned(),
    latitude: float_at(raw, "/coord/lat"),
    longitude: float_at(raw, "/coord/lon"),
    observed_at,
    fetched_at: now,
    temperature_c: temperature_k.map(kelvin_to_celsius),
    temperature_k,
    feels_like_c: feels_like_k.map(kelvin_to_celsius),
    humidity_pct: int_at(raw, "/main/humidity"),
    pressure_hpa: int_at(raw, "/main/pressure"),
    wind_speed_ms: float_at(raw, "/wind/speed"),
    wind_direction_deg: int_at(raw, "/wind/deg"),
    condition_main: text_at(raw, "/weather/0/main"),
    condition_description: text_at(raw, "/weather/0/description"),
    raw_payload: payload.to_text(),
  }
}

fn float_at(raw: &Value, pointer: &str) -> Option<f64> {
  raw.pointer(pointer).and_then(Value::as_f64)
}

/// Integers occasionally arrive as floats (`1009.0`); round those.
fn int_at(raw: &Value, pointer: &str) -> Option<i64> {
  let v = raw.pointer(pointer)?;
  v.as_i64().or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
}

fn text_at(raw: &Value, pointer: &str) -> Option<String> {
  raw.pointer(pointer).and_then(Value::as_str).map(str::to_owned)
}
