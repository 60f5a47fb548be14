//! Handlers for `/weather` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/weather/latest` | `?prefix=&limit=`; newest row per location |
//! | `GET`  | `/weather/recent` | `?limit=`; newest rows across all locations |
//! | `GET`  | `/weather/stale` | `?threshold_minutes=` |
//! | `GET`  | `/weather/{location}` | Prefix match; 404 if nothing matches |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use weatherline_core::{ObservationStore, StaleLocation};

use crate::{AppState, error::ApiError, view::WeatherView};

pub const DEFAULT_LATEST_LIMIT: usize = 50;
pub const DEFAULT_RECENT_LIMIT: usize = 10;

fn views(rows: &[weatherline_core::Observation]) -> Vec<WeatherView> {
  rows.iter().map(WeatherView::from).collect()
}

// ─── Latest ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct LatestParams {
  #[serde(default)]
  pub prefix: String,
  pub limit:  Option<usize>,
}

/// `GET /weather/latest[?prefix=<text>][&limit=<n>]`
pub async fn latest<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<LatestParams>,
) -> Result<Json<Vec<WeatherView>>, ApiError>
where
  S: ObservationStore,
{
  let rows = state
    .store
    .latest(&params.prefix, params.limit.unwrap_or(DEFAULT_LATEST_LIMIT))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(views(&rows)))
}

// ─── Recent ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
  pub limit: Option<usize>,
}

/// `GET /weather/recent[?limit=<n>]`
pub async fn recent<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<RecentParams>,
) -> Result<Json<Vec<WeatherView>>, ApiError>
where
  S: ObservationStore,
{
  let rows = state
    .store
    .recent(params.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(views(&rows)))
}

// ─── Stale ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct StaleParams {
  pub threshold_minutes: Option<u32>,
}

/// `GET /weather/stale[?threshold_minutes=<n>]`
pub async fn stale<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<StaleParams>,
) -> Result<Json<Vec<StaleLocation>>, ApiError>
where
  S: ObservationStore,
{
  let threshold = params
    .threshold_minutes
    .unwrap_or(state.stale_threshold_minutes);
  let stale = state
    .store
    .stale_locations(threshold)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(stale))
}

// ─── By location ──────────────────────────────────────────────────────────────

/// `GET /weather/{location}`: the newest row among locations starting with
/// `location`.
pub async fn by_location<S>(
  State(state): State<AppState<S>>,
  Path(location): Path<String>,
) -> Result<Json<WeatherView>, ApiError>
where
  S: ObservationStore,
{
  let rows = state
    .store
    .latest(&location, 1)
    .await
    .map_err(ApiError::store)?;
  rows
    .first()
    .map(|row| Json(WeatherView::from(row)))
    .ok_or_else(|| ApiError::NotFound(format!("no data found for location: {location}")))
}
