//! Read-only JSON API over the Weatherline observation store.
//!
//! Exposes an axum [`Router`] backed by any
//! [`weatherline_core::ObservationStore`]. There is no auth; put it behind a
//! proxy if it leaves localhost.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = weatherline_api::router(AppState::new(store, 90));
//! ```

pub mod error;
pub mod view;
pub mod weather;

use std::sync::Arc;

use axum::{Json, Router, routing::get};
use chrono::Utc;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use weatherline_core::ObservationStore;

pub use error::ApiError;
pub use view::WeatherView;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub store:                   Arc<S>,
  /// Used by `/weather/stale` when the request names no threshold.
  pub stale_threshold_minutes: u32,
}

impl<S> AppState<S> {
  pub fn new(store: Arc<S>, stale_threshold_minutes: u32) -> Self {
    Self { store, stale_threshold_minutes }
  }
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:                   self.store.clone(),
      stale_threshold_minutes: self.stale_threshold_minutes,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API routes, unprefixed. Nest under `/api` (see [`router`]).
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: ObservationStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .route("/weather/latest", get(weather::latest::<S>))
    .route("/weather/recent", get(weather::recent::<S>))
    .route("/weather/stale", get(weather::stale::<S>))
    .route("/weather/{location}", get(weather::by_location::<S>))
    .with_state(state)
}

/// The full application: [`api_router`] under `/api` with request tracing.
pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: ObservationStore + 'static,
{
  Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http())
}

/// `GET /health`: liveness only; does not touch the store.
async fn health() -> Json<Value> {
  Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

// ─── Integration tests ────────────────────────────────────────────────────────
