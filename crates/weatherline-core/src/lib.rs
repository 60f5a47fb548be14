//! Core types and trait definitions for the Weatherline pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! source client, the SQLite store, the orchestrator and the HTTP layer all
//! depend on it.

// Native `async fn` in traits; the trait definitions spell out `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod error;
pub mod observation;
pub mod source;
pub mod store;
pub mod validate;

pub use config::Settings;
pub use error::{Error, Result};
pub use observation::{NewObservation, Observation, RawPayload, StaleLocation};
pub use source::WeatherSource;
pub use store::ObservationStore;
pub use validate::Validator;
