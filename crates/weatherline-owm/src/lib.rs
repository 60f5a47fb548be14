//! OpenWeatherMap implementation of [`weatherline_core::WeatherSource`].
//!
//! [`OpenWeatherClient`] performs the HTTP call; [`transform::normalize`]
//! maps the provider's nested JSON onto the canonical observation record.

mod client;
pub mod query;
pub mod transform;

pub use client::OpenWeatherClient;
pub use query::LocationQuery;
pub use transform::normalize;
