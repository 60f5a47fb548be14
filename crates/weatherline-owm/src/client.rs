//! Async HTTP client for the OpenWeatherMap current-weather endpoint.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::debug;
use weatherline_core::{
  Error, NewObservation, RawPayload, Result, WeatherSource, config::SourceConfig,
};

use crate::{query::LocationQuery, transform::normalize};

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OpenWeatherClient {
  http:     Client,
  base_url: String,
  api_key:  String,
}

impl std::fmt::Debug for OpenWeatherClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OpenWeatherClient")
      .field("base_url", &self.base_url)
      .finish_non_exhaustive()
  }
}

impl OpenWeatherClient {
  pub fn new(config: &SourceConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(Duration::from_secs(config.timeout_seconds))
      .build()
      .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
    Ok(Self {
      http,
      base_url: config.base_url.clone(),
      api_key: config.api_key.clone(),
    })
  }
}

impl WeatherSource for OpenWeatherClient {
  async fn fetch(&self, location: &str) -> Result<RawPayload> {
    let query = LocationQuery::parse(location);
    debug!(location, ?query, "requesting current weather");

    let resp = self
      .http
      .get(&self.base_url)
      .query(&[("appid", self.api_key.as_str())])
      .query(&query.params())
      .send()
      .await
      .map_err(|e| Error::SourceUnavailable(describe(e)))?;

    let status = resp.status();
    let body = resp
      .text()
      .await
      .map_err(|e| Error::SourceUnavailable(describe(e)))?;

    if !status.is_success() {
      return Err(Error::SourceError {
        status: status.as_u16(),
        body:   truncate_body(&body),
      });
    }

    RawPayload::from_text(&body)
  }

  fn transform(&self, location: &str, payload: &RawPayload) -> NewObservation {
    normalize(location, payload, Utc::now())
  }
}

/// reqwest puts the URL (and with it the API key) in its `Display` output.
fn describe(err: reqwest::Error) -> String {
  let kind = if err.is_timeout() {
    "request timed out"
  } else if err.is_connect() {
    "connection failed"
  } else if err.is_body() || err.is_decode() {
    "failed to read response body"
  } else {
    "request failed"
  };
  format!("{kind}: {}", err.without_url())
}

fn truncate_body(body: &str) -> String {
  const MAX: usize = 200;
  if body.chars().count() > MAX {
    format!("{}...", body.chars().take(MAX).collect::<String>())
  } else {
    body.to_owned()
  }
}
