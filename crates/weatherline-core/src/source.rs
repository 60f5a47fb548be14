//! The `WeatherSource` trait: one upstream weather provider.

use std::future::Future;

use crate::{
  Result,
  observation::{NewObservation, RawPayload},
};

pub trait WeatherSource: Send + Sync {
  /// Fetch the current conditions for `location`.
  ///
  /// Fails with [`Error::SourceUnavailable`](crate::Error::SourceUnavailable)
  /// on transport errors and timeouts,
  /// [`Error::SourceError`](crate::Error::SourceError) on a non-success
  /// status, and
  /// [`Error::MalformedResponse`](crate::Error::MalformedResponse) when the
  /// body cannot be decoded.
  fn fetch<'a>(
    &'a self,
    location: &'a str,
  ) -> impl Future<Output = Result<RawPayload>> + Send + 'a;

  /// Map a provider payload onto the canonical record. Never fails: missing
  /// fields become `None`.
  fn transform(&self, location: &str, payload: &RawPayload) -> NewObservation;
}
