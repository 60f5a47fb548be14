//! Error taxonomy shared by every stage of the pipeline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Network failure or timeout while talking to the provider.
  #[error("source unavailable: {0}")]
  SourceUnavailable(String),

  /// The provider answered with a non-success status.
  #[error("source returned {status}: {body}")]
  SourceError { status: u16, body: String },

  #[error("malformed response: {0}")]
  MalformedResponse(String),

  #[error("validation failed: {0}")]
  ValidationFailed(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("archival error: {0}")]
  Archival(String),

  #[error("invalid configuration: {0}")]
  Config(String),
}

impl Error {
  /// Only transport-level and provider-status failures are worth retrying.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::SourceUnavailable(_) | Self::SourceError { .. })
  }

  /// Wrap a backend-specific store error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
