//! Best-effort forwarding of raw provider payloads to blob storage.
//!
//! Archival is decoupled from durability: an observation counts as saved once
//! it is in the store, whatever happens here.

use std::{
  future::Future,
  path::{Component, Path, PathBuf},
  time::Duration,
};

use chrono::{DateTime, Utc};
use weatherline_core::{Error, Result, config::ArchiveConfig};

/// Used when archival is on but no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "file://./archive";

/// `weather_raw/<location, spaces as underscores>/<fetched_at>.json`
pub fn archive_key(location: &str, fetched_at: DateTime<Utc>) -> String {
  format!(
    "weather_raw/{}/{}.json",
    location.replace(' ', "_"),
    fetched_at.format("%Y%m%dT%H%M%SZ")
  )
}

/// A destination for raw payloads.
pub trait ArchiveSink: Send + Sync {
  /// Store `body` under `key`, replacing anything already there.
  fn put<'a>(
    &'a self,
    key: &'a str,
    body: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Human-readable destination, for logs.
  fn describe(&self, key: &str) -> String;
}

// ─── HTTP object store ───────────────────────────────────────────────────────

/// `PUT {endpoint}/{bucket}/{key}` against an S3-compatible gateway that
/// accepts unsigned writes (public-write bucket or an authenticating proxy).
#[derive(Debug, Clone)]
pub struct HttpArchive {
  http:     reqwest::Client,
  endpoint: String,
  bucket:   String,
}

impl HttpArchive {
  pub fn new(endpoint: &str, bucket: &str, timeout: Duration) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Config(format!("failed to build archive client: {e}")))?;
    Ok(Self {
      http,
      endpoint: endpoint.trim_end_matches('/').to_owned(),
      bucket: bucket.trim_matches('/').to_owned(),
    })
  }

  fn url(&self, key: &str) -> String { format!("{}/{}/{}", self.endpoint, self.bucket, key) }
}

impl ArchiveSink for HttpArchive {
  async fn put(&self, key: &str, body: &str) -> Result<()> {
    let resp = self
      .http
      .put(self.url(key))
      .header(reqwest::header::CONTENT_TYPE, "application/json")
      .body(body.to_owned())
      .send()
      .await
      .map_err(|e| Error::Archival(e.without_url().to_string()))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Archival(format!("PUT {} returned {status}", self.describe(key))));
    }
    Ok(())
  }

  fn describe(&self, key: &str) -> String { self.url(key) }
}

// ─── Local directory ─────────────────────────────────────────────────────────

/// Writes `<root>/<bucket>/<key>` on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirArchive {
  root: PathBuf,
}

impl DirArchive {
  pub fn new(dir: impl AsRef<Path>, bucket: &str) -> Self {
    Self { root: dir.as_ref().join(bucket) }
  }

  fn path_for(&self, key: &str) -> Result<PathBuf> {
    let rel = Path::new(key);
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
      return Err(Error::Archival(format!("refusing to write outside the archive: {key:?}")));
    }
    Ok(self.root.join(rel))
  }
}

impl ArchiveSink for DirArchive {
  async fn put(&self, key: &str, body: &str) -> Result<()> {
    let path = self.path_for(key)?;
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::Archival(format!("{}: {e}", parent.display())))?;
    }
    tokio::fs::write(&path, body)
      .await
      .map_err(|e| Error::Archival(format!("{}: {e}", path.display())))
  }

  fn describe(&self, key: &str) -> String { self.root.join(key).display().to_string() }
}

// ─── Backend selection ───────────────────────────────────────────────────────

/// The concrete sinks selectable from configuration.
#[derive(Debug, Clone)]
pub enum ArchiveBackend {
  Http(HttpArchive),
  Dir(DirArchive),
}

impl ArchiveBackend {
  /// `None` when archival is switched off or has no bucket; the pipeline then
  /// never touches blob storage.
  pub fn from_config(config: &ArchiveConfig, timeout: Duration) -> Result<Option<Self>> {
    if !config.is_active() {
      return Ok(None);
    }
    let bucket = config.bucket.as_deref().unwrap_or_default();
    let endpoint = config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);

    let backend = if let Some(dir) = endpoint.strip_prefix("file://") {
      Self::Dir(DirArchive::new(dir, bucket))
    } else if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
      Self::Http(HttpArchive::new(endpoint, bucket, timeout)?)
    } else {
      return Err(Error::Config(format!(
        "archive.endpoint must start with http://, https:// or file://, got {endpoint:?}"
      )));
    };
    Ok(Some(backend))
  }
}

impl ArchiveSink for ArchiveBackend {
  async fn put(&self, key: &str, body: &str) -> Result<()> {
    match self {
      Self::Http(a) => a.put(key, body).await,
      Self::Dir(a) => a.put(key, body).await,
    }
  }

  fn describe(&self, key: &str) -> String {
    match self {
      Self::Http(a) => a.describe(key),
      Self::Dir(a) => a.describe(key),
    }
  }
}
