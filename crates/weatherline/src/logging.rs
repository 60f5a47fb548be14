//! Tracing subscriber setup: human-readable logs on stderr, optionally
//! mirrored as plain text to an append-only file.

use std::{
  fs::{File, OpenOptions},
  path::Path,
  sync::Arc,
};

use anyhow::Context as _;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use weatherline_core::config::LogConfig;

pub fn init(config: &LogConfig) -> anyhow::Result<()> {
  let level: LevelFilter = config
    .level
    .parse()
    .with_context(|| format!("invalid log level {:?}", config.level))?;
  let filter = EnvFilter::builder()
    .with_default_directive(level.into())
    .from_env_lossy();

  let file_layer = match &config.file {
    Some(path) => Some(
      fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(open_log_file(path)?)),
    ),
    None => None,
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(file_layer)
    .try_init()
    .context("failed to install tracing subscriber")
}

/// Open `path` for appending, creating it and its parent directories.
pub fn open_log_file(path: &Path) -> anyhow::Result<File> {
  if let Some(parent) = path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create log directory {}", parent.display()))?;
  }
  OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("failed to open log file {}", path.display()))
}
