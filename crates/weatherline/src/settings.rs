//! Layered configuration loading: optional TOML file, then `WEATHERLINE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use config::{Config, Environment, File};
use weatherline_core::Settings;

pub const ENV_PREFIX: &str = "WEATHERLINE";

/// Read and merge settings, expanding `~` in paths. A missing file is not an
/// error. Call [`Settings::validate`] once logging is up.
pub fn load(path: &Path) -> anyhow::Result<Settings> {
  let mut settings = read(path, Environment::with_prefix(ENV_PREFIX))?;
  settings.store.path = expand_tilde(&settings.store.path);
  settings.log.file = settings.log.file.as_deref().map(expand_tilde);
  Ok(settings)
}

fn read(path: &Path, env: Environment) -> anyhow::Result<Settings> {
  Config::builder()
    .add_source(File::from(path.to_path_buf()).required(false))
    .add_source(env.prefix_separator("_").separator("__").try_parsing(true))
    .build()
    .with_context(|| format!("failed to read configuration from {}", path.display()))?
    .try_deserialize()
    .context("failed to deserialise settings")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
