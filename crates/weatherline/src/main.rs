//! `weatherline`: fetch current weather for a set of locations, keep every
//! observation in SQLite, and serve the latest readings over HTTP.
//!
//! # Usage
//!
//! ```text
//! weatherline run                          # one ETL cycle, then exit
//! weatherline schedule --interval-minutes 30
//! weatherline health                       # freshness report as JSON
//! weatherline serve --with-scheduler       # HTTP API plus periodic cycles
//! ```
//!
//! Settings come from `weatherline.toml` (or `--config`) overlaid with
//! `WEATHERLINE_<SECTION>__<KEY>` environment variables. Logs go to stderr
//! and, when `log.file` is set, to that file as well.

mod logging;
mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use weatherline_api::AppState;
use weatherline_core::Settings;
use weatherline_etl::{ArchiveBackend, Orchestrator, Scheduler};
use weatherline_owm::OpenWeatherClient;
use weatherline_store_sqlite::SqliteStore;

type Pipeline = Orchestrator<OpenWeatherClient, SqliteStore, ArchiveBackend>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Weather ETL pipeline")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "weatherline.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Run a single ETL cycle and exit.
  Run,

  /// Run cycles on a fixed interval until interrupted.
  Schedule {
    /// Overrides `schedule.interval_minutes`.
    #[arg(long)]
    interval_minutes: Option<u64>,
  },

  /// Print stored-data freshness as JSON.
  Health,

  /// Serve the read-only HTTP API.
  Serve {
    /// Also run the scheduler in the background.
    #[arg(long)]
    with_scheduler: bool,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let mut settings = settings::load(&cli.config)?;
  logging::init(&settings.log)?;
  settings.validate()?;

  let store = SqliteStore::open(&settings.store.path)
    .await
    .with_context(|| format!("failed to open store at {}", settings.store.path.display()))?;

  match cli.command {
    Command::Run => run(&settings, store).await,
    Command::Schedule { interval_minutes } => {
      if let Some(minutes) = interval_minutes {
        if minutes == 0 {
          bail!("--interval-minutes must be at least 1");
        }
        settings.schedule.interval_minutes = minutes;
      }
      schedule(&settings, store).await
    }
    Command::Health => health(&settings, store).await,
    Command::Serve { with_scheduler } => serve(&settings, store, with_scheduler).await,
  }
}

fn pipeline(settings: &Settings, store: SqliteStore) -> anyhow::Result<Pipeline> {
  let client = OpenWeatherClient::new(&settings.source)?;
  let orchestrator = Orchestrator::new(client, store, settings);

  let timeout = Duration::from_secs(settings.source.timeout_seconds);
  Ok(match ArchiveBackend::from_config(&settings.archive, timeout)? {
    Some(archive) => {
      info!(bucket = ?settings.archive.bucket, "raw payload archival enabled");
      orchestrator.with_archive(archive)
    }
    None => orchestrator,
  })
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn run(settings: &Settings, store: SqliteStore) -> anyhow::Result<()> {
  let report = pipeline(settings, store)?.run_cycle().await;
  for failure in &report.failures {
    eprintln!(
      "{}: {} (after {} attempt(s))",
      failure.location, failure.error, failure.attempts
    );
  }
  if !report.is_success() {
    bail!("no observations saved ({} location(s) failed)", report.failed);
  }
  println!(
    "saved {} of {} location(s) in {:.1}s",
    report.saved,
    report.attempted,
    report.duration.as_secs_f64()
  );
  Ok(())
}

fn start_scheduler(settings: &Settings, pipeline: Pipeline) -> Scheduler {
  let pipeline = Arc::new(pipeline);
  let mut scheduler = Scheduler::from_config(&settings.schedule);
  scheduler.start(move || {
    let pipeline = pipeline.clone();
    async move {
      pipeline.run_cycle().await;
    }
  });
  scheduler
}

async fn schedule(settings: &Settings, store: SqliteStore) -> anyhow::Result<()> {
  let mut scheduler = start_scheduler(settings, pipeline(settings, store)?);

  tokio::signal::ctrl_c()
    .await
    .context("failed to listen for ctrl-c")?;
  info!("interrupt received; stopping scheduler");
  scheduler.stop().await;
  Ok(())
}

async fn health(settings: &Settings, store: SqliteStore) -> anyhow::Result<()> {
  let report = pipeline(settings, store)?.health_check().await?;
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

async fn serve(settings: &Settings, store: SqliteStore, with_scheduler: bool) -> anyhow::Result<()> {
  let mut scheduler = if with_scheduler {
    Some(start_scheduler(settings, pipeline(settings, store.clone())?))
  } else {
    None
  };

  let state = AppState::new(Arc::new(store), settings.health.stale_threshold_minutes);
  let app = weatherline_api::router(state);
  let address = format!("{}:{}", settings.server.host, settings.server.port);

  info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!("interrupt received; shutting down");
    })
    .await
    .context("server error")?;

  if let Some(scheduler) = scheduler.as_mut() {
    scheduler.stop().await;
  }
  Ok(())
}
