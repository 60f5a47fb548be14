//! Runs a job on a fixed interval in a background task.
//!
//! One run at a time: the next tick is not awaited until the current run has
//! finished, and a run that overruns the interval delays the schedule rather
//! than piling up. A panicking run is logged and the schedule carries on.

use std::{future::Future, time::Duration};

use tokio::{
  sync::watch,
  task::JoinHandle,
  time::{MissedTickBehavior, interval},
};
use tracing::{error, info, warn};
use weatherline_core::config::ScheduleConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
  Stopped,
  Running,
}

struct Running {
  stop:   watch::Sender<()>,
  handle: JoinHandle<()>,
}

pub struct Scheduler {
  interval:     Duration,
  join_timeout: Duration,
  run_on_start: bool,
  running:      Option<Running>,
}

impl Scheduler {
  pub fn new(interval: Duration, join_timeout: Duration) -> Self {
    Self {
      interval: interval.max(Duration::from_millis(1)),
      join_timeout,
      run_on_start: false,
      running: None,
    }
  }

  pub fn from_config(config: &ScheduleConfig) -> Self {
    Self::new(
      Duration::from_secs(config.interval_minutes.saturating_mul(60)),
      Duration::from_secs(config.join_timeout_seconds),
    )
    .run_on_start(config.run_on_start)
  }

  /// Fire the first run immediately rather than one interval after start.
  pub fn run_on_start(mut self, yes: bool) -> Self {
    self.run_on_start = yes;
    self
  }

  pub fn interval(&self) -> Duration { self.interval }

  pub fn state(&self) -> SchedulerState {
    match &self.running {
      Some(r) if !r.handle.is_finished() => SchedulerState::Running,
      _ => SchedulerState::Stopped,
    }
  }

  /// Spawn the background loop. Calling this while already running logs a
  /// warning and does nothing.
  pub fn start<F, Fut>(&mut self, job: F)
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    if self.state() == SchedulerState::Running {
      warn!("scheduler already running; ignoring start");
      return;
    }

    let (stop, mut stopped) = watch::channel(());
    let period = self.interval;
    let run_on_start = self.run_on_start;

    let handle = tokio::spawn(async move {
      let mut ticker = interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
      if !run_on_start {
        // The first tick completes immediately.
        ticker.tick().await;
      }

      loop {
        tokio::select! {
          biased;
          _ = stopped.changed() => break,
          _ = ticker.tick() => {}
        }

        info!("scheduled run starting");
        match tokio::spawn(job()).await {
          Ok(()) => {}
          Err(e) if e.is_panic() => error!(error = %e, "scheduled run panicked"),
          Err(e) => error!(error = %e, "scheduled run aborted"),
        }

        if stopped.has_changed().unwrap_or(true) {
          break;
        }
      }
      info!("scheduler loop exited");
    });

    info!(interval_secs = period.as_secs(), run_on_start, "scheduler started");
    self.running = Some(Running { stop, handle });
  }

  /// Signal the loop to exit and wait up to the join timeout for it. A run
  /// in progress is allowed to finish within that window; past it the task
  /// is abandoned.
  pub async fn stop(&mut self) {
    let Some(running) = self.running.take() else {
      return;
    };
    let _ = running.stop.send(());

    match tokio::time::timeout(self.join_timeout, running.handle).await {
      Ok(Ok(())) => info!("scheduler stopped"),
      Ok(Err(e)) => error!(error = %e, "scheduler task failed"),
      Err(_) => warn!(
        timeout_secs = self.join_timeout.as_secs(),
        "scheduler did not stop in time; abandoning background task"
      ),
    }
  }
}

impl Drop for Scheduler {
  fn drop(&mut self) {
    if let Some(running) = &self.running {
      let _ = running.stop.send(());
    }
  }
}
