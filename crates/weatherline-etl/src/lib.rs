//! The Weatherline ETL pipeline: per-location fetch with retry, append-only
//! persistence, best-effort archival of raw payloads, health reporting, and
//! the periodic scheduler that drives it all.

pub mod archive;
pub mod orchestrator;
pub mod report;
pub mod scheduler;

pub use archive::{ArchiveBackend, ArchiveSink, archive_key};
pub use orchestrator::Orchestrator;
pub use report::{CycleReport, HealthReport, LocationFailure, LocationOutcome};
pub use scheduler::{Scheduler, SchedulerState};

#[cfg(test)]
mod tests;
