//! Site monitoring: change detection and the batch runner.

pub mod detector;
pub mod error;
pub mod inspect;
pub mod runner;
pub mod summary;

pub use {
    detector::{describe_changes, detect_change, overall_severity, status_severity},
    error::{Error, Result, Stage},
    inspect::{InspectReport, inspect},
    runner::{MonitorRunner, RunnerConfig},
    summary::{BatchSummary, NotifyCounts, SiteOutcome},
};
