//! When to look at the table and when to speak up
mod config;
mod reporting;
mod scheduler;

pub use config::{parse_seconds, DetectionConfig, DetectionConfigBuilder, ReportTimeout};
pub use reporting::{Report, ReportEvent, ReportMachine, ReportPhase};
pub use scheduler::{Command, ControlHandle, Flow, Scheduler};
