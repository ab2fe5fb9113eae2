mod bell;

pub use bell::BellSink;

use anyhow::Result;

use crate::detection::Report;

/// Trait for report destinations
pub trait ReportSink {
    /// Announce Sets that have stayed visible for the whole report timeout
    fn report(&mut self, report: &Report) -> Result<()>;
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn report(&mut self, report: &Report) -> Result<()> {
        (**self).report(report)
    }
}

/// Writes reports to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn report(&mut self, report: &Report) -> Result<()> {
        tracing::info!("{}", describe(report));
        Ok(())
    }
}

/// One line naming every visible Set
pub(crate) fn describe(report: &Report) -> String {
    let sets: Vec<String> = report.visible_sets.iter().map(ToString::to_string).collect();
    match sets.len() {
        1 => format!("there is a Set: {}", sets[0]),
        n => format!("there are {} Sets: {}", n, sets.join(" | ")),
    }
}
