use super::{describe, ReportSink};
use crate::detection::Report;
use anyhow::{Context, Result};
use std::io::{self, Stdout, Write};

/// Rings the terminal bell and prints the Sets
pub struct BellSink<W: Write> {
    out: W,
}

impl BellSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> BellSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for BellSink<W> {
    fn report(&mut self, report: &Report) -> Result<()> {
        writeln!(self.out, "\x07{}", describe(report)).context("Failed to write report")?;
        self.out.flush().context("Failed to flush report")?;
        Ok(())
    }
}
