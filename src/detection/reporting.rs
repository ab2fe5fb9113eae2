//! Debouncing per-cycle detections into a stable "a Set is visible" signal
//!
//! Single frames are noisy: a hand over the table, a reflection or a blurred frame easily turns
//! one card into another. The machine only trusts a sighting once it has held for the whole
//! report timeout, and lets a changed Set count settle before it throws away what it has seen.
//!
//! ```text
//!                 sets seen                   count differs
//!  NoSetVisible ------------> VisibleSure ------------------> VisibleUnsure
//!        ^                    |   ^    ^                          |     |
//!        |                    |   |    '--- count matches again --'     |
//!        |     report timeout |   |                                     |
//!        |                    '---' (report, timer restarts)            |
//!        '---------------- recheck: no sets seen <--- settle window ----'
//! ```
use std::time::{Duration, Instant};

use super::config::{DetectionConfig, ReportTimeout};
use crate::card::CardSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    NoSetVisible,
    /// Sets are visible and the report timer is running
    VisibleSure,
    /// The number of visible Sets changed recently
    VisibleUnsure,
}

/// Inputs to the reporting machine
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    /// A detection cycle finished with these Sets
    DetectionDone(Vec<CardSet>),
    /// Decide again from the latest cycle, as if just started
    Recheck,
    /// The pending timer ran out
    TimerElapsed,
}

/// Sets which have been visible for the whole report timeout
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub visible_sets: Vec<CardSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Report(Instant),
    Settle(Instant),
}

impl Timer {
    fn deadline(&self) -> Instant {
        match *self {
            Timer::Report(at) | Timer::Settle(at) => at,
        }
    }
}

/// The reporting region of a running detector
#[derive(Debug, Clone)]
pub struct ReportMachine {
    phase: ReportPhase,
    detected_sets: Vec<CardSet>,
    visible_sets: Vec<CardSet>,
    report_timeout: ReportTimeout,
    settle_window: Duration,
    timer: Option<Timer>,
}

impl ReportMachine {
    /// Enter the reporting region with nothing detected yet
    pub fn new(report_timeout: ReportTimeout, settle_window: Duration, now: Instant) -> Self {
        let mut machine = Self {
            phase: ReportPhase::NoSetVisible,
            detected_sets: Vec::new(),
            visible_sets: Vec::new(),
            report_timeout,
            settle_window,
            timer: None,
        };
        machine.recheck(now);
        machine
    }

    pub fn from_config(config: &DetectionConfig, now: Instant) -> Self {
        Self::new(config.report_timeout(), config.settle_window(), now)
    }

    pub fn phase(&self) -> ReportPhase {
        self.phase
    }

    /// Sets found by the latest detection cycle
    pub fn detected_sets(&self) -> &[CardSet] {
        &self.detected_sets
    }

    /// Sets last confirmed as visible
    pub fn visible_sets(&self) -> &[CardSet] {
        &self.visible_sets
    }

    /// When the pending timer runs out
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.as_ref().map(Timer::deadline)
    }

    /// Fire the pending timer if it has run out by `now`
    pub fn poll(&mut self, now: Instant) -> Option<Report> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self.handle(ReportEvent::TimerElapsed, now),
            _ => None,
        }
    }

    /// Apply one event, returning a report when one is due
    pub fn handle(&mut self, event: ReportEvent, now: Instant) -> Option<Report> {
        match event {
            ReportEvent::DetectionDone(sets) => {
                self.detected_sets = sets;
                self.on_detection(now);
                None
            }
            ReportEvent::Recheck => {
                self.recheck(now);
                None
            }
            ReportEvent::TimerElapsed => self.on_timer(now),
        }
    }

    fn on_detection(&mut self, now: Instant) {
        let detected = self.detected_sets.len();
        let visible = self.visible_sets.len();

        match self.phase {
            ReportPhase::NoSetVisible if detected > 0 => {
                self.visible_sets = self.detected_sets.clone();
                self.enter_sure(now);
            }
            ReportPhase::VisibleSure if detected != visible => {
                tracing::debug!("{} sets seen, expected {}", detected, visible);
                self.enter_unsure(now);
            }
            ReportPhase::VisibleUnsure if detected == visible => {
                tracing::debug!("back to {} sets", visible);
                self.enter_sure(now);
            }
            _ => {}
        }
    }

    fn on_timer(&mut self, now: Instant) -> Option<Report> {
        match self.timer.take()? {
            Timer::Report(_) => {
                self.timer = self.report_timeout.deadline(now).map(Timer::Report);
                Some(Report {
                    visible_sets: self.visible_sets.clone(),
                })
            }
            Timer::Settle(_) => {
                tracing::debug!("still unsure after {:?}, rechecking", self.settle_window);
                self.recheck(now);
                None
            }
        }
    }

    /// The initial decision of the region
    fn recheck(&mut self, now: Instant) {
        if self.detected_sets.is_empty() {
            self.enter_none();
        } else {
            self.visible_sets = self.detected_sets.clone();
            self.enter_sure(now);
        }
    }

    fn enter_none(&mut self) {
        if self.phase != ReportPhase::NoSetVisible {
            tracing::info!("no Sets on the table");
        }
        self.phase = ReportPhase::NoSetVisible;
        self.visible_sets.clear();
        self.timer = None;
    }

    fn enter_sure(&mut self, now: Instant) {
        if self.phase == ReportPhase::NoSetVisible {
            tracing::info!("{} Sets on the table", self.visible_sets.len());
        }
        self.phase = ReportPhase::VisibleSure;
        self.timer = self.report_timeout.deadline(now).map(Timer::Report);
    }

    fn enter_unsure(&mut self, now: Instant) {
        self.phase = ReportPhase::VisibleUnsure;
        self.timer = now.checked_add(self.settle_window).map(Timer::Settle);
    }
}
