//! Spotting Sets on a table of Set cards
//!
//! Frames come from a [`capture::CaptureSource`] and go through the [`vision`] pipeline, which
//! finds the cards, straightens them and reads their attributes. [`card::find_sets`] picks the
//! Sets out of the cards, and the [`detection::Scheduler`] runs this at a fixed rate, only
//! telling a [`output::ReportSink`] about Sets which stay on the table for a while.
pub mod capture;
pub mod card;
pub mod detection;
pub mod error;
pub mod output;
pub mod vision;
