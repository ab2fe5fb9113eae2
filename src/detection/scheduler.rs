//! Driving detection cycles and the reporting machine on one thread
//!
//! Everything that changes state goes through one event queue: commands from
//! [`ControlHandle`]s, finished detection cycles and expired timers. The queue is worked off in
//! order, so a `Stop` that arrives while a cycle is still running is handled before that cycle's
//! result and the result is dropped with the session.
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use image::RgbaImage;

use super::config::{DetectionConfig, ReportTimeout};
use super::reporting::{Report, ReportEvent, ReportMachine, ReportPhase};
use crate::capture::CaptureSource;
use crate::card::CardSet;
use crate::error::{CaptureError, PipelineError, SchedulerError};
use crate::output::ReportSink;
use crate::vision::{Detection, SetDetector};

/// Requests from outside the detection thread
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Recheck,
    SetReportTimeout(ReportTimeout),
    Shutdown,
}

/// Sends commands to a [`Scheduler`], possibly from another thread
#[derive(Debug, Clone)]
pub struct ControlHandle {
    sender: Sender<Command>,
}

impl ControlHandle {
    pub fn send(&self, command: Command) -> Result<(), SchedulerError> {
        self.sender
            .send(command)
            .map_err(|_| SchedulerError::Disconnected)
    }

    pub fn start(&self) -> Result<(), SchedulerError> {
        self.send(Command::Start)
    }

    pub fn stop(&self) -> Result<(), SchedulerError> {
        self.send(Command::Stop)
    }

    pub fn recheck(&self) -> Result<(), SchedulerError> {
        self.send(Command::Recheck)
    }

    pub fn set_report_timeout(&self, timeout: ReportTimeout) -> Result<(), SchedulerError> {
        self.send(Command::SetReportTimeout(timeout))
    }

    pub fn shutdown(&self) -> Result<(), SchedulerError> {
        self.send(Command::Shutdown)
    }
}

/// What the caller of [`Scheduler::step`] should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The frame source has no more frames
    Exhausted,
    Shutdown,
}

#[derive(Debug)]
enum Event {
    Command(Command),
    DetectionDone { session: u64, sets: Vec<CardSet> },
    ReportTimer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectionRegion {
    Idle { next_tick: Instant },
    Detecting,
}

#[derive(Debug)]
struct CycleStats {
    started: Instant,
    cycles: u64,
    capture_time: Duration,
    detect_time: Duration,
}

impl CycleStats {
    fn new(started: Instant) -> Self {
        Self {
            started,
            cycles: 0,
            capture_time: Duration::ZERO,
            detect_time: Duration::ZERO,
        }
    }

    fn record(&mut self, capture: Duration, detect: Duration, completion: Instant) {
        self.cycles += 1;
        self.capture_time += capture;
        self.detect_time += detect;

        // Log stats every 30 cycles
        if self.cycles % 30 == 0 {
            let avg_capture_ms = self.capture_time.as_secs_f64() * 1000.0 / self.cycles as f64;
            let avg_detect_ms = self.detect_time.as_secs_f64() * 1000.0 / self.cycles as f64;
            let running = completion.saturating_duration_since(self.started).as_secs_f64();
            let rate = if running > 0.0 {
                self.cycles as f64 / running
            } else {
                0.0
            };
            tracing::info!(
                "Cycle {}: capture={:.1}ms, detect={:.1}ms, total={:.1}ms, rate={:.2}/s",
                self.cycles,
                avg_capture_ms,
                avg_detect_ms,
                avg_capture_ms + avg_detect_ms,
                rate
            );
        }
    }
}

/// Everything that only exists while running
struct Session {
    id: u64,
    reporting: ReportMachine,
    detection: DetectionRegion,
    /// Scratch frame the source captures into
    frame: RgbaImage,
    stats: CycleStats,
}

enum State {
    Stopped,
    Running(Session),
}

/// Runs detection cycles at a fixed rate and reports Sets that stay visible
pub struct Scheduler<C, D, S> {
    source: C,
    detector: D,
    sink: S,
    config: DetectionConfig,
    state: State,
    sessions: u64,
    events: VecDeque<Event>,
    commands: Receiver<Command>,
    /// Source of new handles, let go of once [`run`](Scheduler::run) starts
    control: Option<Sender<Command>>,
    shutdown: bool,
    cycles: u64,
    cycle_limit: Option<u64>,
}

impl<C, D, S> Scheduler<C, D, S>
where
    C: CaptureSource,
    D: SetDetector,
    S: ReportSink,
{
    /// Create a stopped scheduler
    ///
    /// Taking a detector up front means every session has a working pipeline to run.
    pub fn new(source: C, detector: D, sink: S, config: DetectionConfig) -> Self {
        let (control, commands) = mpsc::channel();
        Self {
            source,
            detector,
            sink,
            config,
            state: State::Stopped,
            sessions: 0,
            events: VecDeque::new(),
            commands,
            control: Some(control),
            shutdown: false,
            cycles: 0,
            cycle_limit: None,
        }
    }

    /// A handle for sending commands
    ///
    /// Handles have to be taken before [`run`](Self::run), later ones are already disconnected.
    pub fn control(&self) -> ControlHandle {
        let sender = match &self.control {
            Some(sender) => sender.clone(),
            None => mpsc::channel().0,
        };
        ControlHandle { sender }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Stop on its own after this many detection cycles
    pub fn set_cycle_limit(&mut self, limit: Option<u64>) {
        self.cycle_limit = limit;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running(_))
    }

    /// Phase of the reporting machine, `None` while stopped
    pub fn phase(&self) -> Option<ReportPhase> {
        self.session().map(|session| session.reporting.phase())
    }

    /// Sets currently confirmed as visible
    pub fn visible_sets(&self) -> &[CardSet] {
        self.session()
            .map(|session| session.reporting.visible_sets())
            .unwrap_or_default()
    }

    fn session(&self) -> Option<&Session> {
        match &self.state {
            State::Running(session) => Some(session),
            State::Stopped => None,
        }
    }

    /// Start detecting, the first cycle runs one interval from `now`
    pub fn start(&mut self, now: Instant) {
        if self.is_running() {
            tracing::debug!("already running");
            return;
        }

        self.sessions += 1;
        let (width, height) = self.source.resolution();
        tracing::info!(
            "Starting detection at {} cycles/s, report timeout {}",
            self.config.fps(),
            self.config.report_timeout()
        );

        self.state = State::Running(Session {
            id: self.sessions,
            reporting: ReportMachine::from_config(&self.config, now),
            detection: DetectionRegion::Idle {
                next_tick: now + self.config.interval(),
            },
            frame: RgbaImage::new(width, height),
            stats: CycleStats::new(now),
        });
    }

    /// Stop detecting, dropping pending timers and the scratch frame
    pub fn stop(&mut self) {
        if let State::Running(session) = std::mem::replace(&mut self.state, State::Stopped) {
            tracing::info!("Stopped after {} cycles", session.stats.cycles);
        }
    }

    /// Change the report timeout, only allowed while stopped
    pub fn set_report_timeout(&mut self, timeout: ReportTimeout) -> Result<(), SchedulerError> {
        if self.is_running() {
            return Err(SchedulerError::Running);
        }
        self.config.set_report_timeout(timeout)?;
        tracing::info!("Report timeout set to {}", timeout);
        Ok(())
    }

    /// Decide again from the latest detection cycle
    pub fn recheck(&mut self, now: Instant) {
        if let State::Running(session) = &mut self.state {
            session.reporting.handle(ReportEvent::Recheck, now);
        }
    }

    /// Swap the frame source between cycles, returning the old one
    ///
    /// What is visible carries over, the scratch frame is resized for the new source.
    pub fn replace_source(&mut self, source: C) -> C {
        let old = std::mem::replace(&mut self.source, source);
        let (width, height) = self.source.resolution();
        tracing::info!("Frame source replaced, now {}x{}", width, height);

        if let State::Running(session) = &mut self.state {
            session.frame = RgbaImage::new(width, height);
        }
        self.detector.reset_state();
        old
    }

    /// When [`step`](Self::step) next has something to do
    pub fn next_wake(&self) -> Option<Instant> {
        if !self.events.is_empty() || self.shutdown {
            return Some(Instant::now());
        }
        let session = self.session()?;
        let tick = match session.detection {
            DetectionRegion::Idle { next_tick } => Some(next_tick),
            DetectionRegion::Detecting => None,
        };
        match (tick, session.reporting.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run one iteration: commands, expired timers, then at most one detection cycle
    pub fn step(&mut self, now: Instant) -> Flow {
        self.drain_commands();
        self.process_events(now);

        let timer_expired = self
            .session()
            .and_then(|session| session.reporting.deadline())
            .is_some_and(|deadline| deadline <= now);
        if timer_expired {
            self.events.push_back(Event::ReportTimer);
            self.process_events(now);
        }

        if self.shutdown {
            self.stop();
            return Flow::Shutdown;
        }

        let tick_due = matches!(
            self.session().map(|session| session.detection),
            Some(DetectionRegion::Idle { next_tick }) if next_tick <= now
        );
        if tick_due {
            if self.run_cycle(now).is_err() {
                self.stop();
                return Flow::Exhausted;
            }

            self.cycles += 1;
            if self.cycle_limit.is_some_and(|limit| self.cycles >= limit) {
                tracing::info!("Stopping after {} cycles", self.cycles);
                self.shutdown = true;
            }
        }

        if self.shutdown {
            self.stop();
            return Flow::Shutdown;
        }
        Flow::Continue
    }

    /// Step until shutdown or the source runs dry, sleeping in between
    ///
    /// A stopped scheduler also shuts down once every [`ControlHandle`] is gone, since nothing
    /// could start it again.
    pub fn run(&mut self) -> anyhow::Result<()> {
        tracing::info!("Starting detection loop");
        self.control = None;
        loop {
            match self.step(Instant::now()) {
                Flow::Continue => {}
                Flow::Exhausted => {
                    tracing::info!("Frame source exhausted");
                    return Ok(());
                }
                Flow::Shutdown => return Ok(()),
            }
            self.wait(Instant::now());
        }
    }

    /// Sleep until the next tick or timer, waking early for commands
    fn wait(&mut self, now: Instant) {
        let received = match self.next_wake() {
            Some(wake) if wake <= now => return,
            Some(wake) => match self.commands.recv_timeout(wake - now) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => {
                    std::thread::sleep(wake - now);
                    None
                }
            },
            None => match self.commands.recv() {
                Ok(command) => Some(command),
                Err(_) => {
                    tracing::info!("No one left to send commands, shutting down");
                    self.shutdown = true;
                    None
                }
            },
        };
        if let Some(command) = received {
            self.events.push_back(Event::Command(command));
        }
    }

    fn drain_commands(&mut self) {
        self.events
            .extend(self.commands.try_iter().map(Event::Command));
    }

    fn process_events(&mut self, now: Instant) {
        while let Some(event) = self.events.pop_front() {
            match event {
                Event::Command(command) => self.apply(command, now),
                Event::DetectionDone { session: id, sets } => match &mut self.state {
                    State::Running(session) if session.id == id => {
                        session
                            .reporting
                            .handle(ReportEvent::DetectionDone(sets), now);
                    }
                    _ => tracing::debug!("discarding result of a stopped session"),
                },
                Event::ReportTimer => {
                    let report = match &mut self.state {
                        State::Running(session) => session.reporting.poll(now),
                        State::Stopped => None,
                    };
                    if let Some(report) = report {
                        self.publish(&report);
                    }
                }
            }
        }
    }

    fn apply(&mut self, command: Command, now: Instant) {
        tracing::debug!("command {:?}", command);
        match command {
            Command::Start => self.start(now),
            Command::Stop => self.stop(),
            Command::Recheck => self.recheck(now),
            Command::SetReportTimeout(timeout) => {
                if let Err(err) = self.set_report_timeout(timeout) {
                    tracing::warn!("Ignoring report timeout {}: {}", timeout, err);
                }
            }
            Command::Shutdown => self.shutdown = true,
        }
    }

    fn publish(&mut self, report: &Report) {
        if let Err(err) = self.sink.report(report) {
            tracing::warn!("Failed to deliver report: {:#}", err);
        }
    }

    /// Capture and detect once, fails only when the source is exhausted
    fn run_cycle(&mut self, now: Instant) -> Result<(), CaptureError> {
        let State::Running(session) = &mut self.state else {
            return Ok(());
        };

        let _span = tracing::debug_span!("cycle", n = session.stats.cycles + 1).entered();
        session.detection = DetectionRegion::Detecting;

        let capture_start = Instant::now();
        let captured = self.source.capture_frame(&mut session.frame);
        let capture_time = capture_start.elapsed();

        let detect_start = Instant::now();
        let sets = match captured {
            Err(err) => {
                if matches!(
                    err.downcast_ref::<CaptureError>(),
                    Some(CaptureError::Exhausted)
                ) {
                    return Err(CaptureError::Exhausted);
                }
                tracing::warn!("Failed to capture frame: {:#}", err);
                Vec::new()
            }
            Ok(()) => match detect_guarded(&mut self.detector, &session.frame) {
                Ok(detection) => detection.sets,
                Err(err) => {
                    tracing::warn!("Detection failed: {}", err);
                    Vec::new()
                }
            },
        };
        let detect_time = detect_start.elapsed();

        let completion = now + capture_time + detect_time;
        session.detection = DetectionRegion::Idle {
            next_tick: completion + self.config.interval(),
        };
        session.stats.record(capture_time, detect_time, completion);
        let id = session.id;

        // Commands sent during the cycle go first
        self.drain_commands();
        self.events.push_back(Event::DetectionDone { session: id, sets });
        self.process_events(completion);
        Ok(())
    }
}

/// Run the detector, turning a panic into an error for this cycle only
fn detect_guarded<D: SetDetector>(
    detector: &mut D,
    frame: &RgbaImage,
) -> Result<Detection, PipelineError> {
    panic::catch_unwind(AssertUnwindSafe(|| detector.detect(frame)))
        .unwrap_or_else(|payload| Err(PipelineError::Primitive(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic in detector".to_string()
    }
}
