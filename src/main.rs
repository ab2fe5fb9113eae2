use anyhow::{Context, Result};
use clap::Parser;
use set_spotter::capture::{CaptureSource, StillFrames};
use set_spotter::detection::{
    parse_seconds, Command, ControlHandle, DetectionConfig, ReportTimeout, Scheduler,
};
use set_spotter::output::{BellSink, LogSink, ReportSink};
use set_spotter::vision::CardPipeline;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input webcam device index
    #[arg(short, long, default_value_t = 0)]
    input_device: u32,

    /// Read frames from these images instead of a webcam
    #[arg(long, num_args = 1..)]
    images: Vec<PathBuf>,

    /// Start over with the first image after the last one
    #[arg(long)]
    loop_images: bool,

    /// Detection cycles per second
    #[arg(long, default_value_t = 2.0)]
    fps: f32,

    /// Seconds a Set has to stay visible before it is reported, or "off"
    #[arg(long, default_value = "30")]
    report_timeout: ReportTimeout,

    /// Seconds a changed number of Sets may last before everything is rechecked
    #[arg(long, default_value = "5", value_parser = parse_seconds)]
    settle_window: Duration,

    /// Ring the terminal bell when reporting
    #[arg(long)]
    bell: bool,

    /// Quit after this many detection cycles
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("set-spotter starting");

    let config = DetectionConfig::builder()
        .fps(args.fps)
        .report_timeout(args.report_timeout)
        .settle_window(args.settle_window)
        .build()
        .context("Invalid detection settings")?;

    let source = open_source(&args)?;
    let (width, height) = source.resolution();
    tracing::info!("Capture: {}x{}", width, height);

    let sink: Box<dyn ReportSink> = if args.bell {
        Box::new(BellSink::stdout())
    } else {
        Box::new(LogSink)
    };

    let mut scheduler = Scheduler::new(source, CardPipeline::default(), sink, config);
    scheduler.set_cycle_limit(args.max_cycles);

    spawn_command_reader(scheduler.control());
    tracing::info!("Commands: r = recheck, s = stop, g = start, t <seconds|off>, q = quit");

    scheduler.start(Instant::now());
    scheduler.run()
}

fn open_source(args: &Args) -> Result<Box<dyn CaptureSource>> {
    if !args.images.is_empty() {
        let frames = StillFrames::open(args.images.as_slice(), args.loop_images)
            .context("Failed to load images")?;
        tracing::info!("Replaying {} images", frames.len());
        return Ok(Box::new(frames));
    }
    open_webcam(args.input_device)
}

#[cfg(feature = "webcam")]
fn open_webcam(device: u32) -> Result<Box<dyn CaptureSource>> {
    let capture = set_spotter::capture::WebcamCapture::new(device)
        .context("Failed to initialize webcam capture")?;
    Ok(Box::new(capture))
}

#[cfg(not(feature = "webcam"))]
fn open_webcam(device: u32) -> Result<Box<dyn CaptureSource>> {
    anyhow::bail!(
        "camera {} unavailable: built without the webcam feature, pass --images instead",
        device
    )
}

/// Forward commands typed on stdin until it closes or the scheduler is gone
fn spawn_command_reader(control: ControlHandle) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let Some(command) = parse_command(&line) else {
                continue;
            };
            if control.send(command).is_err() {
                break;
            }
        }
    });
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match (words.next()?, words.next()) {
        ("r", None) => Command::Recheck,
        ("s", None) => Command::Stop,
        ("g", None) => Command::Start,
        ("q", None) => Command::Shutdown,
        ("t", Some(timeout)) => match timeout.parse::<ReportTimeout>() {
            Ok(timeout) => Command::SetReportTimeout(timeout),
            Err(err) => {
                tracing::warn!("{}", err);
                return None;
            }
        },
        _ => {
            tracing::warn!("Unknown command {:?}", line.trim());
            return None;
        }
    };
    Some(command)
}
