use std::path::PathBuf;

use thiserror::Error;

/// Failures of a single detection cycle
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("frame has no pixels ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("image primitive failed: {0}")]
    Primitive(String),
}

/// Rejected configuration values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("detection rate must be a positive number of cycles per second, got {0}")]
    InvalidRate(f32),

    #[error("report timeout must be positive")]
    ZeroReportTimeout,

    #[error("settle window must be positive")]
    ZeroSettleWindow,

    #[error("could not parse duration {0:?}, expected seconds or \"off\"")]
    InvalidDuration(String),
}

/// Errors from driving the detection lifecycle
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("the report timeout can only be changed while stopped")]
    Running,

    #[error("the scheduler has shut down")]
    Disconnected,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Frame source errors the scheduler needs to tell apart
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("frame source has no more frames")]
    Exhausted,

    #[error("no images given to the still frame source")]
    NoImages,

    #[error("failed to load image {path}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}
