use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::error::ConfigError;

/// How long a Set has to stay visible before it is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTimeout {
    After(Duration),
    /// Never report, only track what is visible
    Never,
}

impl ReportTimeout {
    /// When a timer started at `now` runs out, if it ever does
    pub fn deadline(&self, now: Instant) -> Option<Instant> {
        match self {
            ReportTimeout::After(timeout) => now.checked_add(*timeout),
            ReportTimeout::Never => None,
        }
    }
}

impl FromStr for ReportTimeout {
    type Err = ConfigError;

    /// Seconds, or one of `off`, `none` and `never`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "never" => Ok(ReportTimeout::Never),
            _ => parse_seconds(s).map(ReportTimeout::After),
        }
    }
}

impl fmt::Display for ReportTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportTimeout::After(timeout) => write!(f, "{}s", timeout.as_secs_f32()),
            ReportTimeout::Never => write!(f, "off"),
        }
    }
}

/// Parse a positive number of seconds, e.g. `2.5`
pub fn parse_seconds(s: &str) -> Result<Duration, ConfigError> {
    let invalid = || ConfigError::InvalidDuration(s.to_string());
    let seconds: f64 = s.trim().trim_end_matches('s').parse().map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}

/// Validated runtime configuration of the detector
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    fps: f32,
    interval: Duration,
    report_timeout: ReportTimeout,
    settle_window: Duration,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            fps: 2.0,
            interval: Duration::from_millis(500),
            report_timeout: ReportTimeout::After(Duration::from_secs(30)),
            settle_window: Duration::from_secs(5),
        }
    }
}

impl DetectionConfig {
    /// Create a builder object to help create a configuration
    pub fn builder() -> DetectionConfigBuilder {
        DetectionConfigBuilder::default()
    }

    /// Detection cycles per second
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Time between the end of one detection cycle and the start of the next
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn report_timeout(&self) -> ReportTimeout {
        self.report_timeout
    }

    /// How long an unsure sighting may last before everything is looked at afresh
    pub fn settle_window(&self) -> Duration {
        self.settle_window
    }

    pub(crate) fn set_report_timeout(&mut self, timeout: ReportTimeout) -> Result<(), ConfigError> {
        validate_report_timeout(timeout)?;
        self.report_timeout = timeout;
        Ok(())
    }
}

fn validate_report_timeout(timeout: ReportTimeout) -> Result<(), ConfigError> {
    match timeout {
        ReportTimeout::After(d) if d.is_zero() => Err(ConfigError::ZeroReportTimeout),
        _ => Ok(()),
    }
}

/// Builder for a detection configuration
#[derive(Debug, Default)]
pub struct DetectionConfigBuilder {
    fps: Option<f32>,
    report_timeout: Option<ReportTimeout>,
    settle_window: Option<Duration>,
}

impl DetectionConfigBuilder {
    /// Detection cycles per second
    ///
    /// The rate is an upper bound: the next cycle is only scheduled once the previous one has
    /// finished, so slow cycles lower the effective rate.
    pub fn fps(&mut self, value: f32) -> &mut Self {
        self.fps = Some(value);
        self
    }

    /// How long Sets have to stay visible before they are reported
    pub fn report_timeout(&mut self, value: ReportTimeout) -> &mut Self {
        self.report_timeout = Some(value);
        self
    }

    /// How long the detector may stay unsure before it rechecks from scratch
    pub fn settle_window(&mut self, value: Duration) -> &mut Self {
        self.settle_window = Some(value);
        self
    }

    /// Validate and build the configuration
    pub fn build(&self) -> Result<DetectionConfig, ConfigError> {
        let defaults = DetectionConfig::default();

        let fps = self.fps.unwrap_or(defaults.fps);
        if !fps.is_finite() || fps <= 0.0 {
            return Err(ConfigError::InvalidRate(fps));
        }
        // Rates so low that the next cycle can't be scheduled are rejected too
        let interval = Duration::try_from_secs_f32(1.0 / fps)
            .ok()
            .filter(|interval| Instant::now().checked_add(*interval).is_some())
            .ok_or(ConfigError::InvalidRate(fps))?;

        let report_timeout = self.report_timeout.unwrap_or(defaults.report_timeout);
        validate_report_timeout(report_timeout)?;

        let settle_window = self.settle_window.unwrap_or(defaults.settle_window);
        if settle_window.is_zero() {
            return Err(ConfigError::ZeroSettleWindow);
        }

        Ok(DetectionConfig {
            fps,
            interval,
            report_timeout,
            settle_window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_seconds, DetectionConfig, ReportTimeout};
    use crate::error::ConfigError;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = DetectionConfig::builder().build().unwrap();
        assert_eq!(config, DetectionConfig::default());
        assert_eq!(config.interval(), Duration::from_millis(500));
        assert_eq!(config.settle_window(), Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_bad_rates() {
        for fps in [0.0, -1.0, f32::NAN, f32::INFINITY, 1e-20, f32::MIN_POSITIVE] {
            let result = DetectionConfig::builder().fps(fps).build();
            assert!(matches!(result, Err(ConfigError::InvalidRate(_))), "{}", fps);
        }
    }

    #[test]
    fn test_slow_rates_have_long_intervals() {
        let config = DetectionConfig::builder().fps(0.5).build().unwrap();
        assert_eq!(config.interval(), Duration::from_secs(2));
        assert!(std::time::Instant::now()
            .checked_add(config.interval())
            .is_some());
    }

    #[test]
    fn test_rejects_zero_durations() {
        assert_eq!(
            DetectionConfig::builder()
                .report_timeout(ReportTimeout::After(Duration::ZERO))
                .build(),
            Err(ConfigError::ZeroReportTimeout)
        );
        assert_eq!(
            DetectionConfig::builder()
                .settle_window(Duration::ZERO)
                .build(),
            Err(ConfigError::ZeroSettleWindow)
        );
    }

    #[test]
    fn test_never_report_is_valid() {
        let config = DetectionConfig::builder()
            .report_timeout(ReportTimeout::Never)
            .build()
            .unwrap();
        assert_eq!(config.report_timeout(), ReportTimeout::Never);
        assert_eq!(config.report_timeout().deadline(std::time::Instant::now()), None);
    }

    #[test]
    fn test_parse_report_timeout() {
        assert_eq!("off".parse::<ReportTimeout>(), Ok(ReportTimeout::Never));
        assert_eq!(" None ".parse::<ReportTimeout>(), Ok(ReportTimeout::Never));
        assert_eq!(
            "45".parse::<ReportTimeout>(),
            Ok(ReportTimeout::After(Duration::from_secs(45)))
        );
        assert_eq!(
            "1.5s".parse::<ReportTimeout>(),
            Ok(ReportTimeout::After(Duration::from_millis(1500)))
        );
        assert!("-3".parse::<ReportTimeout>().is_err());
        assert!("soon".parse::<ReportTimeout>().is_err());
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("5"), Ok(Duration::from_secs(5)));
        assert_eq!(
            parse_seconds("0"),
            Err(ConfigError::InvalidDuration("0".to_string()))
        );
        assert!(parse_seconds("inf").is_err());
    }
}
