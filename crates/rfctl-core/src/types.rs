//! Data model shared by the controller, transports, and presentation code.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default sweep step when the caller does not choose one (1 MHz).
pub const DEFAULT_STEP_HZ: f64 = 1_000_000.0;

/// Default dwell at each sweep frequency.
pub const DEFAULT_DWELL: Duration = Duration::from_millis(200);

/// Default serial line rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default transport read/write timeout.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Opaque identifier of a discoverable transport, e.g. `/dev/ttyUSB0` or `COM3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Endpoint(String);

impl Endpoint {
    /// Wrap a transport-specific address.
    pub fn new(name: impl Into<String>) -> Self {
        Endpoint(name.into())
    }

    /// The address as passed to the transport.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Endpoint::new(s)
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Endpoint(s)
    }
}

// ---------------------------------------------------------------------------
// LinkSettings
// ---------------------------------------------------------------------------

/// Transport-level configuration applied when a link is opened.
///
/// I/O timeouts live here and are enforced by the transport, not by the
/// controller loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    /// Serial line rate in baud.
    pub baud_rate: u32,
    /// Upper bound on a single write or read on the link.
    pub timeout: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// ResponseLine
// ---------------------------------------------------------------------------

/// A decoded, trimmed line of text received from the instrument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseLine(String);

impl ResponseLine {
    /// Trim surrounding whitespace (including any `\r`) and wrap the text.
    pub fn new(text: impl AsRef<str>) -> Self {
        ResponseLine(text.as_ref().trim().to_string())
    }

    /// The line text without its terminator.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the line, returning the owned text.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ResponseLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// The range, step, and dwell of one frequency sweep run.
///
/// Frequencies are in hertz. The step may be negative for a descending
/// sweep, but its sign must agree with `stop_hz - start_hz`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepParameters {
    /// First frequency commanded.
    pub start_hz: f64,
    /// Terminal frequency; never commanded, never crossed.
    pub stop_hz: f64,
    /// Increment applied after each dwell.
    pub step_hz: f64,
    /// Time held at each frequency.
    pub dwell: Duration,
}

impl SweepParameters {
    /// Build a parameter set. Nothing is checked until [`validate`](Self::validate).
    pub fn new(start_hz: f64, stop_hz: f64, step_hz: f64, dwell: Duration) -> Self {
        SweepParameters {
            start_hz,
            stop_hz,
            step_hz,
            dwell,
        }
    }

    /// Check that a sweep with these parameters can terminate.
    ///
    /// Rejects non-finite values, a zero step, an empty range, a step
    /// pointing away from `stop_hz`, and a step too fine to move an `f64`
    /// at the sweep's frequencies. `dwell` is a [`Duration`] and so can
    /// never be negative.
    pub fn validate(&self) -> Result<()> {
        if !self.start_hz.is_finite() || !self.stop_hz.is_finite() || !self.step_hz.is_finite() {
            return Err(Error::InvalidParameters(format!(
                "frequencies must be finite (start {}, stop {}, step {})",
                self.start_hz, self.stop_hz, self.step_hz
            )));
        }
        if self.step_hz == 0.0 {
            return Err(Error::InvalidParameters("step must be nonzero".into()));
        }
        let span = self.stop_hz - self.start_hz;
        if span == 0.0 {
            return Err(Error::InvalidParameters(format!(
                "start and stop are both {} Hz",
                self.start_hz
            )));
        }
        if span.signum() != self.step_hz.signum() {
            return Err(Error::InvalidParameters(format!(
                "step {} Hz does not move from {} Hz toward {} Hz",
                self.step_hz, self.start_hz, self.stop_hz
            )));
        }
        // Each computed frequency is within 1.5 ulp of exact, so a step
        // above 4 ulp keeps the commanded sequence strictly monotonic.
        let magnitude = self.start_hz.abs().max(self.stop_hz.abs());
        let spacing = (magnitude * f64::EPSILON).max(f64::MIN_POSITIVE);
        if self.step_hz.abs() <= 4.0 * spacing {
            return Err(Error::InvalidParameters(format!(
                "step {} Hz is below the resolution of {} Hz",
                self.step_hz, magnitude
            )));
        }
        Ok(())
    }

    /// Whether `freq_hz` has reached or passed the stop frequency in the
    /// direction of travel.
    pub fn is_past_end(&self, freq_hz: f64) -> bool {
        if self.step_hz > 0.0 {
            freq_hz >= self.stop_hz
        } else {
            freq_hz <= self.stop_hz
        }
    }

    /// The `index`-th frequency of the run, counted from `start_hz`.
    ///
    /// Computed from the start rather than by accumulation so long sweeps
    /// do not drift.
    pub fn frequency_at(&self, index: u64) -> f64 {
        self.start_hz + index as f64 * self.step_hz
    }

    /// Number of set-frequency commands a full run issues.
    ///
    /// Returns 0 for parameters that fail validation.
    pub fn step_count(&self) -> u64 {
        if self.validate().is_err() {
            return 0;
        }
        // Start from ceil(span / step) and correct for floating-point error
        // so the count agrees exactly with what the engine will send.
        let estimate = ((self.stop_hz - self.start_hz) / self.step_hz).ceil();
        let mut count = estimate.max(1.0) as u64;
        while count > 0 && self.is_past_end(self.frequency_at(count - 1)) {
            count -= 1;
        }
        while !self.is_past_end(self.frequency_at(count)) {
            count += 1;
        }
        count
    }
}

impl fmt::Display for SweepParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz -> {} Hz step {} Hz dwell {} ms",
            self.start_hz,
            self.stop_hz,
            self.step_hz,
            self.dwell.as_millis()
        )
    }
}

/// Progress of the sweep engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SweepState {
    /// No sweep has run in this controller yet.
    #[default]
    Idle,
    /// Holding at `current_hz`.
    Running {
        /// Last frequency commanded.
        current_hz: f64,
    },
    /// Cancelled before reaching the stop frequency.
    Stopped,
    /// Walked the whole range.
    Completed,
}

impl SweepState {
    /// `true` while a sweep task is stepping.
    pub fn is_running(&self) -> bool {
        matches!(self, SweepState::Running { .. })
    }

    /// `true` for `Stopped` and `Completed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SweepState::Stopped | SweepState::Completed)
    }
}

impl fmt::Display for SweepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepState::Idle => write!(f, "Idle"),
            SweepState::Running { current_hz } => write!(f, "Running ({current_hz} Hz)"),
            SweepState::Stopped => write!(f, "Stopped"),
            SweepState::Completed => write!(f, "Completed"),
        }
    }
}
