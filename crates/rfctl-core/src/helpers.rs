//! Formatting helpers for frequencies.
//!
//! Small utility functions shared by the controller (command rendering)
//! and presentation code (status lines).

/// Render a frequency in hertz for a device command.
///
/// Uses the shortest decimal that round-trips the `f64`, with no exponent
/// and no rounding: whole values print without a fractional part.
///
/// # Example
///
/// ```
/// use rfctl_core::format_freq_hz;
///
/// assert_eq!(format_freq_hz(1_000_000_000.0), "1000000000");
/// assert_eq!(format_freq_hz(2_400_000.5), "2400000.5");
/// ```
pub fn format_freq_hz(freq_hz: f64) -> String {
    format!("{freq_hz}")
}

/// Format a frequency in hertz as a human-readable MHz string.
///
/// Returns a string like `"2400.000000 MHz"` with six decimal places
/// (hertz resolution).
///
/// # Example
///
/// ```
/// use rfctl_core::format_freq_mhz;
///
/// assert_eq!(format_freq_mhz(14_074_000.0), "14.074000 MHz");
/// assert_eq!(format_freq_mhz(2_400_000_000.0), "2400.000000 MHz");
/// ```
pub fn format_freq_mhz(freq_hz: f64) -> String {
    let mhz = freq_hz / 1_000_000.0;
    format!("{mhz:.6} MHz")
}
