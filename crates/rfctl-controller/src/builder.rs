//! ControllerBuilder -- fluent builder for constructing [`RfController`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! link parameters, the device command set, and the status callback
//! before the controller exists.
//!
//! # Example
//!
//! ```no_run
//! use rfctl_controller::ControllerBuilder;
//! use rfctl_test_harness::MockConnector;
//! use std::time::Duration;
//!
//! let controller = ControllerBuilder::new()
//!     .baud_rate(115_200)
//!     .io_timeout(Duration::from_millis(500))
//!     .poll_interval(Duration::from_millis(250))
//!     .build(MockConnector::new(["MOCK0"]));
//! ```

use std::sync::Arc;
use std::time::Duration;

use rfctl_core::helpers::format_freq_hz;
use rfctl_core::transport::Connector;
use rfctl_core::types::LinkSettings;
use rfctl_line_io::DEFAULT_RECENT_CAPACITY;

use crate::controller::RfController;
use crate::poller::{NullStatusHandler, StatusHandler};

/// Default poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default display alias for the instrument.
pub const DEFAULT_DEVICE_ALIAS: &str = "Generic RF Unit";

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// The two device commands the controller issues on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    /// Sent once per poll cycle.
    pub status_query: String,
    /// Prefix of the set-frequency command; the frequency follows after a space.
    pub set_frequency: String,
}

impl CommandSet {
    /// Render a set-frequency command, e.g. `SETFREQ 1000000000`.
    pub fn set_frequency(&self, freq_hz: f64) -> String {
        format!("{} {}", self.set_frequency, format_freq_hz(freq_hz))
    }
}

impl Default for CommandSet {
    fn default() -> Self {
        CommandSet {
            status_query: "STATUS?".into(),
            set_frequency: "SETFREQ".into(),
        }
    }
}

/// Resolved controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub link: LinkSettings,
    pub poll_interval: Duration,
    pub commands: CommandSet,
    pub recent_capacity: usize,
    pub device_alias: String,
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            link: LinkSettings::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            commands: CommandSet::default(),
            recent_capacity: DEFAULT_RECENT_CAPACITY,
            device_alias: DEFAULT_DEVICE_ALIAS.into(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Fluent builder for [`RfController`].
///
/// Every setting has a default, so the simplest usage is:
///
/// ```ignore
/// let controller = ControllerBuilder::new().build(SerialConnector::new());
/// ```
pub struct ControllerBuilder {
    config: ControllerConfig,
    handler: Arc<dyn StatusHandler>,
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerBuilder {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        ControllerBuilder {
            config: ControllerConfig::default(),
            handler: Arc::new(NullStatusHandler),
        }
    }

    /// Set the serial baud rate (default: 115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.config.link.baud_rate = baud;
        self
    }

    /// Set the per-operation transport timeout (default: 1s).
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.link.timeout = timeout;
        self
    }

    /// Replace both link settings at once.
    pub fn link_settings(mut self, link: LinkSettings) -> Self {
        self.config.link = link;
        self
    }

    /// Set the interval used by [`RfController::start_polling_default`]
    /// (default: 1s).
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set the status query sent by the poller (default: `STATUS?`).
    pub fn status_query(mut self, query: &str) -> Self {
        self.config.commands.status_query = query.to_string();
        self
    }

    /// Set the set-frequency command prefix (default: `SETFREQ`).
    pub fn set_frequency_command(mut self, prefix: &str) -> Self {
        self.config.commands.set_frequency = prefix.to_string();
        self
    }

    /// Set how many received lines are retained for inspection
    /// (default: 100; 0 disables retention).
    pub fn recent_capacity(mut self, capacity: usize) -> Self {
        self.config.recent_capacity = capacity;
        self
    }

    /// Set the display alias (default: `Generic RF Unit`).
    pub fn device_alias(mut self, alias: &str) -> Self {
        self.config.device_alias = alias.to_string();
        self
    }

    /// Set the capacity of the event broadcast channel (default: 256).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    /// Install the callback that receives every polled status line.
    pub fn status_handler(mut self, handler: impl StatusHandler) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    /// The configuration as currently set.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Build an [`RfController`] that opens links through `connector`.
    ///
    /// Pass a `MockConnector` from `rfctl-test-harness` for testing, or a
    /// `SerialConnector` from `rfctl-transport` for hardware.
    pub fn build(self, connector: impl Connector + 'static) -> RfController {
        self.build_with_connector(Arc::new(connector))
    }

    /// Build with a connector that is already shared.
    pub fn build_with_connector(self, connector: Arc<dyn Connector>) -> RfController {
        RfController::new(connector, self.config, self.handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfctl_core::types::ResponseLine;

    #[test]
    fn builder_defaults() {
        let builder = ControllerBuilder::new();
        let config = builder.config();
        assert_eq!(config.link.baud_rate, 115_200);
        assert_eq!(config.link.timeout, Duration::from_secs(1));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.commands.status_query, "STATUS?");
        assert_eq!(config.commands.set_frequency, "SETFREQ");
        assert_eq!(config.recent_capacity, 100);
        assert_eq!(config.device_alias, "Generic RF Unit");
    }

    #[test]
    fn builder_overrides() {
        let builder = ControllerBuilder::new()
            .baud_rate(9600)
            .io_timeout(Duration::from_millis(250))
            .poll_interval(Duration::from_millis(50))
            .status_query("STAT")
            .set_frequency_command("FREQ")
            .recent_capacity(5)
            .device_alias("Bench Synth")
            .event_capacity(0)
            .status_handler(|_: &ResponseLine| {});
        let config = builder.config();
        assert_eq!(config.link.baud_rate, 9600);
        assert_eq!(config.link.timeout, Duration::from_millis(250));
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.commands.status_query, "STAT");
        assert_eq!(config.commands.set_frequency(7.5), "FREQ 7.5");
        assert_eq!(config.recent_capacity, 5);
        assert_eq!(config.device_alias, "Bench Synth");
        assert_eq!(config.event_capacity, 1);
    }

    #[test]
    fn set_frequency_formats_hz() {
        let commands = CommandSet::default();
        assert_eq!(commands.set_frequency(1_000_000_000.0), "SETFREQ 1000000000");
        assert_eq!(commands.set_frequency(1_000_000_000.5), "SETFREQ 1000000000.5");
        assert_eq!(commands.set_frequency(-100.0), "SETFREQ -100");
    }
}
