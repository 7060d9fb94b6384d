//! rfctl-test-harness: Test utilities and mock transports for rfctl.
//!
//! This crate provides [`MockTransport`] for deterministic testing of the
//! command/response channel and controller activities without real
//! hardware, and [`MockConnector`] for exercising discovery and connection
//! management.

pub mod mock_connector;
pub mod mock_serial;

pub use mock_connector::{MockConnector, OpenedTransport};
pub use mock_serial::{MockHandle, MockTransport};
