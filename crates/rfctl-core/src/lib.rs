//! rfctl-core: Core traits, types, and error definitions for rfctl.
//!
//! This crate defines the device-agnostic abstractions shared by the
//! controller, the transport implementations, and presentation code.
//!
//! # Key types
//!
//! - [`Transport`] / [`Connector`] -- line-oriented link and its discovery
//! - [`SweepParameters`] / [`SweepState`] -- sweep configuration and progress
//! - [`ControllerEvent`] -- asynchronous notifications for display code
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod helpers;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use rfctl_core::*`.
pub use error::{Activity, Error, Result};
pub use events::ControllerEvent;
pub use helpers::{format_freq_hz, format_freq_mhz};
pub use transport::{Connector, Transport};
pub use types::*;
