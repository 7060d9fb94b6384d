//! Transport implementations for rfctl.
//!
//! This crate provides concrete implementations of the
//! [`Transport`](rfctl_core::Transport) and [`Connector`](rfctl_core::Connector)
//! traits from `rfctl-core` for serial links:
//!
//! - [`SerialTransport`]: USB virtual COM ports and RS-232 serial connections,
//!   speaking newline-terminated text
//! - [`SerialConnector`]: port discovery and opening
//!
//! # Example
//!
//! ```no_run
//! use rfctl_core::{Connector, LinkSettings};
//! use rfctl_transport::SerialConnector;
//!
//! # async fn example() -> rfctl_core::Result<()> {
//! let connector = SerialConnector::new();
//! for endpoint in connector.discover().await {
//!     println!("found {endpoint}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{
    DataBits, FlowControl, Parity, SerialConfig, SerialConnector, SerialTransport, StopBits,
};
