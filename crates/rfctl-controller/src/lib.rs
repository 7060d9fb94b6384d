//! Session, polling, and sweep control for serial-attached RF instruments.
//!
//! This crate is the concurrent core of rfctl. It provides:
//!
//! - **Controller** ([`controller`]) -- [`RfController`], owning the session
//!   and the two background activities, with a broadcast event stream.
//! - **Builder** ([`builder`]) -- [`ControllerBuilder`] with defaults for the
//!   link, the device command set, and the status callback.
//! - **Poller** ([`poller`]) -- the periodic status query and the
//!   [`StatusHandler`] callback trait.
//! - **Sweep engine** -- a cancellable stepped walk over a frequency range,
//!   observable through [`RfController::watch_sweep`].
//!
//! Activities run as tokio tasks. Each has its own cancellation token and
//! join handle; stopping an activity waits for the task to exit, and
//! `disconnect` closes the transport only after both have exited.
//!
//! # Example
//!
//! ```
//! use rfctl_controller::ControllerBuilder;
//! use rfctl_core::{SweepParameters, SweepState};
//! use rfctl_test_harness::MockConnector;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> rfctl_core::Result<()> {
//! let rf = ControllerBuilder::new().build(MockConnector::new(["MOCK0"]));
//! rf.connect(None).await?;
//!
//! let mut state = rf.watch_sweep();
//! rf.start_sweep(SweepParameters::new(1.0e9, 1.00003e9, 1.0e4, Duration::ZERO)).await?;
//! let done = *state.wait_for(|s| s.is_terminal()).await.unwrap();
//! assert_eq!(done, SweepState::Completed);
//!
//! rf.disconnect().await;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod controller;
mod lifecycle;
pub mod poller;
mod session;
mod sweep;

pub use builder::{
    CommandSet, ControllerBuilder, ControllerConfig, DEFAULT_DEVICE_ALIAS, DEFAULT_POLL_INTERVAL,
};
pub use controller::RfController;
pub use poller::{NullStatusHandler, StatusHandler};
