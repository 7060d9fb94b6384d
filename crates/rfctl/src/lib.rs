//! # rfctl -- Real-time Control of Serial RF Instruments
//!
//! `rfctl` is an asynchronous Rust library for driving a serial-attached RF
//! instrument (synthesizer, signal generator, test source) that speaks a
//! line-oriented text protocol. It connects to the instrument, polls its
//! status in the background, and runs cancellable stepped frequency sweeps
//! without blocking the caller.
//!
//! ## Quick Start
//!
//! Add `rfctl` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rfctl = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Connect to the first serial port found and sweep 1.0 - 1.1 GHz:
//!
//! ```no_run
//! use std::time::Duration;
//! use rfctl::{ControllerBuilder, SweepParameters};
//! use rfctl::serial::SerialConnector;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let rf = ControllerBuilder::new()
//!         .baud_rate(115_200)
//!         .build(SerialConnector::new());
//!
//!     rf.connect(None).await?;
//!     rf.start_polling(Duration::from_secs(1)).await?;
//!     rf.start_sweep(SweepParameters::new(1.0e9, 1.1e9, 1.0e7, Duration::from_millis(200)))
//!         .await?;
//!
//!     let mut state = rf.watch_sweep();
//!     state.wait_for(|s| s.is_terminal()).await?;
//!     rf.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                 | Purpose                                               |
//! |-----------------------|-------------------------------------------------------|
//! | `rfctl-core`          | Traits ([`Transport`], [`Connector`]), types, errors  |
//! | `rfctl-line-io`       | Line framing and the serialized command channel       |
//! | `rfctl-transport`     | Serial transport and port discovery                   |
//! | `rfctl-controller`    | Session, poller, sweep engine, [`RfController`]       |
//! | `rfctl-test-harness`  | Mock transport and connector for tests                |
//! | **`rfctl`**           | This facade crate -- re-exports everything            |
//!
//! ## Feature Flags
//!
//! | Feature  | Enables                                     | Default |
//! |----------|---------------------------------------------|---------|
//! | `serial` | [`serial`] module (tokio-serial transport)  | yes     |
//!
//! Without `serial`, supply your own [`Connector`] to
//! [`ControllerBuilder::build`].
//!
//! ## Event Subscription
//!
//! The controller emits [`ControllerEvent`]s through a broadcast channel.
//! Subscribe to render connection changes, status lines, sweep progress,
//! and transient I/O failures:
//!
//! ```no_run
//! use rfctl::{ControllerEvent, RfController};
//! # async fn example(rf: &RfController) {
//! let mut events = rf.subscribe();
//! while let Ok(event) = events.recv().await {
//!     match event {
//!         ControllerEvent::SweepStep { freq_hz } => println!("{} Hz", freq_hz),
//!         ControllerEvent::Status { line } => println!("status: {line}"),
//!         other => println!("{other:?}"),
//!     }
//! }
//! # }
//! ```

pub use rfctl_controller::*;
pub use rfctl_core::*;

/// Line framing and the serialized command channel.
pub mod line_io {
    pub use rfctl_line_io::*;
}

/// Serial transport backend.
///
/// Provides [`SerialConnector`](serial::SerialConnector), which discovers
/// serial ports and opens them as line-oriented transports.
#[cfg(feature = "serial")]
pub mod serial {
    pub use rfctl_transport::*;
}
