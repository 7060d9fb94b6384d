//! Transport and connector traits for instrument communication.
//!
//! The [`Transport`] trait abstracts over the physical link to an
//! instrument: a duplex stream of text lines. The serial implementation
//! lives in `rfctl-transport`; `rfctl-test-harness` provides a scripted
//! mock for deterministic tests.
//!
//! A [`Connector`] discovers candidate [`Endpoint`]s and opens a
//! [`Transport`] to one of them. The controller depends only on these two
//! traits, never on a concrete port type.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Endpoint, LinkSettings};

/// Asynchronous line-oriented transport to an instrument.
///
/// Framing of outbound commands is done by the caller; `send` writes the
/// bytes as given. Inbound data is split into lines by the transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write raw bytes (an already-terminated command line).
    ///
    /// Bounded by the timeout in the [`LinkSettings`] the transport was
    /// opened with.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Return the next complete line if one is ready, without waiting.
    ///
    /// `Ok(None)` means no complete line is available right now; it does
    /// not mean end-of-stream. The returned text has its terminator removed.
    async fn try_read_line(&mut self) -> Result<Option<String>>;

    /// Close the transport.
    ///
    /// After `close()`, `send()` and `try_read_line()` should return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is still open.
    fn is_connected(&self) -> bool;
}

/// Discovery and construction of [`Transport`]s.
#[async_trait]
pub trait Connector: Send + Sync {
    /// List candidate endpoints. An empty list is a valid answer.
    ///
    /// Must not block indefinitely.
    async fn discover(&self) -> Vec<Endpoint>;

    /// Open a transport to `endpoint`.
    async fn open(&self, endpoint: &Endpoint, settings: &LinkSettings)
    -> Result<Box<dyn Transport>>;
}
