//! Mock transport for deterministic testing of the controller.
//!
//! [`MockTransport`] implements the [`Transport`] trait with scripted
//! replies: whenever a given command line is sent, its reply lines are
//! queued for subsequent `try_read_line()` calls. Unsolicited lines can be
//! queued directly, and write/read/close failures can be injected.
//!
//! The transport is usually moved into the code under test, so all
//! inspection goes through a cloneable [`MockHandle`].
//!
//! # Example
//!
//! ```
//! use rfctl_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! let handle = mock.handle();
//! // Every "STATUS?" sent through `mock` queues this reply.
//! handle.reply_to("STATUS?", "STATUS:LOCKED,FREQ=2400.0,POWER=10");
//! assert!(handle.sent_lines().is_empty());
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use rfctl_core::error::{Error, Result};
use rfctl_core::transport::Transport;

/// A scripted reply: when `command` is sent, queue `response`.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub(crate) command: String,
    pub(crate) response: String,
}

#[derive(Debug, Default)]
struct MockState {
    replies: Vec<Reply>,
    incoming: VecDeque<String>,
    sent_bytes: Vec<Vec<u8>>,
    fail_writes: Option<String>,
    fail_reads: Option<String>,
    fail_close: Option<String>,
    closed: bool,
    close_count: usize,
    accesses_after_close: usize,
}

/// A mock [`Transport`] for testing without hardware.
///
/// Starts open. Sent lines are recorded with their terminator stripped;
/// replies are matched on the exact command text.
#[derive(Debug)]
pub struct MockTransport {
    shared: Arc<Mutex<MockState>>,
}

/// Shared view into a [`MockTransport`] that outlives moving it.
#[derive(Debug, Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<MockState>>,
}

fn lock(shared: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Create a new mock transport in the open state.
    pub fn new() -> Self {
        MockTransport {
            shared: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub(crate) fn with_replies(replies: Vec<Reply>) -> Self {
        let mock = Self::new();
        lock(&mock.shared).replies = replies;
        mock
    }

    /// A handle for scripting and inspecting this transport.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// Queue `response` every time `command` is sent.
    pub fn reply_to(&self, command: &str, response: &str) {
        lock(&self.shared).replies.push(Reply {
            command: command.to_string(),
            response: response.to_string(),
        });
    }

    /// Queue an unsolicited line for the next read.
    pub fn push_line(&self, line: &str) {
        lock(&self.shared).incoming.push_back(line.to_string());
    }

    /// Lines not yet read.
    pub fn pending_lines(&self) -> usize {
        lock(&self.shared).incoming.len()
    }

    /// Every command sent, terminator stripped, in order.
    pub fn sent_lines(&self) -> Vec<String> {
        lock(&self.shared)
            .sent_bytes
            .iter()
            .map(|b| strip_terminator(b))
            .collect()
    }

    /// Every raw buffer passed to `send()`, in order.
    pub fn sent_bytes(&self) -> Vec<Vec<u8>> {
        lock(&self.shared).sent_bytes.clone()
    }

    /// Make `send()` fail with a transport error (or succeed again with `None`).
    pub fn fail_writes(&self, detail: Option<&str>) {
        lock(&self.shared).fail_writes = detail.map(str::to_string);
    }

    /// Make `try_read_line()` fail with a transport error.
    pub fn fail_reads(&self, detail: Option<&str>) {
        lock(&self.shared).fail_reads = detail.map(str::to_string);
    }

    /// Make `close()` report an error. The transport still ends up closed.
    pub fn fail_close(&self, detail: Option<&str>) {
        lock(&self.shared).fail_close = detail.map(str::to_string);
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        lock(&self.shared).closed
    }

    /// Number of `close()` calls.
    pub fn close_count(&self) -> usize {
        lock(&self.shared).close_count
    }

    /// Number of `send()`/`try_read_line()` calls made after `close()`.
    ///
    /// Anything other than zero means a caller kept using a stale handle.
    pub fn accesses_after_close(&self) -> usize {
        lock(&self.shared).accesses_after_close
    }
}

fn strip_terminator(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = lock(&self.shared);
        if state.closed {
            state.accesses_after_close += 1;
            return Err(Error::NotConnected);
        }
        if let Some(detail) = state.fail_writes.clone() {
            return Err(Error::Transport(detail));
        }

        state.sent_bytes.push(data.to_vec());

        let command = strip_terminator(data);
        let responses: Vec<String> = state
            .replies
            .iter()
            .filter(|r| r.command == command)
            .map(|r| r.response.clone())
            .collect();
        state.incoming.extend(responses);
        Ok(())
    }

    async fn try_read_line(&mut self) -> Result<Option<String>> {
        let mut state = lock(&self.shared);
        if state.closed {
            state.accesses_after_close += 1;
            return Err(Error::NotConnected);
        }
        if let Some(detail) = state.fail_reads.clone() {
            return Err(Error::Transport(detail));
        }
        Ok(state.incoming.pop_front())
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = lock(&self.shared);
        state.closed = true;
        state.close_count += 1;
        state.incoming.clear();
        match state.fail_close.clone() {
            Some(detail) => Err(Error::Transport(detail)),
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        !lock(&self.shared).closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_reply_to_queues_response() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.reply_to("STATUS?", "STATUS:LOCKED");

        mock.send(b"STATUS?\r\n").await.unwrap();
        assert_eq!(
            mock.try_read_line().await.unwrap().as_deref(),
            Some("STATUS:LOCKED")
        );
        assert_eq!(mock.try_read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn mock_transport_tracks_sent_data() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();

        mock.send(b"SETFREQ 1\r\n").await.unwrap();
        mock.send(b"SETFREQ 2\r\n").await.unwrap();

        assert_eq!(handle.sent_lines(), vec!["SETFREQ 1", "SETFREQ 2"]);
        assert_eq!(handle.sent_bytes()[0], b"SETFREQ 1\r\n");
    }

    #[tokio::test]
    async fn mock_transport_unmatched_command_queues_nothing() {
        let mut mock = MockTransport::new();
        mock.handle().reply_to("STATUS?", "STATUS:OK");

        mock.send(b"IDN?\r\n").await.unwrap();
        assert_eq!(mock.try_read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn mock_transport_unsolicited_lines_in_order() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.push_line("A");
        handle.push_line("B");
        assert_eq!(handle.pending_lines(), 2);

        assert_eq!(mock.try_read_line().await.unwrap().as_deref(), Some("A"));
        assert_eq!(mock.try_read_line().await.unwrap().as_deref(), Some("B"));
        assert_eq!(handle.pending_lines(), 0);
    }

    #[tokio::test]
    async fn mock_transport_injected_failures() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();

        handle.fail_writes(Some("cable pulled"));
        let err = mock.send(b"X\r\n").await.unwrap_err();
        assert!(matches!(err, Error::Transport(ref d) if d == "cable pulled"));
        assert!(handle.sent_lines().is_empty());

        handle.fail_writes(None);
        mock.send(b"X\r\n").await.unwrap();

        handle.fail_reads(Some("parity"));
        assert!(mock.try_read_line().await.is_err());
    }

    #[tokio::test]
    async fn mock_transport_close_and_stale_access() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());
        assert!(handle.is_closed());
        assert_eq!(handle.close_count(), 1);

        assert!(matches!(
            mock.send(b"X\r\n").await.unwrap_err(),
            Error::NotConnected
        ));
        assert!(matches!(
            mock.try_read_line().await.unwrap_err(),
            Error::NotConnected
        ));
        assert_eq!(handle.accesses_after_close(), 2);
    }

    #[tokio::test]
    async fn mock_transport_close_failure_still_closes() {
        let mut mock = MockTransport::new();
        mock.handle().fail_close(Some("busy"));

        assert!(mock.close().await.is_err());
        assert!(!mock.is_connected());
    }
}
