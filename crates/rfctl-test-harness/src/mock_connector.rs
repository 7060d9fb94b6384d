//! Mock connector for testing connection management.
//!
//! [`MockConnector`] implements [`Connector`] with a fixed endpoint list.
//! Each successful `open()` creates a fresh [`MockTransport`] carrying the
//! connector's scripted replies and records its [`MockHandle`], so tests
//! can check which handle a given connection used.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use rfctl_core::error::{Error, Result};
use rfctl_core::transport::{Connector, Transport};
use rfctl_core::types::{Endpoint, LinkSettings};

use crate::mock_serial::{MockHandle, MockTransport, Reply};

/// A transport opened by a [`MockConnector`].
#[derive(Debug, Clone)]
pub struct OpenedTransport {
    /// Endpoint it was opened on.
    pub endpoint: Endpoint,
    /// Settings passed to `open()`.
    pub settings: LinkSettings,
    /// Handle into the transport.
    pub handle: MockHandle,
}

#[derive(Debug, Default)]
struct ConnectorState {
    endpoints: Vec<Endpoint>,
    replies: Vec<Reply>,
    open_failures: HashMap<Endpoint, String>,
    opened: Vec<OpenedTransport>,
}

/// A mock [`Connector`] handing out [`MockTransport`]s.
#[derive(Debug, Default)]
pub struct MockConnector {
    state: Mutex<ConnectorState>,
}

impl MockConnector {
    /// A connector whose discovery returns `endpoints`, in order.
    pub fn new<I, E>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Endpoint>,
    {
        let connector = MockConnector::default();
        connector.lock().endpoints = endpoints.into_iter().map(Into::into).collect();
        connector
    }

    /// A connector whose discovery finds nothing.
    pub fn empty() -> Self {
        MockConnector::default()
    }

    fn lock(&self) -> MutexGuard<'_, ConnectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script a reply on every transport opened from now on.
    pub fn reply_to(&self, command: &str, response: &str) {
        self.lock().replies.push(Reply {
            command: command.to_string(),
            response: response.to_string(),
        });
    }

    /// Make `open()` on `endpoint` fail with `detail`.
    pub fn fail_open(&self, endpoint: impl Into<Endpoint>, detail: &str) {
        self.lock()
            .open_failures
            .insert(endpoint.into(), detail.to_string());
    }

    /// Every transport opened so far, oldest first.
    pub fn opened(&self) -> Vec<OpenedTransport> {
        self.lock().opened.clone()
    }

    /// Handle of the most recently opened transport.
    pub fn last_opened(&self) -> Option<MockHandle> {
        self.lock().opened.last().map(|o| o.handle.clone())
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn discover(&self) -> Vec<Endpoint> {
        self.lock().endpoints.clone()
    }

    async fn open(
        &self,
        endpoint: &Endpoint,
        settings: &LinkSettings,
    ) -> Result<Box<dyn Transport>> {
        let mut state = self.lock();
        if let Some(detail) = state.open_failures.get(endpoint) {
            return Err(Error::Transport(detail.clone()));
        }

        let transport = MockTransport::with_replies(state.replies.clone());
        state.opened.push(OpenedTransport {
            endpoint: endpoint.clone(),
            settings: *settings,
            handle: transport.handle(),
        });
        Ok(Box::new(transport))
    }
}
