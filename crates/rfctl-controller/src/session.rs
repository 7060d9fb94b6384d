//! Session state: which endpoint is bound and the channel opened on it.

use tokio::sync::broadcast;
use tracing::{debug, error, info};

use rfctl_core::error::{Error, Result};
use rfctl_core::events::ControllerEvent;
use rfctl_core::transport::Connector;
use rfctl_core::types::{Endpoint, LinkSettings};
use rfctl_line_io::CommandChannel;

/// An open link to one endpoint.
///
/// A `Session` exists only while connected; "disconnected" is represented
/// by its absence. Each session owns a fresh [`CommandChannel`], so a
/// clone held by an activity from an earlier session can never reach the
/// transport of a later one.
pub(crate) struct Session {
    channel: CommandChannel,
}

impl Session {
    /// Resolve the endpoint and open a transport on it.
    ///
    /// With no endpoint given, the first discovered one is used.
    pub(crate) async fn open(
        connector: &dyn Connector,
        endpoint: Option<Endpoint>,
        settings: &LinkSettings,
        recent_capacity: usize,
        event_tx: broadcast::Sender<ControllerEvent>,
    ) -> Result<Session> {
        let endpoint = match endpoint {
            Some(ep) => ep,
            None => {
                let found = connector.discover().await;
                debug!(count = found.len(), "discovered endpoints");
                found.into_iter().next().ok_or_else(|| {
                    error!("no endpoints available");
                    Error::NoEndpointsAvailable
                })?
            }
        };

        let transport = connector
            .open(&endpoint, settings)
            .await
            .map_err(|e| {
                error!(%endpoint, error = %e, "failed to open transport");
                Error::TransportOpenFailed {
                    endpoint: endpoint.clone(),
                    detail: e.to_string(),
                }
            })?;

        info!(%endpoint, baud = settings.baud_rate, "connected");
        Ok(Session {
            channel: CommandChannel::new(transport, endpoint, recent_capacity, event_tx),
        })
    }

    pub(crate) fn endpoint(&self) -> &Endpoint {
        self.channel.endpoint()
    }

    pub(crate) fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    /// Whether the transport is still open.
    pub(crate) async fn is_connected(&self) -> bool {
        self.channel.is_open().await
    }

    /// Close the transport. Activities must already have exited.
    pub(crate) async fn close(self) {
        let endpoint = self.channel.endpoint().clone();
        self.channel.close().await;
        info!(%endpoint, "disconnected");
    }
}
