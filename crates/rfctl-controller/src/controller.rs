//! RfController -- the public face of the controller.
//!
//! Ties the session, the two background activities, and the event stream
//! together behind one cloneable-by-`Arc` object. Every mutating operation
//! takes the controller's state lock, so `connect`, `disconnect`, and the
//! start/stop calls are linearized against each other. Activities never
//! take that lock; they only go through the session's
//! [`CommandChannel`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info};

use rfctl_core::error::{Activity, Error, Result};
use rfctl_core::events::ControllerEvent;
use rfctl_core::transport::Connector;
use rfctl_core::types::{Endpoint, LinkSettings, ResponseLine, SweepParameters, SweepState};
use rfctl_line_io::CommandChannel;

use crate::builder::ControllerConfig;
use crate::lifecycle::{ActivityHandle, Lifecycle};
use crate::poller::{PollerTask, StatusHandler};
use crate::session::Session;
use crate::sweep::SweepTask;

#[derive(Default)]
struct Inner {
    session: Option<Session>,
    lifecycle: Lifecycle,
    /// Set by the current sweep run just before it publishes its terminal
    /// state.
    sweep_settled: Arc<AtomicBool>,
}

/// Controller for one serial-attached RF instrument.
///
/// Constructed via [`ControllerBuilder`](crate::builder::ControllerBuilder).
pub struct RfController {
    connector: Arc<dyn Connector>,
    config: ControllerConfig,
    handler: Arc<dyn StatusHandler>,
    inner: Mutex<Inner>,
    sweep_state: watch::Sender<SweepState>,
    event_tx: broadcast::Sender<ControllerEvent>,
}

impl Drop for RfController {
    fn drop(&mut self) {
        // Nothing can be awaited here; signal both activities and abort
        // them. The transport is dropped with the session.
        self.inner.get_mut().lifecycle.abort_all();
    }
}

impl RfController {
    pub(crate) fn new(
        connector: Arc<dyn Connector>,
        config: ControllerConfig,
        handler: Arc<dyn StatusHandler>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let (sweep_state, _) = watch::channel(SweepState::Idle);
        RfController {
            connector,
            config,
            handler,
            inner: Mutex::new(Inner::default()),
            sweep_state,
            event_tx,
        }
    }

    /// The configuration this controller was built with.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Display alias of the instrument.
    pub fn device_alias(&self) -> &str {
        &self.config.device_alias
    }

    /// Subscribe to controller events.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.event_tx.subscribe()
    }

    // -----------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------

    /// Candidate endpoints reported by the connector. Empty is not an error.
    pub async fn discover_endpoints(&self) -> Vec<Endpoint> {
        self.connector.discover().await
    }

    /// Connect using the configured link settings.
    ///
    /// See [`connect_with`](Self::connect_with).
    pub async fn connect(&self, endpoint: Option<Endpoint>) -> Result<()> {
        self.connect_with(endpoint, self.config.link).await
    }

    /// Connect to `endpoint`, or to the first discovered endpoint if `None`.
    ///
    /// An existing connection is torn down first, exactly as by
    /// [`disconnect`](Self::disconnect). On failure the controller is left
    /// disconnected and a [`ControllerEvent::ConnectFailed`] is emitted.
    pub async fn connect_with(
        &self,
        endpoint: Option<Endpoint>,
        settings: LinkSettings,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.teardown(&mut inner).await;

        match Session::open(
            self.connector.as_ref(),
            endpoint,
            &settings,
            self.config.recent_capacity,
            self.event_tx.clone(),
        )
        .await
        {
            Ok(session) => {
                let endpoint = session.endpoint().clone();
                info!(alias = %self.config.device_alias, %endpoint, "session open");
                inner.session = Some(session);
                let _ = self.event_tx.send(ControllerEvent::Connected { endpoint });
                Ok(())
            }
            Err(e) => {
                let _ = self.event_tx.send(ControllerEvent::ConnectFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Stop both activities, wait for them to exit, then close the
    /// transport. Safe to call when not connected.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        self.teardown(&mut inner).await;
    }

    async fn teardown(&self, inner: &mut Inner) {
        inner.lifecycle.shutdown().await;
        if let Some(session) = inner.session.take() {
            session.close().await;
            let _ = self.event_tx.send(ControllerEvent::Disconnected);
        }
    }

    /// Whether a transport is open.
    pub async fn is_connected(&self) -> bool {
        match self.inner.lock().await.session.as_ref() {
            Some(session) => session.is_connected().await,
            None => false,
        }
    }

    /// The endpoint currently bound, if connected.
    pub async fn endpoint(&self) -> Option<Endpoint> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.endpoint().clone())
    }

    // -----------------------------------------------------------------
    // Poller
    // -----------------------------------------------------------------

    /// Start polling with the configured interval.
    pub async fn start_polling_default(&self) -> Result<()> {
        self.start_polling(self.config.poll_interval).await
    }

    /// Start the status poller.
    ///
    /// Fails with `AlreadyRunning` if a poller is active, `NotConnected`
    /// without a session, and `InvalidParameters` for a zero interval.
    pub async fn start_polling(&self, interval: Duration) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.lifecycle.reserve(Activity::Poller, false).await?;
        let Some(session) = inner.session.as_ref() else {
            return Err(Error::NotConnected);
        };
        if interval.is_zero() {
            return Err(Error::InvalidParameters(
                "poll interval must be nonzero".into(),
            ));
        }

        let task = PollerTask {
            channel: session.channel().clone(),
            query: self.config.commands.status_query.clone(),
            interval,
            handler: self.handler.clone(),
            event_tx: self.event_tx.clone(),
        };
        let handle = ActivityHandle::spawn(Activity::Poller, |cancel| task.run(cancel));
        inner.lifecycle.install(handle);
        Ok(())
    }

    /// Stop the poller and wait for it to exit. No-op if not polling.
    pub async fn stop_polling(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.lifecycle.stop(Activity::Poller).await {
            debug!("stop_polling: poller not running");
        }
    }

    /// Whether the poller task is running.
    pub async fn is_polling(&self) -> bool {
        self.inner.lock().await.lifecycle.is_active(Activity::Poller)
    }

    // -----------------------------------------------------------------
    // Sweep
    // -----------------------------------------------------------------

    /// Start a sweep in the background and return immediately.
    ///
    /// Fails with `AlreadyRunning` if a sweep is active (the running sweep
    /// is left untouched), `NotConnected` without a session, and
    /// `InvalidParameters` if `params` cannot terminate.
    ///
    /// The sweep state is only changed by the sweep itself: it reads
    /// `Running` once the first frequency has been commanded. Until then
    /// [`sweep_state`](Self::sweep_state) still reports the previous run.
    pub async fn start_sweep(&self, params: SweepParameters) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let settled = inner.sweep_settled.load(Ordering::Acquire);
        inner.lifecycle.reserve(Activity::Sweep, settled).await?;
        let Some(session) = inner.session.as_ref() else {
            return Err(Error::NotConnected);
        };
        params.validate()?;

        let channel = session.channel().clone();
        let settled = Arc::new(AtomicBool::new(false));
        inner.sweep_settled = settled.clone();
        let task = SweepTask {
            channel,
            params,
            commands: self.config.commands.clone(),
            state_tx: self.sweep_state.clone(),
            event_tx: self.event_tx.clone(),
            settled,
        };
        let handle = ActivityHandle::spawn(Activity::Sweep, |cancel| task.run(cancel));
        inner.lifecycle.install(handle);
        Ok(())
    }

    /// Stop the sweep and wait for it to exit. No-op if idle.
    ///
    /// A sweep that observes the request before its natural end finishes
    /// in [`SweepState::Stopped`].
    pub async fn stop_sweep(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.lifecycle.stop(Activity::Sweep).await {
            debug!("stop_sweep: no sweep running");
        }
    }

    /// Whether the sweep task is running.
    pub async fn is_sweeping(&self) -> bool {
        self.inner.lock().await.lifecycle.is_active(Activity::Sweep)
    }

    /// Current sweep state. Never blocks.
    pub fn sweep_state(&self) -> SweepState {
        *self.sweep_state.borrow()
    }

    /// Receiver that observes every sweep state transition.
    pub fn watch_sweep(&self) -> watch::Receiver<SweepState> {
        self.sweep_state.subscribe()
    }

    // -----------------------------------------------------------------
    // Ad-hoc I/O
    // -----------------------------------------------------------------

    /// Send one command line through the shared channel.
    ///
    /// A no-op when not connected. Write failures are returned as
    /// [`Error::TxFailed`] and also broadcast.
    pub async fn send_command(&self, cmd: &str) -> Result<()> {
        match self.current_channel().await {
            Some(channel) => channel.send(cmd).await,
            None => {
                debug!(cmd, "send_command while disconnected ignored");
                Ok(())
            }
        }
    }

    /// Take one received line if ready. Never waits for data.
    pub async fn read_response(&self) -> Option<ResponseLine> {
        self.current_channel().await?.try_read_line().await
    }

    /// The most recent lines received on the current connection.
    pub async fn recent_lines(&self) -> Vec<ResponseLine> {
        match self.current_channel().await {
            Some(channel) => channel.recent_lines().await,
            None => Vec::new(),
        }
    }

    async fn current_channel(&self) -> Option<CommandChannel> {
        self.inner
            .lock()
            .await
            .session
            .as_ref()
            .map(|s| s.channel().clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use rfctl_test_harness::MockConnector;

    use crate::builder::ControllerBuilder;

    const WAIT: Duration = Duration::from_secs(5);

    fn controller(connector: MockConnector) -> RfController {
        ControllerBuilder::new().build(connector)
    }

    fn connector() -> MockConnector {
        let connector = MockConnector::new(["/dev/ttyUSB0", "/dev/ttyUSB1"]);
        connector.reply_to("STATUS?", "STATUS:LOCKED,FREQ=2400.0,POWER=10");
        connector
    }

    fn sweep(start: f64, stop: f64, step: f64, dwell: Duration) -> SweepParameters {
        SweepParameters::new(start, stop, step, dwell)
    }

    async fn wait_for_state(
        rx: &mut watch::Receiver<SweepState>,
        f: impl FnMut(&SweepState) -> bool,
    ) -> SweepState {
        *tokio::time::timeout(WAIT, rx.wait_for(f))
            .await
            .expect("timed out waiting for sweep state")
            .expect("sweep state sender dropped")
    }

    /// Wait for the next terminal state published after the last one seen.
    async fn next_terminal(rx: &mut watch::Receiver<SweepState>) -> SweepState {
        tokio::time::timeout(WAIT, async {
            loop {
                rx.changed().await.expect("sweep state sender dropped");
                let state = *rx.borrow_and_update();
                if state.is_terminal() {
                    return state;
                }
            }
        })
        .await
        .expect("timed out waiting for sweep to end")
    }

    // =======================================================================
    // Session
    // =======================================================================

    #[tokio::test]
    async fn connect_without_candidates_fails() {
        let rf = controller(MockConnector::empty());
        let mut events = rf.subscribe();

        let err = rf.connect(None).await.unwrap_err();
        assert!(matches!(err, Error::NoEndpointsAvailable));
        assert!(!rf.is_connected().await);
        assert_eq!(rf.endpoint().await, None);
        assert!(matches!(
            events.try_recv().unwrap(),
            ControllerEvent::ConnectFailed { .. }
        ));
    }

    #[tokio::test]
    async fn connect_uses_first_endpoint_and_settings() {
        let rf = ControllerBuilder::new()
            .baud_rate(57_600)
            .io_timeout(Duration::from_millis(300))
            .build_with_connector(Arc::new(connector()));
        let mut events = rf.subscribe();

        rf.connect(None).await.unwrap();
        assert!(rf.is_connected().await);
        assert_eq!(rf.endpoint().await, Some(Endpoint::new("/dev/ttyUSB0")));
        assert_eq!(
            events.try_recv().unwrap(),
            ControllerEvent::Connected {
                endpoint: Endpoint::new("/dev/ttyUSB0")
            }
        );
        rf.disconnect().await;
        assert!(!rf.is_connected().await);
    }

    #[tokio::test]
    async fn connect_with_overrides_settings() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());
        let settings = LinkSettings {
            baud_rate: 9600,
            timeout: Duration::from_millis(50),
        };
        rf.connect_with(Some(Endpoint::new("COM4")), settings)
            .await
            .unwrap();
        let opened = connector.opened();
        assert_eq!(opened[0].endpoint.as_str(), "COM4");
        assert_eq!(opened[0].settings, settings);
    }

    #[tokio::test]
    async fn connect_open_failure_leaves_disconnected() {
        let connector = connector();
        connector.fail_open("/dev/ttyUSB0", "permission denied");
        let rf = controller(connector);

        let err = rf.connect(None).await.unwrap_err();
        assert!(matches!(err, Error::TransportOpenFailed { .. }));
        assert!(err.to_string().contains("permission denied"));
        assert!(!rf.is_connected().await);
    }

    #[tokio::test]
    async fn reconnect_closes_previous_transport() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());

        rf.connect(None).await.unwrap();
        let first = connector.last_opened().unwrap();
        rf.connect(Some(Endpoint::new("/dev/ttyUSB1"))).await.unwrap();
        let second = connector.last_opened().unwrap();

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_eq!(rf.endpoint().await, Some(Endpoint::new("/dev/ttyUSB1")));
    }

    #[tokio::test]
    async fn disconnect_when_idle_is_noop() {
        let rf = controller(connector());
        let mut events = rf.subscribe();
        rf.disconnect().await;
        rf.disconnect().await;
        assert!(!rf.is_connected().await);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_then_connect_never_touches_stale_handle() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());

        for _ in 0..5 {
            rf.connect(None).await.unwrap();
            let handle = connector.last_opened().unwrap();
            rf.start_polling(Duration::from_millis(1)).await.unwrap();
            rf.start_sweep(sweep(0.0, 1.0e6, 1.0, Duration::from_millis(1)))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;

            rf.disconnect().await;
            assert!(handle.is_closed());
            assert!(!rf.is_polling().await);
            assert!(!rf.is_sweeping().await);

            rf.connect(None).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert_eq!(handle.accesses_after_close(), 0);
            rf.disconnect().await;
        }

        for opened in connector.opened() {
            assert!(opened.handle.is_closed());
            assert_eq!(opened.handle.accesses_after_close(), 0);
            assert_eq!(opened.handle.close_count(), 1);
        }
    }

    // =======================================================================
    // Poller
    // =======================================================================

    #[tokio::test]
    async fn polling_requires_connection() {
        let rf = controller(connector());
        let err = rf.start_polling(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert!(!rf.is_polling().await);
    }

    #[tokio::test]
    async fn polling_rejects_zero_interval() {
        let rf = controller(connector());
        rf.connect(None).await.unwrap();
        let err = rf.start_polling(Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn polling_is_single_flight() {
        let rf = controller(connector());
        rf.connect(None).await.unwrap();
        rf.start_polling(Duration::from_millis(10)).await.unwrap();

        let err = rf.start_polling(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning(Activity::Poller)));

        rf.stop_polling().await;
        rf.stop_polling().await;
        assert!(!rf.is_polling().await);
        rf.start_polling(Duration::from_millis(10)).await.unwrap();
        rf.disconnect().await;
    }

    #[tokio::test]
    async fn polling_forwards_lines_to_handler() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let rf = ControllerBuilder::new()
            .recent_capacity(4)
            .status_handler(move |line: &ResponseLine| {
                sink.lock().unwrap().push(line.to_string());
            })
            .build(connector());
        let mut events = rf.subscribe();

        rf.connect(None).await.unwrap();
        rf.start_polling(Duration::from_millis(2)).await.unwrap();

        let mut statuses = 0;
        while statuses < 6 {
            match tokio::time::timeout(WAIT, events.recv()).await {
                Ok(Ok(ControllerEvent::Status { .. })) => statuses += 1,
                Ok(Ok(_)) => {}
                other => panic!("no status events: {other:?}"),
            }
        }
        rf.stop_polling().await;

        assert!(seen.lock().unwrap().len() >= 6);
        let recent = rf.recent_lines().await;
        assert_eq!(recent.len(), 4);
        assert!(
            recent
                .iter()
                .all(|l| l.as_str() == "STATUS:LOCKED,FREQ=2400.0,POWER=10")
        );
    }

    // =======================================================================
    // Sweep
    // =======================================================================

    #[tokio::test]
    async fn sweep_scenario_sends_three_commands() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());
        rf.connect(None).await.unwrap();
        let mut state = rf.watch_sweep();

        rf.start_sweep(sweep(1_000_000_000.0, 1_000_030_000.0, 10_000.0, Duration::ZERO))
            .await
            .unwrap();
        let end = wait_for_state(&mut state, |s| s.is_terminal()).await;
        assert_eq!(end, SweepState::Completed);
        assert_eq!(rf.sweep_state(), SweepState::Completed);

        let handle = connector.last_opened().unwrap();
        assert_eq!(
            handle.sent_lines(),
            vec![
                "SETFREQ 1000000000",
                "SETFREQ 1000010000",
                "SETFREQ 1000020000",
            ]
        );
    }

    #[tokio::test]
    async fn sweep_rejects_empty_range() {
        let rf = controller(connector());
        rf.connect(None).await.unwrap();
        let err = rf
            .start_sweep(sweep(5.0, 5.0, 1.0, Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
        assert_eq!(rf.sweep_state(), SweepState::Idle);
        assert!(!rf.is_sweeping().await);
    }

    #[tokio::test]
    async fn sweep_rejects_wrong_direction() {
        let rf = controller(connector());
        rf.connect(None).await.unwrap();
        let err = rf
            .start_sweep(sweep(10.0, 20.0, -1.0, Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn sweep_requires_connection() {
        let rf = controller(connector());
        let err = rf
            .start_sweep(sweep(0.0, 10.0, 1.0, Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert_eq!(rf.sweep_state(), SweepState::Idle);
    }

    #[tokio::test]
    async fn stop_sweep_yields_stopped() {
        let rf = controller(connector());
        rf.connect(None).await.unwrap();
        let mut state = rf.watch_sweep();
        let mut events = rf.subscribe();

        rf.start_sweep(sweep(0.0, 1.0e9, 1.0, Duration::from_secs(3600)))
            .await
            .unwrap();
        wait_for_state(&mut state, |s| s.is_running()).await;

        tokio::time::timeout(WAIT, rf.stop_sweep())
            .await
            .expect("stop_sweep waited for the dwell");
        assert_eq!(rf.sweep_state(), SweepState::Stopped);
        assert!(!rf.is_sweeping().await);

        let mut stopped = None;
        while let Ok(event) = events.try_recv() {
            if let ControllerEvent::SweepStopped { last_hz } = event {
                stopped = Some(last_hz);
            }
        }
        assert_eq!(stopped, Some(Some(0.0)));
    }

    #[tokio::test]
    async fn running_state_follows_first_command() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());
        rf.connect(None).await.unwrap();
        let mut state = rf.watch_sweep();

        rf.start_sweep(sweep(100.0, 200.0, 10.0, Duration::from_secs(3600)))
            .await
            .unwrap();
        // Nothing has been commanded yet, so nothing is reported as held.
        assert_eq!(rf.sweep_state(), SweepState::Idle);

        let running = wait_for_state(&mut state, |s| s.is_running()).await;
        assert_eq!(running, SweepState::Running { current_hz: 100.0 });
        assert_eq!(connector.last_opened().unwrap().sent_lines(), vec!["SETFREQ 100"]);
        rf.stop_sweep().await;
        assert_eq!(rf.sweep_state(), SweepState::Stopped);
    }

    #[tokio::test]
    async fn restart_after_stop_is_accepted() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());
        rf.connect(None).await.unwrap();
        let mut state = rf.watch_sweep();

        rf.start_sweep(sweep(0.0, 1.0e6, 1.0, Duration::from_secs(3600)))
            .await
            .unwrap();
        wait_for_state(&mut state, |s| s.is_running()).await;
        rf.stop_sweep().await;
        state.borrow_and_update();

        rf.start_sweep(sweep(5.0, 7.0, 1.0, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(next_terminal(&mut state).await, SweepState::Completed);
        assert_eq!(
            connector.last_opened().unwrap().sent_lines(),
            vec!["SETFREQ 0", "SETFREQ 5", "SETFREQ 6"]
        );
    }

    #[tokio::test]
    async fn stop_sweep_when_idle_is_noop() {
        let rf = controller(connector());
        rf.stop_sweep().await;
        assert_eq!(rf.sweep_state(), SweepState::Idle);
    }

    #[tokio::test]
    async fn second_start_is_rejected_without_disturbing_first() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());
        rf.connect(None).await.unwrap();
        let mut state = rf.watch_sweep();

        rf.start_sweep(sweep(100.0, 200.0, 10.0, Duration::from_secs(3600)))
            .await
            .unwrap();
        wait_for_state(&mut state, |s| s.is_running()).await;

        let err = rf
            .start_sweep(sweep(0.0, 10.0, 1.0, Duration::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyRunning(Activity::Sweep)));
        assert_eq!(rf.sweep_state(), SweepState::Running { current_hz: 100.0 });
        assert!(rf.is_sweeping().await);

        rf.stop_sweep().await;
        assert_eq!(connector.last_opened().unwrap().sent_lines(), vec!["SETFREQ 100"]);
    }

    #[tokio::test]
    async fn sweep_restarts_after_completion() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());
        rf.connect(None).await.unwrap();
        let mut state = rf.watch_sweep();

        for _ in 0..3 {
            rf.start_sweep(sweep(0.0, 2.0, 1.0, Duration::ZERO))
                .await
                .unwrap();
            assert_eq!(next_terminal(&mut state).await, SweepState::Completed);
        }
        assert_eq!(connector.last_opened().unwrap().sent_lines().len(), 6);
    }

    #[tokio::test]
    async fn disconnect_stops_sweep_and_poller() {
        let rf = controller(connector());
        rf.connect(None).await.unwrap();
        let mut state = rf.watch_sweep();

        rf.start_polling(Duration::from_secs(3600)).await.unwrap();
        rf.start_sweep(sweep(0.0, 1.0e9, 1.0, Duration::from_secs(3600)))
            .await
            .unwrap();
        wait_for_state(&mut state, |s| s.is_running()).await;

        tokio::time::timeout(WAIT, rf.disconnect())
            .await
            .expect("disconnect waited for activities");
        assert_eq!(rf.sweep_state(), SweepState::Stopped);
        assert!(!rf.is_polling().await);
        assert!(!rf.is_connected().await);
    }

    #[tokio::test]
    async fn sweep_and_poller_share_the_channel() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());
        rf.connect(None).await.unwrap();
        let mut state = rf.watch_sweep();

        rf.start_polling(Duration::from_millis(1)).await.unwrap();
        rf.start_sweep(sweep(0.0, 50.0, 1.0, Duration::from_millis(1)))
            .await
            .unwrap();
        wait_for_state(&mut state, |s| s.is_terminal()).await;
        rf.stop_polling().await;

        // Every recorded write is a whole, well-formed command.
        let sent = connector.last_opened().unwrap().sent_lines();
        let sweeps = sent.iter().filter(|l| l.starts_with("SETFREQ ")).count();
        assert_eq!(sweeps, 50);
        assert!(
            sent.iter()
                .all(|l| l == "STATUS?" || l.starts_with("SETFREQ "))
        );
    }

    // =======================================================================
    // Ad-hoc I/O
    // =======================================================================

    #[tokio::test]
    async fn send_command_and_read_response() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());

        // Disconnected: silently ignored.
        rf.send_command("STATUS?").await.unwrap();
        assert_eq!(rf.read_response().await, None);
        assert!(rf.recent_lines().await.is_empty());

        rf.connect(None).await.unwrap();
        rf.send_command("STATUS?").await.unwrap();
        assert_eq!(
            rf.read_response().await,
            Some(ResponseLine::new("STATUS:LOCKED,FREQ=2400.0,POWER=10"))
        );
        assert_eq!(rf.read_response().await, None);
        assert_eq!(rf.recent_lines().await.len(), 1);
    }

    #[tokio::test]
    async fn send_command_reports_tx_failure() {
        let connector = Arc::new(connector());
        let rf = ControllerBuilder::new().build_with_connector(connector.clone());
        rf.connect(None).await.unwrap();
        connector
            .last_opened()
            .unwrap()
            .fail_writes(Some("write timed out"));

        let err = rf.send_command("STATUS?").await.unwrap_err();
        assert!(matches!(err, Error::TxFailed(_)));
        // Transient failures leave the session up.
        assert!(rf.is_connected().await);
    }

    #[test]
    fn device_alias_defaults() {
        let rf = controller(connector());
        assert_eq!(rf.device_alias(), "Generic RF Unit");
        assert_eq!(rf.sweep_state(), SweepState::Idle);
    }
}
