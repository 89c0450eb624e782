pub mod backoff;
pub mod fetch;

/// Long-lived polling session against one controller.
///
/// A single background task owns the transport, the backoff state and the
/// publishing ends of two `watch` channels. Consumers only ever hold the
/// receiving ends, so they see whole snapshots and never touch session state.
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::transport::Transport;

pub use backoff::Backoff;
pub use fetch::{fetch_payload_and_records, PollData, ReadPath};

/// Connection state as seen by consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    /// Last attempt failed; waiting before the next connect
    BackingOff,
    Stopped,
}

impl SessionStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, SessionStatus::Connected)
    }
}

/// What the session last published
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    /// Nothing read yet
    Waiting,
    /// Latest successful poll; kept while the link is down
    Ready(Arc<PollData>),
    /// The session was stopped on purpose
    Closed,
}

impl Snapshot {
    pub fn data(&self) -> Option<&PollData> {
        match self {
            Snapshot::Ready(data) => Some(data.as_ref()),
            Snapshot::Waiting | Snapshot::Closed => None,
        }
    }
}

/// Sleep for `total`, waking every `tick` to check for a stop request
///
/// Always waits at least one `tick`, so a zero interval still hands control
/// back to the runtime once per cycle. Returns `false` when the sleep was cut
/// short by `stop`.
pub async fn sleep_unless_stopped(stop: &CancellationToken, total: Duration, tick: Duration) -> bool {
    let deadline = Instant::now() + total.max(tick);
    loop {
        if stop.is_cancelled() {
            return false;
        }
        sleep(tick.min(deadline.saturating_duration_since(Instant::now()))).await;
        if Instant::now() >= deadline {
            return !stop.is_cancelled();
        }
    }
}

pub struct PollingSession<T> {
    transport: T,
    config: SessionConfig,
    backoff: Backoff,
    stop: CancellationToken,
    status_tx: watch::Sender<SessionStatus>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl<T> PollingSession<T>
where
    T: Transport + 'static,
{
    /// Validate `config` and start polling on a background task
    pub fn spawn(transport: T, config: SessionConfig) -> Result<SessionHandle> {
        config.validate()?;

        let stop = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(SessionStatus::Disconnected);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::Waiting);

        let session = PollingSession {
            transport,
            backoff: Backoff::new(config.backoff),
            config,
            stop: stop.clone(),
            status_tx,
            snapshot_tx,
        };
        let task = tokio::spawn(session.run());

        Ok(SessionHandle {
            status_rx,
            snapshot_rx,
            stop,
            task,
        })
    }

    async fn run(mut self) {
        let request = self.config.request;
        info!(
            "Polling DB{} @ {} size {} on {}:{} every {:?}",
            request.block_id,
            request.start,
            request.size,
            self.config.endpoint.address,
            self.config.endpoint.tcp_port,
            self.config.poll_interval
        );

        while !self.stop.is_cancelled() {
            if !self.transport.is_connected() {
                self.set_status(SessionStatus::Connecting);
                if let Err(e) = self.transport.connect(&self.config.endpoint).await {
                    warn!("Connection error: {}. Retrying...", e);
                    self.back_off().await;
                    continue;
                }
                self.backoff.reset();
                self.set_status(SessionStatus::Connected);
                info!(
                    "Connected to {}:{}",
                    self.config.endpoint.address, self.config.endpoint.tcp_port
                );
            }

            match fetch_payload_and_records(&mut self.transport, &request).await {
                Ok(data) => {
                    debug!(
                        "Read {} byte(s) from DB{} @ {}",
                        data.raw.len(),
                        request.block_id,
                        request.start
                    );
                    self.snapshot_tx.send_replace(Snapshot::Ready(Arc::new(data)));
                }
                Err(e) => {
                    // The last snapshot stays published; only the status changes
                    warn!("Read error: {}. Retrying...", e);
                    self.back_off().await;
                    continue;
                }
            }

            sleep_unless_stopped(&self.stop, self.config.poll_interval, self.config.stop_tick)
                .await;
        }

        self.transport.disconnect().await;
        self.snapshot_tx.send_replace(Snapshot::Closed);
        self.set_status(SessionStatus::Stopped);
        info!("Disconnected");
    }

    async fn back_off(&mut self) {
        self.transport.disconnect().await;
        self.set_status(SessionStatus::BackingOff);
        let delay = self.backoff.next_delay();
        debug!("Next connect attempt in {:?}", delay);
        sleep_unless_stopped(&self.stop, delay, self.config.stop_tick).await;
    }

    fn set_status(&self, status: SessionStatus) {
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

/// Consumer side of a running session
#[derive(Debug)]
pub struct SessionHandle {
    status_rx: watch::Receiver<SessionStatus>,
    snapshot_rx: watch::Receiver<Snapshot>,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    /// Copy of the latest published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    /// Token that stops the session when cancelled
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Request a stop and wait for the polling task to finish
    pub async fn stop(self) -> std::result::Result<(), JoinError> {
        self.stop.cancel();
        let result = self.task.await;
        if let Err(e) = &result {
            error!("Polling task ended abnormally: {}", e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{register, LEGACY_RECORD_BYTE_SIZE};
    use crate::config::{BackoffConfig, Endpoint, ReadRequest};
    use crate::models::{Record, RegisterBlock, REGISTER_CAPACITY};
    use crate::transport::SimulatedController;
    use tokio::time::timeout;

    const DB: u16 = 200;
    const WAIT: Duration = Duration::from_secs(5);

    fn fast_config(request: ReadRequest) -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_millis(20),
            backoff: BackoffConfig {
                floor: Duration::from_millis(10),
                ceiling: Duration::from_millis(50),
                factor: 2,
            },
            stop_tick: Duration::from_millis(5),
            ..SessionConfig::new(Endpoint::new("127.0.0.1"), request)
        }
    }

    fn controller_with_register() -> SimulatedController {
        let records = (0..REGISTER_CAPACITY)
            .map(|i| Record {
                id: i as u32,
                ..Record::default()
            })
            .collect();
        let controller = SimulatedController::new();
        controller.set_block(DB, register::encode(&RegisterBlock::new(records).unwrap()));
        controller
    }

    async fn wait_snapshot<F>(handle: &SessionHandle, pred: F) -> Snapshot
    where
        F: FnMut(&Snapshot) -> bool,
    {
        let mut rx = handle.subscribe_snapshots();
        let snapshot = timeout(WAIT, rx.wait_for(pred))
            .await
            .expect("timed out waiting for snapshot")
            .expect("session dropped its sender");
        snapshot.clone()
    }

    async fn wait_status(handle: &SessionHandle, status: SessionStatus) {
        let mut rx = handle.subscribe_status();
        timeout(WAIT, rx.wait_for(|s| *s == status))
            .await
            .expect("timed out waiting for status")
            .expect("session dropped its sender");
    }

    #[tokio::test]
    async fn publishes_register_and_clears_on_stop() {
        let controller = controller_with_register();
        let handle =
            PollingSession::spawn(controller.transport(), fast_config(ReadRequest::register(DB)))
                .unwrap();

        let snapshot = wait_snapshot(&handle, |s| matches!(s, Snapshot::Ready(_))).await;
        let data = snapshot.data().unwrap();
        assert_eq!(data.path, ReadPath::Register);
        assert_eq!(data.records.as_ref().unwrap().len(), REGISTER_CAPACITY);
        assert!(handle.status().is_online());

        let mut snapshots = handle.subscribe_snapshots();
        let mut status = handle.subscribe_status();
        handle.stop().await.unwrap();
        assert_eq!(*snapshots.borrow_and_update(), Snapshot::Closed);
        assert_eq!(*status.borrow_and_update(), SessionStatus::Stopped);
    }

    #[tokio::test]
    async fn general_path_publishes_legacy_records_and_raw_only_payloads() {
        let controller = SimulatedController::new();
        controller.set_block(DB, vec![0u8; 4 * LEGACY_RECORD_BYTE_SIZE]);

        let request = ReadRequest {
            block_id: DB,
            start: 0,
            size: 2 * LEGACY_RECORD_BYTE_SIZE as u32,
        };
        let handle = PollingSession::spawn(controller.transport(), fast_config(request)).unwrap();
        let snapshot = wait_snapshot(&handle, |s| matches!(s, Snapshot::Ready(_))).await;
        let data = snapshot.data().unwrap();
        assert_eq!(data.path, ReadPath::Range);
        assert_eq!(data.records.as_ref().unwrap().len(), 2);
        handle.stop().await.unwrap();

        let request = ReadRequest {
            block_id: DB,
            start: 0,
            size: 100,
        };
        let handle = PollingSession::spawn(controller.transport(), fast_config(request)).unwrap();
        let snapshot = wait_snapshot(&handle, |s| matches!(s, Snapshot::Ready(_))).await;
        let data = snapshot.data().unwrap();
        assert_eq!(data.raw.len(), 100);
        assert_eq!(data.records, None);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn lost_link_keeps_last_snapshot_and_reconnects() {
        let controller = controller_with_register();
        let handle =
            PollingSession::spawn(controller.transport(), fast_config(ReadRequest::register(DB)))
                .unwrap();
        let first = wait_snapshot(&handle, |s| matches!(s, Snapshot::Ready(_))).await;

        let mut status = handle.subscribe_status();
        controller.refuse_connects(3);
        controller.drop_link_on_next_read();
        timeout(WAIT, status.wait_for(|s| *s == SessionStatus::BackingOff))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.snapshot(), first);

        wait_status(&handle, SessionStatus::Connected).await;
        assert_eq!(controller.connect_count(), 2);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn refused_connects_back_off_until_success() {
        let controller = controller_with_register();
        controller.refuse_connects(3);
        let handle =
            PollingSession::spawn(controller.transport(), fast_config(ReadRequest::register(DB)))
                .unwrap();

        assert_eq!(handle.snapshot(), Snapshot::Waiting);
        wait_snapshot(&handle, |s| matches!(s, Snapshot::Ready(_))).await;
        assert_eq!(controller.connect_count(), 1);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn stop_interrupts_long_backoff() {
        let controller = SimulatedController::new();
        controller.refuse_connects(u32::MAX);
        let mut config = fast_config(ReadRequest::register(DB));
        config.backoff.floor = Duration::from_secs(60);
        config.backoff.ceiling = Duration::from_secs(60);
        let handle = PollingSession::spawn(controller.transport(), config).unwrap();

        wait_status(&handle, SessionStatus::BackingOff).await;
        timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("stop was not honoured during backoff")
            .unwrap();
    }

    #[tokio::test]
    async fn stop_interrupts_long_poll_interval() {
        let controller = controller_with_register();
        let mut config = fast_config(ReadRequest::register(DB));
        config.poll_interval = Duration::from_secs(60);
        let handle = PollingSession::spawn(controller.transport(), config).unwrap();

        wait_snapshot(&handle, |s| matches!(s, Snapshot::Ready(_))).await;
        timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("stop was not honoured during poll interval")
            .unwrap();
        assert_eq!(controller.read_count(), 1);
    }

    #[tokio::test]
    async fn zero_interval_still_yields_and_stops() {
        let controller = controller_with_register();
        let mut config = fast_config(ReadRequest::register(DB));
        config.poll_interval = Duration::ZERO;
        let handle = PollingSession::spawn(controller.transport(), config).unwrap();

        tokio::task::yield_now().await;
        wait_snapshot(&handle, |s| matches!(s, Snapshot::Ready(_))).await;
        timeout(Duration::from_secs(1), handle.stop())
            .await
            .expect("stop was not honoured with a zero interval")
            .unwrap();
    }

    #[tokio::test]
    async fn cancelling_stop_token_ends_session() {
        let controller = controller_with_register();
        let handle =
            PollingSession::spawn(controller.transport(), fast_config(ReadRequest::register(DB)))
                .unwrap();
        wait_snapshot(&handle, |s| matches!(s, Snapshot::Ready(_))).await;

        handle.stop_token().cancel();
        wait_status(&handle, SessionStatus::Stopped).await;
        assert_eq!(handle.snapshot(), Snapshot::Closed);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_spawning() {
        let controller = SimulatedController::new();
        let config = fast_config(ReadRequest::register(DB));
        let config = SessionConfig {
            endpoint: Endpoint::new(""),
            ..config
        };
        assert!(PollingSession::spawn(controller.transport(), config).is_err());
    }

    #[tokio::test]
    async fn sleep_reports_early_stop() {
        let stop = CancellationToken::new();
        assert!(sleep_unless_stopped(&stop, Duration::from_millis(10), Duration::from_millis(2)).await);

        // a zero sleep still waits one tick
        let started = std::time::Instant::now();
        assert!(sleep_unless_stopped(&stop, Duration::ZERO, Duration::from_millis(5)).await);
        assert!(started.elapsed() >= Duration::from_millis(5));

        stop.cancel();
        let started = std::time::Instant::now();
        assert!(!sleep_unless_stopped(&stop, Duration::from_secs(60), Duration::from_millis(2)).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
