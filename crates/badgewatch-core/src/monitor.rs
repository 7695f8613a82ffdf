// ── Monitor facade ──
//
// Owns the registry, the ingestion queue, and the background tasks that
// connect them. Presentation layers only ever talk to a `Monitor`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::decode::FrameDecoder;
use crate::error::CoreError;
use crate::ingest::{self, IngestCounters, IngestSink, IngestStats, ScanSource, Update};
use crate::model::{DeviceRecord, DeviceView, Reading};
use crate::snapshot;
use crate::store::DeviceRegistry;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Construct once at startup,
/// call [`start()`](Self::start), attach one or more scanners, and read
/// snapshots from anywhere.
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    registry: Arc<DeviceRegistry>,
    sink: IngestSink,
    stats: Arc<IngestStats>,
    cancel: CancellationToken,
    /// Taken by the apply task on `start()`.
    update_rx: Mutex<Option<mpsc::Receiver<Update>>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    /// Validate `config` and build an idle monitor. Nothing runs until
    /// [`start()`](Self::start).
    pub fn new(config: MonitorConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let registry = Arc::new(DeviceRegistry::new());
        let stats = Arc::new(IngestStats::default());
        let decoder = Arc::new(FrameDecoder::new(config.protocol.clone()));
        let (update_tx, update_rx) = mpsc::channel(config.queue_capacity);
        let sink = IngestSink::new(decoder, update_tx, Arc::clone(&stats));

        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                registry,
                sink,
                stats,
                cancel: CancellationToken::new(),
                update_rx: Mutex::new(Some(update_rx)),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    /// Non-blocking frame entry point, for scanners that push.
    pub fn sink(&self) -> IngestSink {
        self.inner.sink.clone()
    }

    pub fn stats(&self) -> IngestCounters {
        self.inner.stats.counters()
    }

    /// Token cancelled by [`shutdown()`](Self::shutdown).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the registry writer. Calling it again is a no-op.
    pub async fn start(&self) {
        let Some(rx) = self.inner.update_rx.lock().await.take() else {
            debug!("monitor already started");
            return;
        };

        let registry = Arc::clone(&self.inner.registry);
        let cancel = self.inner.cancel.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(ingest::apply_task(registry, rx, cancel)));
        info!(
            layout = %self.inner.config.protocol.layout,
            queue = self.inner.config.queue_capacity,
            "monitor started"
        );
    }

    /// Run `source` on a background task until it ends, fails, or the
    /// monitor shuts down.
    pub fn spawn_scanner<S>(&self, source: S) -> JoinHandle<Result<(), CoreError>>
    where
        S: ScanSource + 'static,
    {
        tokio::spawn(ingest::run_scanner(
            source,
            self.sink(),
            self.inner.cancel.child_token(),
        ))
    }

    /// Run `source` on the current task.
    pub async fn run_scanner<S: ScanSource>(&self, source: S) -> Result<(), CoreError> {
        ingest::run_scanner(source, self.sink(), self.inner.cancel.child_token()).await
    }

    /// Cancel scanners, apply everything already queued, and join the
    /// background tasks.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "monitor task ended abnormally");
            }
        }
        debug!(devices = self.inner.registry.len(), "monitor shut down");
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Point-in-time copy of every record.
    pub fn all_records(&self) -> Vec<DeviceRecord> {
        self.inner.registry.all_records()
    }

    /// View of one badge, as of now.
    pub fn device(&self, address: &str) -> Option<DeviceView> {
        let record = self.inner.registry.get(address)?;
        snapshot::build(vec![record], Utc::now(), self.inner.config.offline_timeout).pop()
    }

    /// Ordered views of every badge, as of now.
    pub fn snapshot(&self) -> Vec<DeviceView> {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Vec<DeviceView> {
        snapshot::build(self.all_records(), now, self.inner.config.offline_timeout)
    }

    /// Subscribe to registry version bumps.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.registry.subscribe()
    }

    /// Apply a reading directly, bypassing the decoder and the queue.
    pub fn record(
        &self,
        address: &str,
        name: &str,
        reading: Reading,
        observed_at: DateTime<Utc>,
    ) -> bool {
        self.inner.registry.upsert(address, name, reading, observed_at)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::{PayloadLayout, ProtocolConfig};
    use crate::ingest::{Frame, Submit};
    use crate::model::StatusCode;

    fn config() -> MonitorConfig {
        MonitorConfig {
            protocol: ProtocolConfig {
                layout: PayloadLayout::A,
                ..ProtocolConfig::default()
            },
            ..MonitorConfig::default()
        }
    }

    fn frame(address: &str, name: &str) -> Frame {
        Frame {
            address: address.into(),
            name: Some(name.into()),
            rssi: -58,
            manufacturer_data: BTreeMap::from([(0xFFFF, vec![0x12, 0x34, 0x01, 0x00, 0x02])]),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = MonitorConfig {
            queue_capacity: 0,
            ..config()
        };
        assert!(matches!(Monitor::new(bad), Err(CoreError::Config { .. })));
    }

    #[tokio::test]
    async fn submitted_frames_reach_the_snapshot() {
        let monitor = Monitor::new(config()).unwrap();
        monitor.start().await;
        let mut changes = monitor.subscribe();

        assert_eq!(monitor.sink().submit(frame("AA", "BLE Badge 1")), Submit::Queued);
        changes.changed().await.unwrap();

        let snap = monitor.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].address, "AA");
        assert_eq!(snap[0].status_label, "HEARTBEAT");
        assert!(snap[0].online);

        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_applies_queued_frames() {
        let monitor = Monitor::new(config()).unwrap();
        let sink = monitor.sink();
        sink.submit(frame("AA", "BLE Badge 1"));
        sink.submit(frame("BB", "BLE Badge 2"));

        monitor.start().await;
        monitor.shutdown().await;

        assert_eq!(monitor.all_records().len(), 2);
        assert_eq!(sink.submit(frame("CC", "BLE Badge 3")), Submit::Closed);
    }

    #[tokio::test]
    async fn start_twice_is_harmless() {
        let monitor = Monitor::new(config()).unwrap();
        monitor.start().await;
        monitor.start().await;
        monitor.shutdown().await;
    }

    #[test]
    fn direct_record_then_snapshot() {
        let monitor = Monitor::new(config()).unwrap();
        let now = Utc::now();
        let reading = Reading {
            device_id: 3,
            status: StatusCode(1),
            posture: None,
            flags: None,
            rssi: -80,
        };
        assert!(monitor.record("AA", "BLE Badge", reading, now));

        let snap = monitor.snapshot_at(now);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].status_label, "BOOT");
        assert!((snap[0].age).abs() < f64::EPSILON);

        let one = monitor.device("AA").unwrap();
        assert_eq!(one.device_id, 3);
        assert!(one.online);
        assert!(monitor.device("BB").is_none());
    }
}
