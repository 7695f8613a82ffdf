// ── Ingestion ──
//
// Scanner frames enter through `IngestSink`. Push-style scanners call
// `submit`, which never blocks: it decodes inline and drops the reading
// when the bounded queue is full. Pull-style sources go through
// `submit_wait`, which waits for queue space instead, so a finite frame
// file is applied in full. A single apply task drains the queue into the
// registry, so writes are serialized.

mod driver;
pub mod source;
pub mod wire;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::decode::{FrameDecoder, Mismatch, adstruct};
use crate::model::Reading;

pub use driver::run_scanner;
pub(crate) use driver::apply_task;
pub use source::{LineSource, ScanSource, SourceSpec};
pub use wire::{WireError, WireFrame};

/// One observed advertisement, as delivered by the scanning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub address: String,
    pub name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: i16,
    pub manufacturer_data: BTreeMap<u16, Vec<u8>>,
}

impl Frame {
    /// Build a frame from raw advertising bytes.
    pub fn from_advertisement(address: impl Into<String>, rssi: i16, data: &[u8]) -> Self {
        let adv = adstruct::parse(data);
        Self {
            address: address.into(),
            name: adv.name,
            rssi,
            manufacturer_data: adv.manufacturer_data,
        }
    }
}

/// An accepted reading waiting for the registry writer.
#[derive(Debug)]
pub(crate) struct Update {
    pub address: String,
    pub name: String,
    pub reading: Reading,
    pub observed_at: DateTime<Utc>,
}

/// What happened to a submitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    /// Decoded and queued for the registry.
    Queued,
    /// Not a badge frame.
    Filtered(Mismatch),
    /// Decoded, but the queue was full. Only [`IngestSink::submit`] drops.
    Dropped,
    /// The registry writer has shut down.
    Closed,
}

// ── Statistics ───────────────────────────────────────────────────

/// Live ingestion counters, shared between the sink and its readers.
#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    accepted: AtomicU64,
    dropped: AtomicU64,
    malformed: AtomicU64,
    filtered_name: AtomicU64,
    filtered_manufacturer: AtomicU64,
    filtered_length: AtomicU64,
    filtered_app_id: AtomicU64,
}

/// Point-in-time copy of [`IngestStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestCounters {
    pub received: u64,
    pub accepted: u64,
    pub filtered: u64,
    pub dropped: u64,
    /// Source lines that did not parse as frames.
    pub malformed: u64,
    pub filtered_name: u64,
    pub filtered_manufacturer: u64,
    pub filtered_length: u64,
    pub filtered_app_id: u64,
}

impl IngestStats {
    pub fn counters(&self) -> IngestCounters {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let filtered_name = load(&self.filtered_name);
        let filtered_manufacturer = load(&self.filtered_manufacturer);
        let filtered_length = load(&self.filtered_length);
        let filtered_app_id = load(&self.filtered_app_id);

        IngestCounters {
            received: load(&self.received),
            accepted: load(&self.accepted),
            filtered: filtered_name + filtered_manufacturer + filtered_length + filtered_app_id,
            dropped: load(&self.dropped),
            malformed: load(&self.malformed),
            filtered_name,
            filtered_manufacturer,
            filtered_length,
            filtered_app_id,
        }
    }

    fn record_filtered(&self, reason: Mismatch) {
        let counter = match reason {
            Mismatch::NoName | Mismatch::NamePrefix => &self.filtered_name,
            Mismatch::NoManufacturerData => &self.filtered_manufacturer,
            Mismatch::TooShort { .. } => &self.filtered_length,
            Mismatch::AppId { .. } => &self.filtered_app_id,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ── IngestSink ───────────────────────────────────────────────────

/// Non-blocking entry point for scanner frames.
///
/// Cheap to clone; every clone feeds the same queue. Safe to call from a
/// scanner callback thread with no async runtime.
#[derive(Clone)]
pub struct IngestSink {
    decoder: Arc<FrameDecoder>,
    tx: mpsc::Sender<Update>,
    stats: Arc<IngestStats>,
}

impl IngestSink {
    pub(crate) fn new(
        decoder: Arc<FrameDecoder>,
        tx: mpsc::Sender<Update>,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self { decoder, tx, stats }
    }

    /// Decode `frame` and queue it for the registry. Never waits.
    pub fn submit(&self, frame: Frame) -> Submit {
        let update = match self.decode(frame) {
            Ok(update) => update,
            Err(reason) => return Submit::Filtered(reason),
        };

        match self.tx.try_send(update) {
            Ok(()) => self.queued(),
            Err(TrySendError::Full(update)) => {
                let dropped = self.stats.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 100 == 0 {
                    warn!(address = %update.address, dropped, "ingest queue full, dropping frames");
                } else {
                    debug!(address = %update.address, "ingest queue full, frame dropped");
                }
                Submit::Dropped
            }
            Err(TrySendError::Closed(update)) => {
                debug!(address = %update.address, "ingest queue closed, frame discarded");
                Submit::Closed
            }
        }
    }

    /// Decode `frame` and wait for queue space. Never drops.
    pub async fn submit_wait(&self, frame: Frame) -> Submit {
        let update = match self.decode(frame) {
            Ok(update) => update,
            Err(reason) => return Submit::Filtered(reason),
        };

        match self.tx.send(update).await {
            Ok(()) => self.queued(),
            Err(mpsc::error::SendError(update)) => {
                debug!(address = %update.address, "ingest queue closed, frame discarded");
                Submit::Closed
            }
        }
    }

    /// Count source lines that were skipped before they became frames.
    pub fn record_malformed(&self, lines: u64) {
        self.stats.malformed.fetch_add(lines, Ordering::Relaxed);
    }

    fn decode(&self, frame: Frame) -> Result<Update, Mismatch> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let Frame {
            address,
            name,
            rssi,
            manufacturer_data,
        } = frame;

        let payload = self
            .decoder
            .classify(name.as_deref(), &manufacturer_data)
            .inspect_err(|&reason| {
                self.stats.record_filtered(reason);
                debug!(%address, %reason, "frame filtered");
            })?;

        Ok(Update {
            address,
            name: name.unwrap_or_default(),
            reading: payload.with_rssi(rssi),
            observed_at: Utc::now(),
        })
    }

    fn queued(&self) -> Submit {
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        Submit::Queued
    }

    pub fn stats(&self) -> IngestCounters {
        self.stats.counters()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{PayloadLayout, ProtocolConfig};

    fn sink(capacity: usize) -> (IngestSink, mpsc::Receiver<Update>) {
        let decoder = FrameDecoder::new(ProtocolConfig {
            layout: PayloadLayout::A,
            ..ProtocolConfig::default()
        });
        let (tx, rx) = mpsc::channel(capacity);
        (
            IngestSink::new(Arc::new(decoder), tx, Arc::new(IngestStats::default())),
            rx,
        )
    }

    fn badge(address: &str, status: u8) -> Frame {
        Frame {
            address: address.into(),
            name: Some("BLE Badge 1".into()),
            rssi: -60,
            manufacturer_data: BTreeMap::from([(0xFFFF, vec![0x12, 0x34, 0x01, 0x00, status])]),
        }
    }

    #[test]
    fn accepted_frame_is_queued() {
        let (sink, mut rx) = sink(4);
        assert_eq!(sink.submit(badge("AA", 2)), Submit::Queued);

        let update = rx.try_recv().unwrap();
        assert_eq!(update.address, "AA");
        assert_eq!(update.name, "BLE Badge 1");
        assert_eq!(update.reading.rssi, -60);
        assert_eq!(sink.stats().accepted, 1);
    }

    #[test]
    fn foreign_frames_are_counted_by_reason() {
        let (sink, _rx) = sink(4);
        let mut no_name = badge("AA", 2);
        no_name.name = None;
        let mut short = badge("BB", 2);
        short.manufacturer_data.insert(0xFFFF, vec![0x12, 0x34, 0x02]);

        assert_eq!(sink.submit(no_name), Submit::Filtered(Mismatch::NoName));
        assert!(matches!(sink.submit(short), Submit::Filtered(Mismatch::TooShort { .. })));

        let stats = sink.stats();
        assert_eq!(stats.received, 2);
        assert_eq!(stats.filtered, 2);
        assert_eq!(stats.filtered_name, 1);
        assert_eq!(stats.filtered_length, 1);
        assert_eq!(stats.accepted, 0);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (sink, _rx) = sink(2);
        assert_eq!(sink.submit(badge("AA", 2)), Submit::Queued);
        assert_eq!(sink.submit(badge("BB", 2)), Submit::Queued);
        assert_eq!(sink.submit(badge("CC", 2)), Submit::Dropped);

        let stats = sink.stats();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn closed_queue_is_reported() {
        let (sink, rx) = sink(2);
        drop(rx);
        assert_eq!(sink.submit(badge("AA", 2)), Submit::Closed);
    }

    #[tokio::test]
    async fn waiting_submit_holds_the_frame_until_there_is_room() {
        let (sink, mut rx) = sink(1);
        assert_eq!(sink.submit_wait(badge("AA", 2)).await, Submit::Queued);

        let waiting = tokio::spawn({
            let sink = sink.clone();
            async move { sink.submit_wait(badge("BB", 2)).await }
        });
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        assert_eq!(rx.recv().await.unwrap().address, "AA");
        assert_eq!(waiting.await.unwrap(), Submit::Queued);
        assert_eq!(rx.recv().await.unwrap().address, "BB");

        let stats = sink.stats();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test]
    async fn waiting_submit_still_filters_and_reports_close() {
        let (sink, rx) = sink(1);
        let mut foreign = badge("AA", 2);
        foreign.name = Some("Headphones".into());
        assert_eq!(
            sink.submit_wait(foreign).await,
            Submit::Filtered(Mismatch::NamePrefix)
        );

        drop(rx);
        assert_eq!(sink.submit_wait(badge("BB", 2)).await, Submit::Closed);
    }

    #[test]
    fn malformed_lines_are_counted() {
        let (sink, _rx) = sink(1);
        sink.record_malformed(2);
        sink.record_malformed(1);
        assert_eq!(sink.stats().malformed, 3);
        assert_eq!(sink.stats().filtered, 0);
    }

    #[test]
    fn frame_from_raw_advertisement() {
        let mut adv = vec![0x0A, 0x09];
        adv.extend_from_slice(b"BLE Badge");
        adv.extend_from_slice(&[0x08, 0xFF, 0xFF, 0xFF, 0x12, 0x34, 0x05, 0x00, 0x01]);

        let frame = Frame::from_advertisement("AA", -48, &adv);
        assert_eq!(frame.name.as_deref(), Some("BLE Badge"));

        let (sink, mut rx) = sink(1);
        assert_eq!(sink.submit(frame), Submit::Queued);
        assert_eq!(rx.try_recv().unwrap().reading.device_id, 5);
    }
}
