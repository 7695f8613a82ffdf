#![allow(clippy::unwrap_used)]
// Integration tests for the ingestion pipeline: source -> sink -> registry -> snapshot.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;

use badgewatch_core::{
    CoreError, Frame, LineSource, Monitor, MonitorConfig, PayloadLayout, ProtocolConfig,
    ScanSource,
};

// ── Helpers ─────────────────────────────────────────────────────────

enum Ending {
    Exhausted,
    Fail,
    Panic,
}

/// In-memory scanner that records whether it was stopped.
struct ScriptedSource {
    frames: VecDeque<Frame>,
    ending: Ending,
    started: bool,
    stopped: Arc<AtomicBool>,
}

impl ScriptedSource {
    fn new(frames: Vec<Frame>, ending: Ending) -> (Self, Arc<AtomicBool>) {
        let stopped = Arc::new(AtomicBool::new(false));
        (
            Self {
                frames: frames.into(),
                ending,
                started: false,
                stopped: Arc::clone(&stopped),
            },
            stopped,
        )
    }
}

impl ScanSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn start(&mut self) -> Result<(), CoreError> {
        self.started = true;
        Ok(())
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, CoreError> {
        assert!(self.started);
        if let Some(frame) = self.frames.pop_front() {
            return Ok(Some(frame));
        }
        match self.ending {
            Ending::Exhausted => Ok(None),
            Ending::Fail => Err(CoreError::Scanner {
                source_name: "scripted".into(),
                reason: "adapter powered off".into(),
            }),
            Ending::Panic => panic!("scanner callback blew up"),
        }
    }

    async fn stop(&mut self) -> Result<(), CoreError> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn layout_b() -> MonitorConfig {
    MonitorConfig {
        protocol: ProtocolConfig {
            layout: PayloadLayout::B,
            ..ProtocolConfig::default()
        },
        ..MonitorConfig::default()
    }
}

fn badge(address: &str, name: &str, event: u8, posture: u8) -> Frame {
    Frame {
        address: address.into(),
        name: Some(name.into()),
        rssi: -64,
        manufacturer_data: BTreeMap::from([(
            0xFFFF,
            vec![0x12, 0x34, 0x2A, 0x00, 0x00, 0x00, event, posture],
        )]),
    }
}

async fn run_to_end(monitor: &Monitor, source: ScriptedSource) -> Result<(), CoreError> {
    monitor.start().await;
    let result = monitor.run_scanner(source).await;
    monitor.shutdown().await;
    result
}

// ── Pipeline tests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_frames_end_up_in_snapshot_sorted() {
    let monitor = Monitor::new(layout_b()).unwrap();
    let (source, stopped) = ScriptedSource::new(
        vec![
            badge("22:22", "BLE Badge B", 2, 0),
            badge("11:11", "BLE Badge A", 3, 1),
            badge("00:00", "Headphones", 2, 0),
        ],
        Ending::Exhausted,
    );

    run_to_end(&monitor, source).await.unwrap();
    assert!(stopped.load(Ordering::SeqCst));

    let snap = monitor.snapshot();
    let order: Vec<_> = snap.iter().map(|v| v.address.as_str()).collect();
    assert_eq!(order, vec!["11:11", "22:22"]);
    assert_eq!(snap[0].status_label, "INTERRUPT");
    assert_eq!(snap[0].posture_label.as_deref(), Some("FALLEN"));
    assert_eq!(snap[0].device_id, 42);

    let stats = monitor.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.filtered_name, 1);
}

#[tokio::test]
async fn test_repeated_frames_update_one_record() {
    let monitor = Monitor::new(layout_b()).unwrap();
    let (source, _) = ScriptedSource::new(
        vec![
            badge("AA", "BLE Badge", 1, 0),
            badge("AA", "BLE Badge", 2, 0),
            badge("AA", "BLE Badge", 3, 1),
        ],
        Ending::Exhausted,
    );

    run_to_end(&monitor, source).await.unwrap();

    let snap = monitor.snapshot();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].status_label, "INTERRUPT");
}

#[tokio::test]
async fn test_scanner_failure_stops_source_and_propagates() {
    let monitor = Monitor::new(layout_b()).unwrap();
    let (source, stopped) =
        ScriptedSource::new(vec![badge("AA", "BLE Badge", 2, 0)], Ending::Fail);

    let err = run_to_end(&monitor, source).await.unwrap_err();
    assert!(matches!(err, CoreError::Scanner { .. }));
    assert!(stopped.load(Ordering::SeqCst));

    // Frames accepted before the failure are kept.
    assert_eq!(monitor.snapshot().len(), 1);
}

#[tokio::test]
async fn test_scanner_panic_still_stops_source() {
    let monitor = Monitor::new(layout_b()).unwrap();
    monitor.start().await;
    let (source, stopped) = ScriptedSource::new(Vec::new(), Ending::Panic);

    let joined = monitor.spawn_scanner(source).await;
    assert!(joined.unwrap_err().is_panic());
    assert!(stopped.load(Ordering::SeqCst));

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_cancels_a_live_scanner() {
    let monitor = Monitor::new(layout_b()).unwrap();
    monitor.start().await;

    // A duplex pipe whose writer stays open never reaches EOF.
    let (_writer, reader) = tokio::io::duplex(64);
    let handle = monitor.spawn_scanner(LineSource::from_reader("pipe", reader));

    tokio::time::sleep(Duration::from_millis(20)).await;
    monitor.shutdown().await;

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_line_source_feeds_layout_a() {
    let config = MonitorConfig {
        protocol: ProtocolConfig {
            layout: PayloadLayout::A,
            ..ProtocolConfig::default()
        },
        ..MonitorConfig::default()
    };
    let monitor = Monitor::new(config).unwrap();
    monitor.start().await;

    let input = concat!(
        r#"{"address":"E4:01","name":"BLE Badge 01","rssi":-50,"manufacturer_data":{"65535":"1234070002"}}"#,
        "\n",
        r#"{"address":"E4:02","name":"BLE Badge 02","rssi":-75,"manufacturer_data":{"65535":"3412070002"}}"#,
        "\n",
        r#"{"address":"E4:03","name":"BLE Badge 03","rssi":-60,"manufacturer_data":{"65535":"123407"}}"#,
        "\n",
    );
    monitor
        .run_scanner(LineSource::from_reader("lines", input.as_bytes()))
        .await
        .unwrap();
    monitor.shutdown().await;

    let snap = monitor.snapshot();
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].address, "E4:01");
    assert_eq!(snap[0].status_label, "HEARTBEAT");
    assert_eq!(snap[0].device_id, 7);

    let stats = monitor.stats();
    assert_eq!(stats.filtered_app_id, 1);
    assert_eq!(stats.filtered_length, 1);
}

#[tokio::test]
async fn test_finite_source_larger_than_queue_is_applied_in_full() {
    let config = MonitorConfig {
        queue_capacity: 4,
        ..layout_b()
    };
    let monitor = Monitor::new(config).unwrap();
    monitor.start().await;

    let mut input = String::new();
    for i in 0..1000 {
        input.push_str(&format!(
            r#"{{"address":"E4:{i:04}","name":"BLE Badge {i}","rssi":-60,"manufacturer_data":{{"65535":"1234{:02X}0000000200"}}}}"#,
            i % 256
        ));
        input.push('\n');
    }
    input.push_str("not a frame\n");
    // The last word for an address wins, even at the tail of the file.
    input.push_str(
        r#"{"address":"E4:0999","name":"BLE Badge 999","rssi":-60,"manufacturer_data":{"65535":"1234E70300000301"}}"#,
    );
    input.push('\n');

    monitor
        .run_scanner(LineSource::from_reader("frames.jsonl", std::io::Cursor::new(input.into_bytes())))
        .await
        .unwrap();
    monitor.shutdown().await;

    let stats = monitor.stats();
    assert_eq!(stats.received, 1001);
    assert_eq!(stats.accepted, 1001);
    assert_eq!(stats.dropped, 0);
    assert_eq!(stats.malformed, 1);

    let snap = monitor.snapshot();
    assert_eq!(snap.len(), 1000);
    let last = snap.iter().find(|v| v.address == "E4:0999").unwrap();
    assert_eq!(last.device_id, 999);
    assert_eq!(last.status_label, "INTERRUPT");
    assert_eq!(last.posture_label.as_deref(), Some("FALLEN"));
}

#[tokio::test]
async fn test_snapshot_goes_offline_after_timeout() {
    let monitor = Monitor::new(layout_b()).unwrap();
    let (source, _) = ScriptedSource::new(vec![badge("AA", "BLE Badge", 2, 0)], Ending::Exhausted);
    run_to_end(&monitor, source).await.unwrap();

    let seen = monitor.all_records()[0].last_seen_at;
    let later = monitor.snapshot_at(seen + chrono::TimeDelta::seconds(20));
    assert!(!later[0].online);
    assert!((later[0].age - 20.0).abs() < 1e-9);

    let edge = monitor.snapshot_at(seen + chrono::TimeDelta::seconds(15));
    assert!(!edge[0].online);

    assert!(monitor.snapshot_at(Utc::now()).first().is_some_and(|v| v.online));
}
