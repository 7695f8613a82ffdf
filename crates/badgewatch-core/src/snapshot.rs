// ── Snapshot builder ──
//
// Turns a point-in-time copy of the registry into the ordered views every
// presentation layer renders. Ordering is by (name, address) so the list
// stays put between polls.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::liveness::{self, round_tenths};
use crate::model::{DeviceRecord, DeviceView};

/// Build views for `records` as of `now`, sorted by name then address.
pub fn build(records: Vec<DeviceRecord>, now: DateTime<Utc>, timeout: Duration) -> Vec<DeviceView> {
    let mut views: Vec<DeviceView> = records
        .into_iter()
        .map(|rec| to_view(rec, now, timeout))
        .collect();
    views.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.address.cmp(&b.address)));
    views
}

fn to_view(rec: DeviceRecord, now: DateTime<Utc>, timeout: Duration) -> DeviceView {
    let live = liveness::evaluate(Some(rec.last_seen_at), now, timeout);
    let reading = rec.last_reading;

    DeviceView {
        address: rec.address,
        name: rec.name,
        device_id: reading.device_id,
        status: reading.status.0,
        status_label: reading.status.label(),
        posture: reading.posture.map(|p| p.0),
        posture_label: reading.posture.map(|p| p.label()),
        flags: reading.flags,
        rssi: reading.rssi,
        signal: reading.signal(),
        last_seen_at: rec.last_seen_at,
        age: round_tenths(live.age_secs),
        online: live.online,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{PostureCode, Reading, SignalBand, StatusCode};

    const TIMEOUT: Duration = Duration::from_secs(15);

    fn record(name: &str, address: &str, seen_at: DateTime<Utc>) -> DeviceRecord {
        DeviceRecord::new(
            address,
            name,
            Reading {
                device_id: 1,
                status: StatusCode(2),
                posture: Some(PostureCode(1)),
                flags: None,
                rssi: -52,
            },
            seen_at,
        )
    }

    fn order(views: &[DeviceView]) -> Vec<(&str, &str)> {
        views
            .iter()
            .map(|v| (v.name.as_str(), v.address.as_str()))
            .collect()
    }

    #[test]
    fn sorted_by_name_then_address() {
        let now = Utc::now();
        let views = build(
            vec![record("B", "2", now), record("A", "1", now)],
            now,
            TIMEOUT,
        );
        assert_eq!(order(&views), vec![("A", "1"), ("B", "2")]);
    }

    #[test]
    fn equal_names_fall_back_to_address() {
        let now = Utc::now();
        let views = build(
            vec![
                record("BLE Badge", "CC", now),
                record("BLE Badge", "AA", now),
                record("BLE Badge", "BB", now),
            ],
            now,
            TIMEOUT,
        );
        assert_eq!(
            order(&views),
            vec![("BLE Badge", "AA"), ("BLE Badge", "BB"), ("BLE Badge", "CC")]
        );
    }

    #[test]
    fn empty_registry_gives_empty_snapshot() {
        assert!(build(Vec::new(), Utc::now(), TIMEOUT).is_empty());
    }

    #[test]
    fn derived_fields() {
        let now = Utc::now();
        let views = build(
            vec![
                record("fresh", "1", now - TimeDelta::milliseconds(1_240)),
                record("stale", "2", now - TimeDelta::seconds(20)),
                record("edge", "3", now - TimeDelta::seconds(15)),
            ],
            now,
            TIMEOUT,
        );

        let edge = &views[0];
        assert!(!edge.online);

        let fresh = &views[1];
        assert!(fresh.online);
        assert!((fresh.age - 1.2).abs() < 1e-9);
        assert_eq!(fresh.status_label, "HEARTBEAT");
        assert_eq!(fresh.posture_label.as_deref(), Some("FALLEN"));
        assert_eq!(fresh.signal, SignalBand::Strong);

        let stale = &views[2];
        assert!(!stale.online);
        assert!((stale.age - 20.0).abs() < 1e-9);
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let now = Utc::now();
        let records = vec![record("B", "2", now), record("A", "1", now), record("A", "0", now)];
        let first = build(records.clone(), now, TIMEOUT);
        let mut reversed = records;
        reversed.reverse();
        assert_eq!(first, build(reversed, now, TIMEOUT));
    }

    #[test]
    fn view_serializes_without_absent_fields() {
        let now = Utc::now();
        let mut rec = record("A", "1", now);
        rec.last_reading.posture = None;
        let json = serde_json::to_value(&build(vec![rec], now, TIMEOUT)[0]).unwrap();

        assert_eq!(json["status_label"], "HEARTBEAT");
        assert_eq!(json["signal"], "strong");
        assert!(json.get("posture").is_none());
        assert!(json.get("flags").is_none());
    }
}
