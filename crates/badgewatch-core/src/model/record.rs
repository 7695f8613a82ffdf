// ── Registry record ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading::Reading;

/// One badge, keyed by its hardware address.
///
/// Created on the first accepted frame and updated in place afterwards.
/// `address` and `name` are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub address: String,
    pub name: String,
    pub last_reading: Reading,
    pub last_seen_at: DateTime<Utc>,
}

impl DeviceRecord {
    pub(crate) fn new(address: &str, name: &str, reading: Reading, seen_at: DateTime<Utc>) -> Self {
        Self {
            address: address.to_owned(),
            name: name.to_owned(),
            last_reading: reading,
            last_seen_at: seen_at,
        }
    }

    /// Apply a newer reading. The reading always wins (frames are applied in
    /// arrival order); the timestamp never moves backwards.
    pub(crate) fn touch(&mut self, reading: Reading, seen_at: DateTime<Utc>) {
        self.last_reading = reading;
        if seen_at > self.last_seen_at {
            self.last_seen_at = seen_at;
        }
    }
}
