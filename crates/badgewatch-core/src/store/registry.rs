// ── Device registry ──
//
// The one piece of shared mutable state. Every mutation and every bulk
// read goes through a single registry-wide lock, so a reader never sees
// a record mid-update. Change notification via a `watch` version counter.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{DeviceRecord, Reading};

/// Keyed store of badge records, one per hardware address.
///
/// Records are created on first touch and never removed; a badge that
/// goes quiet is reported offline by the liveness policy instead.
pub struct DeviceRegistry {
    records: Mutex<HashMap<String, DeviceRecord>>,
    /// Bumped after every upsert.
    version: watch::Sender<u64>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            records: Mutex::new(HashMap::new()),
            version,
        }
    }

    /// Insert or update the record for `address`. Returns `true` if the
    /// address was new.
    ///
    /// `name` is only used when the record is created.
    pub fn upsert(
        &self,
        address: &str,
        name: &str,
        reading: Reading,
        observed_at: DateTime<Utc>,
    ) -> bool {
        let is_new = {
            let mut records = self.lock();
            if let Some(record) = records.get_mut(address) {
                record.touch(reading, observed_at);
                false
            } else {
                records.insert(
                    address.to_owned(),
                    DeviceRecord::new(address, name, reading, observed_at),
                );
                true
            }
        };

        self.version.send_modify(|v| *v += 1);
        is_new
    }

    /// Point-in-time copy of every record, in no particular order.
    pub fn all_records(&self) -> Vec<DeviceRecord> {
        self.lock().values().cloned().collect()
    }

    /// Copy of the record for `address`, if one exists.
    pub fn get(&self, address: &str) -> Option<DeviceRecord> {
        self.lock().get(address).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Current version; changes whenever a record is written.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Subscribe to version bumps.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// A writer that panicked mid-upsert can at worst leave one record
    /// with a stale reading, so keep serving after poisoning.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, DeviceRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
