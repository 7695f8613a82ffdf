// ── Presentation view of a badge ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reading::SignalBand;

/// A record plus its derived liveness, as handed to the terminal and web views.
///
/// Labels are resolved here so every consumer renders the same text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceView {
    pub address: String,
    pub name: String,
    pub device_id: u32,
    /// Raw status/event byte.
    pub status: u8,
    /// `HEARTBEAT`, `BOOT`, ... or `0xNN` for unknown codes.
    pub status_label: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub posture: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub posture_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub flags: Option<u8>,
    pub rssi: i16,
    pub signal: SignalBand,
    pub last_seen_at: DateTime<Utc>,
    /// Seconds since the last accepted frame, rounded to one decimal.
    pub age: f64,
    pub online: bool,
}
