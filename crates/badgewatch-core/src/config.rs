// ── Runtime monitor configuration ──
//
// These types describe *what* the monitor accepts and how long a badge
// stays online. They never touch disk: the CLI/TUI build a
// `MonitorConfig` (usually through `badgewatch-config`) and hand it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Company identifier the badges advertise under (0xFFFF, reserved for testing).
pub const DEFAULT_MANUFACTURER_ID: u16 = 0xFFFF;
/// Application identifier carried in the first two payload bytes.
pub const DEFAULT_APP_ID: u16 = 0x3412;
/// Local-name prefix every badge advertises.
pub const DEFAULT_NAME_PREFIX: &str = "BLE Badge";
/// Seconds of silence after which a badge is reported offline.
pub const DEFAULT_OFFLINE_TIMEOUT: Duration = Duration::from_secs(15);
/// Capacity of the bounded queue between the scan callback and the registry writer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Byte layout of the vendor payload.
///
/// Both layouts have been seen on deployed badges and neither can be
/// told apart by length alone, so the active one is always configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PayloadLayout {
    /// `[0..1]` app id, `[2..3]` device id (u16), `[4]` status.
    A,
    /// `[0..1]` app id, `[2..5]` device id (u32), `[6]` event, `[7]` posture.
    #[default]
    B,
}

impl PayloadLayout {
    /// Minimum payload length, in bytes, this layout can be decoded from.
    pub const fn min_len(self) -> usize {
        match self {
            Self::A => 5,
            Self::B => 8,
        }
    }

    /// Whether the layout carries a posture byte.
    pub const fn has_posture(self) -> bool {
        matches!(self, Self::B)
    }
}

/// Filter and layout settings for the frame decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Exact, case-sensitive prefix of the advertised local name.
    pub name_prefix: String,
    /// Company identifier keying the manufacturer data.
    pub manufacturer_id: u16,
    /// Application identifier expected in payload bytes `[0..1]`.
    pub app_id: u16,
    /// Active payload layout.
    pub layout: PayloadLayout,
    /// Offset of an optional flags byte. Must lie past the layout's fixed
    /// fields; `None` means the payload carries no flags.
    pub flags_offset: Option<usize>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            name_prefix: DEFAULT_NAME_PREFIX.into(),
            manufacturer_id: DEFAULT_MANUFACTURER_ID,
            app_id: DEFAULT_APP_ID,
            layout: PayloadLayout::default(),
            flags_offset: None,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(offset) = self.flags_offset {
            let min = self.layout.min_len();
            if offset < min {
                return Err(CoreError::config(format!(
                    "flags_offset {offset} overlaps the fixed fields of layout {} (bytes 0..{min})",
                    self.layout
                )));
            }
        }
        Ok(())
    }
}

/// Everything a [`Monitor`](crate::Monitor) needs at construction.
///
/// Built by CLI/TUI, passed to `Monitor` -- core never reads config files.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub protocol: ProtocolConfig,
    /// Staleness timeout; `age == offline_timeout` is already offline.
    pub offline_timeout: Duration,
    /// Bounded ingestion queue size. Frames arriving while it is full are dropped.
    pub queue_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            offline_timeout: DEFAULT_OFFLINE_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.protocol.validate()?;
        if self.offline_timeout.is_zero() {
            return Err(CoreError::config("offline timeout must be greater than zero"));
        }
        if self.queue_capacity == 0 {
            return Err(CoreError::config("queue capacity must be greater than zero"));
        }
        Ok(())
    }
}
