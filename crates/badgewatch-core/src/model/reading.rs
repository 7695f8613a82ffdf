// ── Decoded badge payload types ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Known status/event codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display)]
#[repr(u8)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    None = 0x00,
    Boot = 0x01,
    Heartbeat = 0x02,
    Interrupt = 0x03,
}

/// Known posture codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr, strum::Display)]
#[repr(u8)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PostureKind {
    None = 0x00,
    Fallen = 0x01,
}

/// Raw status/event byte. Unknown codes are kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u8);

impl StatusCode {
    pub fn kind(self) -> Option<EventKind> {
        EventKind::from_repr(self.0)
    }

    /// Symbolic label, or `0xNN` for codes we do not know.
    pub fn label(self) -> String {
        self.kind()
            .map_or_else(|| format!("0x{:02X}", self.0), |k| k.to_string())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Raw posture byte (layout B only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostureCode(pub u8);

impl PostureCode {
    pub fn kind(self) -> Option<PostureKind> {
        PostureKind::from_repr(self.0)
    }

    pub fn label(self) -> String {
        self.kind()
            .map_or_else(|| format!("0x{:02X}", self.0), |k| k.to_string())
    }
}

impl fmt::Display for PostureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Qualitative signal strength.
///
/// | Band     | RSSI            |
/// |----------|-----------------|
/// | `strong` | >= -55 dBm      |
/// | `medium` | -69 to -56 dBm  |
/// | `weak`   | <= -70 dBm      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SignalBand {
    Strong,
    Medium,
    Weak,
}

impl SignalBand {
    pub fn from_rssi(rssi: i16) -> Self {
        if rssi >= -55 {
            Self::Strong
        } else if rssi > -70 {
            Self::Medium
        } else {
            Self::Weak
        }
    }
}

/// Fields decoded from the vendor payload, before the radio adds RSSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub device_id: u32,
    pub status: StatusCode,
    pub posture: Option<PostureCode>,
    pub flags: Option<u8>,
}

impl Payload {
    pub fn with_rssi(self, rssi: i16) -> Reading {
        Reading {
            device_id: self.device_id,
            status: self.status,
            posture: self.posture,
            flags: self.flags,
            rssi,
        }
    }
}

/// The most recent accepted reading for a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub device_id: u32,
    pub status: StatusCode,
    pub posture: Option<PostureCode>,
    pub flags: Option<u8>,
    /// Received signal strength in dBm.
    pub rssi: i16,
}

impl Reading {
    pub fn signal(&self) -> SignalBand {
        SignalBand::from_rssi(self.rssi)
    }
}
