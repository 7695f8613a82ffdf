// ── Badge frame decoder ──
//
// Pure, allocation-free classification of one advertisement: either a
// decoded `Payload` or the reason it is not one of ours. Nothing here
// fails -- truncated or foreign frames are a `Mismatch`, not an error.

pub mod adstruct;

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{PayloadLayout, ProtocolConfig};
use crate::model::{Payload, PostureCode, StatusCode};

/// Why a frame was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// The advertisement carried no local name.
    NoName,
    /// The local name does not start with the configured prefix.
    NamePrefix,
    /// No manufacturer data under the configured company id.
    NoManufacturerData,
    /// Payload shorter than the active layout needs.
    TooShort { len: usize, min: usize },
    /// Payload belongs to another application.
    AppId { found: u16 },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoName => f.write_str("no local name"),
            Self::NamePrefix => f.write_str("name prefix mismatch"),
            Self::NoManufacturerData => f.write_str("manufacturer id absent"),
            Self::TooShort { len, min } => write!(f, "payload too short ({len} < {min} bytes)"),
            Self::AppId { found } => write!(f, "app id mismatch (0x{found:04X})"),
        }
    }
}

/// Decodes badge frames according to a [`ProtocolConfig`].
///
/// Stateless; share one behind an `Arc` or clone it freely.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    protocol: ProtocolConfig,
}

impl FrameDecoder {
    pub fn new(protocol: ProtocolConfig) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    /// Decode a frame, discarding the mismatch reason.
    pub fn decode(
        &self,
        name: Option<&str>,
        manufacturer_data: &BTreeMap<u16, Vec<u8>>,
    ) -> Option<Payload> {
        self.classify(name, manufacturer_data).ok()
    }

    /// Decode a frame, reporting why it was rejected.
    pub fn classify(
        &self,
        name: Option<&str>,
        manufacturer_data: &BTreeMap<u16, Vec<u8>>,
    ) -> Result<Payload, Mismatch> {
        let name = name.ok_or(Mismatch::NoName)?;
        if !name.starts_with(&self.protocol.name_prefix) {
            return Err(Mismatch::NamePrefix);
        }

        let data = manufacturer_data
            .get(&self.protocol.manufacturer_id)
            .ok_or(Mismatch::NoManufacturerData)?;

        self.decode_payload(data)
    }

    /// Decode the manufacturer payload alone (no name or company-id checks).
    pub fn decode_payload(&self, data: &[u8]) -> Result<Payload, Mismatch> {
        let layout = self.protocol.layout;
        let min = layout.min_len();
        let too_short = Mismatch::TooShort {
            len: data.len(),
            min,
        };
        if data.len() < min {
            return Err(too_short);
        }

        let app_id = le_u16(data, 0).ok_or(too_short)?;
        if app_id != self.protocol.app_id {
            return Err(Mismatch::AppId { found: app_id });
        }

        let mut payload = match layout {
            PayloadLayout::A => Payload {
                device_id: le_u16(data, 2).map(u32::from).ok_or(too_short)?,
                status: data.get(4).copied().map(StatusCode).ok_or(too_short)?,
                posture: None,
                flags: None,
            },
            PayloadLayout::B => Payload {
                device_id: le_u32(data, 2).ok_or(too_short)?,
                status: data.get(6).copied().map(StatusCode).ok_or(too_short)?,
                posture: data.get(7).copied().map(PostureCode),
                flags: None,
            },
        };

        // Flags are optional: a short payload simply has none.
        if let Some(offset) = self.protocol.flags_offset {
            payload.flags = data.get(offset).copied();
        }

        Ok(payload)
    }
}

fn le_u16(data: &[u8], at: usize) -> Option<u16> {
    let bytes = data.get(at..at + 2)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

fn le_u32(data: &[u8], at: usize) -> Option<u32> {
    let bytes = data.get(at..at + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}
