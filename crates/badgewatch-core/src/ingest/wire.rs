// ── Scanner wire format ──
//
// One JSON object per line. Manufacturer data arrives either pre-split
// (`manufacturer_data`, company id -> hex) or as raw advertising bytes
// (`adv`, hex). When both are present the explicit map wins per id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Frame;
use crate::decode::adstruct;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid hex in {field}: {source}")]
    Hex {
        field: String,
        source: hex::FromHexError,
    },
}

/// A frame as written by the scanning service.
///
/// ```json
/// {"address":"E4:C6:3D:01:02:03","name":"BLE Badge 01","rssi":-61,
///  "manufacturer_data":{"65535":"1234800100000201"}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFrame {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub rssi: i16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub manufacturer_data: BTreeMap<u16, String>,
    /// Raw advertising data, hex encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adv: Option<String>,
}

impl WireFrame {
    /// Parse one line straight into a [`Frame`].
    pub fn parse(line: &str) -> Result<Frame, WireError> {
        serde_json::from_str::<Self>(line)?.into_frame()
    }

    pub fn into_frame(self) -> Result<Frame, WireError> {
        let (mut name, mut manufacturer_data) = match &self.adv {
            Some(raw) => {
                let bytes = hex::decode(raw).map_err(|source| WireError::Hex {
                    field: "adv".into(),
                    source,
                })?;
                let adv = adstruct::parse(&bytes);
                (adv.name, adv.manufacturer_data)
            }
            None => (None, BTreeMap::new()),
        };

        for (company, data) in self.manufacturer_data {
            let bytes = hex::decode(&data).map_err(|source| WireError::Hex {
                field: format!("manufacturer_data.{company}"),
                source,
            })?;
            manufacturer_data.insert(company, bytes);
        }

        if self.name.is_some() {
            name = self.name;
        }

        Ok(Frame {
            address: self.address,
            name,
            rssi: self.rssi,
            manufacturer_data,
        })
    }
}
