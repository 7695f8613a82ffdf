//! `decode`: classify one payload with the active protocol settings.

use std::collections::BTreeMap;

use serde::Serialize;

use badgewatch_core::{Advertisement, FrameDecoder, Payload, decode::adstruct};

use crate::cli::{DecodeArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// A decoded payload with its labels resolved.
#[derive(Debug, Serialize)]
struct Decoded {
    device_id: u32,
    status: u8,
    status_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    posture: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    posture_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<u8>,
}

impl From<Payload> for Decoded {
    fn from(p: Payload) -> Self {
        Self {
            device_id: p.device_id,
            status: p.status.0,
            status_label: p.status.label(),
            posture: p.posture.map(|c| c.0),
            posture_label: p.posture.map(|c| c.label()),
            flags: p.flags,
        }
    }
}

fn detail(d: &Decoded) -> String {
    let mut lines = vec![
        format!("Device ID: {}", d.device_id),
        format!("Status:    {} (0x{:02X})", d.status_label, d.status),
    ];
    if let (Some(code), Some(label)) = (d.posture, d.posture_label.as_deref()) {
        lines.push(format!("Posture:   {label} (0x{code:02X})"));
    }
    if let Some(flags) = d.flags {
        lines.push(format!("Flags:     0x{flags:02X}"));
    }
    lines.join("\n")
}

/// Accepts `1234800100`, `12 34 80 01 00`, `12:34:80:01:00`, with or without `0x`.
fn parse_hex(input: &str) -> Result<Vec<u8>, CliError> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = body
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    hex::decode(&digits).map_err(|e| CliError::Validation {
        field: "hex".into(),
        reason: e.to_string(),
    })
}

fn classify(decoder: &FrameDecoder, args: &DecodeArgs, bytes: &[u8]) -> Result<Payload, CliError> {
    let result = if args.adv {
        let Advertisement {
            name,
            manufacturer_data,
        } = adstruct::parse(bytes);
        let name = args.name.clone().or(name);
        decoder.classify(name.as_deref(), &manufacturer_data)
    } else if let Some(ref name) = args.name {
        let data = BTreeMap::from([(decoder.protocol().manufacturer_id, bytes.to_vec())]);
        decoder.classify(Some(name), &data)
    } else {
        decoder.decode_payload(bytes)
    };
    result.map_err(|reason| CliError::NoMatch {
        reason: reason.to_string(),
    })
}

pub fn handle(args: &DecodeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::resolve(global)?;
    let monitor_cfg = cfg.monitor_config()?;
    let decoder = FrameDecoder::new(monitor_cfg.protocol);

    let bytes = parse_hex(&args.hex)?;
    tracing::debug!(len = bytes.len(), adv = args.adv, "decoding payload");
    let decoded = Decoded::from(classify(&decoder, args, &bytes)?);

    let out = output::render_single(&global.output, &decoded, detail, |d| {
        d.status_label.clone()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
