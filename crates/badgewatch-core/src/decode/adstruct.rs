// ── Raw advertising data parser ──
//
// Splits legacy advertising bytes into length-type-value records and
// keeps the fields the badge decoder cares about. Parsing stops at a
// zero length byte or at the first record that runs past the buffer.

use std::collections::BTreeMap;

const AD_TYPE_SHORT_LOCAL_NAME: u8 = 0x08;
const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
const AD_TYPE_MANUFACTURER_SPECIFIC: u8 = 0xFF;

/// Fields extracted from one advertisement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    /// Complete local name if present, else the shortened one.
    pub name: Option<String>,
    /// Manufacturer-specific data keyed by company id. Repeated ids keep the last record.
    pub manufacturer_data: BTreeMap<u16, Vec<u8>>,
}

/// Parse raw advertising bytes. Never fails; unknown record types are skipped.
pub fn parse(data: &[u8]) -> Advertisement {
    let mut adv = Advertisement::default();
    let mut short_name = None;
    let mut i = 0;

    while i < data.len() {
        let field_len = usize::from(data[i]);
        if field_len == 0 {
            break;
        }
        let Some(record) = data.get(i + 1..i + 1 + field_len) else {
            tracing::trace!(offset = i, field_len, "AD record overruns buffer");
            break;
        };
        let (kind, value) = (record[0], &record[1..]);

        match kind {
            AD_TYPE_COMPLETE_LOCAL_NAME => {
                adv.name = Some(String::from_utf8_lossy(value).into_owned());
            }
            AD_TYPE_SHORT_LOCAL_NAME => {
                short_name = Some(String::from_utf8_lossy(value).into_owned());
            }
            AD_TYPE_MANUFACTURER_SPECIFIC => {
                if let [lo, hi, ref rest @ ..] = *value {
                    adv.manufacturer_data
                        .insert(u16::from_le_bytes([lo, hi]), rest.to_vec());
                }
            }
            _ => {}
        }

        i += field_len + 1;
    }

    if adv.name.is_none() {
        adv.name = short_name;
    }
    adv
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Record types the parser has no use for.
    const AD_TYPE_FLAGS: u8 = 0x01;
    const AD_TYPE_TX_POWER: u8 = 0x0A;

    fn badge_adv() -> Vec<u8> {
        let mut out = vec![0x02, AD_TYPE_FLAGS, 0x06];
        let name = b"BLE Badge 01";
        out.push(u8::try_from(name.len() + 1).unwrap_or(0));
        out.push(AD_TYPE_COMPLETE_LOCAL_NAME);
        out.extend_from_slice(name);
        out.extend_from_slice(&[0x08, AD_TYPE_MANUFACTURER_SPECIFIC, 0xFF, 0xFF, 0x12, 0x34, 0x07, 0x00, 0x02]);
        out
    }

    #[test]
    fn parses_name_and_manufacturer_data() {
        let adv = parse(&badge_adv());
        assert_eq!(adv.name.as_deref(), Some("BLE Badge 01"));
        assert_eq!(
            adv.manufacturer_data,
            BTreeMap::from([(0xFFFF, vec![0x12, 0x34, 0x07, 0x00, 0x02])])
        );
    }

    #[test]
    fn complete_name_wins_over_short_name() {
        let data = [
            0x04, AD_TYPE_SHORT_LOCAL_NAME, b'B', b'L', b'E',
            0x03, AD_TYPE_COMPLETE_LOCAL_NAME, b'X', b'Y',
        ];
        assert_eq!(parse(&data).name.as_deref(), Some("XY"));

        let short_only = [0x04, AD_TYPE_SHORT_LOCAL_NAME, b'B', b'L', b'E'];
        assert_eq!(parse(&short_only).name.as_deref(), Some("BLE"));
    }

    #[test]
    fn zero_length_terminates() {
        let data = [0x02, AD_TYPE_FLAGS, 0x06, 0x00, 0x03, AD_TYPE_COMPLETE_LOCAL_NAME, b'X', b'Y'];
        assert_eq!(parse(&data).name, None);
    }

    #[test]
    fn overrunning_record_ends_parsing() {
        let data = [
            0x03, AD_TYPE_COMPLETE_LOCAL_NAME, b'X', b'Y',
            0x09, AD_TYPE_MANUFACTURER_SPECIFIC, 0xFF,
        ];
        let adv = parse(&data);
        assert_eq!(adv.name.as_deref(), Some("XY"));
        assert!(adv.manufacturer_data.is_empty());
    }

    #[test]
    fn empty_and_short_manufacturer_records() {
        assert_eq!(parse(&[]), Advertisement::default());
        // A one-byte company id is not a manufacturer record.
        let adv = parse(&[0x02, AD_TYPE_MANUFACTURER_SPECIFIC, 0xFF]);
        assert!(adv.manufacturer_data.is_empty());
    }

    #[test]
    fn unrelated_records_are_skipped() {
        let data = [
            0x02, AD_TYPE_TX_POWER, 0xF4,
            0x05, AD_TYPE_MANUFACTURER_SPECIFIC, 0xFF, 0xFF, 0x12, 0x34,
        ];
        let adv = parse(&data);
        assert_eq!(adv.name, None);
        assert_eq!(adv.manufacturer_data, BTreeMap::from([(0xFFFF, vec![0x12, 0x34])]));
    }
}
