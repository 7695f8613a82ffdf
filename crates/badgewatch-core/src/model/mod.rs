// ── Domain model ──
//
// Decoded payloads, registry records, and the views handed to
// presentation layers.

pub mod reading;
pub mod record;
pub mod view;

pub use reading::{EventKind, Payload, PostureCode, PostureKind, Reading, SignalBand, StatusCode};
pub use record::DeviceRecord;
pub use view::DeviceView;
