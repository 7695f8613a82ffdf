//! Badge advertisement decoding, device registry, and presence tracking.
//!
//! This crate owns everything with real invariants in the badgewatch
//! workspace; the CLI, web server, and TUI are thin consumers:
//!
//! - **[`FrameDecoder`]** — Pure classification of one advertisement into a
//!   [`Payload`] or a [`Mismatch`] reason. Handles both payload layouts
//!   (A: 16-bit device id + status, B: 32-bit device id + event + posture).
//!
//! - **[`DeviceRegistry`]** — One record per hardware address behind a
//!   single lock, with `watch`-based change notification.
//!
//! - **[`liveness`] / [`snapshot`]** — Age and online state derived at read
//!   time; snapshots ordered by `(name, address)`.
//!
//! - **[`Monitor`]** — Facade tying it together: a non-blocking
//!   [`IngestSink`] feeds a bounded queue, a single writer task applies it,
//!   and [`ScanSource`]s are driven with guaranteed cleanup.

pub mod config;
pub mod decode;
pub mod error;
pub mod ingest;
pub mod liveness;
pub mod model;
pub mod monitor;
pub mod snapshot;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{MonitorConfig, PayloadLayout, ProtocolConfig};
pub use decode::adstruct::Advertisement;
pub use decode::{FrameDecoder, Mismatch};
pub use error::CoreError;
pub use ingest::{
    Frame, IngestCounters, IngestSink, LineSource, ScanSource, SourceSpec, Submit, WireError,
    WireFrame,
};
pub use liveness::Liveness;
pub use monitor::Monitor;
pub use store::DeviceRegistry;
pub use stream::snapshot_feed;

pub use model::{
    DeviceRecord, DeviceView, EventKind, Payload, PostureCode, PostureKind, Reading, SignalBand,
    StatusCode,
};
