// ── Core error types ──
//
// Failures that end or prevent ingestion. Frames that simply do not
// belong to us are never errors -- the decoder reports those as a
// `Mismatch` value and the sink counts them.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Scanner errors ───────────────────────────────────────────────
    #[error("Scanner '{source_name}' failed: {reason}")]
    Scanner { source_name: String, reason: String },

    #[error("Scanner '{source_name}' is not running")]
    ScannerNotStarted { source_name: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn scanner(source_name: &str, reason: impl std::fmt::Display) -> Self {
        Self::Scanner {
            source_name: source_name.to_owned(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
