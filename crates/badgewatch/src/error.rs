//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use badgewatch_config::ConfigError;
use badgewatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const SCANNER: i32 = 7;
    /// Input data could not be used (sysexits `EX_DATAERR`).
    pub const DATA: i32 = 65;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Scanner ──────────────────────────────────────────────────────

    #[error("Scanner '{source_name}' failed: {reason}")]
    #[diagnostic(
        code(badgewatch::scanner),
        help(
            "Check that the scanning service is running and reachable.\n\
             Frames are read as JSON lines; see `badgewatch serve --help`."
        )
    )]
    Scanner { source_name: String, reason: String },

    // ── Web ──────────────────────────────────────────────────────────

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(badgewatch::bind),
        help("Is another process using this port? Try --bind 127.0.0.1:0")
    )]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Input ────────────────────────────────────────────────────────

    #[error("Not a badge frame: {reason}")]
    #[diagnostic(
        code(badgewatch::no_match),
        help("Check --layout and the protocol settings shown by `badgewatch config show`.")
    )]
    NoMatch { reason: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(badgewatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(badgewatch::config),
        help("Inspect the resolved settings with: badgewatch config show")
    )]
    Config(#[from] ConfigError),

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(badgewatch::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    // ── Internal ─────────────────────────────────────────────────────

    #[error("Internal error: {message}")]
    #[diagnostic(code(badgewatch::internal))]
    Internal { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(badgewatch::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(badgewatch::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Scanner { .. } | Self::Bind { .. } => exit_code::SCANNER,
            Self::Config(_) | Self::ConfigExists { .. } => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoMatch { .. } => exit_code::DATA,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Scanner {
                source_name,
                reason,
            } => CliError::Scanner {
                source_name,
                reason,
            },

            CoreError::ScannerNotStarted { source_name } => CliError::Scanner {
                source_name,
                reason: "scanner was not started".into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let scanner = CliError::from(CoreError::Scanner {
            source_name: "stdin".into(),
            reason: "closed".into(),
        });
        assert_eq!(scanner.exit_code(), exit_code::SCANNER);

        let no_match = CliError::NoMatch {
            reason: "app id mismatch (0x1234)".into(),
        };
        assert_eq!(no_match.exit_code(), exit_code::DATA);

        let config = CliError::Config(ConfigError::Validation {
            field: "web.bind".into(),
            reason: "bad".into(),
        });
        assert_eq!(config.exit_code(), exit_code::CONFIG);
    }
}
