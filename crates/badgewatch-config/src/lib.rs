//! Shared configuration for the badgewatch CLI and TUI.
//!
//! TOML file + `BADGEWATCH_*` environment, layered over built-in defaults,
//! and translation to `badgewatch_core::MonitorConfig`. Both binaries
//! depend on this crate; the CLI applies its flag overrides on top.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use badgewatch_core::config::{
    DEFAULT_APP_ID, DEFAULT_MANUFACTURER_ID, DEFAULT_NAME_PREFIX, DEFAULT_OFFLINE_TIMEOUT,
    DEFAULT_QUEUE_CAPACITY,
};
use badgewatch_core::{MonitorConfig, PayloadLayout, ProtocolConfig, SourceSpec};

/// Prefix for environment overrides; `__` separates nested keys
/// (`BADGEWATCH_WEB__BIND=0.0.0.0:8000`).
pub const ENV_PREFIX: &str = "BADGEWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub protocol: ProtocolSection,
    #[serde(default)]
    pub liveness: LivenessSection,
    #[serde(default)]
    pub ingest: IngestSection,
    #[serde(default)]
    pub web: WebSection,
    #[serde(default)]
    pub tui: TuiSection,
}

/// CLI presentation defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// Which advertisements count as badges and how to read them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProtocolSection {
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    #[serde(default = "default_manufacturer_id")]
    pub manufacturer_id: u16,

    #[serde(default = "default_app_id")]
    pub app_id: u16,

    /// "a" or "b".
    #[serde(default)]
    pub layout: PayloadLayout,

    /// Optional flags byte; must not overlap the layout's fixed fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags_offset: Option<usize>,
}

impl Default for ProtocolSection {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            manufacturer_id: default_manufacturer_id(),
            app_id: default_app_id(),
            layout: PayloadLayout::default(),
            flags_offset: None,
        }
    }
}

fn default_name_prefix() -> String {
    DEFAULT_NAME_PREFIX.into()
}
fn default_manufacturer_id() -> u16 {
    DEFAULT_MANUFACTURER_ID
}
fn default_app_id() -> u16 {
    DEFAULT_APP_ID
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LivenessSection {
    /// Seconds without a frame before a badge is offline.
    #[serde(default = "default_offline_timeout_secs")]
    pub offline_timeout_secs: f64,
}

impl Default for LivenessSection {
    fn default() -> Self {
        Self {
            offline_timeout_secs: default_offline_timeout_secs(),
        }
    }
}

fn default_offline_timeout_secs() -> f64 {
    DEFAULT_OFFLINE_TIMEOUT.as_secs_f64()
}

/// Where scanner frames come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[derive(strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Stdin,
    File,
    Tcp,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngestSection {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub source: SourceKind,

    /// Frame file for `source = "file"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// `host:port` for `source = "tcp"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            source: SourceKind::default(),
            path: None,
            address: None,
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WebSection {
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Push cadence for WebSocket clients.
    #[serde(default = "default_push_interval_ms")]
    pub push_interval_ms: u64,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            push_interval_ms: default_push_interval_ms(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".into()
}
fn default_push_interval_ms() -> u64 {
    250
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TuiSection {
    /// Snapshot poll interval.
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
}

impl Default for TuiSection {
    fn default() -> Self {
        Self {
            refresh_ms: default_refresh_ms(),
        }
    }
}

fn default_refresh_ms() -> u64 {
    500
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    /// Check every cross-field rule. `load_config` calls this.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.monitor_config()?;
        self.source_spec()?;
        self.web_bind()?;
        if self.web.push_interval_ms == 0 {
            return Err(ConfigError::invalid("web.push_interval_ms", "must be greater than zero"));
        }
        if self.tui.refresh_ms == 0 {
            return Err(ConfigError::invalid("tui.refresh_ms", "must be greater than zero"));
        }
        Ok(())
    }

    /// Build the core monitor settings.
    pub fn monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        let secs = self.liveness.offline_timeout_secs;
        let offline_timeout = Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                ConfigError::invalid(
                    "liveness.offline_timeout_secs",
                    format!("expected a positive number of seconds, got {secs}"),
                )
            })?;

        let config = MonitorConfig {
            protocol: ProtocolConfig {
                name_prefix: self.protocol.name_prefix.clone(),
                manufacturer_id: self.protocol.manufacturer_id,
                app_id: self.protocol.app_id,
                layout: self.protocol.layout,
                flags_offset: self.protocol.flags_offset,
            },
            offline_timeout,
            queue_capacity: self.ingest.queue_capacity,
        };

        if config.queue_capacity == 0 {
            return Err(ConfigError::invalid("ingest.queue_capacity", "must be greater than zero"));
        }
        config
            .protocol
            .validate()
            .map_err(|e| ConfigError::invalid("protocol.flags_offset", e.to_string()))?;

        Ok(config)
    }

    /// Resolve the configured frame source.
    pub fn source_spec(&self) -> Result<SourceSpec, ConfigError> {
        match self.ingest.source {
            SourceKind::Stdin => Ok(SourceSpec::Stdin),
            SourceKind::File => self
                .ingest
                .path
                .clone()
                .map(SourceSpec::File)
                .ok_or_else(|| ConfigError::invalid("ingest.path", "required when source = \"file\"")),
            SourceKind::Tcp => self
                .ingest
                .address
                .clone()
                .map(SourceSpec::Tcp)
                .ok_or_else(|| {
                    ConfigError::invalid("ingest.address", "required when source = \"tcp\"")
                }),
        }
    }

    /// Resolve the frame source for a long-running process. Standard input
    /// only qualifies when something is piped into it: an interactive
    /// terminal never produces frames and its keystrokes belong to the user.
    pub fn frame_source(&self, stdin_is_terminal: bool) -> Result<SourceSpec, ConfigError> {
        let spec = self.source_spec()?;
        if spec == SourceSpec::Stdin && stdin_is_terminal {
            return Err(ConfigError::invalid(
                "ingest.source",
                "standard input is a terminal; pipe frames in, pass a frame file, \
                 or set [ingest] source = \"file\" or \"tcp\"",
            ));
        }
        Ok(spec)
    }

    pub fn web_bind(&self) -> Result<SocketAddr, ConfigError> {
        self.web
            .bind
            .parse()
            .map_err(|_| ConfigError::invalid("web.bind", format!("not a socket address: {}", self.web.bind)))
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_millis(self.web.push_interval_ms)
    }

    pub fn tui_refresh(&self) -> Duration {
        Duration::from_millis(self.tui.refresh_ms)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "badgewatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("badgewatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, file, and environment, then validate.
///
/// An explicit `path` must exist; the default path may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::NotFound { path: p.to_path_buf() });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    let config: Config = figment(&path).extract()?;
    config.validate()?;
    Ok(config)
}

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path` (default: the
/// canonical config path). Returns where it was written.
pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, render_toml(cfg)?)?;
    Ok(path)
}

/// Pretty TOML for `config show`.
pub fn render_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}
