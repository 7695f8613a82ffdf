//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod decode;
pub mod serve;
pub mod snapshot;

use tabled::Tabled;

use badgewatch_core::DeviceView;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Dispatch a command that needs the resolved configuration.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Serve(args) => serve::handle(&args, global).await,
        Command::Decode(args) => decode::handle(&args, global),
        Command::Snapshot(args) => snapshot::handle(&args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command must be handled before dispatch".into(),
        }),
    }
}

// ── Shared device row ────────────────────────────────────────────────

#[derive(Tabled)]
pub(crate) struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Posture")]
    posture: String,
    #[tabled(rename = "RSSI")]
    rssi: String,
    #[tabled(rename = "Age")]
    age: String,
    #[tabled(rename = "Online")]
    online: String,
}

impl DeviceRow {
    pub(crate) fn new(v: &DeviceView, color: bool) -> Self {
        Self {
            name: v.name.clone(),
            address: v.address.clone(),
            id: v.device_id,
            status: v.status_label.clone(),
            posture: v.posture_label.clone().unwrap_or_else(|| "-".into()),
            rssi: format!("{} dBm ({})", v.rssi, v.signal),
            age: format!("{:.1}s", v.age),
            online: output::online_cell(v.online, color),
        }
    }
}
