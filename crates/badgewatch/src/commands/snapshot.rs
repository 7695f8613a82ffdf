//! `snapshot`: ingest a finite frame file and print the resulting view.

use std::path::Path;

use tracing::info;

use badgewatch_core::{LineSource, Monitor, SourceSpec};

use crate::cli::{GlobalOpts, SnapshotArgs};
use crate::commands::DeviceRow;
use crate::config;
use crate::error::CliError;
use crate::output;

fn source_for(file: &Path) -> SourceSpec {
    if file == Path::new("-") {
        SourceSpec::Stdin
    } else {
        SourceSpec::File(file.to_path_buf())
    }
}

pub async fn handle(args: &SnapshotArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::resolve(global)?;
    if let Some(secs) = args.offline_timeout {
        cfg.liveness.offline_timeout_secs = secs;
    }
    let monitor = Monitor::new(cfg.monitor_config()?)?;

    monitor.start().await;
    let result = monitor
        .run_scanner(LineSource::new(source_for(&args.file)))
        .await;
    monitor.shutdown().await;
    result?;

    let stats = monitor.stats();
    info!(
        received = stats.received,
        accepted = stats.accepted,
        filtered = stats.filtered,
        dropped = stats.dropped,
        "ingested frame file"
    );

    let mut views = monitor.snapshot();
    if args.online {
        views.retain(|v| v.online);
    }

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &views,
        |v| DeviceRow::new(v, color),
        |v| v.address.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_means_stdin() {
        assert_eq!(source_for(Path::new("-")), SourceSpec::Stdin);
        assert_eq!(
            source_for(Path::new("frames.jsonl")),
            SourceSpec::File("frames.jsonl".into())
        );
    }
}
