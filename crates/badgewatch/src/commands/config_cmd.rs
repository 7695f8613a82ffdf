//! Config subcommand handlers.

use std::path::PathBuf;

use badgewatch_config::{Config, config_path, render_toml, save_config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

fn target_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: write defaults ────────────────────────────────────
        ConfigCommand::Init { force } => {
            let path = target_path(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut cfg = Config::default();
            if let Some(layout) = global.layout {
                cfg.protocol.layout = layout.into();
            }
            let written = save_config(&cfg, Some(&path))?;
            if !global.quiet {
                eprintln!("Wrote {}", written.display());
            }
            Ok(())
        }

        // ── Show: resolved settings ─────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::resolve(global)?;
            let text = render_toml(&cfg)?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |_| text.trim_end().to_owned(),
                |c| c.protocol.layout.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&target_path(global).display().to_string(), global.quiet);
            Ok(())
        }
    }
}
