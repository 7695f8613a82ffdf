//! Resolve the effective `Config` from the config file, environment, and
//! command-line overrides.

use badgewatch_config::{Config, SourceKind, load_config};
use badgewatch_core::PayloadLayout;

use crate::cli::{GlobalOpts, LayoutArg, ServeArgs, SourceArg};
use crate::error::CliError;

impl From<LayoutArg> for PayloadLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::A => PayloadLayout::A,
            LayoutArg::B => PayloadLayout::B,
        }
    }
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Stdin => SourceKind::Stdin,
            SourceArg::File => SourceKind::File,
            SourceArg::Tcp => SourceKind::Tcp,
        }
    }
}

/// Load config and apply the global flags.
pub fn resolve(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config(global.config.as_deref())?;
    if let Some(layout) = global.layout {
        cfg.protocol.layout = layout.into();
    }
    Ok(cfg)
}

/// Apply `serve` flags on top of a resolved config and re-validate.
pub fn apply_serve_overrides(cfg: &mut Config, args: &ServeArgs) -> Result<(), CliError> {
    if let Some(ref bind) = args.bind {
        cfg.web.bind.clone_from(bind);
    }
    if let Some(source) = args.source {
        cfg.ingest.source = source.into();
    }
    if let Some(ref path) = args.path {
        cfg.ingest.path = Some(path.clone());
        if args.source.is_none() {
            cfg.ingest.source = SourceKind::File;
        }
    }
    if let Some(ref connect) = args.connect {
        cfg.ingest.address = Some(connect.clone());
        if args.source.is_none() {
            cfg.ingest.source = SourceKind::Tcp;
        }
    }
    if let Some(secs) = args.offline_timeout {
        cfg.liveness.offline_timeout_secs = secs;
    }
    if let Some(ms) = args.push_interval {
        cfg.web.push_interval_ms = ms;
    }
    if let Some(n) = args.queue_capacity {
        cfg.ingest.queue_capacity = n;
    }
    cfg.validate()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use badgewatch_core::SourceSpec;

    fn serve_args() -> ServeArgs {
        ServeArgs {
            bind: None,
            source: None,
            path: None,
            connect: None,
            offline_timeout: None,
            push_interval: None,
            queue_capacity: None,
        }
    }

    #[test]
    fn path_implies_file_source() {
        let mut cfg = Config::default();
        let args = ServeArgs {
            path: Some("frames.jsonl".into()),
            ..serve_args()
        };
        apply_serve_overrides(&mut cfg, &args).unwrap();
        assert_eq!(
            cfg.source_spec().unwrap(),
            SourceSpec::File("frames.jsonl".into())
        );
    }

    #[test]
    fn tcp_without_address_is_rejected() {
        let mut cfg = Config::default();
        let args = ServeArgs {
            source: Some(SourceArg::Tcp),
            ..serve_args()
        };
        let err = apply_serve_overrides(&mut cfg, &args).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = Config::default();
        let args = ServeArgs {
            offline_timeout: Some(0.0),
            ..serve_args()
        };
        assert!(apply_serve_overrides(&mut cfg, &args).is_err());
    }
}
