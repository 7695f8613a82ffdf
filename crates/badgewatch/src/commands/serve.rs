//! `serve`: run ingestion and the web server until interrupted.
//!
//! A frame source that reaches end of input leaves the server up, so the
//! last snapshot stays queryable while badges age out. A source failure
//! shuts everything down and exits non-zero.

use std::io::IsTerminal;

use tokio::net::TcpListener;
use tokio::task::JoinError;
use tracing::{info, warn};

use badgewatch_core::{CoreError, LineSource, Monitor};

use crate::cli::{GlobalOpts, ServeArgs};
use crate::config;
use crate::error::CliError;
use crate::web::{self, WebState};

fn scanner_outcome(joined: Result<Result<(), CoreError>, JoinError>) -> Result<(), CliError> {
    match joined {
        Ok(result) => result.map_err(CliError::from),
        Err(e) => Err(CliError::Internal {
            message: format!("scanner task ended abnormally: {e}"),
        }),
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub async fn handle(args: &ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::resolve(global)?;
    config::apply_serve_overrides(&mut cfg, args)?;

    let monitor = Monitor::new(cfg.monitor_config()?)?;
    let spec = cfg.frame_source(std::io::stdin().is_terminal())?;
    let addr = cfg.web_bind()?;

    let listener = TcpListener::bind(addr).await.map_err(|source| CliError::Bind {
        addr: addr.to_string(),
        source,
    })?;
    let local = listener.local_addr()?;

    monitor.start().await;
    info!(source = %spec, "reading frames");
    let mut scanner = monitor.spawn_scanner(LineSource::new(spec));
    let server = tokio::spawn(web::serve(
        listener,
        WebState::new(monitor.clone(), cfg.push_interval()),
    ));

    if !global.quiet {
        eprintln!("Serving badge presence on http://{local} (Ctrl-C to stop)");
    }

    let (outcome, scanner_done) = tokio::select! {
        () = interrupted() => (Ok(()), false),
        joined = &mut scanner => (scanner_outcome(joined), true),
    };

    if scanner_done && outcome.is_ok() {
        info!("frame source exhausted; still serving");
        interrupted().await;
    }

    info!("shutting down");
    monitor.shutdown().await;
    if !scanner_done {
        scanner_outcome(scanner.await)?;
    }

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "web server ended with an error"),
        Err(e) => warn!(error = %e, "web server task ended abnormally"),
    }

    outcome
}
