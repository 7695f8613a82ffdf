// ── Ingestion driver ──
//
// Pumps frames from a `ScanSource` into the sink until the source ends,
// fails, or the token is cancelled. A pulled source can afford to wait,
// so the pump waits for queue space rather than dropping. The source is
// stopped on every exit path, panics included.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::source::ScanSource;
use super::{IngestSink, Submit, Update};
use crate::error::CoreError;
use crate::store::DeviceRegistry;

/// Run `source` until it is exhausted, fails, or `cancel` fires.
///
/// A scanner failure is returned to the caller after the source has
/// been stopped. A panic inside the pump is re-raised after cleanup.
pub async fn run_scanner<S: ScanSource>(
    mut source: S,
    sink: IngestSink,
    cancel: CancellationToken,
) -> Result<(), CoreError> {
    let name = source.name().to_owned();

    if let Err(e) = source.start().await {
        // Release anything the failed start may have half-acquired.
        if let Err(stop_err) = source.stop().await {
            debug!(source = %name, error = %stop_err, "stop after failed start");
        }
        return Err(e);
    }
    info!(source = %name, "scanner started");

    let outcome = AssertUnwindSafe(pump(&mut source, &sink, &cancel))
        .catch_unwind()
        .await;

    match source.stop().await {
        Ok(()) => info!(source = %name, "scanner stopped"),
        Err(e) => warn!(source = %name, error = %e, "scanner did not stop cleanly"),
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

async fn pump<S: ScanSource>(
    source: &mut S,
    sink: &IngestSink,
    cancel: &CancellationToken,
) -> Result<(), CoreError> {
    let mut malformed_seen = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("scanner cancelled");
                return Ok(());
            }
            next = source.next_frame() => next?,
        };

        let malformed = source.malformed_lines();
        if malformed > malformed_seen {
            sink.record_malformed(malformed - malformed_seen);
            malformed_seen = malformed;
        }

        let Some(frame) = next else {
            debug!("scanner exhausted");
            return Ok(());
        };

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("scanner cancelled while the queue was full");
                return Ok(());
            }
            outcome = sink.submit_wait(frame) => outcome,
        };

        if outcome == Submit::Closed {
            debug!("ingest queue closed, stopping scanner");
            return Ok(());
        }
    }
}

/// Single registry writer. Drains the queue serially; on cancellation it
/// closes the queue and applies whatever was already accepted.
pub(crate) async fn apply_task(
    registry: Arc<DeviceRegistry>,
    mut rx: mpsc::Receiver<Update>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            update = rx.recv() => match update {
                Some(update) => apply(&registry, update),
                None => return,
            },
        }
    }

    rx.close();
    while let Some(update) = rx.recv().await {
        apply(&registry, update);
    }
    debug!("apply task drained");
}

fn apply(registry: &DeviceRegistry, update: Update) {
    let Update {
        address,
        name,
        reading,
        observed_at,
    } = update;
    if registry.upsert(&address, &name, reading, observed_at) {
        info!(%address, %name, device_id = reading.device_id, "new badge");
    }
}
