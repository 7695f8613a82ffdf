//! Dashboard events: keys and resizes from the terminal, registry changes
//! from the monitor, and a refresh tick so ages keep moving while no
//! frames arrive.
//!
//! Registry changes are coalesced: after a change the reader waits for the
//! settle interval before reporting it, and every bump in between folds
//! into that one `Changed`. A busy scanner therefore costs at most one
//! redraw per settle interval.

use std::time::Duration;

use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    /// Terminal was resized to (cols, rows).
    Resize(u16, u16),
    /// Liveness re-evaluation tick (`tui.refresh_ms`).
    Refresh,
    /// The registry has new readings.
    Changed,
}

/// Background task merging terminal input with registry notifications.
pub struct EventReader {
    rx: mpsc::UnboundedReceiver<Event>,
    cancel: CancellationToken,
}

impl EventReader {
    /// Read keys from the controlling terminal.
    pub fn new(changes: watch::Receiver<u64>, refresh: Duration, settle: Duration) -> Self {
        Self::spawn(EventStream::new(), changes, refresh, settle)
    }

    pub fn spawn<S>(
        terminal: S,
        mut changes: watch::Receiver<u64>,
        refresh: Duration,
        settle: Duration,
    ) -> Self
    where
        S: Stream<Item = std::io::Result<CrosstermEvent>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut terminal = std::pin::pin!(terminal);
            let mut refresh = interval(refresh);
            let mut settle = interval(settle);
            refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
            settle.set_missed_tick_behavior(MissedTickBehavior::Skip);

            let mut dirty = false;
            let mut registry_open = true;

            loop {
                let event = tokio::select! {
                    () = task_cancel.cancelled() => break,

                    _ = refresh.tick() => {
                        // A refresh re-reads the registry anyway.
                        dirty = false;
                        Event::Refresh
                    }

                    changed = changes.changed(), if registry_open && !dirty => {
                        registry_open = changed.is_ok();
                        dirty = registry_open;
                        if !registry_open {
                            debug!("registry closed, change events stop");
                        }
                        continue;
                    }

                    _ = settle.tick(), if dirty => {
                        dirty = false;
                        Event::Changed
                    }

                    Some(Ok(terminal_event)) = terminal.next() => {
                        match terminal_event {
                            CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                                Event::Key(key)
                            }
                            CrosstermEvent::Resize(w, h) => Event::Resize(w, h),
                            _ => continue,
                        }
                    }
                };

                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        Self { rx, cancel }
    }

    /// Next event, or `None` once the reader has stopped.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
