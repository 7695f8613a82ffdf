// ── Snapshot feed ──
//
// A periodic stream of snapshots for push consumers. Each consumer gets
// its own feed, so a slow or vanished consumer never affects another.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;

use crate::model::DeviceView;
use crate::monitor::Monitor;

/// Emit the current snapshot immediately and then every `period`, until
/// the monitor shuts down.
///
/// Missed ticks are skipped rather than burst.
pub fn snapshot_feed(monitor: Monitor, period: Duration) -> impl Stream<Item = Vec<DeviceView>> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let stop = monitor.cancellation_token().cancelled_owned();
    IntervalStream::new(interval)
        .map(move |_| monitor.snapshot())
        .take_until(stop)
}
