//! The event loop.
//!
//! Blocks on the [`EventQueue`] until something arrives or the sweep
//! timer fires, whichever comes first.  Every event is handed to the
//! [`Controller`] on this thread; nothing else touches controller state.
//!
//! ```text
//!   ┌──────────────────────────────────────────────┐
//!   │ block_on( or( queue.receive(), Timer(sweep) ) )
//!   │      │                       │
//!   │      ▼                       ▼
//!   │  controller.handle      controller.sweep
//!   │      │
//!   │      └── Stop ──▶ return
//!   └──────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use futures_lite::future;
use log::{debug, info};

use crate::app::ports::{Clock, EventSink, IndicatorActuator, MessagingGateway};
use crate::app::service::{Controller, LoopControl};
use crate::events::{EventQueue, LoopEvent};

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events: u64,
    pub sweeps: u64,
    pub expired: u64,
}

/// Wait for the next event, or `None` once `timeout` elapses.
pub fn next_event(queue: &EventQueue, timeout: Duration) -> Option<LoopEvent> {
    future::block_on(future::or(async { Some(queue.receive().await) }, async {
        async_io_mini::Timer::after(timeout).await;
        None
    }))
}

/// Run until a [`LoopEvent::Shutdown`] is handled.
pub fn run<I, M>(
    controller: &mut Controller<I, M>,
    queue: &EventQueue,
    clock: &impl Clock,
    sink: &mut impl EventSink,
    sweep_interval: Duration,
) -> RunSummary
where
    I: IndicatorActuator,
    M: MessagingGateway,
{
    let interval_ms = u64::try_from(sweep_interval.as_millis()).unwrap_or(u64::MAX);
    let mut summary = RunSummary::default();
    let mut last_sweep = clock.now_ms();

    info!("Event loop running (sweep every {:?})", sweep_interval);

    loop {
        if let Some(event) = next_event(queue, sweep_interval) {
            summary.events += 1;
            if controller.handle(event, clock.now_ms(), sink) == LoopControl::Stop {
                break;
            }
        }

        // A busy queue must not starve expiry.
        let now = clock.now_ms();
        if now.saturating_sub(last_sweep) >= interval_ms {
            let expired = controller.sweep(now, sink);
            if expired > 0 {
                debug!("Sweep expired {} request(s)", expired);
            }
            summary.sweeps += 1;
            summary.expired += expired as u64;
            last_sweep = now;
        }
    }

    info!(
        "Event loop stopped after {} event(s), {} expired",
        summary.events, summary.expired
    );
    summary
}
