//! Actuation dispatcher.
//!
//! Owns the long-lived actuators and the [`CallbackRegistry`].  Each
//! command is registered, handed to its actuator with a
//! [`CompletionToken`], and forgotten until the completion comes back
//! through the event loop.
//!
//! ```text
//!  dispatch(cmd) ──▶ register ──▶ actuator.call(token) ──▶ (returns)
//!                                        │
//!            event loop ◀── Completion ◀─┘ (later, any thread)
//!                │
//!                ▼
//!  on_completion ──▶ registry.complete ──▶ on_*_complete ──▶ EventSink
//! ```
//!
//! Failures are fire-and-log: every error becomes exactly one record on
//! the sink, nothing is retried and nothing reaches the router.

use log::{debug, info, warn};

use crate::app::commands::{ActuationCommand, CommandKind, IndicatorColor};
use crate::app::events::AppEvent;
use crate::app::ports::{CompletionToken, EventSink, GeofenceEngine, IndicatorActuator, MessagingGateway};
use crate::app::registry::{
    CallbackRegistry, Completion, CompletionError, CorrelationId, OpOutput, OpResult, PendingRequest,
};
use crate::error::Result;
use crate::events::EventSender;
use crate::geo::GeofenceRegion;

/// Running counters, useful for telemetry and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub issued: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub timed_out: u32,
    pub cancelled: u32,
}

pub struct ActuationDispatcher<I, M> {
    indicator: I,
    gateway: M,
    registry: CallbackRegistry,
    tx: EventSender,
    stats: DispatchStats,
}

impl<I: IndicatorActuator, M: MessagingGateway> ActuationDispatcher<I, M> {
    pub fn new(indicator: I, gateway: M, registry: CallbackRegistry, tx: EventSender) -> Self {
        Self {
            indicator,
            gateway,
            registry,
            tx,
            stats: DispatchStats::default(),
        }
    }

    // ── Issuing ───────────────────────────────────────────────

    /// Hand a command to its actuator and track it until it completes.
    pub fn dispatch(&mut self, cmd: ActuationCommand, now_ms: u64) -> Result<CorrelationId> {
        let id = self.registry.register(cmd.kind(), now_ms)?;
        let token = CompletionToken::new(id, self.tx.clone());

        match cmd {
            ActuationCommand::SetIndicator { color, blink } => {
                debug!("{} set indicator {} (period={} duty={})", id, color, blink.period_ms, blink.duty_cycle);
                self.indicator.set_state(color, blink, token);
            }
            ActuationCommand::SendNotification { text, destination } => {
                debug!("{} send '{}' to {}", id, text, destination);
                self.gateway.send(&text, &destination, token);
            }
        }
        self.stats.issued += 1;
        Ok(id)
    }

    /// Register a polygon with the geofence engine, asynchronously.
    pub fn add_region(
        &mut self,
        engine: &mut impl GeofenceEngine,
        region: &GeofenceRegion,
        now_ms: u64,
    ) -> Result<CorrelationId> {
        let kind = CommandKind::RegionAdd {
            region_id: region.region_id,
        };
        let id = self.registry.register(kind, now_ms)?;
        debug!("{} add region {} ('{}')", id, region.region_id, region.name);
        engine.add_region(region, CompletionToken::new(id, self.tx.clone()));
        self.stats.issued += 1;
        Ok(id)
    }

    // ── Completions ───────────────────────────────────────────

    /// Resolve a completion posted by an actuator.
    pub fn on_completion(&mut self, id: CorrelationId, result: OpResult, sink: &mut impl EventSink) {
        match self.registry.complete(id) {
            Completion::Delivered(request) => self.deliver(&request, result, sink),
            Completion::Late(_) | Completion::Misuse(_) => {}
        }
    }

    /// Indicator result: the reported colour on success, one error record otherwise.
    pub fn on_indicator_complete(&mut self, id: CorrelationId, result: OpResult, sink: &mut impl EventSink) {
        match result {
            Ok(output) => {
                let color = match output {
                    OpOutput::Indicator(color) => color,
                    other => {
                        warn!("{} indicator completed with {:?}", id, other);
                        IndicatorColor::Undefined
                    }
                };
                self.stats.succeeded += 1;
                sink.emit(&AppEvent::IndicatorChanged { id, color });
            }
            Err(error) => {
                self.count_failure(&error);
                sink.emit(&AppEvent::IndicatorFailed { id, error });
            }
        }
    }

    pub fn on_notification_complete(&mut self, id: CorrelationId, result: OpResult, sink: &mut impl EventSink) {
        match result {
            Ok(_) => {
                self.stats.succeeded += 1;
                sink.emit(&AppEvent::NotificationSent { id });
            }
            Err(error) => {
                self.count_failure(&error);
                sink.emit(&AppEvent::NotificationFailed { id, error });
            }
        }
    }

    // ── Housekeeping ──────────────────────────────────────────

    /// Deliver a `Timeout` completion for every overdue request.
    pub fn expire(&mut self, now_ms: u64, sink: &mut impl EventSink) -> usize {
        let expired = self.registry.expire(now_ms);
        for request in &expired {
            warn!(
                "{} {:?} timed out after {} ms",
                request.id,
                request.kind,
                now_ms.saturating_sub(request.issued_at_ms)
            );
            self.deliver(request, Err(CompletionError::Timeout), sink);
        }
        expired.len()
    }

    /// Drop everything still pending without invoking any handler.
    pub fn shutdown(&mut self, sink: &mut impl EventSink) -> usize {
        let cancelled = self.registry.cancel_all();
        if !cancelled.is_empty() {
            info!("Cancelling {} pending request(s)", cancelled.len());
            self.stats.cancelled += cancelled.len() as u32;
            sink.emit(&AppEvent::Cancelled {
                count: cancelled.len(),
            });
        }
        cancelled.len()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn pending(&self) -> usize {
        self.registry.len()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn gateway(&self) -> &M {
        &self.gateway
    }

    // ── Internal ──────────────────────────────────────────────

    fn deliver(&mut self, request: &PendingRequest, result: OpResult, sink: &mut impl EventSink) {
        match request.kind {
            CommandKind::Indicator => self.on_indicator_complete(request.id, result, sink),
            CommandKind::Notification => self.on_notification_complete(request.id, result, sink),
            CommandKind::RegionAdd { region_id } => match result {
                Ok(_) => {
                    self.stats.succeeded += 1;
                    sink.emit(&AppEvent::RegionAdded { region_id });
                }
                Err(error) => {
                    self.count_failure(&error);
                    sink.emit(&AppEvent::RegionAddFailed { region_id, error });
                }
            },
        }
    }

    fn count_failure(&mut self, error: &CompletionError) {
        match error {
            CompletionError::Timeout => self.stats.timed_out += 1,
            _ => self.stats.failed += 1,
        }
    }
}
