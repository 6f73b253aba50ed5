//! Controller, the hexagonal core.
//!
//! [`Controller`] owns the router, dispatcher and reporter.  The event
//! loop hands it one [`LoopEvent`] at a time; every reaction runs to
//! completion on the loop and never blocks.
//!
//! ```text
//!  PositionSource ──▶ ┌───────────────────────────┐ ──▶ EventSink
//!  GeofenceEngine ──▶ │        Controller         │
//!                     │ Router · Dispatcher ·     │ ──▶ IndicatorActuator
//!  completions    ──▶ │ Reporter · Registry       │ ──▶ MessagingGateway
//!                     └───────────────────────────┘
//! ```

use log::{info, warn};

use crate::app::commands::CommandKind;
use crate::app::dispatcher::{ActuationDispatcher, DispatchStats};
use crate::app::events::AppEvent;
use crate::app::ports::{ConfigError, EventSink, GeofenceEngine, IndicatorActuator, MessagingGateway};
use crate::app::registry::{CallbackRegistry, MisusePolicy};
use crate::app::reporter::PositionReporter;
use crate::app::router::{GeofenceEventRouter, Route};
use crate::config::ControllerConfig;
use crate::events::{EventSender, LoopEvent};
use crate::geo::{GeofenceEvent, GeofenceRegion};

/// What the loop should do after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Routing counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStats {
    pub matched: u32,
    pub discarded: u32,
    pub rejected: u32,
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller<I, M> {
    router: GeofenceEventRouter,
    dispatcher: ActuationDispatcher<I, M>,
    reporter: PositionReporter,
    regions: Vec<GeofenceRegion>,
    stats: RouteStats,
}

impl<I: IndicatorActuator, M: MessagingGateway> Controller<I, M> {
    /// Construct the controller from configuration.
    ///
    /// Does **not** register regions; call [`start`](Self::start) next.
    pub fn new(config: &ControllerConfig, indicator: I, gateway: M, tx: EventSender) -> Result<Self, ConfigError> {
        Self::with_policy(config, indicator, gateway, tx, MisusePolicy::default())
    }

    pub fn with_policy(
        config: &ControllerConfig,
        indicator: I,
        gateway: M,
        tx: EventSender,
        policy: MisusePolicy,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let timeout = (config.pending_timeout_ms > 0).then_some(config.pending_timeout_ms);
        let registry = CallbackRegistry::with_policy(timeout, policy);

        Ok(Self {
            router: GeofenceEventRouter::new(config)?,
            dispatcher: ActuationDispatcher::new(indicator, gateway, registry, tx),
            reporter: PositionReporter::new(),
            regions: config.geofence_regions(),
            stats: RouteStats::default(),
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Register every configured region with the engine.
    pub fn start(&mut self, engine: &mut impl GeofenceEngine, now_ms: u64, sink: &mut impl EventSink) {
        for region in &self.regions {
            if let Err(error) = self.dispatcher.add_region(engine, region, now_ms) {
                warn!("Region {} not registered: {}", region.region_id, error);
                sink.emit(&AppEvent::DispatchFailed {
                    kind: CommandKind::RegionAdd {
                        region_id: region.region_id,
                    },
                    error,
                });
            }
        }
        sink.emit(&AppEvent::Started {
            subject_id: self.router.subject_id().to_owned(),
            regions: self.regions.len(),
        });
        info!(
            "Controller started for subject '{}' with {} region(s)",
            self.router.subject_id(),
            self.regions.len()
        );
    }

    // ── Event handling ────────────────────────────────────────

    /// React to one loop event.
    pub fn handle(&mut self, event: LoopEvent, now_ms: u64, sink: &mut impl EventSink) -> LoopControl {
        match event {
            LoopEvent::Position(reading) => self.reporter.report(reading, sink),
            LoopEvent::Geofence(event) => self.on_geofence_event(&event, now_ms, sink),
            LoopEvent::Completion { id, result } => self.dispatcher.on_completion(id, result, sink),
            LoopEvent::Shutdown => {
                self.dispatcher.shutdown(sink);
                sink.emit(&AppEvent::Stopped);
                return LoopControl::Stop;
            }
        }
        LoopControl::Continue
    }

    /// Route one geofence event and issue whatever it calls for.
    pub fn on_geofence_event(&mut self, event: &GeofenceEvent, now_ms: u64, sink: &mut impl EventSink) {
        let commands = match self.router.route(event) {
            Ok(Route::Discarded) => {
                self.stats.discarded += 1;
                return;
            }
            Ok(Route::Actuate(commands)) => commands,
            Err(error) => {
                self.stats.rejected += 1;
                sink.emit(&AppEvent::EventRejected {
                    region_id: event.region_id,
                    error,
                });
                return;
            }
        };

        self.stats.matched += 1;
        sink.emit(&AppEvent::TransitionMatched {
            kind: event.kind,
            region_id: event.region_id,
            region_name: event.region.name.clone(),
            bearing_deg: event.bearing_deg,
        });

        // Both commands go out back to back; neither waits for the other.
        for cmd in commands {
            let kind = cmd.kind();
            if let Err(error) = self.dispatcher.dispatch(cmd, now_ms) {
                sink.emit(&AppEvent::DispatchFailed { kind, error });
            }
        }
    }

    /// Expire overdue requests.  Called by the loop on its sweep timer.
    pub fn sweep(&mut self, now_ms: u64, sink: &mut impl EventSink) -> usize {
        self.dispatcher.expire(now_ms, sink)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn route_stats(&self) -> RouteStats {
        self.stats
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn pending(&self) -> usize {
        self.dispatcher.pending()
    }

    pub fn dispatcher(&self) -> &ActuationDispatcher<I, M> {
        &self.dispatcher
    }

    pub fn reporter(&self) -> &PositionReporter {
        &self.reporter
    }
}
