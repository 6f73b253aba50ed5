//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (`env_logger` on the console in the shipped binary).
//! A telemetry uplink would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] as tagged console lines.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { subject_id, regions } => {
                info!("START | subject={} | regions={}", subject_id, regions);
            }
            AppEvent::Position(report) => {
                for line in report.lines() {
                    info!("GNSS | {}", line);
                }
            }
            AppEvent::PositionError(e) => {
                error!("GNSS | {}", e);
            }
            AppEvent::RegionAdded { region_id } => {
                info!("FENCE | region {} registered", region_id);
            }
            AppEvent::RegionAddFailed { region_id, error: e } => {
                error!("FENCE | region {} not registered: {}", region_id, e);
            }
            AppEvent::TransitionMatched {
                kind,
                region_id,
                region_name,
                bearing_deg,
            } => {
                info!(
                    "FENCE | {:?} region {} ('{}') | bearing={:.1}\u{00b0}",
                    kind, region_id, region_name, bearing_deg
                );
            }
            AppEvent::EventRejected { region_id, error: e } => {
                warn!("FENCE | event for region {} rejected: {}", region_id, e);
            }
            AppEvent::IndicatorChanged { id, color } => {
                info!("LED | {} colour is {}", id, color);
            }
            AppEvent::IndicatorFailed { id, error: e } => {
                error!("LED | {} {}", id, e);
            }
            AppEvent::NotificationSent { id } => {
                info!("SMS | {} sent", id);
            }
            AppEvent::NotificationFailed { id, error: e } => {
                error!("SMS | {} {}", id, e);
            }
            AppEvent::DispatchFailed { kind, error: e } => {
                error!("DISPATCH | {:?} not issued: {}", kind, e);
            }
            AppEvent::Cancelled { count } => {
                warn!("STOP | {} pending request(s) cancelled", count);
            }
            AppEvent::Stopped => {
                info!("STOP | event loop finished");
            }
        }
    }
}
