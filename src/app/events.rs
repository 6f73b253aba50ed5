//! Outbound application events.
//!
//! The [`Controller`](super::service::Controller) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to the console, forward to a
//! telemetry backend, etc.  This is the controller's only user-visible
//! surface.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::app::commands::{CommandKind, IndicatorColor};
use crate::app::registry::{CompletionError, CorrelationId};
use crate::error::{Error, TransportError};
use crate::geo::{FixQuality, TransitionKind};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller is up and subscribed.
    Started { subject_id: String, regions: usize },

    /// Rendered status for one position sample.
    Position(PositionReport),

    /// The positioning source reported an error for this tick.
    PositionError(TransportError),

    /// The geofence engine accepted a polygon.
    RegionAdded { region_id: i32 },

    /// Polygon registration failed.
    RegionAddFailed { region_id: i32, error: CompletionError },

    /// A transition for our subject is about to be actuated.
    TransitionMatched {
        kind: TransitionKind,
        region_id: i32,
        region_name: String,
        bearing_deg: f64,
    },

    /// The event could not be routed (e.g. a transition kind outside
    /// ENTER/EXIT).  Nothing was actuated.
    EventRejected { region_id: i32, error: Error },

    /// The indicator confirmed a colour change.
    IndicatorChanged { id: CorrelationId, color: IndicatorColor },

    /// The indicator command failed.  Not retried.
    IndicatorFailed { id: CorrelationId, error: CompletionError },

    /// The gateway confirmed the notification.
    NotificationSent { id: CorrelationId },

    /// The notification failed.  Not retried.
    NotificationFailed { id: CorrelationId, error: CompletionError },

    /// A command could not even be issued.
    DispatchFailed { kind: CommandKind, error: Error },

    /// Pending requests dropped on shutdown.
    Cancelled { count: usize },

    /// The loop has stopped.
    Stopped,
}

/// Status record for one position sample.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    pub fix: FixQuality,
    pub satellites_used: u8,
    pub timestamp: NaiveDateTime,
    /// Present only with an autonomous-or-better fix.
    pub detail: Option<PositionDetail>,
}

/// Positional fields reported once a fix is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionDetail {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    pub horizontal_dilution: f32,
    pub speed_kmh: f32,
    pub course_deg: f32,
}

impl PositionReport {
    /// Render the fixed set of status lines.
    pub fn lines(&self) -> Vec<String> {
        let ts = &self.timestamp;
        let mut lines = vec![
            format!("FIX status is {}", self.fix.label()),
            format!("Satellites used [{}]", self.satellites_used),
            format!("Date [{}/{}/{}]", ts.day(), ts.month(), ts.year()),
            format!("Time [{:02}:{:02}:{:02}]", ts.hour(), ts.minute(), ts.second()),
        ];

        if let Some(d) = &self.detail {
            lines.push(format!(
                "Position coordinates: [{:.7},{:.7}]",
                d.latitude_deg, d.longitude_deg
            ));
            lines.push(format!("Altitude above/below mean sea level: {:.1} m", d.altitude_m));
            lines.push(format!("Horizontal dilution of precision: {:.2}", d.horizontal_dilution));
            lines.push(format!("Speed over ground: {:.1} km/h", d.speed_kmh));
            lines.push(format!("Course over ground: {:.1} deg", d.course_deg));
        }
        lines
    }
}
