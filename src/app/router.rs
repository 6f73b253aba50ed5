//! Geofence event router.
//!
//! Turns a boundary-crossing event into the ordered pair of actuation
//! commands it calls for.  Pure: no I/O, no state beyond configuration.
//!
//! | Transition | Commands (in order)                         |
//! |------------|---------------------------------------------|
//! | ENTER      | SetIndicator(RED), SendNotification(enter)  |
//! | EXIT       | SetIndicator(GREEN), SendNotification(exit) |
//! | other      | none, `Error::UnrecognizedEventKind`        |
//!
//! Events for any subject other than the configured one are dropped
//! before a transition is even looked at.

use log::{info, trace, warn};

use crate::app::commands::{ActuationCommand, Blink, IndicatorColor, NotificationText};
use crate::app::ports::ConfigError;
use crate::config::ControllerConfig;
use crate::error::{Error, Result};
use crate::geo::{GeofenceEvent, TransitionKind};

/// Routing decision for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Subject does not match; nothing to do.
    Discarded,
    /// Indicator first, then notification.  Issued without sequencing.
    Actuate([ActuationCommand; 2]),
}

pub struct GeofenceEventRouter {
    subject_id: String,
    destination: String,
    enter_text: NotificationText,
    exit_text: NotificationText,
    blink: Blink,
}

impl GeofenceEventRouter {
    pub fn new(config: &ControllerConfig) -> core::result::Result<Self, ConfigError> {
        let too_long = ConfigError::ValidationFailed("notification text exceeds one SMS segment");
        Ok(Self {
            subject_id: config.subject_id.clone(),
            destination: config.destination.clone(),
            enter_text: NotificationText::try_from(config.enter_text.as_str())
                .map_err(|_| too_long.clone())?,
            exit_text: NotificationText::try_from(config.exit_text.as_str())
                .map_err(|_| too_long)?,
            blink: config.indicator_blink,
        })
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Decide what a single event should trigger.
    ///
    /// A transition kind outside ENTER/EXIT means the engine broke its
    /// contract; it is reported as an error and triggers nothing.
    pub fn route(&self, event: &GeofenceEvent) -> Result<Route> {
        if event.subject_id != self.subject_id {
            trace!(
                "Ignoring {:?} for subject '{}' (watching '{}')",
                event.kind, event.subject_id, self.subject_id
            );
            return Ok(Route::Discarded);
        }

        let (color, text) = match event.kind {
            TransitionKind::Enter => (IndicatorColor::Red, &self.enter_text),
            TransitionKind::Exit => (IndicatorColor::Green, &self.exit_text),
            TransitionKind::Unknown(raw) => {
                warn!(
                    "Unrecognized transition kind {} for region {} ('{}')",
                    raw, event.region_id, event.region.name
                );
                return Err(Error::UnrecognizedEventKind(raw));
            }
        };

        info!(
            "{:?} region {} ('{}'), indicator changing to {}",
            event.kind, event.region_id, event.region.name, color
        );

        Ok(Route::Actuate([
            ActuationCommand::SetIndicator {
                color,
                blink: self.blink,
            },
            ActuationCommand::SendNotification {
                text: text.clone(),
                destination: self.destination.clone(),
            },
        ]))
    }
}
