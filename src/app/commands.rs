//! Actuation commands issued by the router.
//!
//! These represent the side effects a matched geofence transition asks
//! for.  The [`ActuationDispatcher`](super::dispatcher::ActuationDispatcher)
//! hands each one to the actuator that owns it.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum notification payload, in bytes (one SMS segment).
pub const MAX_NOTIFICATION_LEN: usize = 160;

/// Fixed-capacity notification text.
pub type NotificationText = heapless::String<MAX_NOTIFICATION_LEN>;

/// Colours the indicator driver can report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IndicatorColor {
    Blue,
    Red,
    Green,
    Magenta,
    Yellow,
    Cyan,
    /// Driver could not determine the current state.
    Undefined,
}

impl IndicatorColor {
    /// Map a driver colour code; anything out of range is `Undefined`.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Blue,
            1 => Self::Red,
            2 => Self::Green,
            3 => Self::Magenta,
            4 => Self::Yellow,
            5 => Self::Cyan,
            _ => Self::Undefined,
        }
    }

    /// Human-readable label used in status records.
    pub fn label(self) -> &'static str {
        match self {
            Self::Blue => "Blue",
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Magenta => "Magenta",
            Self::Yellow => "Yellow",
            Self::Cyan => "Cyan",
            Self::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for IndicatorColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Blink parameters passed along with every colour change.
///
/// `period_ms == 0` means steady light; `duty_cycle` is the on-fraction in
/// tenths when blinking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blink {
    pub period_ms: u32,
    pub duty_cycle: u32,
}

impl Blink {
    pub const SOLID: Self = Self {
        period_ms: 0,
        duty_cycle: 1,
    };
}

/// Commands the router emits for a matched geofence event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuationCommand {
    /// Change the indicator light.
    SetIndicator { color: IndicatorColor, blink: Blink },

    /// Send a text notification.
    SendNotification {
        text: NotificationText,
        destination: String,
    },
}

impl ActuationCommand {
    /// Build a notification command, rejecting text longer than one segment.
    pub fn notification(text: &str, destination: &str) -> Option<Self> {
        let text = NotificationText::try_from(text).ok()?;
        Some(Self::SendNotification {
            text,
            destination: destination.to_owned(),
        })
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::SetIndicator { .. } => CommandKind::Indicator,
            Self::SendNotification { .. } => CommandKind::Notification,
        }
    }
}

/// Which collaborator a pending request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Indicator,
    Notification,
    /// Asynchronous polygon registration with the geofence engine.
    RegionAdd { region_id: i32 },
}
