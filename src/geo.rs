//! Positional data model shared by the positioning source, the geofence
//! engine and the application core.
//!
//! Everything here is plain data.  Samples and events are produced by
//! collaborators, moved through the event queue, and consumed exactly once
//! by the loop.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fix quality
// ---------------------------------------------------------------------------

/// Classification of positioning accuracy / method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixQuality {
    NoFix,
    Autonomous,
    Differential,
    RtkFixed,
    RtkFloat,
    DeadReckoning,
    /// Vendor code outside the known table.
    Unknown(u8),
}

impl FixQuality {
    /// Map a raw NMEA-style quality indicator.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::NoFix,
            1 => Self::Autonomous,
            2 => Self::Differential,
            3 => Self::RtkFixed,
            4 => Self::RtkFloat,
            5 => Self::DeadReckoning,
            other => Self::Unknown(other),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NoFix => "NO FIX",
            Self::Autonomous => "AUTONOMOUS FIX",
            Self::Differential => "DIFFERENTIAL FIX",
            Self::RtkFixed => "RTK FIXED",
            Self::RtkFloat => "RTK FLOAT",
            Self::DeadReckoning => "ESTIMATED DEAD RECKONING FIX",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// `true` for an autonomous-or-better fix.  Unknown codes never qualify:
    /// no coordinates are reported unless the quality is positively known.
    pub fn has_fix(self) -> bool {
        !matches!(self, Self::NoFix | Self::Unknown(_))
    }
}

// ---------------------------------------------------------------------------
// Position sample
// ---------------------------------------------------------------------------

/// One reading from the positioning source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// UTC time of the fix.
    pub timestamp: NaiveDateTime,
    pub fix_quality: FixQuality,
    pub satellites_used: u8,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Altitude above (or below) mean sea level.
    pub altitude_m: f64,
    pub horizontal_dilution: f32,
    pub speed_kmh: f32,
    /// Course over ground (track angle).
    pub course_deg: f32,
}

// ---------------------------------------------------------------------------
// Geofence regions and events
// ---------------------------------------------------------------------------

/// A `(lat, lon)` pair in decimal degrees.
pub type Vertex = (f64, f64);

/// A polygon registered with the geofence engine.
///
/// Identified by `(subject_id, region_id)`; immutable after startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRegion {
    pub subject_id: String,
    pub region_id: i32,
    pub name: String,
    pub closed: bool,
    pub vertices: Vec<Vertex>,
}

impl GeofenceRegion {
    pub fn key(&self) -> (&str, i32) {
        (self.subject_id.as_str(), self.region_id)
    }
}

/// Boundary-crossing direction reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    Enter,
    Exit,
    /// Engine delivered a code outside `{ENTER, EXIT}`.
    Unknown(u8),
}

impl TransitionKind {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Enter,
            1 => Self::Exit,
            other => Self::Unknown(other),
        }
    }
}

/// A single enter/exit notification from the geofence engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub kind: TransitionKind,
    pub subject_id: String,
    pub region_id: i32,
    pub region: GeofenceRegion,
    /// Heading at the moment of crossing.
    pub bearing_deg: f64,
}
