//! Demo trip for host runs.
//!
//! Drives the scripted GNSS source and geofence engine through one pass
//! of the configured subject across the first configured region:
//!
//! ```text
//!  tick  0      1        2 .. 3     4        5         8         ..n
//!        NO FIX rx error approach   ENTER    ENTER(99) EXIT      leave
//! ```

use std::time::Duration;

use chrono::{NaiveDateTime, TimeDelta, Utc};

use crate::adapters::geofence::ScriptedTransition;
use crate::adapters::gnss::Reading;
use crate::config::ControllerConfig;
use crate::error::TransportError;
use crate::geo::{FixQuality, PositionSample, TransitionKind};

/// Subject the demo uses to show events for someone else being ignored.
pub const FOREIGN_SUBJECT: &str = "99";

const TRIP_TICKS: i64 = 10;
const ENTER_TICK: u32 = 4;
const EXIT_TICK: u32 = 8;

pub struct Scenario {
    pub readings: Vec<Reading>,
    pub transitions: Vec<ScriptedTransition>,
    pub tick: Duration,
}

impl Scenario {
    /// An eastbound pass through the first region in `config`.
    pub fn eastbound_trip(config: &ControllerConfig, tick: Duration) -> Self {
        let start = Utc::now().naive_utc();
        let (lat, lon_from, lon_to) = config
            .regions
            .first()
            .map(|r| span(&r.vertices))
            .unwrap_or((0.0, 0.0, 0.0));

        let readings = (0..TRIP_TICKS)
            .map(|i| match i {
                0 => Ok(sample(start, i, FixQuality::NoFix, 0, (0.0, 0.0))),
                1 => Err(TransportError::new(3, "receiver timeout")),
                _ => {
                    let f = (i - 2) as f64 / (TRIP_TICKS - 3) as f64;
                    let lon = lon_from + (lon_to - lon_from) * f;
                    Ok(sample(start, i, FixQuality::Autonomous, 8, (lat, lon)))
                }
            })
            .collect();

        let transitions = config
            .regions
            .first()
            .map(|r| {
                let at = |ticks: u32| tick * ticks;
                vec![
                    crossing(at(ENTER_TICK), &config.subject_id, r.region_id, TransitionKind::Enter),
                    crossing(at(1), FOREIGN_SUBJECT, r.region_id, TransitionKind::Enter),
                    crossing(at(EXIT_TICK - ENTER_TICK - 1), &config.subject_id, r.region_id, TransitionKind::Exit),
                ]
            })
            .unwrap_or_default();

        Self {
            readings,
            transitions,
            tick,
        }
    }

    /// Time after which the script has fully played out.
    pub fn duration(&self) -> Duration {
        let ticks = u32::try_from(self.readings.len()).unwrap_or(u32::MAX).saturating_add(2);
        self.tick * ticks
    }
}

/// Mid latitude and a longitude range that starts west and ends east of
/// the polygon.
fn span(vertices: &[(f64, f64)]) -> (f64, f64, f64) {
    let n = vertices.len().max(1) as f64;
    let lat = vertices.iter().map(|v| v.0).sum::<f64>() / n;
    let west = vertices.iter().map(|v| v.1).fold(f64::INFINITY, f64::min);
    let east = vertices.iter().map(|v| v.1).fold(f64::NEG_INFINITY, f64::max);
    let margin = (east - west) * 0.25;
    (lat, west - margin, east + margin)
}

fn sample(start: NaiveDateTime, tick: i64, fix: FixQuality, satellites: u8, (lat, lon): (f64, f64)) -> PositionSample {
    PositionSample {
        timestamp: start + TimeDelta::seconds(tick),
        fix_quality: fix,
        satellites_used: satellites,
        latitude_deg: lat,
        longitude_deg: lon,
        altitude_m: 148.0,
        horizontal_dilution: 1.1,
        speed_kmh: 28.0,
        course_deg: 90.0,
    }
}

fn crossing(after: Duration, subject: &str, region_id: i32, kind: TransitionKind) -> ScriptedTransition {
    ScriptedTransition {
        after,
        subject_id: subject.into(),
        region_id,
        kind,
        bearing_deg: 90.0,
    }
}
