//! Position reporter.
//!
//! A pure transformation from one positioning tick to one status record.
//! Positional detail (coordinates, altitude, HDOP, speed, course) is only
//! reported with an autonomous-or-better fix.

use crate::app::events::{AppEvent, PositionDetail, PositionReport};
use crate::app::ports::EventSink;
use crate::error::TransportError;
use crate::geo::PositionSample;

#[derive(Debug, Default)]
pub struct PositionReporter {
    samples: u64,
    errors: u64,
}

impl PositionReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the record for one sample.
    pub fn render(sample: &PositionSample) -> PositionReport {
        let detail = sample.fix_quality.has_fix().then(|| PositionDetail {
            latitude_deg: sample.latitude_deg,
            longitude_deg: sample.longitude_deg,
            altitude_m: sample.altitude_m,
            horizontal_dilution: sample.horizontal_dilution,
            speed_kmh: sample.speed_kmh,
            course_deg: sample.course_deg,
        });

        PositionReport {
            fix: sample.fix_quality,
            satellites_used: sample.satellites_used,
            timestamp: sample.timestamp,
            detail,
        }
    }

    /// Handle one tick: the sample's report, or exactly one error record.
    pub fn report(&mut self, reading: Result<PositionSample, TransportError>, sink: &mut impl EventSink) {
        match reading {
            Ok(sample) => {
                self.samples += 1;
                sink.emit(&AppEvent::Position(Self::render(&sample)));
            }
            Err(e) => {
                self.errors += 1;
                sink.emit(&AppEvent::PositionError(e));
            }
        }
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }
}
