//! Controller configuration parameters
//!
//! Static, startup-time configuration.  Defaults reproduce the unit that
//! was deployed on bus 16; any field can be overridden by a JSON file
//! loaded through a [`ConfigPort`](crate::app::ports::ConfigPort).

use serde::{Deserialize, Serialize};

use crate::app::commands::{Blink, MAX_NOTIFICATION_LEN};
use crate::app::ports::ConfigError;
use crate::geo::{GeofenceRegion, Vertex};

/// One polygon to register with the geofence engine at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub region_id: i32,
    pub name: String,
    /// Whether the last vertex connects back to the first.
    pub closed: bool,
    pub vertices: Vec<Vertex>,
}

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Logging ---
    /// Application name the logger is registered under
    pub app_name: String,
    /// Log level filter ("error", "warn", "info", "debug", "trace")
    pub log_level: String,

    // --- Geofence ---
    /// Only events for this subject trigger actuation
    pub subject_id: String,
    /// Regions registered at startup, all owned by `subject_id`
    pub regions: Vec<RegionConfig>,

    // --- Actuation ---
    /// Phone number notifications are sent to
    pub destination: String,
    /// Notification text on region entry
    pub enter_text: String,
    /// Notification text on region exit
    pub exit_text: String,
    /// Indicator blink parameters sent with every colour change
    pub indicator_blink: Blink,

    // --- Timing ---
    /// Pending request timeout (milliseconds, 0 disables)
    pub pending_timeout_ms: u64,
    /// How often the loop wakes to expire stale requests (milliseconds)
    pub sweep_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Logging
            app_name: "app16".into(),
            log_level: "debug".into(),

            // Geofence
            subject_id: "16".into(),
            regions: vec![RegionConfig {
                region_id: 16,
                name: "geofence".into(),
                closed: true,
                vertices: vec![
                    (35.171_491_7, 33.350_330_6),
                    (35.165_905_6, 33.350_322_2),
                    (35.169_200_0, 33.357_669_4),
                    (35.165_905_6, 33.358_144_4),
                ],
            }],

            // Actuation
            destination: "655036904".into(),
            enter_text: "The bus has entered into the zone".into(),
            exit_text: "The bus has exited the zone".into(),
            indicator_blink: Blink::SOLID,

            // Timing
            pending_timeout_ms: 30_000,
            sweep_interval_ms: 1_000,
        }
    }
}

impl ControllerConfig {
    /// Reject configurations the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subject_id.is_empty() {
            return Err(ConfigError::ValidationFailed("subject_id is empty"));
        }
        if self.destination.is_empty() {
            return Err(ConfigError::ValidationFailed("destination is empty"));
        }
        if self.enter_text.len() > MAX_NOTIFICATION_LEN || self.exit_text.len() > MAX_NOTIFICATION_LEN {
            return Err(ConfigError::ValidationFailed(
                "notification text exceeds one SMS segment",
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("sweep_interval_ms must be > 0"));
        }
        if log_level_filter(&self.log_level).is_none() {
            return Err(ConfigError::ValidationFailed("unknown log_level"));
        }

        for (i, region) in self.regions.iter().enumerate() {
            if region.vertices.len() < 3 {
                return Err(ConfigError::ValidationFailed(
                    "region needs at least 3 vertices",
                ));
            }
            let out_of_range = region
                .vertices
                .iter()
                .any(|&(lat, lon)| !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon));
            if out_of_range {
                return Err(ConfigError::ValidationFailed("vertex outside lat/lon range"));
            }
            // All regions share `subject_id`, so region_id alone must be unique.
            if self.regions[..i].iter().any(|r| r.region_id == region.region_id) {
                return Err(ConfigError::ValidationFailed("duplicate region identity"));
            }
        }
        Ok(())
    }

    /// Build the immutable region set registered with the geofence engine.
    pub fn geofence_regions(&self) -> Vec<GeofenceRegion> {
        self.regions
            .iter()
            .map(|r| GeofenceRegion {
                subject_id: self.subject_id.clone(),
                region_id: r.region_id,
                name: r.name.clone(),
                closed: r.closed,
                vertices: r.vertices.clone(),
            })
            .collect()
    }

    /// Parsed [`log::LevelFilter`] for `log_level`.
    pub fn level_filter(&self) -> log::LevelFilter {
        log_level_filter(&self.log_level).unwrap_or(log::LevelFilter::Info)
    }
}

fn log_level_filter(level: &str) -> Option<log::LevelFilter> {
    level.parse::<log::LevelFilter>().ok()
}
