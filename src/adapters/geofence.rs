//! Scripted geofence engine.
//!
//! Implements [`GeofenceEngine`] by accepting polygons and replaying a
//! list of timed transitions against them.  No point-in-polygon test is
//! performed: the script says when a subject crosses which region.

use std::time::Duration;

use log::{debug, info, warn};

use crate::adapters::utils::{ERR_SUBSCRIBE, ScriptWorker};
use crate::app::ports::{CompletionToken, GeofenceEngine, SubscriptionId};
use crate::app::registry::OpOutput;
use crate::error::TransportError;
use crate::events::{EventSender, LoopEvent};
use crate::geo::{GeofenceEvent, GeofenceRegion, TransitionKind};

/// Status code for a polygon the engine refuses.
pub const ERR_BAD_POLYGON: i32 = -2;

/// One scripted boundary crossing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedTransition {
    /// Delay after the previous transition.
    pub after: Duration,
    pub subject_id: String,
    pub region_id: i32,
    pub kind: TransitionKind,
    pub bearing_deg: f64,
}

pub struct ScriptedGeofence {
    regions: Vec<GeofenceRegion>,
    script: Vec<ScriptedTransition>,
    worker: Option<ScriptWorker>,
    next_id: u32,
}

impl ScriptedGeofence {
    pub fn new(script: Vec<ScriptedTransition>) -> Self {
        Self {
            regions: Vec::new(),
            script,
            worker: None,
            next_id: 1,
        }
    }

    pub fn regions(&self) -> &[GeofenceRegion] {
        &self.regions
    }
}

/// Materialise a transition against the registered polygons.
///
/// The event carries the polygon re-keyed to the crossing subject, so a
/// foreign subject crossing our polygon still reports its own identity.
fn build_event(regions: &[GeofenceRegion], t: &ScriptedTransition) -> Option<GeofenceEvent> {
    let mut region = regions.iter().find(|r| r.region_id == t.region_id)?.clone();
    region.subject_id.clone_from(&t.subject_id);
    Some(GeofenceEvent {
        kind: t.kind,
        subject_id: t.subject_id.clone(),
        region_id: t.region_id,
        region,
        bearing_deg: t.bearing_deg,
    })
}

impl GeofenceEngine for ScriptedGeofence {
    fn add_region(&mut self, region: &GeofenceRegion, done: CompletionToken) {
        if region.vertices.len() < 3 {
            done.fail(TransportError::new(ERR_BAD_POLYGON, "polygon needs at least 3 vertices"));
            return;
        }
        if self.regions.iter().any(|r| r.key() == region.key()) {
            done.fail(TransportError::new(ERR_BAD_POLYGON, "region already registered"));
            return;
        }

        debug!(
            "ScriptedGeofence: region {} ('{}'), {} vertices, closed={}",
            region.region_id,
            region.name,
            region.vertices.len(),
            region.closed
        );
        self.regions.push(region.clone());
        done.succeed(OpOutput::RegionAdded);
    }

    fn subscribe(&mut self, tx: EventSender) -> Result<SubscriptionId, TransportError> {
        if self.worker.is_some() {
            return Err(TransportError::new(ERR_SUBSCRIBE, "already subscribed"));
        }

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let regions = self.regions.clone();
        let script = self.script.clone();

        self.worker = Some(ScriptWorker::spawn(id, "sim-geofence", move |stop| {
            for transition in &script {
                if !stop.sleep(transition.after) {
                    return;
                }
                match build_event(&regions, transition) {
                    Some(event) => {
                        tx.post(LoopEvent::Geofence(event));
                    }
                    None => warn!(
                        "ScriptedGeofence: region {} not registered, transition skipped",
                        transition.region_id
                    ),
                }
            }
            debug!("ScriptedGeofence: script finished");
        })?);

        info!(
            "ScriptedGeofence: subscribed ({} regions, {} transitions)",
            self.regions.len(),
            self.script.len()
        );
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        if self.worker.as_ref().is_some_and(|w| w.id() == id) {
            if let Some(mut worker) = self.worker.take() {
                worker.stop();
            }
            info!("ScriptedGeofence: unsubscribed");
        }
    }
}
