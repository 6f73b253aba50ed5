//! Scripted positioning source.
//!
//! Implements [`PositionSource`] by replaying a fixed list of readings,
//! one per tick, from a background thread.  Stands in for the GNSS
//! receiver on host runs; it computes no fixes of its own.

use std::time::Duration;

use log::{debug, info};

use crate::adapters::utils::{ERR_SUBSCRIBE, ScriptWorker};
use crate::app::ports::{PositionSource, SubscriptionId};
use crate::error::TransportError;
use crate::events::{EventSender, LoopEvent};
use crate::geo::PositionSample;

/// One tick of the script: a sample or the receiver's error.
pub type Reading = Result<PositionSample, TransportError>;

pub struct ScriptedGnss {
    script: Vec<Reading>,
    tick: Duration,
    worker: Option<ScriptWorker>,
    next_id: u32,
}

impl ScriptedGnss {
    pub fn new(script: Vec<Reading>, tick: Duration) -> Self {
        Self {
            script,
            tick,
            worker: None,
            next_id: 1,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.worker.is_some()
    }
}

impl PositionSource for ScriptedGnss {
    fn subscribe(&mut self, tx: EventSender) -> Result<SubscriptionId, TransportError> {
        if self.worker.is_some() {
            return Err(TransportError::new(ERR_SUBSCRIBE, "already subscribed"));
        }

        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let script = self.script.clone();
        let tick = self.tick;

        self.worker = Some(ScriptWorker::spawn(id, "sim-gnss", move |stop| {
            for reading in script {
                if !stop.sleep(tick) {
                    return;
                }
                tx.post(LoopEvent::Position(reading));
            }
            debug!("ScriptedGnss: script finished");
        })?);

        info!("ScriptedGnss: subscribed ({} readings, tick {:?})", self.script.len(), self.tick);
        Ok(id)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        if self.worker.as_ref().is_some_and(|w| w.id() == id) {
            if let Some(mut worker) = self.worker.take() {
                worker.stop();
            }
            info!("ScriptedGnss: unsubscribed");
        }
    }
}
