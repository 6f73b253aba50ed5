//! Shared plumbing for the scripted adapters.
//!
//! Both the GNSS source and the geofence engine replay a script from a
//! background thread that posts into the event queue.  [`ScriptWorker`]
//! owns that thread and its stop flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::warn;

use crate::app::ports::SubscriptionId;
use crate::error::TransportError;

/// Status code reported when a subscription cannot be started.
pub(super) const ERR_SUBSCRIBE: i32 = -1;

/// Stop-aware sleep handed to the replay closure.
#[derive(Clone)]
pub(super) struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub(super) fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Sleep for `d` in short slices; `false` if asked to stop meanwhile.
    pub(super) fn sleep(&self, d: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(20);
        let mut left = d;
        while !left.is_zero() {
            if self.is_set() {
                return false;
            }
            let step = left.min(SLICE);
            thread::sleep(step);
            left -= step;
        }
        !self.is_set()
    }
}

/// A running replay thread.
pub(super) struct ScriptWorker {
    id: SubscriptionId,
    stop: StopFlag,
    handle: Option<JoinHandle<()>>,
}

impl ScriptWorker {
    pub(super) fn spawn(
        id: SubscriptionId,
        name: &str,
        body: impl FnOnce(StopFlag) + Send + 'static,
    ) -> Result<Self, TransportError> {
        let stop = StopFlag(Arc::new(AtomicBool::new(false)));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name(name.into())
            .spawn(move || body(flag))
            .map_err(|e| TransportError::new(ERR_SUBSCRIBE, e.to_string()))?;

        Ok(Self {
            id,
            stop,
            handle: Some(handle),
        })
    }

    pub(super) fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Signal the thread and wait for it to exit.
    pub(super) fn stop(&mut self) {
        self.stop.0.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Script worker {:?} panicked", self.id);
            }
        }
    }
}

impl Drop for ScriptWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
