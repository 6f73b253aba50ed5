//! Event queue feeding the controller's single event loop.
//!
//! Events are produced by:
//! - The positioning source (periodic samples or read errors)
//! - The geofence engine (enter/exit transitions)
//! - Actuators and gateways (completion of an issued command)
//! - The process itself (shutdown request)
//!
//! Events are consumed by the loop in [`runtime`](crate::runtime), one at a
//! time, in FIFO order.
//!
//! The last [`COMPLETION_RESERVE`] slots only take completions and the
//! shutdown request.  At most [`REGISTRY_CAP`] requests are pending, so a
//! flood of readings or crossings cannot crowd out their answers.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GNSS         │────▶│              │     │              │
//! │ Geofencing   │────▶│  EventQueue  │────▶│  Event loop  │
//! │ LED / SMS    │────▶│  (bounded)   │     │  (consumer)  │
//! │ Shutdown     │────▶│              │     │              │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::registry::{CorrelationId, OpResult, REGISTRY_CAP};
use crate::error::TransportError;
use crate::geo::{GeofenceEvent, PositionSample};

/// Maximum number of pending loop events.
pub const EVENT_QUEUE_CAP: usize = 64;

/// Slots held back for completions and shutdown.
pub const COMPLETION_RESERVE: usize = REGISTRY_CAP;

const _: () = assert!(COMPLETION_RESERVE < EVENT_QUEUE_CAP);

/// Everything the loop reacts to.
#[derive(Debug)]
pub enum LoopEvent {
    /// A periodic reading, or the source's error code for this tick.
    Position(Result<PositionSample, TransportError>),
    /// A boundary crossing reported by the geofence engine.
    Geofence(GeofenceEvent),
    /// An asynchronous operation finished.
    Completion { id: CorrelationId, result: OpResult },
    /// Stop the loop after cancelling whatever is still pending.
    Shutdown,
}

impl LoopEvent {
    fn may_use_reserve(&self) -> bool {
        matches!(self, Self::Completion { .. } | Self::Shutdown)
    }
}

/// Bounded MPMC queue.  Any thread may post; only the loop receives.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, LoopEvent, EVENT_QUEUE_CAP>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Allocate a queue shared between the loop and its producers.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Producer handle for collaborators.
    pub fn sender(self: &Arc<Self>) -> EventSender {
        EventSender {
            queue: Arc::clone(self),
        }
    }

    /// Push an event.  Returns `false` if there is no room for it (event
    /// dropped).  Readings and crossings only get the unreserved slots.
    pub fn try_post(&self, event: LoopEvent) -> bool {
        critical_section::with(|_| {
            if !event.may_use_reserve() && self.channel.len() >= EVENT_QUEUE_CAP - COMPLETION_RESERVE {
                return false;
            }
            self.channel.try_send(event).is_ok()
        })
    }

    /// Wait for the next event.
    pub async fn receive(&self) -> LoopEvent {
        self.channel.receive().await
    }

    /// Pop the next event without waiting.
    pub fn try_next(&self) -> Option<LoopEvent> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(LoopEvent)) {
        while let Some(event) = self.try_next() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }
}

/// Cloneable posting handle given to collaborators.
#[derive(Clone)]
pub struct EventSender {
    queue: Arc<EventQueue>,
}

impl EventSender {
    /// Post an event, logging if it had to be dropped.
    pub fn post(&self, event: LoopEvent) -> bool {
        let posted = self.queue.try_post(event);
        if !posted {
            warn!("Event queue full, dropping event");
        }
        posted
    }

    /// Ask the loop to shut down.
    pub fn shutdown(&self) -> bool {
        self.post(LoopEvent::Shutdown)
    }
}
