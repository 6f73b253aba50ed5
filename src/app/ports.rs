//! Port traits: the hexagonal boundary between the controller and the
//! vendor SDKs it drives.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (positioning, geofencing, indicator, messaging, event
//! sinks, config storage) implement these traits.  The
//! [`Controller`](super::service::Controller) consumes them via generics,
//! so the domain core never touches a vendor API directly.
//!
//! ## Asynchronous contract
//!
//! Every call that starts an operation returns immediately and receives a
//! [`CompletionToken`].  The adapter completes the token later, from any
//! thread; the result travels through the event queue and is handled on
//! the loop.  Adapters must never block inside these calls.

use log::warn;

use crate::app::commands::{Blink, IndicatorColor};
use crate::app::events::AppEvent;
use crate::app::registry::{CompletionError, CorrelationId, OpOutput, OpResult};
use crate::config::ControllerConfig;
use crate::error::TransportError;
use crate::events::{EventSender, LoopEvent};
use crate::geo::GeofenceRegion;

// ───────────────────────────────────────────────────────────────
// Completion token
// ───────────────────────────────────────────────────────────────

/// One-shot handle an adapter uses to report the outcome of an operation.
///
/// Completing consumes the token, so an adapter cannot answer twice.  A
/// token dropped without an answer reports [`CompletionError::Abandoned`].
pub struct CompletionToken {
    id: CorrelationId,
    tx: Option<EventSender>,
}

impl CompletionToken {
    pub fn new(id: CorrelationId, tx: EventSender) -> Self {
        Self { id, tx: Some(tx) }
    }

    pub fn id(&self) -> CorrelationId {
        self.id
    }

    /// Report the outcome.  Delivery happens on the event loop.
    pub fn complete(mut self, result: OpResult) {
        self.post(result);
    }

    pub fn succeed(self, output: OpOutput) {
        self.complete(Ok(output));
    }

    /// Report a non-zero status code from the vendor SDK.
    pub fn fail(self, error: TransportError) {
        self.complete(Err(CompletionError::Transport(error)));
    }

    fn post(&mut self, result: OpResult) {
        if let Some(tx) = self.tx.take() {
            if !tx.post(LoopEvent::Completion {
                id: self.id,
                result,
            }) {
                warn!("Completion {} lost to a full queue; it will time out", self.id);
            }
        }
    }
}

impl Drop for CompletionToken {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.post(Err(CompletionError::Abandoned));
        }
    }
}

impl core::fmt::Debug for CompletionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CompletionToken")
            .field("id", &self.id)
            .field("answered", &self.tx.is_none())
            .finish()
    }
}

/// Handle returned by event-stream subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(pub u32);

// ───────────────────────────────────────────────────────────────
// Positioning source (driven adapter: GNSS → domain)
// ───────────────────────────────────────────────────────────────

/// Periodic position readings.
///
/// After `subscribe`, the source posts one [`LoopEvent::Position`] per
/// tick: the sample, or the error code the receiver reported.
pub trait PositionSource {
    fn subscribe(&mut self, tx: EventSender) -> Result<SubscriptionId, TransportError>;

    fn unsubscribe(&mut self, id: SubscriptionId);
}

// ───────────────────────────────────────────────────────────────
// Geofence engine (driven adapter: polygons ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Polygon-based boundary detection.
pub trait GeofenceEngine {
    /// Register a polygon.  The engine completes `done` with
    /// [`OpOutput::RegionAdded`] or a transport error.
    fn add_region(&mut self, region: &GeofenceRegion, done: CompletionToken);

    /// Start receiving [`LoopEvent::Geofence`] transitions.
    fn subscribe(&mut self, tx: EventSender) -> Result<SubscriptionId, TransportError>;

    fn unsubscribe(&mut self, id: SubscriptionId);
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapters: domain → hardware / network)
// ───────────────────────────────────────────────────────────────

/// Coloured status light.
pub trait IndicatorActuator {
    /// Request a colour change.  `done` carries the colour the driver
    /// reports after applying it.
    fn set_state(&mut self, color: IndicatorColor, blink: Blink, done: CompletionToken);
}

/// Text-message gateway.
pub trait MessagingGateway {
    fn send(&mut self, text: &str, destination: &str, done: CompletionToken);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
/// Fire-and-forget; no backpressure.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds, used to stamp and expire pending requests.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads the startup configuration.
///
/// Implementations MUST run [`ControllerConfig::validate`] before handing
/// the config out.
pub trait ConfigPort {
    fn load(&self) -> Result<ControllerConfig, ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found.
    NotFound,
    /// Stored config failed to deserialize.
    Corrupted,
    /// A config field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
