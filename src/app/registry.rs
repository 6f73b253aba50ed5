//! Pending-request registry.
//!
//! Every asynchronous operation the controller starts is registered here
//! and gets a [`CorrelationId`].  When its completion comes back through
//! the event queue, [`CallbackRegistry::complete`] removes the entry and
//! hands the [`PendingRequest`] back exactly once.
//!
//! ## Entry lifecycle
//!
//! 1. `register` allocates a slot (fixed capacity, no heap).
//! 2. The collaborator eventually completes; `complete` removes the slot.
//! 3. If a deadline is configured and passes first, `expire` removes the
//!    slot and the caller delivers a `Timeout` completion instead.
//! 4. On shutdown, `cancel_all` removes every slot without delivery.
//!
//! Ids removed by 3 or 4 are remembered until their own completion
//! arrives, so that it is recognised as *late* rather than as misuse.
//! A token answers at most once, so the entry is dropped on that answer.
//! Entries whose answer never shows up (lost to a full queue) are pruned
//! [`LATE_HORIZON_MS`] after they retired.

use core::fmt;
use std::collections::HashMap;

use heapless::FnvIndexMap;
use log::{debug, error};

use crate::app::commands::{CommandKind, IndicatorColor};
use crate::error::{RegistryError, TransportError};

/// Maximum number of in-flight requests.  Must be a power of two.
pub const REGISTRY_CAP: usize = 32;

/// How long a retired id waits for its late answer before it is forgotten.
pub const LATE_HORIZON_MS: u64 = 10 * 60 * 1000;

// ───────────────────────────────────────────────────────────────
// Identity and results
// ───────────────────────────────────────────────────────────────

/// Opaque token linking an issued operation to its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(u32);

impl CorrelationId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Successful outcome of an asynchronous operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpOutput {
    /// The indicator now shows this colour.
    Indicator(IndicatorColor),
    /// The gateway accepted the notification.
    Notification,
    /// The geofence engine accepted the polygon.
    RegionAdded,
}

/// Why an asynchronous operation did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Collaborator reported a non-zero code.
    Transport(TransportError),
    /// No completion arrived before the deadline.
    Timeout,
    /// Removed on shutdown.
    Cancelled,
    /// The collaborator dropped its completion token without answering.
    Abandoned,
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{e}"),
            Self::Timeout => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Abandoned => write!(f, "completion abandoned"),
        }
    }
}

impl From<TransportError> for CompletionError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

/// Result carried by every completion.
pub type OpResult = Result<OpOutput, CompletionError>;

/// Book-keeping for one in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: CorrelationId,
    pub kind: CommandKind,
    pub issued_at_ms: u64,
    /// `None` when timeouts are disabled.
    pub deadline_ms: Option<u64>,
}

/// What to do when a completion names an unknown handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MisusePolicy {
    /// Treat as a programming error and panic.
    Panic,
    /// Log at error level and ignore.
    Log,
}

impl Default for MisusePolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Panic
        } else {
            Self::Log
        }
    }
}

/// Outcome of [`CallbackRegistry::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// First completion for a live request; deliver it.
    Delivered(PendingRequest),
    /// Request already timed out or was cancelled; drop silently.
    Late(CorrelationId),
    /// Unknown or already-completed handle (only under [`MisusePolicy::Log`]).
    Misuse(CorrelationId),
}

// ───────────────────────────────────────────────────────────────
// CallbackRegistry
// ───────────────────────────────────────────────────────────────

/// Fixed-capacity table of in-flight requests.
///
/// Only ever touched from the event loop, so it needs no locking.
pub struct CallbackRegistry {
    pending: FnvIndexMap<u32, PendingRequest, REGISTRY_CAP>,
    /// Retired id → time it left the pending table.
    retired: HashMap<u32, u64>,
    /// Latest time seen by `register` or `expire`.
    last_seen_ms: u64,
    next_id: u32,
    timeout_ms: Option<u64>,
    policy: MisusePolicy,
}

impl CallbackRegistry {
    /// `timeout_ms == None` disables expiry.
    pub fn new(timeout_ms: Option<u64>) -> Self {
        Self::with_policy(timeout_ms, MisusePolicy::default())
    }

    pub fn with_policy(timeout_ms: Option<u64>, policy: MisusePolicy) -> Self {
        Self {
            pending: FnvIndexMap::new(),
            retired: HashMap::new(),
            last_seen_ms: 0,
            next_id: 1,
            timeout_ms,
            policy,
        }
    }

    /// Allocate a slot for a new operation.
    pub fn register(&mut self, kind: CommandKind, now_ms: u64) -> Result<CorrelationId, RegistryError> {
        if self.pending.len() == REGISTRY_CAP {
            return Err(RegistryError::Full);
        }
        self.last_seen_ms = self.last_seen_ms.max(now_ms);

        let id = self.allocate_id();
        let request = PendingRequest {
            id,
            kind,
            issued_at_ms: now_ms,
            deadline_ms: self.timeout_ms.map(|t| now_ms.saturating_add(t)),
        };
        self.pending
            .insert(id.raw(), request)
            .map_err(|_| RegistryError::Full)?;
        Ok(id)
    }

    /// Resolve a completion.  A live id is removed and returned exactly once.
    pub fn complete(&mut self, id: CorrelationId) -> Completion {
        if let Some(request) = self.pending.remove(&id.raw()) {
            return Completion::Delivered(request);
        }
        if self.retired.remove(&id.raw()).is_some() {
            debug!("Late completion for {} ignored", id);
            return Completion::Late(id);
        }
        match self.policy {
            MisusePolicy::Panic => panic!("registry misuse: {}", RegistryError::Misuse(id.raw())),
            MisusePolicy::Log => {
                error!("Registry misuse: {}", RegistryError::Misuse(id.raw()));
                Completion::Misuse(id)
            }
        }
    }

    /// Remove and return every request whose deadline is at or before `now_ms`.
    ///
    /// Also forgets retired ids that have waited past the late horizon.
    pub fn expire(&mut self, now_ms: u64) -> heapless::Vec<PendingRequest, REGISTRY_CAP> {
        self.last_seen_ms = self.last_seen_ms.max(now_ms);
        self.prune_retired(now_ms);

        let due: heapless::Vec<u32, REGISTRY_CAP> = self
            .pending
            .iter()
            .filter(|(_, r)| r.deadline_ms.is_some_and(|d| d <= now_ms))
            .map(|(&k, _)| k)
            .collect();

        let mut expired = heapless::Vec::new();
        for key in due {
            if let Some(request) = self.pending.remove(&key) {
                self.retire(key);
                let _ = expired.push(request);
            }
        }
        expired.sort_unstable_by_key(|r| r.issued_at_ms);
        expired
    }

    /// Drop a single request without delivering anything.
    pub fn cancel(&mut self, id: CorrelationId) -> Option<PendingRequest> {
        let request = self.pending.remove(&id.raw())?;
        self.retire(id.raw());
        Some(request)
    }

    /// Drop every pending request (shutdown path).
    pub fn cancel_all(&mut self) -> heapless::Vec<PendingRequest, REGISTRY_CAP> {
        let keys: heapless::Vec<u32, REGISTRY_CAP> = self.pending.keys().copied().collect();
        let mut cancelled = heapless::Vec::new();
        for key in keys {
            if let Some(request) = self.pending.remove(&key) {
                self.retire(key);
                let _ = cancelled.push(request);
            }
        }
        cancelled
    }

    pub fn contains(&self, id: CorrelationId) -> bool {
        self.pending.contains_key(&id.raw())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout_ms
    }

    /// Retired ids still waiting for their late answer.
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    // ── Internal ──────────────────────────────────────────────

    fn allocate_id(&mut self) -> CorrelationId {
        loop {
            let raw = self.next_id;
            self.next_id = self.next_id.wrapping_add(1).max(1);
            if !self.pending.contains_key(&raw) && !self.retired.contains_key(&raw) {
                return CorrelationId(raw);
            }
        }
    }

    fn retire(&mut self, raw: u32) {
        self.retired.insert(raw, self.last_seen_ms);
    }

    fn prune_retired(&mut self, now_ms: u64) {
        let before = self.retired.len();
        self.retired.retain(|_, &mut at| now_ms < at.saturating_add(LATE_HORIZON_MS));
        let pruned = before - self.retired.len();
        if pruned > 0 {
            debug!("Forgot {} retired id(s) with no late answer", pruned);
        }
    }
}
