//! Mock collaborators for integration tests.
//!
//! Record every actuator call so tests can assert on the full command
//! history without a status light or a modem.  Each mock answers its
//! completion token according to a [`Reply`] mode; tokens are answered
//! from the calling thread, so the completion sits in the event queue
//! until the test pumps it.

use std::cell::RefCell;
use std::rc::Rc;

use geosignal::app::commands::{Blink, IndicatorColor};
use geosignal::app::events::AppEvent;
use geosignal::app::ports::{
    CompletionToken, EventSink, GeofenceEngine, IndicatorActuator, MessagingGateway, SubscriptionId,
};
use geosignal::app::registry::OpOutput;
use geosignal::error::TransportError;
use geosignal::events::EventSender;
use geosignal::geo::GeofenceRegion;

// ── Reply mode ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Reply {
    /// Complete successfully right away.
    Succeed,
    /// Complete with this non-zero status code.
    Fail(i32),
    /// Keep the token; the test answers it later (or never).
    Hold,
    /// Drop the token unanswered.
    Drop,
}

struct Recorder<C> {
    calls: Vec<C>,
    held: Vec<CompletionToken>,
    reply: Reply,
}

impl<C: Clone> Recorder<C> {
    fn new() -> Self {
        Self {
            calls: Vec::new(),
            held: Vec::new(),
            reply: Reply::Succeed,
        }
    }

    fn answer(&mut self, call: C, done: CompletionToken, output: OpOutput) {
        self.calls.push(call);
        match self.reply {
            Reply::Succeed => done.succeed(output),
            Reply::Fail(code) => done.fail(TransportError::new(code, "mock failure")),
            Reply::Hold => self.held.push(done),
            Reply::Drop => drop(done),
        }
    }
}

/// Shared handle: the controller owns one clone, the test keeps another.
pub struct Mock<C>(Rc<RefCell<Recorder<C>>>);

impl<C> Clone for Mock<C> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

#[allow(dead_code)]
impl<C: Clone> Mock<C> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Recorder::new())))
    }

    pub fn set_reply(&self, reply: Reply) {
        self.0.borrow_mut().reply = reply;
    }

    pub fn calls(&self) -> Vec<C> {
        self.0.borrow().calls.clone()
    }

    pub fn take_held(&self) -> Vec<CompletionToken> {
        std::mem::take(&mut self.0.borrow_mut().held)
    }
}

// ── Indicator ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorCall {
    pub color: IndicatorColor,
    pub blink: Blink,
}

pub type MockIndicator = Mock<IndicatorCall>;

impl IndicatorActuator for MockIndicator {
    fn set_state(&mut self, color: IndicatorColor, blink: Blink, done: CompletionToken) {
        self.0
            .borrow_mut()
            .answer(IndicatorCall { color, blink }, done, OpOutput::Indicator(color));
    }
}

// ── Messaging gateway ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sms {
    pub text: String,
    pub destination: String,
}

pub type MockGateway = Mock<Sms>;

impl MessagingGateway for MockGateway {
    fn send(&mut self, text: &str, destination: &str, done: CompletionToken) {
        let sms = Sms {
            text: text.into(),
            destination: destination.into(),
        };
        self.0.borrow_mut().answer(sms, done, OpOutput::Notification);
    }
}

// ── Geofence engine ───────────────────────────────────────────

pub type MockEngine = Mock<GeofenceRegion>;

impl GeofenceEngine for MockEngine {
    fn add_region(&mut self, region: &GeofenceRegion, done: CompletionToken) {
        self.0.borrow_mut().answer(region.clone(), done, OpOutput::RegionAdded);
    }

    fn subscribe(&mut self, _tx: EventSender) -> Result<SubscriptionId, TransportError> {
        Ok(SubscriptionId(1))
    }

    fn unsubscribe(&mut self, _id: SubscriptionId) {}
}

// ── RecordingSink ─────────────────────────────────────────────

/// Event sink that records everything.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    /// Records produced by actuation (indicator and notification outcomes).
    pub fn actuation_records(&self) -> usize {
        self.count(|e| {
            matches!(
                e,
                AppEvent::IndicatorChanged { .. }
                    | AppEvent::IndicatorFailed { .. }
                    | AppEvent::NotificationSent { .. }
                    | AppEvent::NotificationFailed { .. }
            )
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
