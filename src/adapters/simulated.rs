//! Simulated actuators for host runs.
//!
//! Implements [`IndicatorActuator`] and [`MessagingGateway`] without any
//! hardware.  Each simulated device owns one long-lived worker thread that
//! answers requests in order, after a configurable latency, so completions
//! arrive through the event queue exactly as they would from a vendor SDK
//! callback.
//!
//! A fault code can be injected to exercise the failure path.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::commands::{Blink, IndicatorColor};
use crate::app::ports::{CompletionToken, IndicatorActuator, MessagingGateway};
use crate::app::registry::OpOutput;
use crate::error::TransportError;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// The device's answering thread.  Started on the first request and
/// joined on drop, after it has answered everything already queued.
struct DeviceWorker {
    name: &'static str,
    latency: Duration,
    jobs: Option<Sender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl DeviceWorker {
    fn new(name: &'static str, latency: Duration) -> Self {
        Self {
            name,
            latency,
            jobs: None,
            handle: None,
        }
    }

    /// Answer `done` from the worker after the device latency.
    fn answer_later(&mut self, done: CompletionToken, answer: impl FnOnce(CompletionToken) + Send + 'static) {
        let name = self.name;
        let Some(jobs) = self.sender() else {
            // Dropping the token reports the request as abandoned.
            return;
        };
        let job: Job = Box::new(move || answer(done));
        // The worker only goes away if a job panicked; the token inside the
        // returned job is dropped and reports the request as abandoned.
        if jobs.send(job).is_err() {
            warn!("{} worker is gone", name);
        }
    }

    fn sender(&mut self) -> Option<&Sender<Job>> {
        if self.jobs.is_none() {
            let (tx, rx) = mpsc::channel::<Job>();
            let latency = self.latency;
            let spawned = thread::Builder::new().name(self.name.into()).spawn(move || {
                for job in rx {
                    thread::sleep(latency);
                    job();
                }
            });
            match spawned {
                Ok(handle) => {
                    self.jobs = Some(tx);
                    self.handle = Some(handle);
                }
                Err(e) => {
                    warn!("{} could not spawn worker: {}", self.name, e);
                    return None;
                }
            }
        }
        self.jobs.as_ref()
    }
}

impl Drop for DeviceWorker {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop.
        self.jobs = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("{} worker panicked", self.name);
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Indicator
// ───────────────────────────────────────────────────────────────

/// Simulated RGB status light.
pub struct SimIndicator {
    worker: DeviceWorker,
    color: Arc<AtomicU8>,
    fault: Option<i32>,
}

impl SimIndicator {
    pub fn new(latency: Duration) -> Self {
        Self {
            worker: DeviceWorker::new("sim-indicator", latency),
            color: Arc::new(AtomicU8::new(IndicatorColor::Undefined as u8)),
            fault: None,
        }
    }

    /// Fail every request with `code`.
    pub fn with_fault(mut self, code: i32) -> Self {
        self.fault = Some(code);
        self
    }

    /// Colour currently shown.
    pub fn color(&self) -> IndicatorColor {
        IndicatorColor::from_raw(self.color.load(Ordering::Acquire))
    }
}

impl IndicatorActuator for SimIndicator {
    fn set_state(&mut self, color: IndicatorColor, blink: Blink, done: CompletionToken) {
        debug!(
            "SimIndicator: {} requested (period={}ms duty={})",
            color, blink.period_ms, blink.duty_cycle
        );
        let shown = Arc::clone(&self.color);
        let fault = self.fault;

        self.worker.answer_later(done, move |done| match fault {
            Some(code) => done.fail(TransportError::new(code, "indicator driver rejected state")),
            None => {
                shown.store(color as u8, Ordering::Release);
                done.succeed(OpOutput::Indicator(color));
            }
        });
    }
}

// ───────────────────────────────────────────────────────────────
// Messaging gateway
// ───────────────────────────────────────────────────────────────

/// Simulated SMS modem.  "Sends" by logging the message.
pub struct SimGateway {
    worker: DeviceWorker,
    fault: Option<i32>,
}

impl SimGateway {
    pub fn new(latency: Duration) -> Self {
        Self {
            worker: DeviceWorker::new("sim-gateway", latency),
            fault: None,
        }
    }

    pub fn with_fault(mut self, code: i32) -> Self {
        self.fault = Some(code);
        self
    }
}

impl MessagingGateway for SimGateway {
    fn send(&mut self, text: &str, destination: &str, done: CompletionToken) {
        let text = text.to_owned();
        let destination = destination.to_owned();
        let fault = self.fault;

        self.worker.answer_later(done, move |done| match fault {
            Some(code) => done.fail(TransportError::new(code, "modem refused message")),
            None => {
                info!("SimGateway: to {} \"{}\"", destination, text);
                done.succeed(OpOutput::Notification);
            }
        });
    }
}
