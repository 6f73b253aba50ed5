//! GeoSignal main entry point
//!
//! Hexagonal architecture with a single event-driven loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ScriptedGnss      ScriptedGeofence   SimIndicator  SimGateway │
//! │  (PositionSource)  (GeofenceEngine)   (Indicator)   (Messaging)│
//! │  LogEventSink      JsonConfigFile     MonotonicClock           │
//! │  (EventSink)       (ConfigPort)       (Clock)                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Router · Dispatcher · Registry · Reporter             │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EventQueue ──▶ runtime::run (blocking wait + sweep timer)     │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::Write;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use geosignal::adapters::config_file::{CONFIG_ENV, JsonConfigFile};
use geosignal::adapters::geofence::ScriptedGeofence;
use geosignal::adapters::gnss::ScriptedGnss;
use geosignal::adapters::log_sink::LogEventSink;
use geosignal::adapters::scenario::Scenario;
use geosignal::adapters::simulated::{SimGateway, SimIndicator};
use geosignal::adapters::time::MonotonicClock;
use geosignal::app::ports::{Clock, ConfigError, ConfigPort, GeofenceEngine, PositionSource};
use geosignal::app::service::Controller;
use geosignal::config::ControllerConfig;
use geosignal::error::Error;
use geosignal::events::EventQueue;
use geosignal::runtime;

/// Interval between scripted GNSS readings.
const DEMO_TICK: Duration = Duration::from_millis(500);
/// How long the simulated LED and modem take to answer.
const ACTUATOR_LATENCY: Duration = Duration::from_millis(50);

/// Where the running config came from; logged once the logger is up.
enum ConfigOrigin {
    File(String),
    Unset,
    Fallback(String, ConfigError),
}

fn load_config() -> (ControllerConfig, ConfigOrigin) {
    let Some(file) = JsonConfigFile::from_env() else {
        return (ControllerConfig::default(), ConfigOrigin::Unset);
    };
    let path = file.path().display().to_string();
    match file.load() {
        Ok(config) => (config, ConfigOrigin::File(path)),
        Err(e) => (ControllerConfig::default(), ConfigOrigin::Fallback(path, e)),
    }
}

fn init_logging(config: &ControllerConfig) -> Result<()> {
    let app = config.app_name.clone();
    env_logger::Builder::new()
        .filter_level(config.level_filter())
        .parse_default_env()
        .format(move |buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}: {}",
                buf.timestamp_millis(),
                record.level(),
                app,
                record.args()
            )
        })
        .try_init()
        .context("logger already initialised")
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Config + logging ───────────────────────────────────
    let (config, origin) = load_config();
    init_logging(&config)?;

    info!("╔══════════════════════════════════════╗");
    info!("║  GeoSignal v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    match origin {
        ConfigOrigin::File(path) => info!("Config loaded from {}", path),
        ConfigOrigin::Unset => info!("{} not set, using defaults", CONFIG_ENV),
        ConfigOrigin::Fallback(path, e) => warn!("Config {} unusable ({}), using defaults", path, e),
    }

    // ── 2. Construct adapters ─────────────────────────────────
    let queue = EventQueue::shared();
    let clock = MonotonicClock::new();
    let mut sink = LogEventSink::new();

    let trip = Scenario::eastbound_trip(&config, DEMO_TICK);
    let run_for = trip.duration();
    let mut gnss = ScriptedGnss::new(trip.readings, trip.tick);
    let mut engine = ScriptedGeofence::new(trip.transitions);

    // ── 3. Construct controller ───────────────────────────────
    let mut controller = Controller::new(
        &config,
        SimIndicator::new(ACTUATOR_LATENCY),
        SimGateway::new(ACTUATOR_LATENCY),
        queue.sender(),
    )
    .context("invalid configuration")?;

    controller.start(&mut engine, clock.now_ms(), &mut sink);

    let fence_sub = engine
        .subscribe(queue.sender())
        .map_err(Error::from)
        .context("geofence subscription failed")?;
    let gnss_sub = gnss
        .subscribe(queue.sender())
        .map_err(Error::from)
        .context("position subscription failed")?;

    // ── 4. Stop once the demo trip has played out ─────────────
    let stopper = queue.sender();
    thread::Builder::new()
        .name("shutdown-timer".into())
        .spawn(move || {
            thread::sleep(run_for);
            stopper.shutdown();
        })
        .context("spawning shutdown timer")?;

    info!("System ready. Entering event loop.");

    // ── 5. Event loop ─────────────────────────────────────────
    let summary = runtime::run(
        &mut controller,
        &queue,
        &clock,
        &mut sink,
        Duration::from_millis(config.sweep_interval_ms),
    );

    gnss.unsubscribe(gnss_sub);
    engine.unsubscribe(fence_sub);

    let routes = controller.route_stats();
    let dispatch = controller.dispatch_stats();
    info!(
        "Done | events={} | matched={} discarded={} rejected={} | issued={} ok={} failed={} timed_out={} cancelled={}",
        summary.events,
        routes.matched,
        routes.discarded,
        routes.rejected,
        dispatch.issued,
        dispatch.succeeded,
        dispatch.failed,
        dispatch.timed_out,
        dispatch.cancelled,
    );
    Ok(())
}
