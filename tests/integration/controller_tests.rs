//! Integration tests for the Controller → Router → Dispatcher → actuators
//! pipeline, with completions travelling through the real event queue.

use std::sync::Arc;

use chrono::NaiveDate;

use geosignal::app::commands::{Blink, IndicatorColor};
use geosignal::app::events::AppEvent;
use geosignal::app::registry::{CompletionError, MisusePolicy, OpOutput};
use geosignal::app::service::{Controller, LoopControl};
use geosignal::config::ControllerConfig;
use geosignal::error::{Error, TransportError};
use geosignal::events::{COMPLETION_RESERVE, EVENT_QUEUE_CAP, EventQueue, LoopEvent};
use geosignal::geo::{FixQuality, GeofenceEvent, PositionSample, TransitionKind};

use crate::mock_hw::{IndicatorCall, MockEngine, MockGateway, MockIndicator, RecordingSink, Reply, Sms};

const ENTER_TEXT: &str = "The bus has entered into the zone";
const EXIT_TEXT: &str = "The bus has exited the zone";

struct Rig {
    queue: Arc<EventQueue>,
    ctl: Controller<MockIndicator, MockGateway>,
    led: MockIndicator,
    sms: MockGateway,
    engine: MockEngine,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    fn with_config(config: ControllerConfig) -> Self {
        let queue = EventQueue::shared();
        let led = MockIndicator::new();
        let sms = MockGateway::new();
        let mut engine = MockEngine::new();
        let mut sink = RecordingSink::new();

        let mut ctl = Controller::with_policy(&config, led.clone(), sms.clone(), queue.sender(), MisusePolicy::Log)
            .expect("valid config");
        ctl.start(&mut engine, 0, &mut sink);

        let mut rig = Self {
            queue,
            ctl,
            led,
            sms,
            engine,
            sink,
        };
        rig.pump(0);
        rig
    }

    /// Feed every queued event to the controller.
    fn pump(&mut self, now_ms: u64) -> LoopControl {
        let mut control = LoopControl::Continue;
        while let Some(event) = self.queue.try_next() {
            if self.ctl.handle(event, now_ms, &mut self.sink) == LoopControl::Stop {
                control = LoopControl::Stop;
            }
        }
        control
    }

    fn cross(&mut self, kind: TransitionKind, subject: &str, now_ms: u64) {
        assert!(self.queue.sender().post(LoopEvent::Geofence(crossing(kind, subject))));
        self.pump(now_ms);
    }

    /// Throw away whatever is queued without handling it.
    fn discard_queue(&mut self) -> usize {
        let mut discarded = 0;
        while self.queue.try_next().is_some() {
            discarded += 1;
        }
        discarded
    }
}

fn crossing(kind: TransitionKind, subject: &str) -> GeofenceEvent {
    let mut region = ControllerConfig::default().geofence_regions().remove(0);
    region.subject_id = subject.into();
    GeofenceEvent {
        kind,
        subject_id: subject.into(),
        region_id: region.region_id,
        region,
        bearing_deg: 87.5,
    }
}

fn color_calls(led: &MockIndicator) -> Vec<IndicatorColor> {
    led.calls().into_iter().map(|c| c.color).collect()
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_registers_configured_region() {
    let rig = Rig::new();

    let regions = rig.engine.calls();
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].region_id, 16);
    assert_eq!(regions[0].name, "geofence");
    assert_eq!(regions[0].vertices.len(), 4);
    assert!(regions[0].closed);

    assert!(rig.sink.events.contains(&AppEvent::RegionAdded { region_id: 16 }));
    assert!(rig.sink.events.contains(&AppEvent::Started {
        subject_id: "16".into(),
        regions: 1
    }));
    assert_eq!(rig.ctl.pending(), 0);
}

#[test]
fn failed_region_registration_is_reported() {
    let queue = EventQueue::shared();
    let mut engine = MockEngine::new();
    engine.set_reply(Reply::Fail(-2));
    let mut sink = RecordingSink::new();
    let mut ctl = Controller::with_policy(
        &ControllerConfig::default(),
        MockIndicator::new(),
        MockGateway::new(),
        queue.sender(),
        MisusePolicy::Log,
    )
    .unwrap();

    ctl.start(&mut engine, 0, &mut sink);
    while let Some(ev) = queue.try_next() {
        ctl.handle(ev, 0, &mut sink);
    }

    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::RegionAddFailed { region_id: 16, error: CompletionError::Transport(t) } if t.code == -2)),
        1
    );
}

// ── Routing scenarios ─────────────────────────────────────────

#[test]
fn subject_16_enter_turns_red_and_notifies() {
    let mut rig = Rig::new();
    rig.sink.clear();

    rig.cross(TransitionKind::Enter, "16", 1_000);

    assert_eq!(
        rig.led.calls(),
        [IndicatorCall {
            color: IndicatorColor::Red,
            blink: Blink::SOLID
        }]
    );
    assert_eq!(
        rig.sms.calls(),
        [Sms {
            text: ENTER_TEXT.into(),
            destination: "655036904".into()
        }]
    );

    assert!(matches!(
        rig.sink.events[0],
        AppEvent::TransitionMatched {
            kind: TransitionKind::Enter,
            region_id: 16,
            ..
        }
    ));
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::IndicatorChanged { color: IndicatorColor::Red, .. })),
        1
    );
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::NotificationSent { .. })), 1);
    assert_eq!(rig.ctl.pending(), 0);
}

#[test]
fn enter_then_exit_drives_red_then_green() {
    let mut rig = Rig::new();

    rig.cross(TransitionKind::Enter, "16", 1_000);
    rig.cross(TransitionKind::Exit, "16", 2_000);

    assert_eq!(color_calls(&rig.led), [IndicatorColor::Red, IndicatorColor::Green]);
    let texts: Vec<_> = rig.sms.calls().into_iter().map(|s| s.text).collect();
    assert_eq!(texts, [ENTER_TEXT, EXIT_TEXT]);
    assert_eq!(rig.ctl.route_stats().matched, 2);
    assert_eq!(rig.ctl.dispatch_stats().succeeded, 5, "region + 2 × (indicator, notification)");
}

#[test]
fn foreign_subject_triggers_nothing() {
    let mut rig = Rig::new();
    rig.sink.clear();

    rig.cross(TransitionKind::Enter, "99", 1_000);
    rig.cross(TransitionKind::Exit, "99", 2_000);

    assert!(rig.led.calls().is_empty());
    assert!(rig.sms.calls().is_empty());
    assert!(rig.sink.events.is_empty());
    assert_eq!(rig.sink.actuation_records(), 0);
    assert_eq!(rig.ctl.route_stats().discarded, 2);
}

#[test]
fn unknown_transition_is_rejected_without_actuation() {
    let mut rig = Rig::new();
    rig.sink.clear();

    rig.cross(TransitionKind::Unknown(7), "16", 1_000);

    assert!(rig.led.calls().is_empty());
    assert_eq!(
        rig.sink.events,
        [AppEvent::EventRejected {
            region_id: 16,
            error: Error::UnrecognizedEventKind(7)
        }]
    );
    assert_eq!(rig.ctl.route_stats().rejected, 1);
}

// ── Failure handling ──────────────────────────────────────────

#[test]
fn indicator_failure_is_logged_once_and_not_retried() {
    let mut rig = Rig::new();
    rig.led.set_reply(Reply::Fail(5));
    rig.sink.clear();

    rig.cross(TransitionKind::Enter, "16", 1_000);

    assert_eq!(rig.led.calls().len(), 1, "no retry");
    let failures: Vec<_> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::IndicatorFailed { error, .. } => Some(error.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(failures, [CompletionError::Transport(TransportError::new(5, "mock failure"))]);

    // The notification went out regardless.
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::NotificationSent { .. })), 1);

    // Later commands are unaffected.
    rig.led.set_reply(Reply::Succeed);
    rig.cross(TransitionKind::Exit, "16", 2_000);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::IndicatorChanged { color: IndicatorColor::Green, .. })),
        1
    );
    assert_eq!(rig.ctl.pending(), 0);
}

#[test]
fn notification_failure_does_not_touch_indicator_result() {
    let mut rig = Rig::new();
    rig.sms.set_reply(Reply::Fail(21));
    rig.sink.clear();

    rig.cross(TransitionKind::Exit, "16", 1_000);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::NotificationFailed { .. })), 1);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::IndicatorChanged { .. })), 1);
    assert_eq!(rig.sms.calls().len(), 1);
}

#[test]
fn unanswered_command_times_out_exactly_once() {
    let mut rig = Rig::new();
    rig.led.set_reply(Reply::Hold);
    rig.sink.clear();

    rig.cross(TransitionKind::Enter, "16", 1_000);
    assert_eq!(rig.ctl.pending(), 1);

    assert_eq!(rig.ctl.sweep(30_999, &mut rig.sink), 0);
    assert_eq!(rig.ctl.sweep(31_000, &mut rig.sink), 1);
    assert_eq!(rig.ctl.sweep(60_000, &mut rig.sink), 0);

    // The real answer finally arrives and is ignored.
    for token in rig.led.take_held() {
        token.succeed(OpOutput::Indicator(IndicatorColor::Red));
    }
    rig.pump(61_000);

    let outcomes = rig.sink.count(|e| {
        matches!(e, AppEvent::IndicatorChanged { .. } | AppEvent::IndicatorFailed { .. })
    });
    assert_eq!(outcomes, 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::IndicatorFailed { error: CompletionError::Timeout, .. })),
        1
    );
    assert_eq!(rig.ctl.dispatch_stats().timed_out, 1);
}

#[test]
fn dropped_token_completes_as_abandoned() {
    let mut rig = Rig::new();
    rig.sms.set_reply(Reply::Drop);
    rig.sink.clear();

    rig.cross(TransitionKind::Enter, "16", 1_000);

    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::NotificationFailed { error: CompletionError::Abandoned, .. })),
        1
    );
    assert_eq!(rig.ctl.pending(), 0);
}

// ── Full queue ────────────────────────────────────────────────

#[test]
fn completions_get_through_a_queue_flooded_with_readings() {
    let mut rig = Rig::with_config(ControllerConfig {
        pending_timeout_ms: 0,
        ..ControllerConfig::default()
    });
    rig.sink.clear();

    let tx = rig.queue.sender();
    let mut readings = 0;
    while tx.post(LoopEvent::Position(Err(TransportError::new(1, "no data")))) {
        readings += 1;
    }
    assert_eq!(readings, EVENT_QUEUE_CAP - COMPLETION_RESERVE);

    // The crossing itself is refused by the queue, so hand it over directly.
    rig.ctl.on_geofence_event(&crossing(TransitionKind::Enter, "16"), 1_000, &mut rig.sink);
    rig.pump(1_000);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::PositionError(_))), readings);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::IndicatorChanged { color: IndicatorColor::Red, .. })),
        1
    );
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::NotificationSent { .. })), 1);
    assert_eq!(rig.ctl.pending(), 0);
}

#[test]
fn answer_lost_to_a_full_queue_times_out_once() {
    let mut rig = Rig::new();
    rig.led.set_reply(Reply::Hold);
    rig.cross(TransitionKind::Enter, "16", 1_000);
    assert_eq!(rig.ctl.pending(), 1, "notification already answered");
    rig.sink.clear();

    let tx = rig.queue.sender();
    while tx.shutdown() {}
    assert_eq!(rig.queue.len(), EVENT_QUEUE_CAP);

    // The LED answers, but there is no room for its completion.
    for token in rig.led.take_held() {
        token.succeed(OpOutput::Indicator(IndicatorColor::Red));
    }
    assert_eq!(rig.discard_queue(), EVENT_QUEUE_CAP);

    assert_eq!(rig.ctl.sweep(30_999, &mut rig.sink), 0);
    assert_eq!(rig.ctl.sweep(31_000, &mut rig.sink), 1);
    assert_eq!(rig.ctl.sweep(90_000, &mut rig.sink), 0);

    assert_eq!(rig.sink.events.len(), 1);
    assert!(matches!(
        rig.sink.events[0],
        AppEvent::IndicatorFailed {
            error: CompletionError::Timeout,
            ..
        }
    ));
    assert_eq!(rig.ctl.dispatch_stats().timed_out, 1);
    assert_eq!(rig.ctl.pending(), 0);
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_cancels_pending_without_handlers() {
    let mut rig = Rig::new();
    rig.led.set_reply(Reply::Hold);
    rig.sms.set_reply(Reply::Hold);
    rig.cross(TransitionKind::Enter, "16", 1_000);
    rig.sink.clear();

    rig.queue.sender().shutdown();
    assert_eq!(rig.pump(2_000), LoopControl::Stop);
    assert_eq!(rig.sink.events, [AppEvent::Cancelled { count: 2 }, AppEvent::Stopped]);

    // Answers after shutdown reach no handler.
    rig.sink.clear();
    for token in rig.led.take_held() {
        token.succeed(OpOutput::Indicator(IndicatorColor::Red));
    }
    for token in rig.sms.take_held() {
        token.succeed(OpOutput::Notification);
    }
    rig.pump(3_000);
    assert_eq!(rig.sink.actuation_records(), 0);
}

// ── Position reporting ────────────────────────────────────────

fn sample(fix: FixQuality) -> PositionSample {
    PositionSample {
        timestamp: NaiveDate::from_ymd_opt(2024, 11, 2)
            .unwrap()
            .and_hms_opt(17, 4, 9)
            .unwrap(),
        fix_quality: fix,
        satellites_used: 5,
        latitude_deg: 35.168,
        longitude_deg: 33.353,
        altitude_m: -2.5,
        horizontal_dilution: 1.25,
        speed_kmh: 40.0,
        course_deg: 180.0,
    }
}

#[test]
fn positions_are_reported_independently_of_routing() {
    let mut rig = Rig::new();
    rig.sink.clear();
    let tx = rig.queue.sender();

    tx.post(LoopEvent::Position(Ok(sample(FixQuality::NoFix))));
    tx.post(LoopEvent::Position(Err(TransportError::new(1, "no data"))));
    tx.post(LoopEvent::Position(Ok(sample(FixQuality::DeadReckoning))));
    rig.pump(500);

    let [AppEvent::Position(no_fix), AppEvent::PositionError(err), AppEvent::Position(dr)] = &rig.sink.events[..]
    else {
        panic!("unexpected records {:?}", rig.sink.events);
    };
    assert_eq!(
        no_fix.lines(),
        [
            "FIX status is NO FIX",
            "Satellites used [5]",
            "Date [2/11/2024]",
            "Time [17:04:09]"
        ]
    );
    assert_eq!(err.code, 1);
    assert_eq!(dr.lines().len(), 9);
    assert!(dr.lines().contains(&"Altitude above/below mean sea level: -2.5 m".to_string()));
    assert!(rig.led.calls().is_empty());
}
