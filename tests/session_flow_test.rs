use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use gazer_client::config::SessionConfig;
use gazer_client::display::{NullSink, PresentationSink};
use gazer_client::landmarks::SimulatedSource;
use gazer_client::points;
use gazer_client::protocol::{ClientMessage, MessageSink, ServerMessage};
use gazer_client::sampler::FeatureSampler;
use gazer_client::scheduler::{run_session_loop, SessionEvent};
use gazer_client::session::{Phase, Session};
use gazer_client::types::{FeatureRecord, Point2D};

#[derive(Clone, Default)]
struct RecordingMessages(Arc<Mutex<Vec<ClientMessage>>>);

impl MessageSink for RecordingMessages {
    fn send(&mut self, message: ClientMessage) {
        self.0.lock().unwrap().push(message);
    }
}

impl RecordingMessages {
    fn count<F: Fn(&ClientMessage) -> bool>(&self, f: F) -> usize {
        self.0.lock().unwrap().iter().filter(|m| f(m)).count()
    }
}

#[derive(Clone, Default)]
struct SilentDisplay;

impl PresentationSink for SilentDisplay {
    fn draw_shrinking_point(&mut self, _point: Point2D, _progress: f32) {}
    fn draw_target_and_prediction(&mut self, _target: Point2D, _predicted: Point2D) {}
    fn draw_prediction(&mut self, _point: Point2D) {}
    fn draw_accuracy_text(&mut self, _percent: f32) {}
    fn clear(&mut self) {}
}

fn feature() -> FeatureRecord {
    FeatureRecord {
        pupil_left: Point2D::new(420.0, 310.0),
        pupil_right: Point2D::new(500.0, 312.0),
        nose: Point2D::new(460.0, 400.0),
        blink_left: 0.05,
        blink_right: 0.05,
    }
}

/// Walks the entire scripted session at real sample counts, checking the
/// phase order, the message counts, and the final accuracy number.
#[test]
fn full_session_walk_at_production_counts() {
    let config = SessionConfig::default();
    let messages = RecordingMessages::default();
    let mut session = Session::new(
        config.clone(),
        1000.0,
        800.0,
        Box::new(SilentDisplay),
        Box::new(messages.clone()),
    );
    session.set_extractor_ready();
    session.start_calibration().unwrap();
    assert_eq!(session.phase(), Phase::Calibrating);

    let f = feature();

    // Calibration: 21 points x 100 samples.
    let calibration_ticks = 21 * config.points_per_calibration as usize;
    for _ in 0..calibration_ticks {
        session.tick(Some(&f));
    }
    assert_eq!(session.phase(), Phase::AwaitingTraining);
    assert_eq!(
        messages.count(|m| matches!(m, ClientMessage::CalibrationSample(_))),
        calibration_ticks
    );
    assert_eq!(
        messages.count(|m| matches!(m, ClientMessage::CalibrationFinished(true))),
        1
    );

    // Model training completes remotely.
    session.handle_server_message(ServerMessage::ModelTrained);
    assert_eq!(session.phase(), Phase::Validating);
    assert_eq!(session.sequence(), points::validation_points(1000.0, 800.0));

    // Validation: 9 points x 300 samples, then the two-step handshake.
    let validation_ticks = 9 * config.points_per_validation as usize;
    for _ in 0..validation_ticks {
        session.tick(Some(&f));
    }
    assert_eq!(
        messages.count(|m| matches!(m, ClientMessage::ValidationSample(_))),
        validation_ticks
    );
    assert_eq!(
        messages.count(|m| matches!(m, ClientMessage::ValidationFinished(true))),
        1
    );
    assert_eq!(session.phase(), Phase::Validating);

    session.handle_server_message(ServerMessage::ValidationAcknowledged);
    assert_eq!(session.phase(), Phase::Testing);

    // Testing: 5 random points x 400 samples with a constant (30, 20) px
    // prediction offset. Mean abs error = (30 + 20) / 2 = 25 px -> 50%.
    let test_ticks = config.test_point_count * config.points_per_test as usize;
    for _ in 0..test_ticks {
        let target = session.current_target().unwrap();
        session.handle_server_message(ServerMessage::Prediction([
            target.x + 30.0,
            target.y + 20.0,
        ]));
        session.tick(Some(&f));
    }
    assert_eq!(session.phase(), Phase::Tracking);
    let accuracy = session.accuracy().unwrap();
    assert!((accuracy - 50.0).abs() < 1e-3, "accuracy was {}", accuracy);

    // Live tracking now tags samples with validationDone = true.
    session.tick(Some(&f));
    let last = messages.0.lock().unwrap().last().cloned().unwrap();
    assert!(matches!(last, ClientMessage::LiveSample(s) if s.validation_done));
}

/// Same walk through the public event loop with the simulated landmark
/// source, at reduced sample counts.
#[test]
fn event_loop_runs_a_session_end_to_end() {
    let config = SessionConfig {
        points_per_calibration: 3,
        points_per_validation: 2,
        points_per_test: 2,
        test_point_count: 2,
        blink_threshold: 0.25,
    };
    let messages = RecordingMessages::default();
    let mut session = Session::new(
        config,
        1000.0,
        800.0,
        Box::new(NullSink),
        Box::new(messages.clone()),
    );
    let mut sampler = FeatureSampler::new(1000.0, 800.0);
    let mut source = SimulatedSource::new();

    let (tx, rx) = mpsc::channel();
    tx.send(SessionEvent::Tick).unwrap();
    tx.send(SessionEvent::StartRequested).unwrap();
    for _ in 0..(21 * 3) {
        tx.send(SessionEvent::Tick).unwrap();
    }
    tx.send(SessionEvent::Inbound(ServerMessage::ModelTrained)).unwrap();
    for _ in 0..(9 * 2) {
        tx.send(SessionEvent::Tick).unwrap();
    }
    tx.send(SessionEvent::Inbound(ServerMessage::ValidationAcknowledged))
        .unwrap();
    for _ in 0..(2 * 2) {
        tx.send(SessionEvent::Tick).unwrap();
    }
    tx.send(SessionEvent::Stop).unwrap();

    run_session_loop(&mut session, &mut sampler, &mut source, &rx).unwrap();

    assert_eq!(session.phase(), Phase::Tracking);
    assert_eq!(
        messages.count(|m| matches!(m, ClientMessage::CalibrationFinished(true))),
        1
    );
    assert_eq!(
        messages.count(|m| matches!(m, ClientMessage::ValidationFinished(true))),
        1
    );
    assert!(session.accuracy().is_some());
}
