use crate::config::SessionConfig;
use crate::display::PresentationSink;
use crate::points;
use crate::protocol::{
    CalibrationSample, ClientMessage, LiveSample, MessageSink, ServerMessage, ValidationSample,
};
use crate::types::{FeatureRecord, Point2D};
use anyhow::{bail, Result};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Accuracy metric normalization: this many pixels of mean absolute error
/// counts as 100% error. Fixed constant of the metric, not derived.
const ERROR_FULL_SCALE_PX: f64 = 50.0;

/// One stage of the scripted session. Strictly ordered; `AwaitingTraining`
/// and `Testing` are only entered on service notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Calibrating,
    AwaitingTraining,
    Validating,
    Testing,
    Tracking,
}

#[derive(Debug, Clone, Copy, Default)]
struct ErrorSums {
    abs_x: f64,
    abs_y: f64,
}

/// Accuracy percentage from accumulated absolute errors over `samples`
/// test ticks. Clamped to 0..100.
pub fn accuracy_from_errors(sum_abs_x: f64, sum_abs_y: f64, samples: u32) -> f32 {
    let avg_error_px = (sum_abs_x + sum_abs_y) / (2.0 * f64::from(samples));
    (100.0 - avg_error_px / ERROR_FULL_SCALE_PX * 100.0).clamp(0.0, 100.0) as f32
}

/// The session state machine. Owns all mutable session state plus its two
/// sinks; mutated only from the single event-loop thread, once per frame
/// tick or inbound notification.
pub struct Session {
    config: SessionConfig,
    width: f32,
    height: f32,

    phase: Phase,
    /// Target sequence for the current scripted phase (calibration or
    /// validation). Testing re-randomizes a single target instead.
    sequence: Vec<Point2D>,
    test_target: Point2D,
    point_index: usize,
    sample_counter: u32,

    predicted: Point2D,
    errors: ErrorSums,
    accuracy: Option<f32>,

    calibration_done: bool,
    model_trained: bool,
    validation_done: bool,
    extractor_ready: bool,

    rng: StdRng,
    display: Box<dyn PresentationSink>,
    messages: Box<dyn MessageSink>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        width: f32,
        height: f32,
        display: Box<dyn PresentationSink>,
        messages: Box<dyn MessageSink>,
    ) -> Self {
        Self::with_rng(config, width, height, display, messages, StdRng::from_entropy())
    }

    pub fn with_rng(
        config: SessionConfig,
        width: f32,
        height: f32,
        display: Box<dyn PresentationSink>,
        messages: Box<dyn MessageSink>,
        rng: StdRng,
    ) -> Self {
        Self {
            config,
            width,
            height,
            phase: Phase::Idle,
            sequence: Vec::new(),
            test_target: Point2D::default(),
            point_index: 0,
            sample_counter: 0,
            predicted: Point2D::default(),
            errors: ErrorSums::default(),
            accuracy: None,
            calibration_done: false,
            model_trained: false,
            validation_done: false,
            extractor_ready: false,
            rng,
            display,
            messages,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn point_index(&self) -> usize {
        self.point_index
    }

    pub fn sample_counter(&self) -> u32 {
        self.sample_counter
    }

    pub fn predicted(&self) -> Point2D {
        self.predicted
    }

    pub fn accuracy(&self) -> Option<f32> {
        self.accuracy
    }

    pub fn sequence(&self) -> &[Point2D] {
        &self.sequence
    }

    /// The target the session is currently sampling against, if any.
    pub fn current_target(&self) -> Option<Point2D> {
        match self.phase {
            Phase::Calibrating | Phase::Validating => self.sequence.get(self.point_index).copied(),
            Phase::Testing => Some(self.test_target),
            _ => None,
        }
    }

    /// Called by the loop once the landmark source has produced its first
    /// record. Session starts are rejected until then.
    pub fn set_extractor_ready(&mut self) {
        if !self.extractor_ready {
            self.extractor_ready = true;
            debug!("Landmark source ready");
        }
    }

    /// Begin calibration. Re-entry while a session is already running is a
    /// no-op; a missing extractor or a zero-size canvas rejects the attempt
    /// (retryable, nothing is mutated).
    pub fn start_calibration(&mut self) -> Result<()> {
        if self.phase != Phase::Idle {
            debug!("Session already active in {:?}, ignoring start", self.phase);
            return Ok(());
        }
        if !self.extractor_ready {
            bail!("Landmark source not ready, cannot start calibration");
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            bail!(
                "Canvas has degenerate size {}x{}, deferring calibration start",
                self.width,
                self.height
            );
        }

        self.sequence = points::calibration_points(self.width, self.height);
        self.point_index = 0;
        self.sample_counter = 0;
        self.phase = Phase::Calibrating;
        info!(
            "Calibration started: {} points x {} samples",
            self.sequence.len(),
            self.config.points_per_calibration
        );
        Ok(())
    }

    /// Ask the service to discard the trained model. The session itself
    /// returns to Idle when `resetComplete` arrives.
    pub fn request_reset(&mut self) {
        self.messages.send(ClientMessage::Reset);
    }

    /// Advance one frame tick. `sample` is Some only when this tick's
    /// detection produced a face; emission and counters are gated on it,
    /// drawing is not.
    pub fn tick(&mut self, sample: Option<&FeatureRecord>) {
        // Live features stream whenever the trained model can consume them,
        // independent of which scripted phase is active. The service answers
        // each one with a prediction.
        if let Some(feature) = sample {
            if self.calibration_done && self.model_trained {
                self.messages.send(ClientMessage::LiveSample(LiveSample::new(
                    feature,
                    self.config.blink_threshold,
                    self.validation_done,
                )));
            }
        }

        match self.phase {
            Phase::Idle | Phase::AwaitingTraining => self.display.clear(),
            Phase::Calibrating => self.tick_calibrating(sample),
            Phase::Validating => self.tick_validating(sample),
            Phase::Testing => self.tick_testing(sample),
            // Tracking draws on prediction arrival, not on the tick.
            Phase::Tracking => {}
        }
    }

    /// Dispatch one inbound notification. Notifications for a phase that is
    /// not awaiting them are logged and ignored.
    pub fn handle_server_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::ModelTrained => self.on_model_trained(),
            ServerMessage::ValidationAcknowledged => self.on_validation_acknowledged(),
            ServerMessage::Prediction([x, y]) => {
                self.predicted = Point2D::new(x, y);
                // Validating/Testing render target + prediction on their own
                // tick; only live tracking forwards it directly.
                if self.phase == Phase::Tracking {
                    self.display.draw_prediction(self.predicted);
                }
            }
            ServerMessage::CalibrationError { error } => {
                error!("Service rejected calibration data: {}", error);
            }
            ServerMessage::ResetComplete => self.reset(),
        }
    }

    fn tick_calibrating(&mut self, sample: Option<&FeatureRecord>) {
        let target = self.sequence[self.point_index];
        let progress = self.sample_counter as f32 / self.config.points_per_calibration as f32;
        self.display.draw_shrinking_point(target, progress);

        let Some(feature) = sample else { return };
        self.messages
            .send(ClientMessage::CalibrationSample(CalibrationSample::new(
                target,
                feature,
                self.config.blink_threshold,
            )));

        self.sample_counter += 1;
        if self.sample_counter == self.config.points_per_calibration {
            self.sample_counter = 0;
            self.point_index += 1;
            if self.point_index == self.sequence.len() {
                self.finish_calibration();
            }
        }
    }

    fn finish_calibration(&mut self) {
        self.messages.send(ClientMessage::CalibrationFinished(true));
        self.calibration_done = true;
        self.phase = Phase::AwaitingTraining;
        self.display.clear();
        info!("Calibration data complete, waiting for model training");
    }

    fn tick_validating(&mut self, sample: Option<&FeatureRecord>) {
        if self.point_index >= self.sequence.len() {
            // Locally exhausted: finished notification is out, parked until
            // the service acknowledges.
            self.display.clear();
            return;
        }

        let target = self.sequence[self.point_index];
        self.display.draw_target_and_prediction(target, self.predicted);

        if sample.is_none() {
            return;
        }
        self.messages
            .send(ClientMessage::ValidationSample(ValidationSample::new(
                target,
                self.predicted,
            )));

        self.sample_counter += 1;
        if self.sample_counter == self.config.points_per_validation {
            self.sample_counter = 0;
            self.point_index += 1;
            if self.point_index == self.sequence.len() {
                self.messages.send(ClientMessage::ValidationFinished(true));
                info!("Validation sweep complete, waiting for acknowledgement");
            }
        }
    }

    fn tick_testing(&mut self, sample: Option<&FeatureRecord>) {
        let target = self.test_target;
        self.display.draw_target_and_prediction(target, self.predicted);

        if sample.is_none() {
            return;
        }
        // Errors accumulate on every valid tick, blinking or not.
        self.errors.abs_x += f64::from((self.predicted.x - target.x).abs());
        self.errors.abs_y += f64::from((self.predicted.y - target.y).abs());

        self.sample_counter += 1;
        if self.sample_counter == self.config.points_per_test {
            self.sample_counter = 0;
            self.point_index += 1;
            if self.point_index == self.config.test_point_count {
                self.finish_testing();
            } else {
                self.test_target =
                    points::random_test_point(self.width, self.height, &mut self.rng);
            }
        }
    }

    fn finish_testing(&mut self) {
        let samples = self.config.test_point_count as u32 * self.config.points_per_test;
        let accuracy = accuracy_from_errors(self.errors.abs_x, self.errors.abs_y, samples);
        self.accuracy = Some(accuracy);
        self.phase = Phase::Tracking;
        self.display.draw_accuracy_text(accuracy);
        info!("Testing complete, accuracy {:.1}%", accuracy);
    }

    fn on_model_trained(&mut self) {
        if self.phase != Phase::AwaitingTraining {
            warn!("modelTrained received in {:?}, ignoring", self.phase);
            return;
        }
        self.model_trained = true;
        self.sequence = points::validation_points(self.width, self.height);
        self.point_index = 0;
        self.sample_counter = 0;
        self.phase = Phase::Validating;
        info!(
            "Model trained, validation started: {} points x {} samples",
            self.sequence.len(),
            self.config.points_per_validation
        );
    }

    fn on_validation_acknowledged(&mut self) {
        let exhausted = self.phase == Phase::Validating && self.point_index >= self.sequence.len();
        if !exhausted {
            warn!(
                "validation acknowledgement received in {:?} (point {}), ignoring",
                self.phase, self.point_index
            );
            return;
        }
        self.validation_done = true;
        self.errors = ErrorSums::default();
        self.point_index = 0;
        self.sample_counter = 0;
        self.test_target = points::random_test_point(self.width, self.height, &mut self.rng);
        self.phase = Phase::Testing;
        info!(
            "Validation acknowledged, testing started: {} points x {} samples",
            self.config.test_point_count, self.config.points_per_test
        );
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.sequence.clear();
        self.test_target = Point2D::default();
        self.point_index = 0;
        self.sample_counter = 0;
        self.predicted = Point2D::default();
        self.errors = ErrorSums::default();
        self.accuracy = None;
        self.calibration_done = false;
        self.model_trained = false;
        self.validation_done = false;
        self.display.clear();
        info!("Session reset to idle");
    }
}
