use crate::types::{FeatureRecord, Point2D};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Outbound message catalog. Event names and payload field casing are fixed
/// by the estimation service and must not drift.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "calibrationDataOneByOneUpdate")]
    CalibrationSample(CalibrationSample),
    #[serde(rename = "calibrationStatus")]
    CalibrationFinished(bool),
    #[serde(rename = "validationData")]
    ValidationSample(ValidationSample),
    #[serde(rename = "validationStatus")]
    ValidationFinished(bool),
    #[serde(rename = "realTimeData")]
    LiveSample(LiveSample),
    #[serde(rename = "reset")]
    Reset,
}

/// Inbound notification catalog. The service answers `realTimeData` with
/// `data_response` and signals phase transitions by name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "modelTrained")]
    ModelTrained,
    #[serde(rename = "validationStatus")]
    ValidationAcknowledged,
    #[serde(rename = "data_response")]
    Prediction([f32; 2]),
    #[serde(rename = "calibrationError")]
    CalibrationError { error: String },
    #[serde(rename = "resetComplete")]
    ResetComplete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSample {
    pub screen_x: f32,
    pub screen_y: f32,
    pub left_x: f32,
    pub left_y: f32,
    pub right_x: f32,
    pub right_y: f32,
    pub nose_x: f32,
    pub nose_y: f32,
    pub blink: u8,
}

impl CalibrationSample {
    pub fn new(target: Point2D, feature: &FeatureRecord, blink_threshold: f32) -> Self {
        Self {
            screen_x: target.x,
            screen_y: target.y,
            left_x: feature.pupil_left.x,
            left_y: feature.pupil_left.y,
            right_x: feature.pupil_right.x,
            right_y: feature.pupil_right.y,
            nose_x: feature.nose.x,
            nose_y: feature.nose.y,
            blink: feature.blink_flag(blink_threshold),
        }
    }
}

// The validation channel predates the camelCase payloads on the service side
// and stays snake_case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSample {
    pub screen_x: f32,
    pub screen_y: f32,
    pub predicted_x: f32,
    pub predicted_y: f32,
}

impl ValidationSample {
    pub fn new(target: Point2D, predicted: Point2D) -> Self {
        Self {
            screen_x: target.x,
            screen_y: target.y,
            predicted_x: predicted.x,
            predicted_y: predicted.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSample {
    pub left_x: f32,
    pub left_y: f32,
    pub right_x: f32,
    pub right_y: f32,
    pub nose_x: f32,
    pub nose_y: f32,
    pub blink: u8,
    pub validation_done: bool,
}

impl LiveSample {
    pub fn new(feature: &FeatureRecord, blink_threshold: f32, validation_done: bool) -> Self {
        Self {
            left_x: feature.pupil_left.x,
            left_y: feature.pupil_left.y,
            right_x: feature.pupil_right.x,
            right_y: feature.pupil_right.y,
            nose_x: feature.nose.x,
            nose_y: feature.nose.y,
            blink: feature.blink_flag(blink_threshold),
            validation_done,
        }
    }
}

/// Serialize one outbound message as a single wire line (no trailing newline).
pub fn encode(message: &ClientMessage) -> Result<String> {
    serde_json::to_string(message).context("Failed to encode client message")
}

/// Parse one inbound wire line. Unknown events fail here and are dropped by
/// the caller; they never reach the session.
pub fn decode(line: &str) -> Result<ServerMessage> {
    serde_json::from_str(line.trim()).with_context(|| format!("Bad server message: {}", line))
}

/// Fire-and-forget outbound channel. Implementations never block the tick
/// loop; a send during disconnect or backpressure is dropped.
pub trait MessageSink {
    fn send(&mut self, message: ClientMessage);
}
