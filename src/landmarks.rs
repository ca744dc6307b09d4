use crate::sampler::{
    LEFT_IRIS_HORIZONTAL, LEFT_IRIS_VERTICAL, MESH_LANDMARK_COUNT, NOSE_TIP,
    RIGHT_IRIS_HORIZONTAL, RIGHT_IRIS_VERTICAL,
};
use crate::types::{NormalizedLandmark, RawDetection};
use anyhow::Result;

/// Per-frame landmark provider. The real extractor (camera + face mesh) is
/// an external collaborator behind this seam; `None` means no face this
/// frame.
pub trait LandmarkSource {
    fn name(&self) -> String;
    fn next(&mut self) -> Result<Option<RawDetection>>;
}

/// Source that synthesizes a face without any camera. Pupils wander in a
/// slow circle, with a blink roughly every three seconds at 30 fps.
pub struct SimulatedSource {
    frame_count: u32,
}

const BLINK_PERIOD_FRAMES: u32 = 90;
const BLINK_LENGTH_FRAMES: u32 = 4;

impl SimulatedSource {
    pub fn new() -> Self {
        Self { frame_count: 0 }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

fn place_iris(
    landmarks: &mut [NormalizedLandmark],
    horizontal: (usize, usize),
    vertical: (usize, usize),
    cx: f32,
    cy: f32,
    radius: f32,
) {
    landmarks[horizontal.0] = NormalizedLandmark {
        x: cx - radius,
        y: cy,
        z: 0.0,
    };
    landmarks[horizontal.1] = NormalizedLandmark {
        x: cx + radius,
        y: cy,
        z: 0.0,
    };
    landmarks[vertical.0] = NormalizedLandmark {
        x: cx,
        y: cy - radius,
        z: 0.0,
    };
    landmarks[vertical.1] = NormalizedLandmark {
        x: cx,
        y: cy + radius,
        z: 0.0,
    };
}

impl LandmarkSource for SimulatedSource {
    fn name(&self) -> String {
        "Simulated Face".to_string()
    }

    fn next(&mut self) -> Result<Option<RawDetection>> {
        self.frame_count += 1;

        // Slow circular wander around the frame center.
        let t = self.frame_count as f32 * 0.05;
        let cx = 0.5 + t.cos() * 0.05;
        let cy = 0.45 + t.sin() * 0.04;

        let mut landmarks = vec![NormalizedLandmark::default(); MESH_LANDMARK_COUNT];
        place_iris(
            &mut landmarks,
            LEFT_IRIS_HORIZONTAL,
            LEFT_IRIS_VERTICAL,
            cx - 0.06,
            cy,
            0.012,
        );
        place_iris(
            &mut landmarks,
            RIGHT_IRIS_HORIZONTAL,
            RIGHT_IRIS_VERTICAL,
            cx + 0.06,
            cy,
            0.012,
        );
        landmarks[NOSE_TIP] = NormalizedLandmark {
            x: cx,
            y: cy + 0.12,
            z: 0.0,
        };

        let blinking = self.frame_count % BLINK_PERIOD_FRAMES < BLINK_LENGTH_FRAMES;
        let blink = if blinking { 0.8 } else { 0.05 };

        Ok(Some(RawDetection {
            landmarks,
            blink_left: blink,
            blink_right: blink,
        }))
    }
}
