use crate::types::{FeatureRecord, NormalizedLandmark, Point2D, RawDetection};
use log::warn;

/// Full face mesh size with iris refinement enabled.
pub const MESH_LANDMARK_COUNT: usize = 478;

/// Nose tip landmark index.
pub(crate) const NOSE_TIP: usize = 1;

// Iris boundary landmarks: one horizontal pair and one vertical pair per eye.
pub(crate) const RIGHT_IRIS_HORIZONTAL: (usize, usize) = (469, 471);
pub(crate) const RIGHT_IRIS_VERTICAL: (usize, usize) = (470, 472);
pub(crate) const LEFT_IRIS_HORIZONTAL: (usize, usize) = (474, 476);
pub(crate) const LEFT_IRIS_VERTICAL: (usize, usize) = (475, 477);

/// Whether a tick produced a fresh feature record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Updated,
    NoFace,
}

/// Adapts raw detector output into the canonical [`FeatureRecord`].
///
/// The sampler owns the single mutable record. A no-face frame keeps the
/// previous record intact so readers always see valid (possibly stale) data,
/// and reports [`SampleOutcome::NoFace`] so the session skips emission for
/// that tick.
pub struct FeatureSampler {
    width: f32,
    height: f32,
    current: Option<FeatureRecord>,
}

impl FeatureSampler {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            current: None,
        }
    }

    /// Feed one frame's detection result. Returns whether the record was
    /// refreshed this tick.
    pub fn ingest(&mut self, detection: Option<&RawDetection>) -> SampleOutcome {
        let Some(detection) = detection else {
            return SampleOutcome::NoFace;
        };

        if detection.landmarks.len() < MESH_LANDMARK_COUNT {
            warn!(
                "Detector returned {} landmarks, expected {}; treating as no face",
                detection.landmarks.len(),
                MESH_LANDMARK_COUNT
            );
            return SampleOutcome::NoFace;
        }

        self.current = Some(FeatureRecord {
            pupil_left: self.iris_center(
                &detection.landmarks,
                LEFT_IRIS_HORIZONTAL,
                LEFT_IRIS_VERTICAL,
            ),
            pupil_right: self.iris_center(
                &detection.landmarks,
                RIGHT_IRIS_HORIZONTAL,
                RIGHT_IRIS_VERTICAL,
            ),
            nose: self.scale(&detection.landmarks[NOSE_TIP]),
            blink_left: detection.blink_left,
            blink_right: detection.blink_right,
        });
        SampleOutcome::Updated
    }

    /// The most recent feature record, if a face has ever been seen.
    pub fn current(&self) -> Option<&FeatureRecord> {
        self.current.as_ref()
    }

    /// True once the sampler has produced at least one record.
    pub fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    /// Iris center: midpoint of the horizontal-pair midpoint and the
    /// vertical-pair midpoint, scaled to canvas pixels.
    fn iris_center(
        &self,
        landmarks: &[NormalizedLandmark],
        horizontal: (usize, usize),
        vertical: (usize, usize),
    ) -> Point2D {
        let h = midpoint(&landmarks[horizontal.0], &landmarks[horizontal.1]);
        let v = midpoint(&landmarks[vertical.0], &landmarks[vertical.1]);
        Point2D::new(
            (h.x + v.x) / 2.0 * self.width,
            (h.y + v.y) / 2.0 * self.height,
        )
    }

    fn scale(&self, landmark: &NormalizedLandmark) -> Point2D {
        Point2D::new(landmark.x * self.width, landmark.y * self.height)
    }
}

fn midpoint(a: &NormalizedLandmark, b: &NormalizedLandmark) -> NormalizedLandmark {
    NormalizedLandmark {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
        z: (a.z + b.z) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection_with(
        set: &[(usize, f32, f32)],
        blink_left: f32,
        blink_right: f32,
    ) -> RawDetection {
        let mut landmarks = vec![NormalizedLandmark::default(); MESH_LANDMARK_COUNT];
        for &(idx, x, y) in set {
            landmarks[idx] = NormalizedLandmark { x, y, z: 0.0 };
        }
        RawDetection {
            landmarks,
            blink_left,
            blink_right,
        }
    }

    #[test]
    fn iris_center_is_midpoint_of_both_pairs() {
        // Left iris boundary forming a square around (0.4, 0.5)
        let detection = detection_with(
            &[
                (474, 0.38, 0.5),
                (476, 0.42, 0.5),
                (475, 0.4, 0.48),
                (477, 0.4, 0.52),
                (NOSE_TIP, 0.5, 0.6),
            ],
            0.0,
            0.0,
        );

        let mut sampler = FeatureSampler::new(1000.0, 800.0);
        assert_eq!(sampler.ingest(Some(&detection)), SampleOutcome::Updated);

        let record = sampler.current().unwrap();
        assert!((record.pupil_left.x - 400.0).abs() < 1e-3);
        assert!((record.pupil_left.y - 400.0).abs() < 1e-3);
        assert!((record.nose.x - 500.0).abs() < 1e-3);
        assert!((record.nose.y - 480.0).abs() < 1e-3);
    }

    #[test]
    fn no_face_keeps_previous_record() {
        let detection = detection_with(&[(NOSE_TIP, 0.5, 0.5)], 0.1, 0.2);
        let mut sampler = FeatureSampler::new(640.0, 480.0);

        assert_eq!(sampler.ingest(Some(&detection)), SampleOutcome::Updated);
        let before = *sampler.current().unwrap();

        assert_eq!(sampler.ingest(None), SampleOutcome::NoFace);
        let after = sampler.current().unwrap();
        assert_eq!(before.nose, after.nose);
        assert_eq!(before.blink_left, after.blink_left);
    }

    #[test]
    fn short_mesh_is_treated_as_no_face() {
        let detection = RawDetection {
            landmarks: vec![NormalizedLandmark::default(); 68],
            blink_left: 0.0,
            blink_right: 0.0,
        };
        let mut sampler = FeatureSampler::new(640.0, 480.0);
        assert_eq!(sampler.ingest(Some(&detection)), SampleOutcome::NoFace);
        assert!(sampler.current().is_none());
        assert!(!sampler.is_ready());
    }
}
