/// A point in canvas pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A single landmark in normalized [0,1] image coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Raw per-frame output of the landmark extractor: the full normalized mesh
/// plus the two eye-blink blendshape scores.
#[derive(Debug, Clone)]
pub struct RawDetection {
    pub landmarks: Vec<NormalizedLandmark>,
    pub blink_left: f32,
    pub blink_right: f32,
}

/// Canonical per-frame feature snapshot. Produced by the sampler, read-only
/// everywhere else. Coordinates are in canvas pixel space.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureRecord {
    pub pupil_left: Point2D,
    pub pupil_right: Point2D,
    pub nose: Point2D,
    pub blink_left: f32,
    pub blink_right: f32,
}

impl FeatureRecord {
    /// Blink classification, derived on demand. The boundary is inclusive.
    pub fn is_blinking(&self, threshold: f32) -> bool {
        self.blink_left >= threshold || self.blink_right >= threshold
    }

    /// Blink state as the 0/1 flag the wire protocol carries.
    pub fn blink_flag(&self, threshold: f32) -> u8 {
        u8::from(self.is_blinking(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blink_threshold_is_inclusive() {
        let mut record = FeatureRecord {
            blink_left: 0.25,
            blink_right: 0.0,
            ..FeatureRecord::default()
        };
        assert!(record.is_blinking(0.25));
        assert_eq!(record.blink_flag(0.25), 1);

        record.blink_left = 0.249_999;
        record.blink_right = 0.1;
        assert!(!record.is_blinking(0.25));
        assert_eq!(record.blink_flag(0.25), 0);
    }

    #[test]
    fn blink_triggers_on_either_eye() {
        let record = FeatureRecord {
            blink_left: 0.0,
            blink_right: 0.9,
            ..FeatureRecord::default()
        };
        assert!(record.is_blinking(0.25));
    }
}
