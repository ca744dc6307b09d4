use crate::types::Point2D;
use rand::Rng;

/// Calibration scan pattern as normalized (x, y) ratios. Center first, then
/// the outer ring (corners, edge midpoints, quarter points), then the inner
/// ring. The order defines the on-screen scan and must stay fixed.
const CALIBRATION_LAYOUT: [(f32, f32); 21] = [
    (0.5, 0.5),
    // outer corners
    (0.1, 0.1),
    (0.9, 0.1),
    (0.9, 0.9),
    (0.1, 0.9),
    // outer edge midpoints
    (0.5, 0.1),
    (0.9, 0.5),
    (0.5, 0.9),
    (0.1, 0.5),
    // outer quarter points
    (0.3, 0.1),
    (0.7, 0.1),
    (0.7, 0.9),
    (0.3, 0.9),
    // inner ring corners
    (0.3, 0.3),
    (0.7, 0.3),
    (0.7, 0.7),
    (0.3, 0.7),
    // inner ring edge midpoints
    (0.5, 0.3),
    (0.7, 0.5),
    (0.5, 0.7),
    (0.3, 0.5),
];

/// Validation subset: center, four corners, four inter-quadrant points.
const VALIDATION_LAYOUT: [(f32, f32); 9] = [
    (0.5, 0.5),
    (0.1, 0.1),
    (0.9, 0.1),
    (0.9, 0.9),
    (0.1, 0.9),
    (0.3, 0.3),
    (0.7, 0.3),
    (0.7, 0.7),
    (0.3, 0.7),
];

fn scale_layout(layout: &[(f32, f32)], width: f32, height: f32) -> Vec<Point2D> {
    layout
        .iter()
        .map(|&(rx, ry)| Point2D::new(rx * width, ry * height))
        .collect()
}

/// The 21-point calibration sequence scaled to the canvas.
pub fn calibration_points(width: f32, height: f32) -> Vec<Point2D> {
    scale_layout(&CALIBRATION_LAYOUT, width, height)
}

/// The 9-point validation sequence scaled to the canvas.
pub fn validation_points(width: f32, height: f32) -> Vec<Point2D> {
    scale_layout(&VALIDATION_LAYOUT, width, height)
}

/// A fresh test target, uniform over the canvas. Drawn at the start of each
/// test point rather than pre-generated as a batch.
pub fn random_test_point<R: Rng>(width: f32, height: f32, rng: &mut R) -> Point2D {
    Point2D::new(rng.gen_range(0.0..=width), rng.gen_range(0.0..=height))
}
