use crate::types::Point2D;

/// Draw-command sink the session talks to. Implementations own all pixel
/// mechanics; the session only says what to show.
///
/// `progress` for the shrinking point runs 0.0 (full radius) to 1.0 (gone)
/// across the samples collected on the current target.
pub trait PresentationSink {
    fn draw_shrinking_point(&mut self, point: Point2D, progress: f32);
    fn draw_target_and_prediction(&mut self, target: Point2D, predicted: Point2D);
    fn draw_prediction(&mut self, point: Point2D);
    fn draw_accuracy_text(&mut self, percent: f32);
    fn clear(&mut self);
}

/// Sink that discards every command. Used where no surface is attached.
#[derive(Debug, Default)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn draw_shrinking_point(&mut self, _point: Point2D, _progress: f32) {}
    fn draw_target_and_prediction(&mut self, _target: Point2D, _predicted: Point2D) {}
    fn draw_prediction(&mut self, _point: Point2D) {}
    fn draw_accuracy_text(&mut self, _percent: f32) {}
    fn clear(&mut self) {}
}
