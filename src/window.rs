use crate::display::PresentationSink;
use crate::scheduler::SessionEvent;
use crate::types::Point2D;
use anyhow::Result;
use log::warn;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::sync::mpsc::Sender;

const BACKGROUND: u32 = 0x00101418;
const TARGET_COLOR: u32 = 0x00E84040;
const PREDICTION_COLOR: u32 = 0x0040D080;
const PREDICTION_RADIUS: f32 = 8.0;

/// Full-window presentation surface. Redraws the whole buffer on every
/// command and forwards Space / R / Escape / window-close as session events,
/// so it never mutates the session itself.
pub struct WindowSink {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    point_radius: f32,
    events: Sender<SessionEvent>,
    stop_sent: bool,
}

impl WindowSink {
    pub fn new(
        title: &str,
        width: usize,
        height: usize,
        point_radius: f32,
        events: Sender<SessionEvent>,
    ) -> Result<Self> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| anyhow::anyhow!("Failed to create window: {}", e))?;

        window.limit_update_rate(Some(std::time::Duration::from_micros(16600))); // ~60 FPS

        Ok(Self {
            window,
            buffer: vec![BACKGROUND; width * height],
            width,
            height,
            point_radius,
            events,
            stop_sent: false,
        })
    }

    fn fill(&mut self, color: u32) {
        self.buffer.fill(color);
    }

    fn fill_circle(&mut self, center: Point2D, radius: f32, color: u32) {
        let r = radius.max(2.0) as i32;
        let cx = center.x as i32;
        let cy = center.y as i32;

        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    let px = cx + dx;
                    let py = cy + dy;
                    if px >= 0 && px < self.width as i32 && py >= 0 && py < self.height as i32 {
                        let idx = py as usize * self.width + px as usize;
                        self.buffer[idx] = color;
                    }
                }
            }
        }
    }

    /// Push the buffer and translate window input into session events.
    fn present(&mut self) {
        if let Err(e) = self
            .window
            .update_with_buffer(&self.buffer, self.width, self.height)
        {
            warn!("Window update failed: {}", e);
        }

        for key in self.window.get_keys_pressed(KeyRepeat::No) {
            match key {
                Key::Space => {
                    let _ = self.events.send(SessionEvent::StartRequested);
                }
                Key::R => {
                    let _ = self.events.send(SessionEvent::ResetRequested);
                }
                _ => {}
            }
        }

        let wants_stop = !self.window.is_open() || self.window.is_key_down(Key::Escape);
        if wants_stop && !self.stop_sent {
            self.stop_sent = true;
            let _ = self.events.send(SessionEvent::Stop);
        }
    }
}

impl PresentationSink for WindowSink {
    fn draw_shrinking_point(&mut self, point: Point2D, progress: f32) {
        self.fill(BACKGROUND);
        let radius = self.point_radius * (1.0 - progress.clamp(0.0, 1.0));
        self.fill_circle(point, radius, TARGET_COLOR);
        self.present();
    }

    fn draw_target_and_prediction(&mut self, target: Point2D, predicted: Point2D) {
        self.fill(BACKGROUND);
        self.fill_circle(target, self.point_radius * 0.5, TARGET_COLOR);
        self.fill_circle(predicted, PREDICTION_RADIUS, PREDICTION_COLOR);
        self.present();
    }

    fn draw_prediction(&mut self, point: Point2D) {
        self.fill(BACKGROUND);
        self.fill_circle(point, PREDICTION_RADIUS, PREDICTION_COLOR);
        self.present();
    }

    fn draw_accuracy_text(&mut self, percent: f32) {
        self.window
            .set_title(&format!("Gazer - accuracy {:.1}%", percent));
        self.fill(BACKGROUND);
        self.present();
    }

    fn clear(&mut self) {
        self.fill(BACKGROUND);
        self.present();
    }
}
