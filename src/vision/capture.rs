/// Frame acquisition.
///
/// The tracker only sees [`FrameSource`]; camera backends live outside the
/// crate. [`TestPattern`] stands in when no camera is wired up.
use std::f32::consts::TAU;

use super::frame::{hsv_to_rgb, Frame};
use crate::error::{Error, Result};

pub trait FrameSource: Send {
    /// Grab the next frame. Called once per sequencer tick.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Let go of the device. Called once at shutdown.
    fn release(&mut self) {}
}

/// A colored disc orbiting the centre of a dark frame. Its radius breathes
/// so the tracked area, and with it the hue voice's pitch, keeps moving.
#[derive(Debug, Clone)]
pub struct TestPattern {
    width: usize,
    height: usize,
    hue: u8,
    frame_index: u64,
    released: bool,
}

impl TestPattern {
    pub fn new(width: usize, height: usize, hue: u8) -> Self {
        Self {
            width,
            height,
            hue: hue.min(179),
            frame_index: 0,
            released: false,
        }
    }

    pub fn set_hue(&mut self, hue: u8) {
        self.hue = hue.min(179);
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn render(&self) -> Frame {
        let mut frame = Frame::filled(self.width, self.height, [20, 20, 24]);
        let t = self.frame_index as f32;
        let short_side = self.width.min(self.height) as f32;
        let orbit = short_side * 0.25;
        let radius = short_side * (0.12 + 0.06 * (t * TAU / 40.0).sin());
        let cx = self.width as f32 / 2.0 + orbit * (t * TAU / 120.0).cos();
        let cy = self.height as f32 / 2.0 + orbit * (t * TAU / 120.0).sin();
        let color = hsv_to_rgb([self.hue, 255, 255]);

        let r2 = radius * radius;
        for y in 0..self.height {
            for x in 0..self.width {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    frame.set_pixel(x, y, color);
                }
            }
        }
        frame
    }
}

impl FrameSource for TestPattern {
    fn read_frame(&mut self) -> Result<Frame> {
        if self.released {
            return Err(Error::Capture("test pattern released".to_string()));
        }
        let frame = self.render();
        self.frame_index += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        self.released = true;
    }
}
