/// Image buffers and the pixel operations the tracker needs.
///
/// Colors follow the usual 8-bit camera conventions: RGB channels 0–255,
/// and HSV with hue halved into 0–179 so it fits a byte.
use crate::error::{Error, Result};

/// Inclusive-exclusive pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// Packed 8-bit RGB image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let expected = width * height * 3;
        if data.len() != expected {
            return Err(Error::FrameSize {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, color: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&color);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: [u8; 3]) {
        if x < self.width && y < self.height {
            let i = (y * self.width + x) * 3;
            self.data[i..i + 3].copy_from_slice(&color);
        }
    }

    /// Paint a filled rectangle, clipped to the frame.
    pub fn fill_rect(&mut self, rect: BoundingBox, color: [u8; 3]) {
        for y in rect.y..(rect.y + rect.height).min(self.height) {
            for x in rect.x..(rect.x + rect.width).min(self.width) {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// Flip left to right.
    pub fn mirrored(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for y in 0..self.height {
            for x in (0..self.width).rev() {
                data.extend_from_slice(&self.pixel(x, y));
            }
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Bilinear resize with pixel centres aligned.
    pub fn resized(&self, width: usize, height: usize) -> Self {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut data = Vec::with_capacity(width * height * 3);
        if self.width == 0 || self.height == 0 {
            data.resize(width * height * 3, 0);
            return Self {
                width,
                height,
                data,
            };
        }

        let sx = self.width as f32 / width as f32;
        let sy = self.height as f32 / height as f32;
        for y in 0..height {
            let (y0, y1, fy) = sample_coord(y, sy, self.height);
            for x in 0..width {
                let (x0, x1, fx) = sample_coord(x, sx, self.width);
                let p00 = self.pixel(x0, y0);
                let p10 = self.pixel(x1, y0);
                let p01 = self.pixel(x0, y1);
                let p11 = self.pixel(x1, y1);
                for c in 0..3 {
                    let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
                    let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
                    let v = top * (1.0 - fy) + bottom * fy;
                    data.push(v.round().clamp(0.0, 255.0) as u8);
                }
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Luma with the BT.601 weights.
    pub fn to_gray(&self) -> GrayImage {
        let data = self
            .data
            .chunks_exact(3)
            .map(|p| {
                let y = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Outline `rect` with a border `thickness` pixels wide, centred on the
    /// rectangle's edges.
    pub fn draw_rect(&mut self, rect: BoundingBox, color: [u8; 3], thickness: usize) {
        let t = thickness.max(1);
        let before = (t - 1) / 2;
        let x0 = rect.x.saturating_sub(before);
        let y0 = rect.y.saturating_sub(before);
        let x1 = rect.x + rect.width;
        let y1 = rect.y + rect.height;
        let outer_w = x1 + t - before - x0;
        let outer_h = y1 + t - before - y0;

        let bands = [
            BoundingBox { x: x0, y: y0, width: outer_w, height: t },
            BoundingBox { x: x0, y: y1.saturating_sub(before), width: outer_w, height: t },
            BoundingBox { x: x0, y: y0, width: t, height: outer_h },
            BoundingBox { x: x1.saturating_sub(before), y: y0, width: t, height: outer_h },
        ];
        for band in bands {
            self.fill_rect(band, color);
        }
    }
}

fn sample_coord(dst: usize, scale: f32, len: usize) -> (usize, usize, f32) {
    let src = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
    let i0 = (src.floor() as usize).min(len - 1);
    let i1 = (i0 + 1).min(len - 1);
    (i0, i1, src - i0 as f32)
}

/// Single-channel 8-bit image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let expected = width * height;
        if data.len() != expected {
            return Err(Error::FrameSize {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }

    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Expand to RGB for display.
    pub fn to_rgb(&self) -> Frame {
        let mut data = Vec::with_capacity(self.data.len() * 3);
        for &v in &self.data {
            data.extend_from_slice(&[v, v, v]);
        }
        Frame {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

/// RGB to HSV with H in 0–179 and S, V in 0–255.
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| c as f32);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;
    let s = if v > 0.0 { diff * 255.0 / v } else { 0.0 };
    let mut h = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }
    let h = (h / 2.0).round() as u32 % 180;
    [h as u8, s.round() as u8, v as u8]
}

/// HSV (H 0–179) back to RGB.
pub fn hsv_to_rgb(hsv: [u8; 3]) -> [u8; 3] {
    let h = (hsv[0] as f32 * 2.0) % 360.0;
    let s = hsv[1] as f32 / 255.0;
    let v = hsv[2] as f32;
    let c = v * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = v - c;
    [r, g, b].map(|ch| (ch + m).round().clamp(0.0, 255.0) as u8)
}

/// Minimum saturation and value for a pixel to count as colored.
pub const MASK_FLOOR: u8 = 100;

/// Binary mask (0/255) of pixels with hue in `[hue - 10·sens, hue + 10·sens]`
/// and saturation and value at least [`MASK_FLOOR`]. The band does not wrap
/// around the hue circle.
pub fn hue_mask(frame: &Frame, target_hue: u8, sensitivity: u8) -> GrayImage {
    let half_width = 10 * sensitivity as i32;
    let low = target_hue as i32 - half_width;
    let high = target_hue as i32 + half_width;
    let data = frame
        .data
        .chunks_exact(3)
        .map(|p| {
            let [h, s, v] = rgb_to_hsv([p[0], p[1], p[2]]);
            let h = h as i32;
            if h >= low && h <= high && s >= MASK_FLOOR && v >= MASK_FLOOR {
                255
            } else {
                0
            }
        })
        .collect();
    GrayImage {
        width: frame.width,
        height: frame.height,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_size_is_checked() {
        assert!(Frame::new(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::new(2, 2, vec![0; 11]),
            Err(Error::FrameSize { expected: 12, got: 11 })
        ));
    }

    #[test]
    fn test_hsv_matches_camera_convention() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([255, 255, 0]), [30, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
    }

    #[test]
    fn test_hsv_to_rgb() {
        assert_eq!(hsv_to_rgb([0, 255, 255]), [255, 0, 0]);
        assert_eq!(hsv_to_rgb([60, 255, 255]), [0, 255, 0]);
        assert_eq!(hsv_to_rgb([120, 255, 255]), [0, 0, 255]);
        assert_eq!(hsv_to_rgb([30, 255, 255]), [255, 255, 0]);
    }

    #[test]
    fn test_mirror() {
        let mut frame = Frame::filled(3, 1, [0, 0, 0]);
        frame.set_pixel(0, 0, [9, 9, 9]);
        let flipped = frame.mirrored();
        assert_eq!(flipped.pixel(2, 0), [9, 9, 9]);
        assert_eq!(flipped.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_resize_keeps_flat_color() {
        let frame = Frame::filled(640, 480, [10, 200, 30]);
        let small = frame.resized(400, 225);
        assert_eq!(small.width(), 400);
        assert_eq!(small.height(), 225);
        assert_eq!(small.pixel(0, 0), [10, 200, 30]);
        assert_eq!(small.pixel(399, 224), [10, 200, 30]);
    }

    #[test]
    fn test_resize_interpolates() {
        let frame = Frame::new(2, 1, vec![0, 0, 0, 200, 200, 200]).unwrap();
        let wide = frame.resized(4, 1);
        assert_eq!(wide.pixel(0, 0), [0, 0, 0]);
        assert_eq!(wide.pixel(1, 0), [50, 50, 50]);
        assert_eq!(wide.pixel(2, 0), [150, 150, 150]);
        assert_eq!(wide.pixel(3, 0), [200, 200, 200]);
    }

    #[test]
    fn test_mask_band_and_floors() {
        let mut frame = Frame::filled(4, 1, [0, 0, 0]);
        frame.set_pixel(0, 0, [0, 255, 0]); // hue 60
        frame.set_pixel(1, 0, [255, 0, 0]); // hue 0
        frame.set_pixel(2, 0, [60, 80, 60]); // too dark
        frame.set_pixel(3, 0, [200, 255, 200]); // too pale
        let mask = hue_mask(&frame, 50, 1);
        assert_eq!(mask.data(), &[255, 0, 0, 0]);

        let wide = hue_mask(&frame, 50, 5);
        assert_eq!(wide.data(), &[255, 255, 0, 0]);
    }

    #[test]
    fn test_draw_rect_outline() {
        let mut frame = Frame::filled(20, 20, [0, 0, 0]);
        let rect = BoundingBox { x: 5, y: 5, width: 6, height: 4 };
        frame.draw_rect(rect, [255, 0, 0], 2);
        assert_eq!(frame.pixel(5, 5), [255, 0, 0]);
        assert_eq!(frame.pixel(6, 6), [255, 0, 0]);
        assert_eq!(frame.pixel(11, 9), [255, 0, 0]);
        assert_eq!(frame.pixel(8, 7), [0, 0, 0]);
        assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn test_gray_round_trip_for_display() {
        let frame = Frame::filled(2, 2, [255, 255, 255]);
        let gray = frame.to_gray();
        assert_eq!(gray.count_nonzero(), 4);
        assert_eq!(gray.to_rgb().pixel(1, 1), [255, 255, 255]);
    }
}
