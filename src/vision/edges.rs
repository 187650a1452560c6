/// Edge map for the preview pane: 5×5 Gaussian blur, then Canny.
use std::collections::VecDeque;

use super::frame::GrayImage;

pub const CANNY_LOW: f32 = 50.0;
pub const CANNY_HIGH: f32 = 150.0;

/// Binomial approximation of a 5-tap Gaussian.
const GAUSS_5: [u32; 5] = [1, 4, 6, 4, 1];

/// Mirror an out-of-range index back into `0..len` without repeating the
/// edge sample.
fn reflect_101(i: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let mut i = i;
    while i < 0 || i >= len {
        i = if i < 0 { -i } else { 2 * (len - 1) - i };
    }
    i as usize
}

pub fn gaussian_blur_5(image: &GrayImage) -> GrayImage {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return image.clone();
    }
    let mut horizontal = vec![0u32; w * h];
    for y in 0..h {
        for x in 0..w {
            horizontal[y * w + x] = GAUSS_5
                .iter()
                .enumerate()
                .map(|(k, &c)| c * image.get(reflect_101(x as isize + k as isize - 2, w), y) as u32)
                .sum();
        }
    }
    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let acc: u32 = GAUSS_5
                .iter()
                .enumerate()
                .map(|(k, &c)| c * horizontal[reflect_101(y as isize + k as isize - 2, h) * w + x])
                .sum();
            // 256 = 16 * 16, rounded
            out.set(x, y, ((acc + 128) >> 8) as u8);
        }
    }
    out
}

/// Canny edges with the L1 gradient norm. Edge pixels are 255.
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (w, h) = (image.width(), image.height());
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }

    let px = |x: isize, y: isize| -> i32 {
        let cx = x.clamp(0, w as isize - 1) as usize;
        let cy = y.clamp(0, h as isize - 1) as usize;
        image.get(cx, cy) as i32
    };

    let mut gx = vec![0i32; w * h];
    let mut gy = vec![0i32; w * h];
    let mut magnitude = vec![0.0f32; w * h];
    for y in 0..h as isize {
        for x in 0..w as isize {
            let dx = (px(x + 1, y - 1) + 2 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x - 1, y) + px(x - 1, y + 1));
            let dy = (px(x - 1, y + 1) + 2 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x, y - 1) + px(x + 1, y - 1));
            let i = y as usize * w + x as usize;
            gx[i] = dx;
            gy[i] = dy;
            magnitude[i] = (dx.abs() + dy.abs()) as f32;
        }
    }

    let mag = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0.0
        } else {
            magnitude[y as usize * w + x as usize]
        }
    };

    // thin to local maxima along the gradient, split into strong and weak
    let tan_22_5 = 0.414_213_56f32;
    let tan_67_5 = 2.414_213_6f32;
    let mut candidate = vec![false; w * h];
    let mut queue = VecDeque::new();
    for y in 0..h as isize {
        for x in 0..w as isize {
            let i = y as usize * w + x as usize;
            let m = magnitude[i];
            if m <= low {
                continue;
            }
            let ax = gx[i].abs() as f32;
            let ay = gy[i].abs() as f32;
            let is_max = if ay < ax * tan_22_5 {
                m > mag(x - 1, y) && m >= mag(x + 1, y)
            } else if ay > ax * tan_67_5 {
                m > mag(x, y - 1) && m >= mag(x, y + 1)
            } else if (gx[i] < 0) != (gy[i] < 0) {
                m > mag(x + 1, y - 1) && m > mag(x - 1, y + 1)
            } else {
                m > mag(x - 1, y - 1) && m > mag(x + 1, y + 1)
            };
            if !is_max {
                continue;
            }
            candidate[i] = true;
            if m > high {
                out.set(x as usize, y as usize, 255);
                queue.push_back((x, y));
            }
        }
    }

    // hysteresis: keep weak pixels connected to a strong one
    while let Some((x, y)) = queue.pop_front() {
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let i = ny as usize * w + nx as usize;
                if candidate[i] && out.get(nx as usize, ny as usize) == 0 {
                    out.set(nx as usize, ny as usize, 255);
                    queue.push_back((nx, ny));
                }
            }
        }
    }
    out
}

/// Blur then Canny with the preview thresholds.
pub fn edge_map(gray: &GrayImage) -> GrayImage {
    canny(&gaussian_blur_5(gray), CANNY_LOW, CANNY_HIGH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_image(w: usize, h: usize, split: usize) -> GrayImage {
        let mut image = GrayImage::new(w, h);
        for y in 0..h {
            for x in split..w {
                image.set(x, y, 255);
            }
        }
        image
    }

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-3, 1), 0);
    }

    #[test]
    fn test_blur_keeps_flat_image() {
        let mut image = GrayImage::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                image.set(x, y, 77);
            }
        }
        assert_eq!(gaussian_blur_5(&image), image);
    }

    #[test]
    fn test_blur_softens_step() {
        let blurred = gaussian_blur_5(&step_image(20, 4, 10));
        assert_eq!(blurred.get(0, 0), 0);
        assert_eq!(blurred.get(19, 0), 255);
        let mid = blurred.get(10, 2);
        assert!(mid > 0 && mid < 255);
    }

    #[test]
    fn test_canny_finds_step_edge() {
        let edges = edge_map(&step_image(20, 10, 10));
        assert!(edges.count_nonzero() >= 10);
        for y in 0..10 {
            for x in 0..20 {
                if edges.get(x, y) != 0 {
                    assert!((8..=11).contains(&x), "stray edge at ({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_canny_ignores_flat_and_faint() {
        assert_eq!(edge_map(&GrayImage::new(16, 16)).count_nonzero(), 0);

        let mut faint = GrayImage::new(16, 16);
        for y in 0..16 {
            for x in 8..16 {
                faint.set(x, y, 5);
            }
        }
        assert_eq!(edge_map(&faint).count_nonzero(), 0);
    }
}
