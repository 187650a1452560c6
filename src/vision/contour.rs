/// Outer boundaries of the blobs in a binary mask.
///
/// Each 8-connected region is traced once, starting from its first pixel in
/// raster order, with the border-following rule of Suzuki & Abe. Holes are
/// not traced.
use std::collections::VecDeque;

use super::frame::{BoundingBox, GrayImage};

/// Neighbour offsets in clockwise order (y grows downwards), starting east.
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];
const WEST: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<(i32, i32)>,
}

impl Contour {
    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    /// Area of the polygon through the boundary pixel centres.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let (x0, y0) = self.points[i];
                let (x1, y1) = self.points[(i + 1) % n];
                x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        for &(x, y) in &self.points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        if self.points.is_empty() {
            return BoundingBox { x: 0, y: 0, width: 0, height: 0 };
        }
        BoundingBox {
            x: min_x as usize,
            y: min_y as usize,
            width: (max_x - min_x + 1) as usize,
            height: (max_y - min_y + 1) as usize,
        }
    }
}

/// Trace the outer contour of every region, in raster order of each
/// region's first pixel.
pub fn find_contours(mask: &GrayImage) -> Vec<Contour> {
    let (w, h) = (mask.width(), mask.height());
    let mut labelled = vec![false; w * h];
    let mut contours = Vec::new();
    let mut queue = VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            if mask.get(x, y) == 0 || labelled[y * w + x] {
                continue;
            }
            // flood the region so its other pixels aren't taken as new starts
            labelled[y * w + x] = true;
            queue.push_back((x, y));
            while let Some((cx, cy)) = queue.pop_front() {
                for (dx, dy) in DIRS {
                    let nx = cx as i32 + dx;
                    let ny = cy as i32 + dy;
                    if !is_set(mask, nx, ny) {
                        continue;
                    }
                    let i = ny as usize * w + nx as usize;
                    if !labelled[i] {
                        labelled[i] = true;
                        queue.push_back((nx as usize, ny as usize));
                    }
                }
            }
            contours.push(trace(mask, (x as i32, y as i32)));
        }
    }
    contours
}

/// The first contour with the largest area.
pub fn largest(contours: &[Contour]) -> Option<&Contour> {
    contours.iter().fold(None, |best: Option<&Contour>, c| match best {
        Some(b) if b.area() >= c.area() => Some(b),
        _ => Some(c),
    })
}

fn is_set(mask: &GrayImage, x: i32, y: i32) -> bool {
    x >= 0
        && y >= 0
        && (x as usize) < mask.width()
        && (y as usize) < mask.height()
        && mask.get(x as usize, y as usize) != 0
}

fn step(p: (i32, i32), dir: usize) -> (i32, i32) {
    (p.0 + DIRS[dir].0, p.1 + DIRS[dir].1)
}

fn direction(from: (i32, i32), to: (i32, i32)) -> usize {
    let d = (to.0 - from.0, to.1 - from.1);
    DIRS.iter().position(|&o| o == d).unwrap_or(WEST)
}

fn trace(mask: &GrayImage, start: (i32, i32)) -> Contour {
    // the pixel west of a raster-order start is background; search clockwise from it
    let first = (0..8)
        .map(|k| step(start, (WEST + k) % 8))
        .find(|&(x, y)| is_set(mask, x, y));
    let Some(first) = first else {
        return Contour { points: vec![start] };
    };

    let mut points = Vec::new();
    let mut prev = first;
    let mut current = start;
    loop {
        // counterclockwise around `current`, starting just past `prev`
        let back = direction(current, prev);
        let next = (1..=8)
            .map(|k| step(current, (back + 8 - k) % 8))
            .find(|&(x, y)| is_set(mask, x, y))
            .unwrap_or(prev);
        points.push(current);
        if next == start && current == first {
            break;
        }
        prev = current;
        current = next;
    }
    Contour { points }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> GrayImage {
        let h = rows.len();
        let w = rows[0].len();
        let data = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| if b == b'#' { 255 } else { 0 }))
            .collect();
        GrayImage::from_raw(w, h, data).unwrap()
    }

    #[test]
    fn test_single_pixel() {
        let mask = mask_from(&["...", ".#.", "..."]);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points(), &[(1, 1)]);
        assert_eq!(contours[0].area(), 0.0);
        assert_eq!(
            contours[0].bounding_box(),
            BoundingBox { x: 1, y: 1, width: 1, height: 1 }
        );
    }

    #[test]
    fn test_square_block() {
        let mask = mask_from(&["##..", "##..", "...."]);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points(), &[(0, 0), (0, 1), (1, 1), (1, 0)]);
        assert_eq!(contours[0].area(), 1.0);
    }

    #[test]
    fn test_rectangle_area_uses_pixel_centres() {
        let mut mask = GrayImage::new(30, 20);
        for y in 5..15 {
            for x in 3..13 {
                mask.set(x, y, 255);
            }
        }
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].area(), 81.0);
        assert_eq!(
            contours[0].bounding_box(),
            BoundingBox { x: 3, y: 5, width: 10, height: 10 }
        );
    }

    #[test]
    fn test_diagonal_pixels_are_one_region() {
        let mask = mask_from(&["#...", ".#..", "..#."]);
        assert_eq!(find_contours(&mask).len(), 1);
    }

    #[test]
    fn test_shape_with_hole_traces_outside_only() {
        let mask = mask_from(&[".....", ".###.", ".#.#.", ".###.", "....."]);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points().len(), 8);
        assert_eq!(contours[0].area(), 4.0);
    }

    #[test]
    fn test_largest_prefers_first_on_tie() {
        let mask = mask_from(&["##..##", "##..##", "......", "###..."]);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 3);
        let best = largest(&contours).unwrap();
        assert_eq!(best.bounding_box().x, 0);
        assert_eq!(best.bounding_box().y, 0);
        assert!(largest(&[]).is_none());
    }
}
