/// Hue tracking: find the biggest patch of the target color and turn its
/// area into a pitch.
use super::contour::{find_contours, largest};
use super::edges::edge_map;
use super::frame::{hsv_to_rgb, hue_mask, BoundingBox, Frame, GrayImage};
use crate::scale::quantize;
use crate::settings::HueSettings;

/// Working resolution of the tracker and its preview images.
pub const CANVAS_WIDTH: usize = 400;
pub const CANVAS_HEIGHT: usize = 225;

const BASE_FREQUENCY: f64 = 220.0;
const AREA_WRAP: f64 = 300.0;
const OUTLINE_THICKNESS: usize = 2;

/// The detection in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HueSample {
    pub bounding_box: BoundingBox,
    pub area: f64,
    /// `220 + (area mod 300)`.
    pub raw_frequency: f32,
    /// `raw_frequency` snapped to the scale.
    pub frequency: f32,
}

/// Preview images, all at canvas size.
#[derive(Debug, Clone, PartialEq)]
pub struct Visuals {
    /// Mirrored camera image with the detection outlined.
    pub annotated: Frame,
    pub edges: GrayImage,
    pub mask: GrayImage,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackerOutput {
    pub sample: Option<HueSample>,
    pub visuals: Option<Visuals>,
}

impl TrackerOutput {
    pub fn detected(&self) -> bool {
        self.sample.is_some()
    }
}

/// Raw pitch for a contour area.
pub fn area_to_frequency(area: f64) -> f32 {
    (BASE_FREQUENCY + area.rem_euclid(AREA_WRAP)) as f32
}

#[derive(Debug, Clone, Default)]
pub struct HueTracker;

impl HueTracker {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, frame: &Frame, settings: &HueSettings) -> TrackerOutput {
        if !settings.enabled {
            return TrackerOutput::default();
        }

        let canvas = frame.mirrored().resized(CANVAS_WIDTH, CANVAS_HEIGHT);
        let mask = hue_mask(&canvas, settings.target_hue, settings.sensitivity);
        let edges = edge_map(&canvas.to_gray());

        let contours = find_contours(&mask);
        let mut annotated = canvas;
        let sample = largest(&contours).map(|contour| {
            let bounding_box = contour.bounding_box();
            let area = contour.area();
            let raw_frequency = area_to_frequency(area);
            HueSample {
                bounding_box,
                area,
                raw_frequency,
                frequency: quantize(raw_frequency),
            }
        });

        if let Some(sample) = &sample {
            let outline = hsv_to_rgb([settings.target_hue, 255, 255]);
            annotated.draw_rect(sample.bounding_box, outline, OUTLINE_THICKNESS);
            log::debug!(
                "Hue {} detected: area {:.1}, {:.2} Hz -> {:.2} Hz",
                settings.target_hue,
                sample.area,
                sample.raw_frequency,
                sample.frequency
            );
        }

        TrackerOutput {
            sample,
            visuals: Some(Visuals {
                annotated,
                edges,
                mask,
            }),
        }
    }
}
