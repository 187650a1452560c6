/// Camera-side pipeline: frames in, hue detections and preview images out
pub mod capture;
pub mod contour;
pub mod edges;
pub mod frame;
pub mod tracker;

pub use capture::{FrameSource, TestPattern};
pub use frame::{BoundingBox, Frame, GrayImage};
pub use tracker::{HueSample, HueTracker, TrackerOutput, Visuals, CANVAS_HEIGHT, CANVAS_WIDTH};
