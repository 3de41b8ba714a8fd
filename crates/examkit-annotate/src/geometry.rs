//! Rectangle types for the two coordinate spaces the annotator works in.
//!
//! Drawing happens in device (canvas) space at the current zoom; committed
//! regions are stored in document space so they survive zoom changes and
//! rasterize correctly at any scale.

use serde::{Deserialize, Serialize};

/// Minimum candidate size in device pixels; smaller drags are discarded as
/// accidental clicks.
pub const MIN_REGION_DEVICE_PX: f64 = 10.0;

/// Axis-aligned rectangle in device (canvas) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl DeviceRect {
    /// Normalized rectangle from two drag corners, in any order.
    pub fn from_corners(start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            x0: start.0.min(end.0),
            y0: start.1.min(end.1),
            x1: start.0.max(end.0),
            y1: start.1.max(end.1),
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// True when both sides exceed [`MIN_REGION_DEVICE_PX`].
    pub fn meets_minimum_size(&self) -> bool {
        self.width() > MIN_REGION_DEVICE_PX && self.height() > MIN_REGION_DEVICE_PX
    }

    /// Convert to document space by dividing out the display zoom factor.
    pub fn to_doc(&self, zoom: f64) -> DocRect {
        DocRect {
            x0: self.x0 / zoom,
            y0: self.y0 / zoom,
            x1: self.x1 / zoom,
            y1: self.y1 / zoom,
        }
    }
}

/// Axis-aligned rectangle in document (source page) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl DocRect {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}
