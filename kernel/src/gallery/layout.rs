// Layout Helpers
//
// Pure geometry used before an image is handed to the encoder.

use serde::{Deserialize, Serialize};

/// Width and height in pixels (or points, for screen bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Largest size with `image`'s aspect ratio that fits inside `bounds`.
///
/// Scales up as well as down. Returns `None` when either size is empty.
pub fn fit_within(image: Size, bounds: Size) -> Option<Size> {
    if image.is_empty() || bounds.is_empty() {
        return None;
    }

    let scale = f64::min(
        f64::from(bounds.width) / f64::from(image.width),
        f64::from(bounds.height) / f64::from(image.height),
    );

    let scaled = |side: u32, limit: u32| -> u32 {
        ((f64::from(side) * scale).round() as u32).clamp(1, limit)
    };

    Some(Size::new(
        scaled(image.width, bounds.width),
        scaled(image.height, bounds.height),
    ))
}
