//! Core value types shared by the mapping, selection and extraction stages

use crate::error::{ExtractionError, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Mask value for a foreground pixel
pub const MASK_FOREGROUND: u8 = 255;

/// Mask value for a background pixel
pub const MASK_BACKGROUND: u8 = 0;

/// A coordinate in pixel space of the source image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// The "unset" marker
    pub const UNSET: Point = Point { x: -1.0, y: -1.0 };

    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// A point counts as set only when neither coordinate equals the sentinel
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_set(&self) -> bool {
        self.x != Self::UNSET.x && self.y != Self::UNSET.y
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::UNSET
    }
}

/// Axis-aligned rectangle in integer pixel coordinates
///
/// `right` and `bottom` are exclusive, so a pixel `(x, y)` lies inside when
/// `left <= x < right` and `top <= y < bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Rectangle {
    #[must_use]
    pub const fn new(left: i64, top: i64, right: i64, bottom: i64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build a normalized rectangle from two opposite corners given in any order
    #[must_use]
    pub fn from_points(a: Point, b: Point) -> Self {
        let left = a.x.min(b.x).floor() as i64;
        let top = a.y.min(b.y).floor() as i64;
        let right = a.x.max(b.x).floor() as i64;
        let bottom = a.y.max(b.y).floor() as i64;
        Self::new(left, top, right, bottom)
    }

    /// Rectangle spanning a whole `width` x `height` image
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, i64::from(width), i64::from(height))
    }

    #[must_use]
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    #[must_use]
    pub fn area(&self) -> i64 {
        self.width().max(0) * self.height().max(0)
    }

    /// Zero or negative extent on either axis
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Whether the rectangle lies entirely inside a `width` x `height` image
    #[must_use]
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.right <= i64::from(width)
            && self.bottom <= i64::from(height)
    }

    /// Intersection with the image bounds (may come out degenerate)
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let (w, h) = (i64::from(width), i64::from(height));
        Self::new(
            self.left.clamp(0, w),
            self.top.clamp(0, h),
            self.right.clamp(0, w),
            self.bottom.clamp(0, h),
        )
    }

    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }
}

impl std::fmt::Display for Rectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}) x [{}, {}) ({}x{})",
            self.left,
            self.right,
            self.top,
            self.bottom,
            self.width(),
            self.height()
        )
    }
}

/// A decoded source photo together with the path it was read from
///
/// The pixel buffer is never mutated; every derived image is a new buffer.
#[derive(Debug, Clone)]
pub struct SourceImage {
    path: PathBuf,
    pixels: RgbImage,
}

impl SourceImage {
    /// Decode an image file into an RGB8 buffer
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::services::ImageIOService::load_source(path)
    }

    /// Wrap an already decoded buffer
    pub fn from_pixels<P: Into<PathBuf>>(path: P, pixels: RgbImage) -> Self {
        Self {
            path: path.into(),
            pixels,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Binary foreground mask with the same dimensions as its source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Row-major mask values, `MASK_FOREGROUND` or `MASK_BACKGROUND`
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Create a mask from raw row-major data
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = dimensions.0 as usize * dimensions.1 as usize;
        if data.len() != expected {
            return Err(ExtractionError::processing(format!(
                "Mask data has {} values, expected {} for {}x{}",
                data.len(),
                expected,
                dimensions.0,
                dimensions.1
            )));
        }
        Ok(Self { data, dimensions })
    }

    /// Build a mask by evaluating `is_foreground` at every pixel
    pub fn from_fn<F>(width: u32, height: u32, mut is_foreground: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(if is_foreground(x, y) {
                    MASK_FOREGROUND
                } else {
                    MASK_BACKGROUND
                });
            }
        }
        Self {
            data,
            dimensions: (width, height),
        }
    }

    /// Mask selecting every pixel
    #[must_use]
    pub fn filled(width: u32, height: u32) -> Self {
        Self::from_fn(width, height, |_, _| true)
    }

    /// Mask selecting no pixel
    #[must_use]
    pub fn cleared(width: u32, height: u32) -> Self {
        Self::from_fn(width, height, |_, _| false)
    }

    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        let index = y as usize * self.dimensions.0 as usize + x as usize;
        self.data.get(index).copied().unwrap_or(MASK_BACKGROUND) != MASK_BACKGROUND
    }

    /// Foreground/background pixel counts
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self
            .data
            .iter()
            .filter(|&&v| v != MASK_BACKGROUND)
            .count();
        let foreground_ratio = if total_pixels == 0 {
            0.0
        } else {
            foreground_pixels as f64 / total_pixels as f64
        };

        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels: total_pixels - foreground_pixels,
            foreground_ratio,
        }
    }
}

/// Summary of a segmentation mask
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f64,
}

/// Wall-clock breakdown of one extraction run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// GrabCut segmentation time in milliseconds
    pub segmentation_ms: u64,

    /// Compositing time in milliseconds
    pub compositing_ms: u64,

    /// JPEG encoding and file write time in milliseconds
    pub encode_ms: u64,

    /// Total time in milliseconds
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Time not attributed to any stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        self.total_ms
            .saturating_sub(self.segmentation_ms + self.compositing_ms + self.encode_ms)
    }
}

/// Outcome of a successful extraction
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// Where the composited image was written
    pub output_path: PathBuf,

    /// The rectangle actually used for segmentation
    pub rectangle: Rectangle,

    /// Mask summary
    pub mask_statistics: MaskStatistics,

    /// Stage timings
    pub timings: ProcessingTimings,
}
