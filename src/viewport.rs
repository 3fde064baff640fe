//! Mapping pointer positions over a letterboxed view back to bitmap pixels
//!
//! A bitmap shown inside a larger view is scaled (uniformly in the usual
//! fit-center case) and centred, leaving symmetric empty borders. The
//! forward transform is `view = offset + pixel * scale`; this module
//! computes its inverse. Nothing here is cached: the transform is derived
//! from the current bitmap and view sizes on every call.

use crate::error::{ExtractionError, Result};
use crate::types::Point;
use serde::{Deserialize, Serialize};

/// Width and height pair in either bitmap or view units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A raw pointer position in view coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// What the host view reports about the bitmap it currently displays
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportInfo {
    /// Intrinsic size of the displayed bitmap, `None` when nothing is shown
    pub bitmap: Option<Size>,

    /// Size of the containing view
    pub view: Size,

    /// Scale components of the view's image matrix, when the host exposes
    /// them. `None` means the bitmap is fit-centred.
    pub scale: Option<(f64, f64)>,
}

impl ViewportInfo {
    /// Fit-centred bitmap inside `view`
    #[must_use]
    pub fn fit_center(bitmap: Size, view: Size) -> Self {
        Self {
            bitmap: Some(bitmap),
            view,
            scale: None,
        }
    }

    /// Bitmap drawn with explicit matrix scale components
    #[must_use]
    pub fn with_scale(bitmap: Size, view: Size, scale_x: f64, scale_y: f64) -> Self {
        Self {
            bitmap: Some(bitmap),
            view,
            scale: Some((scale_x, scale_y)),
        }
    }

    /// A view showing nothing
    #[must_use]
    pub fn empty(view: Size) -> Self {
        Self {
            bitmap: None,
            view,
            scale: None,
        }
    }

    /// Derive the transform for the current state of the view
    #[must_use]
    pub fn transform(&self) -> ViewportTransform {
        match (self.bitmap, self.scale) {
            (None, _) => ViewportTransform::NEUTRAL,
            (Some(bitmap), None) => ViewportTransform::fit_center(bitmap, self.view),
            (Some(bitmap), Some((sx, sy))) => {
                ViewportTransform::from_scale(bitmap, self.view, sx, sy)
            },
        }
    }
}

/// Scale and letterbox offsets of a displayed bitmap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    /// Displayed bitmap size in view units after rounding
    pub actual_width: f64,
    pub actual_height: f64,
}

impl ViewportTransform {
    /// Transform of a view with no bitmap
    pub const NEUTRAL: ViewportTransform = ViewportTransform {
        scale_x: 0.0,
        scale_y: 0.0,
        offset_x: 0.0,
        offset_y: 0.0,
        actual_width: 0.0,
        actual_height: 0.0,
    };

    /// Transform for explicit scale components, bitmap centred in the view
    #[must_use]
    pub fn from_scale(bitmap: Size, view: Size, scale_x: f64, scale_y: f64) -> Self {
        let degenerate_scale = !(scale_x.is_finite() && scale_y.is_finite())
            || scale_x <= 0.0
            || scale_y <= 0.0;
        if bitmap.is_empty() || view.is_empty() || degenerate_scale {
            return Self::NEUTRAL;
        }

        let actual_width = (f64::from(bitmap.width) * scale_x).round();
        let actual_height = (f64::from(bitmap.height) * scale_y).round();

        Self {
            scale_x,
            scale_y,
            offset_x: (f64::from(view.width) - actual_width) / 2.0,
            offset_y: (f64::from(view.height) - actual_height) / 2.0,
            actual_width,
            actual_height,
        }
    }

    /// Uniform scale that fits the whole bitmap inside the view
    #[must_use]
    pub fn fit_center(bitmap: Size, view: Size) -> Self {
        if bitmap.is_empty() || view.is_empty() {
            return Self::NEUTRAL;
        }
        let scale = (f64::from(view.width) / f64::from(bitmap.width))
            .min(f64::from(view.height) / f64::from(bitmap.height));
        Self::from_scale(bitmap, view, scale, scale)
    }

    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.scale_x <= 0.0 || self.scale_y <= 0.0
    }

    /// Map a view-space position back to bitmap pixel space
    ///
    /// Positions in the letterbox borders map outside `[0, size)`; callers
    /// that need in-bounds pixels check the result against the bitmap.
    ///
    /// # Errors
    /// `NoImageLoaded` when the transform is neutral.
    pub fn map_to_pixel(&self, event: PointerEvent) -> Result<Point> {
        if self.is_neutral() {
            return Err(ExtractionError::NoImageLoaded);
        }
        Ok(Point::new(
            (event.x - self.offset_x) / self.scale_x,
            (event.y - self.offset_y) / self.scale_y,
        ))
    }

    /// Forward transform, bitmap pixel to view position
    #[must_use]
    pub fn map_to_view(&self, pixel: Point) -> PointerEvent {
        PointerEvent::new(
            self.offset_x + pixel.x * self.scale_x,
            self.offset_y + pixel.y * self.scale_y,
        )
    }
}

/// Map a pointer event through the current viewport state
///
/// # Errors
/// `NoImageLoaded` when no bitmap is displayed.
pub fn map_to_pixel(event: PointerEvent, viewport: &ViewportInfo) -> Result<Point> {
    viewport.transform().map_to_pixel(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} +/- {tolerance}, got {actual}"
        );
    }

    #[test]
    fn test_fit_center_landscape_bitmap_in_portrait_view() {
        // 400x200 bitmap in 200x400 view: scale 0.5, 150px bars top and bottom
        let t = ViewportTransform::fit_center(Size::new(400, 200), Size::new(200, 400));
        assert_close(t.scale_x, 0.5, 1e-12);
        assert_close(t.scale_y, 0.5, 1e-12);
        assert_close(t.offset_x, 0.0, 1e-12);
        assert_close(t.offset_y, 150.0, 1e-12);

        let p = t.map_to_pixel(PointerEvent::new(0.0, 150.0)).unwrap();
        assert_close(p.x, 0.0, 1e-9);
        assert_close(p.y, 0.0, 1e-9);

        let p = t.map_to_pixel(PointerEvent::new(200.0, 250.0)).unwrap();
        assert_close(p.x, 400.0, 1e-9);
        assert_close(p.y, 200.0, 1e-9);
    }

    #[test]
    fn test_center_maps_to_bitmap_center() {
        let bitmaps = [(100, 100), (640, 480), (480, 640), (1920, 1080), (33, 77)];
        let views = [(320, 480), (1080, 1920), (500, 500), (731, 411)];

        for &(bw, bh) in &bitmaps {
            for &(vw, vh) in &views {
                let t = ViewportTransform::fit_center(Size::new(bw, bh), Size::new(vw, vh));
                let center = t
                    .map_to_pixel(PointerEvent::new(f64::from(vw) / 2.0, f64::from(vh) / 2.0))
                    .unwrap();
                // Rounding of the displayed size moves the centre by at most
                // a quarter view pixel per axis
                let tolerance = 1.0_f64.max(0.5 / t.scale_x);
                assert_close(center.x, f64::from(bw) / 2.0, tolerance);
                assert_close(center.y, f64::from(bh) / 2.0, tolerance);
            }
        }
    }

    #[test]
    fn test_forward_then_inverse() {
        let t = ViewportTransform::from_scale(Size::new(300, 200), Size::new(1000, 800), 2.5, 2.5);
        let pixel = Point::new(123.0, 45.5);
        let back = t.map_to_pixel(t.map_to_view(pixel)).unwrap();
        assert_close(back.x, pixel.x, 1e-9);
        assert_close(back.y, pixel.y, 1e-9);
    }

    #[test]
    fn test_letterbox_border_maps_outside_bitmap() {
        let t = ViewportTransform::fit_center(Size::new(100, 50), Size::new(100, 100));
        let p = t.map_to_pixel(PointerEvent::new(10.0, 5.0)).unwrap();
        assert!(p.y < 0.0);
    }

    #[test]
    fn test_odd_letterbox_keeps_half_pixel_offset() {
        // 51px of slack split over two bars: 25.5 each, not truncated to 25
        let t = ViewportTransform::fit_center(Size::new(100, 50), Size::new(100, 101));
        assert_close(t.offset_y, 25.5, 1e-12);

        let center = t.map_to_pixel(PointerEvent::new(50.0, 50.5)).unwrap();
        assert_close(center.x, 50.0, 1e-12);
        assert_close(center.y, 25.0, 1e-12);
        let top = t.map_to_pixel(PointerEvent::new(0.0, 25.5)).unwrap();
        assert_close(top.y, 0.0, 1e-12);
    }

    #[test]
    fn test_no_bitmap_gives_neutral_transform() {
        let info = ViewportInfo::empty(Size::new(320, 480));
        assert!(info.transform().is_neutral());
        assert!(matches!(
            map_to_pixel(PointerEvent::new(10.0, 10.0), &info),
            Err(ExtractionError::NoImageLoaded)
        ));

        let zero = ViewportTransform::fit_center(Size::new(0, 10), Size::new(100, 100));
        assert!(zero.is_neutral());
        let bad_scale =
            ViewportTransform::from_scale(Size::new(10, 10), Size::new(100, 100), 0.0, 1.0);
        assert!(bad_scale.is_neutral());
    }

    #[test]
    fn test_transform_recomputed_per_call() {
        let view = Size::new(400, 400);
        let first = ViewportInfo::fit_center(Size::new(200, 100), view);
        let second = ViewportInfo::fit_center(Size::new(100, 200), view);
        let event = PointerEvent::new(200.0, 200.0);

        let a = map_to_pixel(event, &first).unwrap();
        let b = map_to_pixel(event, &second).unwrap();
        assert_close(a.x, 100.0, 1e-9);
        assert_close(a.y, 50.0, 1e-9);
        assert_close(b.x, 50.0, 1e-9);
        assert_close(b.y, 100.0, 1e-9);
    }

    #[test]
    fn test_explicit_matrix_scale() {
        let info = ViewportInfo::with_scale(Size::new(200, 100), Size::new(600, 300), 2.0, 2.0);
        let t = info.transform();
        assert_close(t.offset_x, 100.0, 1e-12);
        assert_close(t.offset_y, 50.0, 1e-12);
        let p = map_to_pixel(PointerEvent::new(300.0, 150.0), &info).unwrap();
        assert_close(p.x, 100.0, 1e-9);
        assert_close(p.y, 50.0, 1e-9);
    }
}
