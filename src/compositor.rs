//! Hard cutout compositing onto a white backdrop, plus the selection preview

use crate::error::{ExtractionError, Result};
use crate::types::{Rectangle, SegmentationMask};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Colour of every pixel outside the mask
pub const BACKDROP: Rgb<u8> = Rgb([255, 255, 255]);

/// Select each pixel from `image` where `mask` is set and white elsewhere
///
/// No blending takes place: a pixel is either copied verbatim or replaced by
/// [`BACKDROP`]. The source image is left untouched.
///
/// # Errors
/// `Processing` when the mask and image dimensions differ.
pub fn compose(image: &RgbImage, mask: &SegmentationMask) -> Result<RgbImage> {
    if image.dimensions() != mask.dimensions {
        return Err(ExtractionError::processing(format!(
            "Mask is {}x{} but image is {}x{}",
            mask.dimensions.0,
            mask.dimensions.1,
            image.width(),
            image.height()
        )));
    }

    Ok(RgbImage::from_fn(image.width(), image.height(), |x, y| {
        if mask.is_foreground(x, y) {
            *image.get_pixel(x, y)
        } else {
            BACKDROP
        }
    }))
}

/// Copy of `image` with the outline of `rect` drawn on top
///
/// The outline is `stroke` pixels thick and centred on the rectangle edges;
/// parts outside the image are clipped.
#[must_use]
pub fn render_selection_preview(
    image: &RgbImage,
    rect: Rectangle,
    color: [u8; 3],
    stroke: u32,
) -> RgbImage {
    let mut canvas = image.clone();
    let half = i64::from(stroke / 2);
    // One pixel of slack on each side keeps clipped edges off the image
    let bound_x = |v: i64| v.clamp(-1, i64::from(image.width()) + 1);
    let bound_y = |v: i64| v.clamp(-1, i64::from(image.height()) + 1);

    for ring in 0..i64::from(stroke) {
        let grow = ring - half;
        let left = bound_x(rect.left.saturating_sub(grow));
        let top = bound_y(rect.top.saturating_sub(grow));
        let right = bound_x(rect.right.saturating_add(grow));
        let bottom = bound_y(rect.bottom.saturating_add(grow));
        if right <= left || bottom <= top {
            continue;
        }
        let (Ok(x), Ok(y), Ok(width), Ok(height)) = (
            i32::try_from(left),
            i32::try_from(top),
            u32::try_from(right - left),
            u32::try_from(bottom - top),
        ) else {
            continue;
        };
        draw_hollow_rect_mut(&mut canvas, Rect::at(x, y).of_size(width, height), Rgb(color));
    }

    canvas
}
