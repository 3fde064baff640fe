//! Rectangle-seeded foreground/background segmentation
//!
//! The pipeline talks to segmentation through the [`Segmenter`] trait so a
//! different classifier can be swapped in. [`GrabCut`] is the built-in
//! implementation.

mod gmm;
mod grabcut;
mod graph;

pub use grabcut::GrabCut;

use crate::config::RectanglePolicy;
use crate::error::{ExtractionError, Result};
use crate::types::{Rectangle, SegmentationMask};
use image::RgbImage;

/// Per-pixel classification state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Definitely background, never relabeled
    Background,
    /// Definitely foreground, never relabeled
    Foreground,
    /// Currently believed to be background
    ProbableBackground,
    /// Currently believed to be foreground
    ProbableForeground,
}

impl Label {
    /// Belongs to the background colour model
    #[must_use]
    pub fn is_background(self) -> bool {
        matches!(self, Self::Background | Self::ProbableBackground)
    }

    /// Selected for the output cutout
    #[must_use]
    pub fn is_foreground(self) -> bool {
        matches!(self, Self::Foreground | Self::ProbableForeground)
    }

    /// May change on the next graph cut
    #[must_use]
    pub fn is_undecided(self) -> bool {
        matches!(self, Self::ProbableBackground | Self::ProbableForeground)
    }
}

/// A binary foreground classifier seeded by a rectangle
pub trait Segmenter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// How rectangles that leave the image are treated
    fn rectangle_policy(&self) -> RectanglePolicy;

    /// Check `rect` against an image of `dimensions` and return the
    /// rectangle segmentation will actually use
    ///
    /// # Errors
    /// `InvalidRectangle` for degenerate or out-of-bounds rectangles.
    fn validate_rectangle(&self, dimensions: (u32, u32), rect: Rectangle) -> Result<Rectangle> {
        validate_rectangle(rect, dimensions, self.rectangle_policy())
    }

    /// Classify every pixel of `image` given the seed rectangle
    ///
    /// # Errors
    /// `InvalidRectangle` when `rect` fails validation; no mask is produced.
    fn segment(&self, image: &RgbImage, rect: Rectangle) -> Result<SegmentationMask>;
}

/// Validate a seed rectangle against the image bounds
///
/// # Errors
/// `InvalidRectangle` when the rectangle has no area, when it leaves the
/// image under [`RectanglePolicy::Reject`], or when nothing is left after
/// clamping under [`RectanglePolicy::Clamp`].
pub fn validate_rectangle(
    rect: Rectangle,
    dimensions: (u32, u32),
    policy: RectanglePolicy,
) -> Result<Rectangle> {
    let (width, height) = dimensions;

    if rect.is_degenerate() {
        return Err(ExtractionError::invalid_rectangle(format!(
            "{} has no area",
            rect
        )));
    }

    if rect.fits_within(width, height) {
        return Ok(rect);
    }

    match policy {
        RectanglePolicy::Reject => Err(ExtractionError::invalid_rectangle(format!(
            "{} exceeds image bounds {}x{}",
            rect, width, height
        ))),
        RectanglePolicy::Clamp => {
            let clamped = rect.clamp_to(width, height);
            if clamped.is_degenerate() {
                return Err(ExtractionError::invalid_rectangle(format!(
                    "{} does not overlap image {}x{}",
                    rect, width, height
                )));
            }
            Ok(clamped)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_rectangles_rejected() {
        for policy in [RectanglePolicy::Reject, RectanglePolicy::Clamp] {
            let zero_width = Rectangle::new(10, 10, 10, 50);
            let zero_height = Rectangle::new(10, 10, 50, 10);
            assert!(matches!(
                validate_rectangle(zero_width, (100, 100), policy),
                Err(ExtractionError::InvalidRectangle(_))
            ));
            assert!(matches!(
                validate_rectangle(zero_height, (100, 100), policy),
                Err(ExtractionError::InvalidRectangle(_))
            ));
        }
    }

    #[test]
    fn test_partial_overlap_follows_policy() {
        let rect = Rectangle::new(-10, 20, 60, 130);

        let err = validate_rectangle(rect, (100, 100), RectanglePolicy::Reject).unwrap_err();
        assert!(err.to_string().contains("exceeds image bounds"));

        let clamped = validate_rectangle(rect, (100, 100), RectanglePolicy::Clamp).unwrap();
        assert_eq!(clamped, Rectangle::new(0, 20, 60, 100));
    }

    #[test]
    fn test_disjoint_rectangle_rejected_even_when_clamping() {
        let rect = Rectangle::new(150, 150, 200, 200);
        assert!(validate_rectangle(rect, (100, 100), RectanglePolicy::Clamp).is_err());
    }

    #[test]
    fn test_label_classes() {
        assert!(Label::Background.is_background());
        assert!(Label::ProbableBackground.is_background());
        assert!(Label::ProbableForeground.is_foreground());
        assert!(Label::Foreground.is_foreground());
        assert!(!Label::Foreground.is_undecided());
        assert!(Label::ProbableBackground.is_undecided());
    }
}
