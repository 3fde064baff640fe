//! Interactive cutout session
//!
//! Glue between a host view and the extraction core: it owns the loaded
//! source image and the current rectangle selection, and turns pointer
//! events into selection transitions.

use crate::{
    compositor::render_selection_preview,
    config::ExtractionConfig,
    error::{ExtractionError, Result},
    pipeline::ExtractionPipeline,
    selection::{Selection, SelectionState},
    services::ImageIOService,
    types::SourceImage,
    viewport::{PointerEvent, Size, ViewportInfo},
};
use image::RgbImage;
use log::{debug, warn};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CutoutSession {
    image: Option<SourceImage>,
    selection: Selection,
    preview_color: [u8; 3],
    preview_stroke: u32,
}

impl Default for CutoutSession {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl CutoutSession {
    /// Empty session drawing previews in the style given by `config`
    #[must_use]
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            image: None,
            selection: Selection::EMPTY,
            preview_color: config.preview_color,
            preview_stroke: config.preview_stroke,
        }
    }

    /// Load a new source image, dropping any selection
    ///
    /// On failure the previously loaded image stays in place.
    ///
    /// # Errors
    /// `Decode` or `PermissionDenied` from loading.
    pub fn open_image<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let source = ImageIOService::load_source(path)?;
        self.set_image(source);
        Ok(())
    }

    /// Use an already decoded image, dropping any selection
    pub fn set_image(&mut self, source: SourceImage) {
        debug!(
            "Session image set to {} ({}x{})",
            source.path().display(),
            source.dimensions().0,
            source.dimensions().1
        );
        self.image = Some(source);
        self.selection = Selection::EMPTY;
    }

    #[must_use]
    pub fn image(&self) -> Option<&SourceImage> {
        self.image.as_ref()
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.selection
    }

    fn loaded(&self) -> Result<&SourceImage> {
        self.image.as_ref().ok_or(ExtractionError::NoImageLoaded)
    }

    /// Handle a pointer press at `position` inside a view of `view_size`
    /// showing the image fit-centred
    ///
    /// Returns the selection state after the transition.
    ///
    /// # Errors
    /// `NoImageLoaded` when no image is open; the selection is unchanged.
    pub fn pointer_down(
        &mut self,
        position: PointerEvent,
        view_size: Size,
    ) -> Result<SelectionState> {
        let (width, height) = self.loaded()?.dimensions();
        let viewport = ViewportInfo::fit_center(Size::new(width, height), view_size);
        let pixel = viewport.transform().map_to_pixel(position)?;

        self.selection = self.selection.add_point(pixel);
        debug!(
            "Pointer ({:.1}, {:.1}) mapped to pixel ({:.1}, {:.1}), selection {:?}",
            position.x,
            position.y,
            pixel.x,
            pixel.y,
            self.selection.state()
        );
        Ok(self.selection.state())
    }

    /// Drop the current selection
    ///
    /// # Errors
    /// `NoImageLoaded` when no image is open.
    pub fn clear_target(&mut self) -> Result<()> {
        self.loaded()?;
        self.selection = self.selection.reset();
        Ok(())
    }

    /// Run `pipeline` on the selected rectangle and return the output path
    ///
    /// The selection is cleared afterwards whether or not extraction
    /// succeeded.
    ///
    /// # Errors
    /// - `NoImageLoaded` when no image is open
    /// - `IncompleteSelection` unless both corners are picked
    /// - anything [`ExtractionPipeline::extract`] reports
    pub fn cut(&mut self, pipeline: &ExtractionPipeline) -> Result<PathBuf> {
        let source = self.loaded()?;
        let rect = self
            .selection
            .rectangle()
            .ok_or(ExtractionError::IncompleteSelection)?;

        let result = pipeline.extract(source, rect);
        if let Err(ref e) = result {
            warn!("Cut of {} failed: {}", rect, e);
        }
        self.selection = self.selection.reset();
        result
    }

    /// The loaded image with the selected rectangle outlined
    ///
    /// `None` until both corners are picked.
    ///
    /// # Errors
    /// `NoImageLoaded` when no image is open.
    pub fn preview(&self) -> Result<Option<RgbImage>> {
        let source = self.loaded()?;
        Ok(self.selection.rectangle().map(|rect| {
            render_selection_preview(source.pixels(), rect, self.preview_color, self.preview_stroke)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn session_with_image() -> CutoutSession {
        let mut session = CutoutSession::default();
        let pixels = RgbImage::from_pixel(200, 100, Rgb([40, 40, 40]));
        session.set_image(SourceImage::from_pixels("memory.png", pixels));
        session
    }

    #[test]
    fn test_guards_without_image() {
        let mut session = CutoutSession::default();
        let pipeline = ExtractionPipeline::new(ExtractionConfig::default()).unwrap();

        assert!(matches!(
            session.pointer_down(PointerEvent::new(10.0, 10.0), Size::new(100, 100)),
            Err(ExtractionError::NoImageLoaded)
        ));
        assert!(matches!(session.clear_target(), Err(ExtractionError::NoImageLoaded)));
        assert!(matches!(session.cut(&pipeline), Err(ExtractionError::NoImageLoaded)));
        assert!(matches!(session.preview(), Err(ExtractionError::NoImageLoaded)));
        assert_eq!(session.selection(), Selection::EMPTY);
    }

    #[test]
    fn test_pointer_sequence_through_letterbox() {
        let mut session = session_with_image();
        // 200x100 image in a 400x400 view: scale 2, 100px bars top and bottom
        let view = Size::new(400, 400);

        let state = session.pointer_down(PointerEvent::new(20.0, 120.0), view).unwrap();
        assert_eq!(state, SelectionState::TopLeftSet);
        assert!(session.preview().unwrap().is_none());

        let state = session.pointer_down(PointerEvent::new(220.0, 220.0), view).unwrap();
        assert_eq!(state, SelectionState::Complete);

        let rect = session.selection().rectangle().unwrap();
        assert_eq!(rect, crate::types::Rectangle::new(10, 10, 110, 60));

        let preview = session.preview().unwrap().unwrap();
        assert_eq!(*preview.get_pixel(10, 30), Rgb([255, 0, 0]));

        // A third press starts over
        let state = session.pointer_down(PointerEvent::new(5.0, 150.0), view).unwrap();
        assert_eq!(state, SelectionState::Empty);
    }

    #[test]
    fn test_clear_target_resets() {
        let mut session = session_with_image();
        session
            .pointer_down(PointerEvent::new(50.0, 150.0), Size::new(400, 400))
            .unwrap();
        session.clear_target().unwrap();
        assert_eq!(session.selection().state(), SelectionState::Empty);
    }

    #[test]
    fn test_cut_requires_complete_selection() {
        let mut session = session_with_image();
        let pipeline = ExtractionPipeline::new(ExtractionConfig::default()).unwrap();
        assert!(matches!(
            session.cut(&pipeline),
            Err(ExtractionError::IncompleteSelection)
        ));
    }

    #[test]
    fn test_failed_cut_still_resets_selection() {
        let mut session = session_with_image();
        let pipeline = ExtractionPipeline::new(ExtractionConfig::default()).unwrap();
        let view = Size::new(400, 400);

        // Same pixel twice gives a zero-area rectangle
        session.pointer_down(PointerEvent::new(60.0, 160.0), view).unwrap();
        session.pointer_down(PointerEvent::new(60.0, 160.0), view).unwrap();

        let err = session.cut(&pipeline).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidRectangle(_)));
        assert_eq!(session.selection().state(), SelectionState::Empty);
    }

    #[test]
    fn test_open_image_failure_keeps_previous() {
        let mut session = session_with_image();
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(session.open_image(temp_dir.path().join("missing.png")).is_err());
        assert_eq!(session.image().unwrap().path(), Path::new("memory.png"));
    }
}
