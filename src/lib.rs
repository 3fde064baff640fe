#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]

//! # GrabCut Background Removal Library
//!
//! Rectangle-seeded foreground extraction for still photos. The user picks
//! two corners of a box around the subject on a letterboxed preview; the
//! library maps those taps back to bitmap pixels, separates foreground from
//! background with GrabCut, pastes the foreground onto white and writes the
//! result as JPEG next to the source.
//!
//! ## Features
//!
//! - **Viewport mapping**: view coordinates to bitmap pixels for fit-centred
//!   and explicitly scaled bitmaps
//! - **Selection state machine**: two-tap rectangle selection as a `Copy` value
//! - **GrabCut segmentation**: colour mixture models plus min-cut, fully in
//!   Rust with no native dependencies
//! - **Compositing**: hard cutout over a white backdrop
//! - **Atomic output**: results never appear half-written
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grabcut_bgremove::{ExtractionConfig, ExtractionPipeline, Rectangle, SourceImage};
//!
//! # fn example() -> anyhow::Result<()> {
//! let pipeline = ExtractionPipeline::new(ExtractionConfig::default())?;
//! let source = SourceImage::open("portrait.jpg")?;
//! let output = pipeline.extract(&source, Rectangle::new(120, 40, 480, 620))?;
//! println!("Cutout written to {}", output.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Interactive Usage
//!
//! ```rust,no_run
//! use grabcut_bgremove::{
//!     CutoutSession, ExtractionConfig, ExtractionPipeline, PointerEvent, Size,
//! };
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ExtractionConfig::default();
//! let pipeline = ExtractionPipeline::new(config.clone())?;
//! let mut session = CutoutSession::new(&config);
//!
//! session.open_image("portrait.jpg")?;
//! let view = Size::new(1080, 1920);
//! session.pointer_down(PointerEvent::new(200.0, 500.0), view)?;
//! session.pointer_down(PointerEvent::new(880.0, 1400.0), view)?;
//! let output = session.cut(&pipeline)?;
//! # let _ = output;
//! # Ok(())
//! # }
//! ```
//!
//! ### Feature Flags
//!
//! - `tracing-init` (default): ready-made tracing subscriber setup
//! - `webp-support`: WebP source images

pub mod compositor;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod segmentation;
pub mod selection;
pub mod services;
pub mod session;
#[cfg(feature = "tracing-init")]
pub mod tracing_config;
pub mod types;
pub mod viewport;

use std::path::{Path, PathBuf};

pub use compositor::{compose, render_selection_preview};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, RectanglePolicy};
pub use error::{ExtractionError, Result};
pub use pipeline::ExtractionPipeline;
pub use segmentation::{GrabCut, Label, Segmenter};
pub use selection::{Selection, SelectionState};
pub use services::ImageIOService;
pub use session::CutoutSession;
#[cfg(feature = "tracing-init")]
pub use tracing_config::{init_library_tracing, TracingConfig, TracingFormat};
pub use types::{
    ExtractionReport, MaskStatistics, Point, ProcessingTimings, Rectangle, SegmentationMask,
    SourceImage,
};
pub use viewport::{map_to_pixel, PointerEvent, Size, ViewportInfo, ViewportTransform};

/// Extract the foreground inside `rect` from the image at `path` with the
/// default configuration
///
/// Returns the path of the written JPEG.
///
/// # Examples
///
/// ```rust,no_run
/// use grabcut_bgremove::{extract_foreground, Rectangle};
///
/// let output = extract_foreground("photo.png", Rectangle::new(10, 10, 200, 300))?;
/// assert!(output.ends_with("photo.png_tmp.jpg"));
/// # Ok::<(), grabcut_bgremove::ExtractionError>(())
/// ```
pub fn extract_foreground<P: AsRef<Path>>(path: P, rect: Rectangle) -> Result<PathBuf> {
    extract_foreground_with_config(path, rect, &ExtractionConfig::default())
}

/// Same as [`extract_foreground`] with an explicit configuration
pub fn extract_foreground_with_config<P: AsRef<Path>>(
    path: P,
    rect: Rectangle,
    config: &ExtractionConfig,
) -> Result<PathBuf> {
    ExtractionPipeline::new(config.clone())?.extract_file(path, rect)
}
