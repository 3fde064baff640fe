//! Configuration types for foreground extraction

use crate::error::{ExtractionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a rectangle that only partially overlaps the image is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RectanglePolicy {
    /// Any rectangle not fully inside the image is invalid
    #[default]
    Reject,
    /// Intersect with the image bounds, fail only if nothing is left
    Clamp,
}

impl std::fmt::Display for RectanglePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::Clamp => write!(f, "clamp"),
        }
    }
}

/// Configuration for one extraction pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// GrabCut refinement iterations
    pub iterations: u32,

    /// Gaussian components per colour model
    pub gmm_components: usize,

    /// Lloyd iterations used to seed the colour models
    pub kmeans_iterations: u32,

    /// Smoothness weight between neighbouring pixels
    pub gamma: f64,

    /// Handling of rectangles that leave the image
    pub rectangle_policy: RectanglePolicy,

    /// Suffix appended to the source path to name the output file
    pub output_suffix: String,

    /// JPEG quality of the written result (1-100)
    pub jpeg_quality: u8,

    /// Outline colour of the selection preview
    pub preview_color: [u8; 3],

    /// Outline thickness of the selection preview in pixels
    pub preview_stroke: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            iterations: 5,
            gmm_components: 5,
            kmeans_iterations: 10,
            gamma: 50.0,
            rectangle_policy: RectanglePolicy::default(),
            output_suffix: "_tmp.jpg".to_string(),
            jpeg_quality: 90,
            preview_color: [255, 0, 0],
            preview_stroke: 3,
        }
    }
}

impl ExtractionConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use grabcut_bgremove::{ExtractionConfig, RectanglePolicy};
    ///
    /// let config = ExtractionConfig::builder()
    ///     .iterations(3)
    ///     .rectangle_policy(RectanglePolicy::Clamp)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.iterations, 3);
    /// ```
    #[must_use]
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder::default()
    }

    /// Weight tying definite pixels to their terminal
    #[must_use]
    pub fn lambda(&self) -> f64 {
        9.0 * self.gamma
    }

    /// Parse and validate a JSON configuration
    ///
    /// Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            ExtractionError::invalid_config(format!("Failed to parse configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - `iterations` or `kmeans_iterations` outside 1-100
    /// - `gmm_components` outside 1-16
    /// - non-finite or non-positive `gamma`
    /// - empty `output_suffix`
    /// - `jpeg_quality` outside 1-100
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.iterations) {
            return Err(ExtractionError::config_value_error(
                "iterations",
                self.iterations,
                "1-100",
                Some(5),
            ));
        }

        if !(1..=16).contains(&self.gmm_components) {
            return Err(ExtractionError::config_value_error(
                "GMM components",
                self.gmm_components,
                "1-16",
                Some(5),
            ));
        }

        if !(1..=100).contains(&self.kmeans_iterations) {
            return Err(ExtractionError::config_value_error(
                "k-means iterations",
                self.kmeans_iterations,
                "1-100",
                Some(10),
            ));
        }

        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(ExtractionError::config_value_error(
                "gamma",
                self.gamma,
                "> 0",
                Some(50.0),
            ));
        }

        if self.output_suffix.is_empty() {
            return Err(ExtractionError::invalid_config(
                "Output suffix must not be empty",
            ));
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ExtractionError::config_value_error(
                "JPEG quality",
                self.jpeg_quality,
                "1-100",
                Some(90),
            ));
        }

        Ok(())
    }
}

/// Builder for `ExtractionConfig`
#[derive(Debug, Default)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    #[must_use]
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.config.iterations = iterations;
        self
    }

    #[must_use]
    pub fn gmm_components(mut self, components: usize) -> Self {
        self.config.gmm_components = components;
        self
    }

    #[must_use]
    pub fn kmeans_iterations(mut self, iterations: u32) -> Self {
        self.config.kmeans_iterations = iterations;
        self
    }

    #[must_use]
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.config.gamma = gamma;
        self
    }

    #[must_use]
    pub fn rectangle_policy(mut self, policy: RectanglePolicy) -> Self {
        self.config.rectangle_policy = policy;
        self
    }

    #[must_use]
    pub fn output_suffix<S: Into<String>>(mut self, suffix: S) -> Self {
        self.config.output_suffix = suffix.into();
        self
    }

    /// Set JPEG quality, clamped to 1-100
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    #[must_use]
    pub fn preview_color(mut self, color: [u8; 3]) -> Self {
        self.config.preview_color = color;
        self
    }

    #[must_use]
    pub fn preview_stroke(mut self, stroke: u32) -> Self {
        self.config.preview_stroke = stroke;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ExtractionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
