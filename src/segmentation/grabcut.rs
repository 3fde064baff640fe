//! GrabCut segmentation seeded by a rectangle
//!
//! Pixels outside the rectangle are fixed background; pixels inside start as
//! probable foreground. Each iteration re-fits one Gaussian mixture per
//! class and relabels the undecided pixels with a minimum s-t cut whose
//! smoothness term follows colour edges on the 8-connected grid.

use super::gmm::{kmeans, Color, GaussianMixture};
use super::graph::FlowGraph;
use super::{Label, Segmenter};
use crate::config::{ExtractionConfig, RectanglePolicy};
use crate::error::Result;
use crate::types::{Rectangle, SegmentationMask};
use image::RgbImage;
use ndarray::Array2;
use tracing::{debug, instrument};

/// Neighbour offsets handled per pixel: left, up-left, up, up-right
const NEIGHBOURS: [(i64, i64); 4] = [(-1, 0), (-1, -1), (0, -1), (1, -1)];

/// GrabCut engine parameters
#[derive(Debug, Clone)]
pub struct GrabCut {
    iterations: u32,
    components: usize,
    kmeans_iterations: u32,
    gamma: f64,
    lambda: f64,
    rectangle_policy: RectanglePolicy,
}

impl Default for GrabCut {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl GrabCut {
    /// Engine using the segmentation settings of `config`
    #[must_use]
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            iterations: config.iterations,
            components: config.gmm_components,
            kmeans_iterations: config.kmeans_iterations,
            gamma: config.gamma,
            lambda: config.lambda(),
            rectangle_policy: config.rectangle_policy,
        }
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Seed both colour models with k-means clusters of their pixels
    fn initial_models(
        &self,
        colors: &[Color],
        labels: &Array2<Label>,
    ) -> (GaussianMixture, GaussianMixture) {
        let (background, foreground): (Vec<Color>, Vec<Color>) = {
            let mut bg = Vec::new();
            let mut fg = Vec::new();
            for (color, label) in colors.iter().zip(labels.iter()) {
                if label.is_background() {
                    bg.push(*color);
                } else {
                    fg.push(*color);
                }
            }
            (bg, fg)
        };

        let fit = |samples: &[Color]| {
            let clusters = kmeans(samples, self.components, self.kmeans_iterations);
            GaussianMixture::fit(
                samples.iter().copied().zip(clusters),
                self.components,
            )
        };

        (fit(&background), fit(&foreground))
    }

    /// Re-estimate both models from their current members' best components
    fn refit_models(
        &self,
        colors: &[Color],
        labels: &Array2<Label>,
        background: &GaussianMixture,
        foreground: &GaussianMixture,
    ) -> (GaussianMixture, GaussianMixture) {
        (
            GaussianMixture::fit(
                class_members(colors, labels, true, background),
                self.components,
            ),
            GaussianMixture::fit(
                class_members(colors, labels, false, foreground),
                self.components,
            ),
        )
    }

    /// Build the s-t graph, cut it and relabel undecided pixels
    ///
    /// Returns the max-flow value. The graph is dropped on return.
    fn relabel(
        &self,
        colors: &[Color],
        labels: &mut Array2<Label>,
        background: &GaussianMixture,
        foreground: &GaussianMixture,
        smoothness: &[[f64; 4]],
    ) -> f64 {
        let (height, width) = labels.dim();
        let nodes = width * height;
        let lambda = self.lambda;
        let mut graph = FlowGraph::new(nodes, nodes * 10);

        for ((index, color), label) in colors.iter().enumerate().zip(labels.iter()) {
            let (source_weight, sink_weight) = match label {
                Label::ProbableBackground | Label::ProbableForeground => (
                    negative_log(background.probability(color)),
                    negative_log(foreground.probability(color)),
                ),
                Label::Background => (0.0, lambda),
                Label::Foreground => (lambda, 0.0),
            };
            graph.add_terminal_weights(index, source_weight, sink_weight);

            let (x, y) = ((index % width) as i64, (index / width) as i64);
            for (slot, (dx, dy)) in NEIGHBOURS.iter().enumerate() {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= width as i64 {
                    continue;
                }
                let weight = smoothness[index][slot];
                let neighbour = ny as usize * width + nx as usize;
                graph.add_edge(index, neighbour, weight, weight);
            }
        }

        let flow = graph.max_flow();
        let source_side = graph.source_side();

        for (label, in_source) in labels.iter_mut().zip(source_side) {
            if label.is_undecided() {
                *label = if in_source {
                    Label::ProbableForeground
                } else {
                    Label::ProbableBackground
                };
            }
        }

        flow
    }
}

impl Segmenter for GrabCut {
    fn name(&self) -> &'static str {
        "grabcut"
    }

    fn rectangle_policy(&self) -> RectanglePolicy {
        self.rectangle_policy
    }

    #[instrument(
        skip(self, image, rect),
        fields(
            dimensions = %format!("{}x{}", image.width(), image.height()),
            rect = %rect,
            iterations = self.iterations
        )
    )]
    fn segment(&self, image: &RgbImage, rect: Rectangle) -> Result<SegmentationMask> {
        let (width, height) = image.dimensions();
        let rect = self.validate_rectangle((width, height), rect)?;

        let colors: Vec<Color> = image
            .pixels()
            .map(|p| Color::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2])))
            .collect();

        let mut labels = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            if rect.contains(x as u32, y as u32) {
                Label::ProbableForeground
            } else {
                Label::Background
            }
        });

        let smoothness = smoothness_weights(&colors, width as usize, height as usize, self.gamma);
        let (mut background, mut foreground) = self.initial_models(&colors, &labels);
        debug!(
            background_components = background.active_components(),
            foreground_components = foreground.active_components(),
            "Initialized colour models"
        );

        for iteration in 0..self.iterations {
            let (bg, fg) = self.refit_models(&colors, &labels, &background, &foreground);
            background = bg;
            foreground = fg;

            let flow = self.relabel(&colors, &mut labels, &background, &foreground, &smoothness);
            debug!(
                iteration,
                flow,
                empty_background_model = background.is_empty(),
                "GrabCut iteration finished"
            );
        }

        let mask = SegmentationMask::from_fn(width, height, |x, y| {
            labels[[y as usize, x as usize]].is_foreground()
        });
        debug!(
            foreground_ratio = mask.statistics().foreground_ratio,
            "Segmentation mask ready"
        );
        Ok(mask)
    }
}

/// Pixels of one class paired with their most likely component of `model`
fn class_members<'a>(
    colors: &'a [Color],
    labels: &'a Array2<Label>,
    background: bool,
    model: &'a GaussianMixture,
) -> impl Iterator<Item = (Color, usize)> + 'a {
    colors
        .iter()
        .zip(labels.iter())
        .filter(move |(_, label)| label.is_background() == background)
        .map(move |(color, _)| (*color, model.most_likely_component(color)))
}

/// `-ln p` with zero probabilities mapped to a large finite cost
fn negative_log(probability: f64) -> f64 {
    -probability.max(f64::MIN_POSITIVE).ln()
}

/// Contrast-sensitive weights towards the four "previous" neighbours
///
/// `beta` is the inverse of twice the mean squared colour difference over
/// all neighbour pairs; diagonal weights are divided by `sqrt(2)`.
fn smoothness_weights(
    colors: &[Color],
    width: usize,
    height: usize,
    gamma: f64,
) -> Vec<[f64; 4]> {
    let squared_difference = |index: usize, slot: usize| -> Option<f64> {
        let (x, y) = ((index % width) as i64, (index / width) as i64);
        let (dx, dy) = NEIGHBOURS[slot];
        let (nx, ny) = (x + dx, y + dy);
        if nx < 0 || ny < 0 || nx >= width as i64 {
            return None;
        }
        let neighbour = ny as usize * width + nx as usize;
        Some((colors[index] - colors[neighbour]).norm_squared())
    };

    let mut total = 0.0;
    let mut pairs = 0usize;
    for index in 0..width * height {
        for slot in 0..NEIGHBOURS.len() {
            if let Some(d) = squared_difference(index, slot) {
                total += d;
                pairs += 1;
            }
        }
    }
    let beta = if pairs == 0 || total <= f64::EPSILON {
        0.0
    } else {
        1.0 / (2.0 * total / pairs as f64)
    };

    let diagonal_gamma = gamma / std::f64::consts::SQRT_2;
    (0..width * height)
        .map(|index| {
            let mut weights = [0.0; 4];
            for (slot, weight) in weights.iter_mut().enumerate() {
                if let Some(d) = squared_difference(index, slot) {
                    let (dx, dy) = NEIGHBOURS[slot];
                    let g = if dx != 0 && dy != 0 { diagonal_gamma } else { gamma };
                    *weight = g * (-beta * d).exp();
                }
            }
            weights
        })
        .collect()
}
