//! Full-covariance Gaussian mixture colour models and their k-means seeding

use nalgebra::{Matrix3, Vector3};

/// An RGB colour as floating point channels
pub(crate) type Color = Vector3<f64>;

/// Added to the covariance diagonal when it is (near) singular
const VARIANCE_REGULARIZATION: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
struct Component {
    weight: f64,
    mean: Color,
    inverse: Matrix3<f64>,
    inv_sqrt_det: f64,
}

impl Component {
    fn empty() -> Self {
        Self {
            weight: 0.0,
            mean: Vector3::zeros(),
            inverse: Matrix3::zeros(),
            inv_sqrt_det: 0.0,
        }
    }

    /// Unweighted density up to the constant factor shared by all components
    fn likelihood(&self, color: &Color) -> f64 {
        if self.weight <= 0.0 {
            return 0.0;
        }
        let d = color - self.mean;
        let mahalanobis = d.dot(&(self.inverse * d));
        self.inv_sqrt_det * (-0.5 * mahalanobis).exp()
    }
}

/// Mixture of `k` Gaussians; components that received no samples have
/// weight zero and contribute nothing
#[derive(Debug, Clone)]
pub(crate) struct GaussianMixture {
    components: Vec<Component>,
}

impl GaussianMixture {
    /// Estimate a mixture from `(colour, component index)` samples
    ///
    /// Indices `>= k` are ignored. With no samples at all the mixture is
    /// empty and assigns probability zero to every colour.
    pub(crate) fn fit<I>(samples: I, k: usize) -> Self
    where
        I: IntoIterator<Item = (Color, usize)>,
    {
        let mut counts = vec![0usize; k];
        let mut sums = vec![Vector3::<f64>::zeros(); k];
        let mut products = vec![Matrix3::<f64>::zeros(); k];

        for (color, component) in samples {
            if component >= k {
                continue;
            }
            counts[component] += 1;
            sums[component] += color;
            products[component] += color * color.transpose();
        }

        let total: usize = counts.iter().sum();
        let components = (0..k)
            .map(|ci| {
                if counts[ci] == 0 {
                    return Component::empty();
                }
                let n = counts[ci] as f64;
                let mean = sums[ci] / n;
                let cov = products[ci] / n - mean * mean.transpose();

                match regularized_inverse(cov) {
                    Some((inverse, det)) => Component {
                        weight: n / total as f64,
                        mean,
                        inverse,
                        inv_sqrt_det: 1.0 / det.sqrt(),
                    },
                    None => Component::empty(),
                }
            })
            .collect();

        Self { components }
    }

    /// Number of components with a non-zero weight
    pub(crate) fn active_components(&self) -> usize {
        self.components.iter().filter(|c| c.weight > 0.0).count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.active_components() == 0
    }

    /// Weighted mixture density of `color`
    pub(crate) fn probability(&self, color: &Color) -> f64 {
        self.components
            .iter()
            .map(|c| c.weight * c.likelihood(color))
            .sum()
    }

    /// Index of the component that explains `color` best
    pub(crate) fn most_likely_component(&self, color: &Color) -> usize {
        let mut best = 0;
        let mut best_likelihood = 0.0;
        for (ci, component) in self.components.iter().enumerate() {
            let likelihood = component.likelihood(color);
            if likelihood > best_likelihood {
                best = ci;
                best_likelihood = likelihood;
            }
        }
        best
    }
}

/// Inverse and determinant of a covariance, with the diagonal raised by
/// [`VARIANCE_REGULARIZATION`] when it is singular or nearly so
fn regularized_inverse(cov: Matrix3<f64>) -> Option<(Matrix3<f64>, f64)> {
    let det = cov.determinant();
    if det > f64::EPSILON {
        if let Some(inverse) = cov.try_inverse() {
            return Some((inverse, det));
        }
    }

    let cov = cov + Matrix3::from_diagonal_element(VARIANCE_REGULARIZATION);
    let det = cov.determinant();
    if det <= 0.0 {
        return None;
    }
    cov.try_inverse().map(|inverse| (inverse, det))
}

fn squared_distance(a: &Color, b: &Color) -> f64 {
    (a - b).norm_squared()
}

fn nearest_center(color: &Color, centers: &[Color]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (ci, center) in centers.iter().enumerate() {
        let distance = squared_distance(color, center);
        if distance < best_distance {
            best = ci;
            best_distance = distance;
        }
    }
    best
}

/// Deterministic k-means clustering of `samples` into `k` groups
///
/// Seeds with the first sample and then repeatedly the sample farthest from
/// all chosen centres, followed by `iterations` Lloyd steps. Returns the
/// cluster index of every sample; clusters may end up empty when the data
/// has fewer distinct colours than `k`.
pub(crate) fn kmeans(samples: &[Color], k: usize, iterations: u32) -> Vec<usize> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    if k == 0 {
        return vec![0; samples.len()];
    }

    let mut centers = Vec::with_capacity(k);
    centers.push(*first);
    let mut nearest_distance: Vec<f64> = samples
        .iter()
        .map(|s| squared_distance(s, first))
        .collect();

    while centers.len() < k {
        let mut farthest = 0;
        let mut farthest_distance = -1.0;
        for (i, &distance) in nearest_distance.iter().enumerate() {
            if distance > farthest_distance {
                farthest = i;
                farthest_distance = distance;
            }
        }
        let center = samples[farthest];
        centers.push(center);
        for (distance, sample) in nearest_distance.iter_mut().zip(samples) {
            *distance = distance.min(squared_distance(sample, &center));
        }
    }

    let mut assignment: Vec<usize> = samples
        .iter()
        .map(|s| nearest_center(s, &centers))
        .collect();

    for _ in 0..iterations {
        let mut sums = vec![Vector3::<f64>::zeros(); k];
        let mut counts = vec![0usize; k];
        for (sample, &cluster) in samples.iter().zip(&assignment) {
            counts[cluster] += 1;
            sums[cluster] += sample;
        }
        for (ci, center) in centers.iter_mut().enumerate() {
            if counts[ci] > 0 {
                *center = sums[ci] / counts[ci] as f64;
            }
        }

        let mut changed = false;
        for (sample, cluster) in samples.iter().zip(assignment.iter_mut()) {
            let nearest = nearest_center(sample, &centers);
            if nearest != *cluster {
                *cluster = nearest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    assignment
}
