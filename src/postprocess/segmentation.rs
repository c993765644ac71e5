//! Figure/ground segmentation seeded with a rectangle.
//!
//! `GraphCutSegmenter` follows the GrabCut recipe: pixels outside the seed
//! rectangle are fixed background, pixels inside start as probable foreground,
//! and each refinement iteration re-fits a colour mixture per class and then
//! relabels the unfixed pixels against a data term plus a contrast-sensitive
//! smoothness term. Relabeling uses iterated conditional modes with alternating
//! scan directions rather than an exact min-cut.
use image::RgbImage;
use thiserror::Error;

/// Components per colour mixture.
const COMPONENTS: usize = 5;
const KMEANS_ROUNDS: usize = 8;
/// Upper bound on samples used to fit one mixture.
const MAX_FIT_SAMPLES: usize = 20_000;
const VARIANCE_FLOOR: f64 = 4.0;
/// Smoothness weight, same magnitude GrabCut uses.
const GAMMA: f64 = 50.0;
const SWEEPS_PER_ITERATION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// The region left after trimming `border` pixels from every side, or
    /// `None` when nothing remains.
    pub fn inset(width: u32, height: u32, border: u32) -> Option<Rect> {
        let inner_w = width.checked_sub(border.saturating_mul(2))?;
        let inner_h = height.checked_sub(border.saturating_mul(2))?;
        if inner_w == 0 || inner_h == 0 {
            return None;
        }
        Some(Rect { x: border, y: border, width: inner_w, height: inner_h })
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Background,
    Foreground,
    ProbableBackground,
    ProbableForeground,
}

impl Label {
    pub fn is_foreground(self) -> bool {
        matches!(self, Label::Foreground | Label::ProbableForeground)
    }
}

#[derive(Debug, Error)]
pub enum SegmentationError {
    #[error("seed rectangle is empty for a {0}x{1} image")]
    EmptyRegion(u32, u32),
    #[error("seed rectangle {0:?} does not fit a {1}x{2} image")]
    RectOutOfBounds(Rect, u32, u32),
    #[error("no {0} pixels left to fit a colour model")]
    EmptyModel(&'static str),
}

/// Produces one label per pixel, row-major.
pub trait Segmenter: Send + Sync {
    fn segment(&self, image: &RgbImage, rect: Rect) -> Result<Vec<Label>, SegmentationError>;
}

#[derive(Debug, Clone)]
pub struct GraphCutSegmenter {
    pub iterations: usize,
}

impl Default for GraphCutSegmenter {
    fn default() -> Self {
        GraphCutSegmenter { iterations: 5 }
    }
}

impl Segmenter for GraphCutSegmenter {
    fn segment(&self, image: &RgbImage, rect: Rect) -> Result<Vec<Label>, SegmentationError> {
        let (width, height) = image.dimensions();
        if rect.width == 0 || rect.height == 0 {
            return Err(SegmentationError::EmptyRegion(width, height));
        }
        if rect.x + rect.width > width || rect.y + rect.height > height {
            return Err(SegmentationError::RectOutOfBounds(rect, width, height));
        }

        let pixels: Vec<[f64; 3]> = image
            .pixels()
            .map(|p| [p[0] as f64, p[1] as f64, p[2] as f64])
            .collect();
        let mut labels: Vec<Label> = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                if rect.contains(x, y) {
                    Label::ProbableForeground
                } else {
                    Label::Background
                }
            })
            .collect();

        let edges = EdgeWeights::new(&pixels, width as usize, height as usize);

        for _ in 0..self.iterations {
            let fg_samples: Vec<[f64; 3]> = collect_samples(&pixels, &labels, true);
            let bg_samples: Vec<[f64; 3]> = collect_samples(&pixels, &labels, false);
            let fg_model = ColorModel::fit(&fg_samples).ok_or(SegmentationError::EmptyModel("foreground"))?;
            let bg_model = ColorModel::fit(&bg_samples).ok_or(SegmentationError::EmptyModel("background"))?;

            let fg_cost: Vec<f64> = pixels.iter().map(|p| fg_model.cost(p)).collect();
            let bg_cost: Vec<f64> = pixels.iter().map(|p| bg_model.cost(p)).collect();

            for sweep in 0..SWEEPS_PER_ITERATION {
                relabel(&mut labels, &fg_cost, &bg_cost, &edges, rect, width, sweep % 2 == 1);
            }
        }

        Ok(labels)
    }
}

fn collect_samples(pixels: &[[f64; 3]], labels: &[Label], foreground: bool) -> Vec<[f64; 3]> {
    let total = labels.iter().filter(|l| l.is_foreground() == foreground).count();
    let stride = (total / MAX_FIT_SAMPLES).max(1);
    pixels
        .iter()
        .zip(labels)
        .filter(|(_, l)| l.is_foreground() == foreground)
        .step_by(stride)
        .map(|(p, _)| *p)
        .collect()
}

/// One ICM sweep over the unfixed pixels inside `rect`.
fn relabel(
    labels: &mut [Label],
    fg_cost: &[f64],
    bg_cost: &[f64],
    edges: &EdgeWeights,
    rect: Rect,
    width: u32,
    reverse: bool,
) {
    let w = width as usize;
    let mut rows: Vec<u32> = (rect.y..rect.y + rect.height).collect();
    let mut cols: Vec<u32> = (rect.x..rect.x + rect.width).collect();
    if reverse {
        rows.reverse();
        cols.reverse();
    }

    for &y in &rows {
        for &x in &cols {
            let idx = y as usize * w + x as usize;
            let mut fg_energy = fg_cost[idx];
            let mut bg_energy = bg_cost[idx];
            for (neighbor, weight) in edges.neighbors(x as usize, y as usize) {
                if labels[neighbor].is_foreground() {
                    bg_energy += weight;
                } else {
                    fg_energy += weight;
                }
            }
            labels[idx] = if fg_energy < bg_energy {
                Label::ProbableForeground
            } else {
                Label::ProbableBackground
            };
        }
    }
}

/// Contrast-sensitive weights for right and down links of every pixel.
struct EdgeWeights {
    width: usize,
    height: usize,
    right: Vec<f64>,
    down: Vec<f64>,
}

impl EdgeWeights {
    fn new(pixels: &[[f64; 3]], width: usize, height: usize) -> Self {
        let mut right = vec![0.0; pixels.len()];
        let mut down = vec![0.0; pixels.len()];

        let mut sum = 0.0;
        let mut count = 0usize;
        for y in 0..height {
            for x in 0..width {
                let i = y * width + x;
                if x + 1 < width {
                    right[i] = squared_distance(&pixels[i], &pixels[i + 1]);
                    sum += right[i];
                    count += 1;
                }
                if y + 1 < height {
                    down[i] = squared_distance(&pixels[i], &pixels[i + width]);
                    sum += down[i];
                    count += 1;
                }
            }
        }
        let beta = if count == 0 || sum <= f64::EPSILON {
            0.0
        } else {
            1.0 / (2.0 * sum / count as f64)
        };
        for d in right.iter_mut().chain(down.iter_mut()) {
            *d = GAMMA * (-beta * *d).exp();
        }

        EdgeWeights { width, height, right, down }
    }

    fn neighbors(&self, x: usize, y: usize) -> impl Iterator<Item = (usize, f64)> {
        let i = y * self.width + x;
        let mut out: [(usize, f64); 4] = [(0, 0.0); 4];
        let mut n = 0;
        if x > 0 {
            out[n] = (i - 1, self.right[i - 1]);
            n += 1;
        }
        if x + 1 < self.width {
            out[n] = (i + 1, self.right[i]);
            n += 1;
        }
        if y > 0 {
            out[n] = (i - self.width, self.down[i - self.width]);
            n += 1;
        }
        if y + 1 < self.height {
            out[n] = (i + self.width, self.down[i]);
            n += 1;
        }
        out.into_iter().take(n)
    }
}

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|c| (a[c] - b[c]).powi(2)).sum()
}

#[derive(Debug, Clone)]
struct Component {
    mean: [f64; 3],
    variance: [f64; 3],
    log_weight: f64,
}

/// Diagonal-covariance colour mixture fitted with k-means.
#[derive(Debug, Clone)]
struct ColorModel {
    components: Vec<Component>,
}

impl ColorModel {
    fn fit(samples: &[[f64; 3]]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        // Seed centres at luminance quantiles so the fit is deterministic.
        let mut sorted: Vec<[f64; 3]> = samples.to_vec();
        sorted.sort_by(|a, b| luminance(a).total_cmp(&luminance(b)));
        let k = COMPONENTS.min(sorted.len());
        let mut centres: Vec<[f64; 3]> = (0..k)
            .map(|i| sorted[(2 * i + 1) * sorted.len() / (2 * k)])
            .collect();
        centres.dedup();

        let mut assignment = vec![0usize; samples.len()];
        for _ in 0..KMEANS_ROUNDS {
            for (slot, s) in assignment.iter_mut().zip(samples) {
                *slot = nearest(&centres, s);
            }
            let mut sums = vec![[0.0f64; 3]; centres.len()];
            let mut counts = vec![0usize; centres.len()];
            for (&a, s) in assignment.iter().zip(samples) {
                for c in 0..3 {
                    sums[a][c] += s[c];
                }
                counts[a] += 1;
            }
            for (j, centre) in centres.iter_mut().enumerate() {
                if counts[j] > 0 {
                    for c in 0..3 {
                        centre[c] = sums[j][c] / counts[j] as f64;
                    }
                }
            }
        }
        for (slot, s) in assignment.iter_mut().zip(samples) {
            *slot = nearest(&centres, s);
        }

        let total = samples.len() as f64;
        let mut components = Vec::with_capacity(centres.len());
        for (j, mean) in centres.iter().enumerate() {
            let members: Vec<&[f64; 3]> = assignment
                .iter()
                .zip(samples)
                .filter(|&(&a, _)| a == j)
                .map(|(_, s)| s)
                .collect();
            if members.is_empty() {
                continue;
            }
            let n = members.len() as f64;
            let mut variance = [0.0f64; 3];
            for s in &members {
                for c in 0..3 {
                    variance[c] += (s[c] - mean[c]).powi(2);
                }
            }
            for v in variance.iter_mut() {
                *v = (*v / n).max(VARIANCE_FLOOR);
            }
            components.push(Component { mean: *mean, variance, log_weight: (n / total).ln() });
        }

        Some(ColorModel { components })
    }

    /// Negative log-likelihood of `pixel` under the mixture.
    fn cost(&self, pixel: &[f64; 3]) -> f64 {
        let mut logs = [f64::NEG_INFINITY; COMPONENTS];
        for (slot, comp) in logs.iter_mut().zip(&self.components) {
            let mut ll = comp.log_weight;
            for c in 0..3 {
                let v = comp.variance[c];
                ll -= 0.5 * ((2.0 * std::f64::consts::PI * v).ln() + (pixel[c] - comp.mean[c]).powi(2) / v);
            }
            *slot = ll;
        }
        let used = &logs[..self.components.len()];
        let max = used.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = used.iter().map(|l| (l - max).exp()).sum();
        -(max + sum.ln())
    }
}

fn nearest(centres: &[[f64; 3]], sample: &[f64; 3]) -> usize {
    centres
        .iter()
        .enumerate()
        .map(|(j, c)| (j, squared_distance(c, sample)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(j, _)| j)
        .unwrap_or(0)
}

fn luminance(p: &[f64; 3]) -> f64 {
    0.299 * p[0] + 0.587 * p[1] + 0.114 * p[2]
}
