//! Valence-arousal blend grid.
//!
//! Blend weights over the reference emotions are precomputed at every node
//! of a regular grid over [-1, 1]^2: every emotion within `radius` gets a
//! linearly falling weight, and a node with nobody in range takes its nearest
//! emotion. Lookups bilinearly interpolate the four surrounding nodes, so
//! weights move smoothly as the valence-arousal point moves.

use indexmap::IndexMap;

use crate::config::EmotionGridConfig;
use crate::lexicon::{AuDelta, EmotionPoint};

#[derive(Clone, Debug)]
pub struct EmotionGrid {
    resolution: usize,
    emotions: Vec<EmotionPoint>,
    /// Row-major `[arousal][valence][emotion]`.
    weights: Vec<f32>,
}

impl EmotionGrid {
    pub fn new(emotions: &[EmotionPoint], cfg: &EmotionGridConfig) -> Self {
        let resolution = cfg.resolution.max(2);
        let radius = cfg.radius.max(f32::EPSILON);
        let n = emotions.len();
        let mut weights = Vec::with_capacity(resolution * resolution * n);
        for row in 0..resolution {
            for col in 0..resolution {
                let v = Self::coord(col, resolution);
                let a = Self::coord(row, resolution);
                weights.extend(node_weights(emotions, v, a, radius));
            }
        }
        Self {
            resolution,
            emotions: emotions.to_vec(),
            weights,
        }
    }

    #[inline]
    fn coord(i: usize, resolution: usize) -> f32 {
        -1.0 + 2.0 * i as f32 / (resolution - 1) as f32
    }

    fn node(&self, row: usize, col: usize) -> &[f32] {
        let n = self.emotions.len();
        let base = (row * self.resolution + col) * n;
        &self.weights[base..base + n]
    }

    pub fn emotions(&self) -> &[EmotionPoint] {
        &self.emotions
    }

    /// Blend weights for each reference emotion at `(valence, arousal)`.
    pub fn weights(&self, valence: f32, arousal: f32) -> Vec<f32> {
        let n = self.emotions.len();
        if n == 0 {
            return Vec::new();
        }
        let last = (self.resolution - 1) as f32;
        let x = (valence.clamp(-1.0, 1.0) + 1.0) * 0.5 * last;
        let y = (arousal.clamp(-1.0, 1.0) + 1.0) * 0.5 * last;
        let c0 = (x.floor() as usize).min(self.resolution - 2);
        let r0 = (y.floor() as usize).min(self.resolution - 2);
        let fx = x - c0 as f32;
        let fy = y - r0 as f32;

        let mut out = vec![0.0; n];
        for (row, col, w) in [
            (r0, c0, (1.0 - fx) * (1.0 - fy)),
            (r0, c0 + 1, fx * (1.0 - fy)),
            (r0 + 1, c0, (1.0 - fx) * fy),
            (r0 + 1, c0 + 1, fx * fy),
        ] {
            if w == 0.0 {
                continue;
            }
            for (o, nw) in out.iter_mut().zip(self.node(row, col)) {
                *o += w * nw;
            }
        }
        out
    }

    /// Action-unit deltas for `(valence, arousal)`, merged per unit.
    pub fn blend(&self, valence: f32, arousal: f32) -> Vec<AuDelta> {
        let mut merged: IndexMap<&str, f32> = IndexMap::new();
        for (emotion, w) in self.emotions.iter().zip(self.weights(valence, arousal)) {
            if w <= 0.0 {
                continue;
            }
            for d in &emotion.aus {
                *merged.entry(d.au.as_str()).or_insert(0.0) += w * d.weight;
            }
        }
        merged
            .into_iter()
            .map(|(au, weight)| AuDelta::new(au, weight))
            .collect()
    }
}

fn node_weights(emotions: &[EmotionPoint], v: f32, a: f32, radius: f32) -> Vec<f32> {
    let dist: Vec<f32> = emotions
        .iter()
        .map(|e| ((e.valence - v).powi(2) + (e.arousal - a).powi(2)).sqrt())
        .collect();
    let mut w: Vec<f32> = dist.iter().map(|d| (1.0 - d / radius).max(0.0)).collect();
    let sum: f32 = w.iter().sum();
    if sum > 0.0 {
        w.iter_mut().for_each(|x| *x /= sum);
    } else if let Some((nearest, _)) = dist
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
    {
        w[nearest] = 1.0;
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Lexicon;

    fn grid() -> EmotionGrid {
        EmotionGrid::new(Lexicon::builtin().emotions(), &EmotionGridConfig::default())
    }

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    #[test]
    fn weights_sum_to_one_everywhere() {
        let g = grid();
        for (v, a) in [(0.0, 0.0), (0.33, -0.71), (-1.0, 1.0), (1.0, -1.0), (5.0, 5.0)] {
            approx(g.weights(v, a).iter().sum::<f32>(), 1.0, 1e-4);
        }
    }

    #[test]
    fn reference_point_dominates_its_node() {
        let g = grid();
        let w = g.weights(0.8, 0.4);
        let idx = g.emotions().iter().position(|e| e.name == "HAPPINESS").unwrap();
        let best = w
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(best, idx);
    }

    #[test]
    fn far_corner_takes_nearest() {
        let g = grid();
        let w = g.weights(1.0, -1.0);
        let idx = g.emotions().iter().position(|e| e.name == "CONTENTMENT").unwrap();
        approx(w[idx], 1.0, 1e-5);
    }

    #[test]
    fn blend_is_smooth() {
        let g = grid();
        let au12 = |v: f32| {
            g.blend(v, 0.3)
                .into_iter()
                .find(|d| d.au == "AU12")
                .map_or(0.0, |d| d.weight)
        };
        let mut prev = au12(0.0);
        for i in 1..=100 {
            let cur = au12(i as f32 / 100.0);
            assert!((cur - prev).abs() < 0.1, "jump at step {i}: {prev} -> {cur}");
            prev = cur;
        }
        assert!(au12(0.8) > au12(0.0));
    }
}
