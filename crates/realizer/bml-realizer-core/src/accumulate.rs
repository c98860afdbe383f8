//! Per-tick accumulation of channel contributions.
//!
//! Scalar channels combine with the biased average
//! `sum(v * |v|) / sum(|v|)`, so a dominant contributor keeps its sign and
//! scale while weak contributors blend in as they grow. IK targets combine
//! with a factor-weighted mean per limb.

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::outputs::{IkTarget, Limb};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct BiasedEntry {
    abs_sum: f32,
    signed_sum: f32,
    first: f32,
    count: u32,
}

impl BiasedEntry {
    #[inline]
    fn add(&mut self, v: f32) {
        if self.count == 0 {
            self.first = v;
        }
        self.count += 1;
        self.abs_sum += v.abs();
        self.signed_sum += v * v.abs();
    }

    #[inline]
    fn value(&self, epsilon: f32) -> f32 {
        if self.abs_sum <= epsilon {
            0.0
        } else if self.count == 1 {
            // the ratio is the identity here; skip its rounding
            self.first
        } else {
            self.signed_sum / self.abs_sum
        }
    }
}

/// Biased average of `values`; 0 when their magnitudes sum to `epsilon` or less.
pub fn biased_average(values: &[f32], epsilon: f32) -> f32 {
    let mut e = BiasedEntry::default();
    values.iter().for_each(|v| e.add(*v));
    e.value(epsilon)
}

/// Channel accumulator, reset every tick. Iteration order is first
/// contribution order, which keeps frame output deterministic.
#[derive(Debug, Default)]
pub struct WeightCompositor {
    epsilon: f32,
    map: IndexMap<String, BiasedEntry>,
}

impl WeightCompositor {
    pub fn new(epsilon: f32) -> Self {
        Self {
            epsilon,
            map: IndexMap::new(),
        }
    }

    pub fn add(&mut self, channel: &str, value: f32) {
        if !value.is_finite() {
            return;
        }
        match self.map.get_mut(channel) {
            Some(entry) => entry.add(value),
            None => {
                let mut entry = BiasedEntry::default();
                entry.add(value);
                self.map.insert(channel.to_string(), entry);
            }
        }
    }

    /// Whether anything contributed to `channel` this tick. A zero-valued
    /// contribution still counts.
    pub fn contains(&self, channel: &str) -> bool {
        self.map.contains_key(channel)
    }

    pub fn value(&self, channel: &str) -> Option<f32> {
        self.map.get(channel).map(|e| e.value(self.epsilon))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Write every composited channel into `out` and reset.
    pub fn finalize_into(&mut self, out: &mut IndexMap<String, f32>) {
        let eps = self.epsilon;
        for (channel, entry) in self.map.drain(..) {
            out.insert(channel, entry.value(eps));
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct TargetEntry {
    sum: [f32; 3],
    w: f32,
    max_factor: f32,
}

/// Factor-weighted mean of IK target positions per limb.
#[derive(Debug, Default)]
pub struct TargetAccumulator {
    map: HashMap<Limb, TargetEntry>,
}

impl TargetAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, limb: Limb, position: [f32; 3], factor: f32) {
        if factor <= 0.0 {
            return;
        }
        let e = self.map.entry(limb).or_default();
        e.sum[0] += position[0] * factor;
        e.sum[1] += position[1] * factor;
        e.sum[2] += position[2] * factor;
        e.w += factor;
        e.max_factor = e.max_factor.max(factor);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Blended targets ordered by limb, reported with the strongest factor.
    pub fn finalize_into(&mut self, out: &mut Vec<IkTarget>) {
        let mut limbs: Vec<(Limb, TargetEntry)> = self.map.drain().collect();
        limbs.sort_by_key(|(limb, _)| *limb);
        for (limb, e) in limbs {
            if e.w > 0.0 {
                out.push(IkTarget {
                    limb,
                    position: [e.sum[0] / e.w, e.sum[1] / e.w, e.sum[2] / e.w],
                    factor: e.max_factor.min(1.0),
                });
            }
        }
    }
}
