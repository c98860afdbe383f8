//! Eyelid closure, manual and automatic.

use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{channels, Contributions, Realize, TickContext};
use crate::block::BlinkParams;
use crate::config::{BlinkConfig, KindTiming};
use crate::error::RealizerError;
use crate::interp::lerp_f32;
use crate::phase::{PhaseAnimator, PhaseSample};
use crate::timeline::SyncTimeline;

#[derive(Clone, Debug)]
pub struct BlinkRealizer {
    animator: PhaseAnimator,
    initial: [f32; 2],
    target: f32,
    current: [f32; 2],
}

impl BlinkRealizer {
    /// Closes both lids from wherever the previous frame left them.
    pub fn new(animator: PhaseAnimator, params: &BlinkParams, ctx: &TickContext<'_>) -> Self {
        let initial = [ctx.settled(channels::LID_L), ctx.settled(channels::LID_R)];
        Self {
            animator,
            initial,
            target: params.amount.clamp(0.0, 1.0),
            current: initial,
        }
    }

    pub fn current(&self) -> [f32; 2] {
        self.current
    }
}

impl Realize for BlinkRealizer {
    fn animator(&self) -> &PhaseAnimator {
        &self.animator
    }

    fn animator_mut(&mut self) -> &mut PhaseAnimator {
        &mut self.animator
    }

    fn update(&mut self, sample: PhaseSample, _ctx: &TickContext<'_>) {
        for (cur, init) in self.current.iter_mut().zip(self.initial) {
            *cur = lerp_f32(init, self.target.max(init), sample.factor);
        }
    }

    fn emit(&self, out: &mut Contributions<'_>) {
        out.channel(channels::LID_L, self.current[0]);
        out.channel(channels::LID_R, self.current[1]);
    }
}

/// Duration of an automatic blink given the lids' current closure:
/// `0.5 * (1 - min(closure))`. `None` when the lids are already closed far
/// enough that the blink would be shorter than `min_duration`.
pub fn auto_duration(settled: &HashMap<String, f32>, cfg: &BlinkConfig) -> Option<f32> {
    let lid = |c: &str| settled.get(c).copied().unwrap_or(0.0).clamp(0.0, 1.0);
    let closure = lid(channels::LID_L).min(lid(channels::LID_R));
    let end = 0.5 * (1.0 - closure);
    (end >= cfg.min_duration).then_some(end)
}

/// Default-shaped blink timeline lasting `end` seconds.
pub fn auto_timeline(defaults: &KindTiming, end: f32) -> Result<SyncTimeline, RealizerError> {
    SyncTimeline::scaled(defaults, end, false)
}

/// Randomized re-trigger timer for automatic blinking.
#[derive(Clone, Debug)]
pub struct AutoBlink {
    rng: StdRng,
    next_at: Option<f32>,
}

impl AutoBlink {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_at: None,
        }
    }

    /// Schedule the next automatic blink after a random delay from `now`.
    pub fn rearm(&mut self, now: f32, cfg: &BlinkConfig) {
        let lo = cfg.min_interval.min(cfg.max_interval).max(0.0);
        let hi = cfg.min_interval.max(cfg.max_interval).max(0.0);
        self.next_at = Some(now + self.rng.random_range(lo..=hi));
    }

    /// Arms on first use; returns true (and re-arms) once the delay elapsed.
    pub fn poll(&mut self, now: f32, cfg: &BlinkConfig) -> bool {
        match self.next_at {
            None => {
                self.rearm(now, cfg);
                false
            }
            Some(at) if now >= at => {
                self.rearm(now, cfg);
                true
            }
            Some(_) => false,
        }
    }

    pub fn next_at(&self) -> Option<f32> {
        self.next_at
    }

    pub fn reset(&mut self, seed: u64) {
        *self = Self::new(seed);
    }
}
