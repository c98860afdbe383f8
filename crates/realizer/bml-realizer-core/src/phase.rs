//! Phase-based envelope shared by every realizer.
//!
//! `PENDING -> INTRO -> HOLD -> OUTRO -> DONE`, driven purely by local time
//! against a [`SyncTimeline`]. Shift timelines stop at the attack peak with
//! factor 1 and never enter HOLD or OUTRO.

use serde::{Deserialize, Serialize};

use crate::interp::{ease_cos, ease_sin};
use crate::timeline::SyncTimeline;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Pending,
    Intro,
    Hold,
    Outro,
    Done,
}

impl Phase {
    /// Whether the envelope is producing output in this phase.
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, Phase::Intro | Phase::Hold | Phase::Outro)
    }
}

/// Phase plus interpolation factor in [0, 1].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PhaseSample {
    pub phase: Phase,
    pub factor: f32,
}

impl PhaseSample {
    pub const PENDING: PhaseSample = PhaseSample {
        phase: Phase::Pending,
        factor: 0.0,
    };
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    Cosine,
    Sine,
}

impl Easing {
    #[inline]
    pub fn apply(self, u: f32) -> f32 {
        let u = u.clamp(0.0, 1.0);
        match self {
            Easing::Cosine => ease_cos(u),
            Easing::Sine => ease_sin(u),
        }
    }
}

/// Evaluate `timeline` at local time `t`.
pub fn evaluate(timeline: &SyncTimeline, t: f32, easing: Easing) -> PhaseSample {
    let tl = timeline;
    if t < tl.start {
        return PhaseSample::PENDING;
    }
    if tl.shift && t >= tl.attack_peak {
        return PhaseSample {
            phase: Phase::Done,
            factor: 1.0,
        };
    }
    if t >= tl.end {
        return PhaseSample {
            phase: Phase::Done,
            factor: 0.0,
        };
    }
    if t < tl.attack_peak {
        let u = (t - tl.start) / (tl.attack_peak - tl.start);
        return PhaseSample {
            phase: Phase::Intro,
            factor: easing.apply(u),
        };
    }
    if t < tl.relax {
        return PhaseSample {
            phase: Phase::Hold,
            factor: 1.0,
        };
    }
    let u = (t - tl.relax) / (tl.end - tl.relax);
    PhaseSample {
        phase: Phase::Outro,
        factor: 1.0 - easing.apply(u),
    }
}

/// Local clock plus envelope state for one running instruction.
#[derive(Clone, Debug)]
pub struct PhaseAnimator {
    timeline: SyncTimeline,
    easing: Easing,
    elapsed: f32,
    terminated: bool,
    last: PhaseSample,
}

impl PhaseAnimator {
    /// Clock starts at 0.
    pub fn new(timeline: SyncTimeline, easing: Easing) -> Self {
        Self {
            timeline,
            easing,
            elapsed: 0.0,
            terminated: false,
            last: PhaseSample::PENDING,
        }
    }

    pub fn timeline(&self) -> &SyncTimeline {
        &self.timeline
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn last(&self) -> PhaseSample {
        self.last
    }

    /// Advance the local clock by `dt` (negative steps are ignored) and sample.
    pub fn advance(&mut self, dt: f32) -> PhaseSample {
        if !self.terminated {
            self.elapsed += dt.max(0.0);
        }
        let s = self.sample();
        self.last = s;
        s
    }

    /// Sample without moving the clock. A terminated animator reports DONE
    /// with the factor it last produced.
    pub fn sample(&self) -> PhaseSample {
        if self.terminated {
            return PhaseSample {
                phase: Phase::Done,
                factor: self.last.factor,
            };
        }
        evaluate(&self.timeline, self.elapsed, self.easing)
    }

    /// Force DONE on the next advance.
    pub fn terminate(&mut self) {
        self.terminated = true;
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Position of the clock within the whole timeline, in [0, 1].
    pub fn progress(&self) -> f32 {
        let d = self.timeline.duration();
        if d > 0.0 {
            ((self.elapsed - self.timeline.start) / d).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingTable;
    use crate::timeline::SyncSpec;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn tl(shift: bool) -> SyncTimeline {
        let spec = SyncSpec {
            ready: Some(0.5),
            relax: Some(1.5),
            ..SyncSpec::span(0.0, 2.0)
        };
        SyncTimeline::resolve(&spec, &TimingTable::default().face, shift, "t").unwrap()
    }

    #[test]
    fn phases_follow_timeline() {
        let t = tl(false);
        let e = Easing::Cosine;
        assert_eq!(evaluate(&t, -0.1, e).phase, Phase::Pending);
        assert_eq!(evaluate(&t, 0.1, e).phase, Phase::Intro);
        assert_eq!(evaluate(&t, 1.0, e).phase, Phase::Hold);
        assert_eq!(evaluate(&t, 1.7, e).phase, Phase::Outro);
        assert_eq!(evaluate(&t, 2.0, e).phase, Phase::Done);
    }

    #[test]
    fn factor_is_continuous_at_boundaries() {
        let t = tl(false);
        for e in [Easing::Cosine, Easing::Sine] {
            let h = 1e-3;
            approx(evaluate(&t, 0.0, e).factor, 0.0, 1e-6);
            approx(evaluate(&t, t.attack_peak - h, e).factor, 1.0, 1e-3);
            approx(evaluate(&t, t.attack_peak + h, e).factor, 1.0, 1e-6);
            approx(evaluate(&t, t.relax - h, e).factor, 1.0, 1e-6);
            approx(evaluate(&t, t.relax + h, e).factor, 1.0, 1e-3);
            approx(evaluate(&t, t.end - h, e).factor, 0.0, 1e-3);
            approx(evaluate(&t, t.end, e).factor, 0.0, 1e-6);
        }
    }

    #[test]
    fn intro_is_monotonic() {
        let t = tl(false);
        let mut prev = -1.0;
        for i in 0..=50 {
            let f = evaluate(&t, 0.5 * i as f32 / 50.0, Easing::Cosine).factor;
            assert!(f >= prev);
            prev = f;
        }
    }

    #[test]
    fn shift_terminates_at_attack_peak() {
        let t = tl(true);
        let s = evaluate(&t, 0.25, Easing::Cosine);
        assert_eq!(s.phase, Phase::Intro);
        let s = evaluate(&t, 0.5, Easing::Cosine);
        assert_eq!(s.phase, Phase::Done);
        assert_eq!(s.factor, 1.0);
    }

    #[test]
    fn animator_clock_and_termination() {
        let mut a = PhaseAnimator::new(tl(false), Easing::Cosine);
        assert_eq!(a.advance(0.0).phase, Phase::Intro);
        assert_eq!(a.advance(0.6).phase, Phase::Hold);
        approx(a.progress(), 0.3, 1e-6);
        a.terminate();
        let s = a.advance(0.1);
        assert_eq!(s.phase, Phase::Done);
        assert_eq!(s.factor, 1.0);
        approx(a.elapsed(), 0.6, 1e-6);
    }

    #[test]
    fn negative_dt_is_ignored() {
        let mut a = PhaseAnimator::new(tl(false), Easing::Sine);
        a.advance(0.2);
        a.advance(-1.0);
        approx(a.elapsed(), 0.2, 1e-6);
    }
}
