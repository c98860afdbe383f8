//! Head lexemes (nod, shake, tilt, toss) and persistent direction shifts.

use std::f32::consts::PI;
use std::str::FromStr;

use super::gaze::Direction;
use super::{channels, BuildContext, Contributions, Realize, TickContext};
use crate::block::{HeadParams, HeadShiftParams};
use crate::error::RealizerError;
use crate::interp::lerp_f32;
use crate::phase::{PhaseAnimator, PhaseSample};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HeadLexeme {
    Nod,
    Shake,
    TiltLeft,
    TiltRight,
    Toss,
}

impl FromStr for HeadLexeme {
    type Err = RealizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NOD" => Ok(HeadLexeme::Nod),
            "SHAKE" => Ok(HeadLexeme::Shake),
            "TILT_LEFT" | "TILTLEFT" => Ok(HeadLexeme::TiltLeft),
            "TILT_RIGHT" | "TILTRIGHT" => Ok(HeadLexeme::TiltRight),
            "TOSS" => Ok(HeadLexeme::Toss),
            _ => Err(RealizerError::unknown("head lexeme", s)),
        }
    }
}

impl HeadLexeme {
    fn channel(self) -> &'static str {
        match self {
            HeadLexeme::Nod | HeadLexeme::Toss => channels::HEAD_PITCH,
            HeadLexeme::Shake => channels::HEAD_YAW,
            HeadLexeme::TiltLeft | HeadLexeme::TiltRight => channels::HEAD_ROLL,
        }
    }

    /// Offset from rest at envelope `factor` and overall `progress` in [0, 1].
    fn offset(self, amount: f32, repetition: u32, factor: f32, progress: f32) -> f32 {
        let n = repetition.max(1) as f32;
        match self {
            HeadLexeme::Nod => -amount * factor * (PI * n * progress).sin().abs(),
            HeadLexeme::Shake => amount * factor * (2.0 * PI * n * progress).sin(),
            HeadLexeme::TiltLeft => -amount * factor,
            HeadLexeme::TiltRight | HeadLexeme::Toss => amount * factor,
        }
    }
}

#[derive(Clone, Debug)]
enum Motion {
    Lexeme {
        lexeme: HeadLexeme,
        amount: f32,
        repetition: u32,
        rest: f32,
        current: f32,
    },
    Shift {
        initial: [f32; 2],
        target: [f32; 2],
        current: [f32; 2],
    },
}

#[derive(Clone, Debug)]
pub struct HeadRealizer {
    animator: PhaseAnimator,
    motion: Motion,
}

impl HeadRealizer {
    pub fn lexeme(
        animator: PhaseAnimator,
        params: &HeadParams,
        ctx: &BuildContext<'_>,
    ) -> Result<Self, RealizerError> {
        let lexeme: HeadLexeme = params.lexeme.parse()?;
        let rest = ctx.baseline(lexeme.channel());
        Ok(Self {
            animator,
            motion: Motion::Lexeme {
                lexeme,
                amount: params.amount,
                repetition: params.repetition,
                rest,
                current: rest,
            },
        })
    }

    /// Persistent turn toward a symbolic direction; unknown directions hold
    /// the head facing front.
    pub fn direction(
        animator: PhaseAnimator,
        params: &HeadShiftParams,
        ctx: &BuildContext<'_>,
        fallbacks: &mut Vec<RealizerError>,
    ) -> Self {
        let cfg = &ctx.config().gaze;
        let direction = params.direction.parse::<Direction>().unwrap_or_else(|e| {
            fallbacks.push(e);
            Direction::Front
        });
        let (yaw, pitch) = direction.angles(params.offset_angle.unwrap_or(cfg.offset_angle));
        let initial = [ctx.baseline(channels::HEAD_YAW), ctx.baseline(channels::HEAD_PITCH)];
        let target = [
            (yaw / cfg.max_yaw.max(f32::EPSILON)).clamp(-1.0, 1.0),
            (pitch / cfg.max_pitch.max(f32::EPSILON)).clamp(-1.0, 1.0),
        ];
        Self {
            animator,
            motion: Motion::Shift {
                initial,
                target,
                current: initial,
            },
        }
    }
}

impl Realize for HeadRealizer {
    fn animator(&self) -> &PhaseAnimator {
        &self.animator
    }

    fn animator_mut(&mut self) -> &mut PhaseAnimator {
        &mut self.animator
    }

    fn update(&mut self, sample: PhaseSample, _ctx: &TickContext<'_>) {
        let progress = self.animator.progress();
        match &mut self.motion {
            Motion::Lexeme {
                lexeme,
                amount,
                repetition,
                rest,
                current,
            } => {
                *current = *rest + lexeme.offset(*amount, *repetition, sample.factor, progress);
            }
            Motion::Shift {
                initial,
                target,
                current,
            } => {
                for i in 0..2 {
                    current[i] = lerp_f32(initial[i], target[i], sample.factor);
                }
            }
        }
    }

    fn emit(&self, out: &mut Contributions<'_>) {
        match &self.motion {
            Motion::Lexeme {
                lexeme, current, ..
            } => out.channel(lexeme.channel(), *current),
            Motion::Shift { current, .. } => {
                out.channel(channels::HEAD_YAW, current[0]);
                out.channel(channels::HEAD_PITCH, current[1]);
            }
        }
    }

    fn committed(&self) -> Vec<(String, f32)> {
        match &self.motion {
            Motion::Shift { current, .. } if self.animator.timeline().shift => vec![
                (channels::HEAD_YAW.to_string(), current[0]),
                (channels::HEAD_PITCH.to_string(), current[1]),
            ],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Behavior;
    use crate::realizers::test_support::Harness;
    use crate::realizers::ChannelRealizer;
    use crate::timeline::SyncSpec;

    fn nod(lexeme: &str, repetition: u32) -> Behavior {
        Behavior::Head(HeadParams {
            lexeme: lexeme.into(),
            repetition,
            amount: 0.5,
        })
    }

    #[test]
    fn nod_goes_down_and_only_touches_pitch() {
        let mut h = Harness::new();
        let i = h.instruction(nod("NOD", 1), SyncSpec::span(0.0, 2.0));
        let (mut r, _) = h.build(&i);
        let mut lowest = 0.0f32;
        for _ in 0..20 {
            let (_, v) = h.step(&mut r, 0.1);
            if let Some(p) = v.get(channels::HEAD_PITCH) {
                assert!(*p <= 0.0);
                lowest = lowest.min(*p);
            }
            assert!(!v.contains_key(channels::HEAD_YAW));
        }
        assert!(lowest < -0.3);
    }

    #[test]
    fn shake_swings_both_ways() {
        let mut h = Harness::new();
        let i = h.instruction(nod("shake", 2), SyncSpec::span(0.0, 2.0));
        let (mut r, _) = h.build(&i);
        let (mut min, mut max) = (0.0f32, 0.0f32);
        for _ in 0..40 {
            let (_, v) = h.step(&mut r, 0.05);
            if let Some(y) = v.get(channels::HEAD_YAW) {
                min = min.min(*y);
                max = max.max(*y);
            }
        }
        assert!(min < -0.1 && max > 0.1);
    }

    #[test]
    fn unknown_head_lexeme_is_an_error() {
        let h = Harness::new();
        let i = h.instruction(nod("WOBBLE", 1), SyncSpec::span(0.0, 1.0));
        let mut fallbacks = Vec::new();
        assert!(ChannelRealizer::build(&i, &h.build_ctx(), &mut fallbacks).is_err());
    }

    #[test]
    fn direction_shift_persists() {
        let mut h = Harness::new();
        let i = h.instruction(
            Behavior::HeadDirectionShift(HeadShiftParams {
                direction: "LEFT".into(),
                offset_angle: Some(0.3),
            }),
            SyncSpec::span(0.0, 1.0),
        );
        let (mut r, fb) = h.build(&i);
        assert!(fb.is_empty());
        h.step(&mut r, 5.0);
        let c = r.committed();
        assert!((c[0].1 + 0.5).abs() < 1e-6);
        assert_eq!(c[1].1, 0.0);
    }

    #[test]
    fn unknown_direction_faces_front() {
        let h = Harness::new();
        let i = h.instruction(
            Behavior::HeadDirectionShift(HeadShiftParams {
                direction: "BACKWARDS".into(),
                offset_angle: None,
            }),
            SyncSpec::span(0.0, 1.0),
        );
        let (_, fb) = h.build(&i);
        assert_eq!(fb.len(), 1);
    }
}
