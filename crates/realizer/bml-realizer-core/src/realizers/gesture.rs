//! Hand gestures, realized as IK goals for the arm collaborator.

use std::str::FromStr;

use super::{BuildContext, Contributions, Realize, TickContext};
use crate::block::{GestureParams, Hands};
use crate::config::GestureConfig;
use crate::error::RealizerError;
use crate::interp::{add_vec3, lerp_vec3, normalize3, scale_vec3, sub_vec3};
use crate::outputs::Limb;
use crate::phase::{PhaseAnimator, PhaseSample};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GestureLexeme {
    /// Short emphasis stroke in front of the body.
    Beat,
    /// Extend toward a point, stopping at `point_reach` from rest.
    Point,
    /// Move the hand onto a point.
    Reach,
}

impl FromStr for GestureLexeme {
    type Err = RealizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BEAT" => Ok(GestureLexeme::Beat),
            "POINT" => Ok(GestureLexeme::Point),
            "REACH" => Ok(GestureLexeme::Reach),
            _ => Err(RealizerError::unknown("gesture lexeme", s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
struct Arm {
    limb: Limb,
    rest: [f32; 3],
    goal: [f32; 3],
    current: [f32; 3],
}

#[derive(Clone, Debug)]
pub struct GestureRealizer {
    animator: PhaseAnimator,
    arms: Vec<Arm>,
    factor: f32,
}

fn limbs(mode: Hands) -> &'static [Limb] {
    match mode {
        Hands::LeftHand => &[Limb::LeftHand],
        Hands::RightHand => &[Limb::RightHand],
        Hands::BothHands => &[Limb::LeftHand, Limb::RightHand],
    }
}

fn rest_of(limb: Limb, cfg: &GestureConfig) -> [f32; 3] {
    match limb {
        Limb::LeftHand => cfg.left_rest,
        Limb::RightHand => cfg.right_rest,
    }
}

impl GestureRealizer {
    pub fn new(
        animator: PhaseAnimator,
        params: &GestureParams,
        ctx: &BuildContext<'_>,
        fallbacks: &mut Vec<RealizerError>,
    ) -> Result<Self, RealizerError> {
        let lexeme: GestureLexeme = params.lexeme.parse()?;
        let cfg = &ctx.config().gesture;

        let point = match (&params.target, params.position) {
            (Some(name), _) => match ctx.tick.targets.get(name) {
                Ok(p) => Some(p),
                Err(e) => {
                    fallbacks.push(e);
                    None
                }
            },
            (None, position) => position,
        };

        let arms = limbs(params.mode)
            .iter()
            .map(|&limb| {
                let rest = rest_of(limb, cfg);
                let ahead = add_vec3(rest, [0.0, 0.0, cfg.point_reach]);
                let goal = match lexeme {
                    GestureLexeme::Beat => {
                        params.position.unwrap_or_else(|| add_vec3(rest, cfg.beat_offset))
                    }
                    GestureLexeme::Point => point.map_or(ahead, |p| {
                        add_vec3(rest, scale_vec3(normalize3(sub_vec3(p, rest)), cfg.point_reach))
                    }),
                    GestureLexeme::Reach => point.unwrap_or(ahead),
                };
                Arm {
                    limb,
                    rest,
                    goal,
                    current: rest,
                }
            })
            .collect();

        Ok(Self {
            animator,
            arms,
            factor: 0.0,
        })
    }
}

impl Realize for GestureRealizer {
    fn animator(&self) -> &PhaseAnimator {
        &self.animator
    }

    fn animator_mut(&mut self) -> &mut PhaseAnimator {
        &mut self.animator
    }

    fn update(&mut self, sample: PhaseSample, _ctx: &TickContext<'_>) {
        self.factor = sample.factor;
        for arm in &mut self.arms {
            arm.current = lerp_vec3(arm.rest, arm.goal, sample.factor);
        }
    }

    fn emit(&self, out: &mut Contributions<'_>) {
        for arm in &self.arms {
            out.ik(arm.limb, arm.current, self.factor);
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

    fn params(lexeme: &str, mode: Hands) -> GestureParams {
        GestureParams {
            mode,
            lexeme: lexeme.into(),
            target: None,
            position: None,
        }
    }

    fn ik_after(h: &mut Harness, r: &mut ChannelRealizer, dt: f32) -> Vec<crate::outputs::IkTarget> {
        h.step(r, dt);
        let mut out = Vec::new();
        h.ik.finalize_into(&mut out);
        out
    }

    #[test]
    fn beat_moves_off_rest_with_factor() {
        let mut h = Harness::new();
        let i = h.instruction(
            Behavior::Gesture(params("BEAT", Hands::BothHands)),
            SyncSpec::span(0.0, 2.0),
        );
        let (mut r, _) = h.build(&i);
        let out = ik_after(&mut h, &mut r, 1.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].limb, Limb::LeftHand);
        assert_eq!(out[0].factor, 1.0);
        let cfg = GestureConfig::default();
        let goal = add_vec3(cfg.right_rest, cfg.beat_offset);
        for k in 0..3 {
            assert!((out[1].position[k] - goal[k]).abs() < 1e-6);
        }
    }

    #[test]
    fn point_stops_at_reach() {
        let mut h = Harness::new();
        h.targets.set("door", [0.2, 0.9, 5.0]);
        let mut p = params("point", Hands::RightHand);
        p.target = Some("door".into());
        let i = h.instruction(Behavior::Gesture(p), SyncSpec::span(0.0, 2.0));
        let (mut r, fb) = h.build(&i);
        assert!(fb.is_empty());
        let out = ik_after(&mut h, &mut r, 1.0);
        let d = sub_vec3(out[0].position, GestureConfig::default().right_rest);
        let len = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        assert!((len - 0.45).abs() < 1e-5);
    }

    #[test]
    fn unknown_target_and_lexeme() {
        let h = Harness::new();
        let mut p = params("REACH", Hands::LeftHand);
        p.target = Some("nowhere".into());
        let i = h.instruction(Behavior::Gesture(p), SyncSpec::span(0.0, 1.0));
        let (_, fb) = h.build(&i);
        assert_eq!(fb.len(), 1);

        let i = h.instruction(
            Behavior::Gesture(params("JUGGLE", Hands::LeftHand)),
            SyncSpec::span(0.0, 1.0),
        );
        let mut fallbacks = Vec::new();
        assert!(ChannelRealizer::build(&i, &h.build_ctx(), &mut fallbacks).is_err());
    }
}
