//! Gaze: eye (and optionally head) rotation toward a symbolic direction or
//! a named point, with upper-lid tension when looking down.
//!
//! Angles are radians internally; channels carry them normalized by
//! `max_yaw` / `max_pitch` into [-1, 1]. Positive yaw turns to the
//! character's right (+x), positive pitch looks up (+y); the character
//! faces +z.

use std::str::FromStr;

use super::{channels, BuildContext, Contributions, Realize, TickContext};
use crate::block::{GazeParams, Influence};
use crate::config::GazeConfig;
use crate::error::RealizerError;
use crate::interp::lerp_f32;
use crate::phase::{Phase, PhaseAnimator, PhaseSample};
use crate::targets::TargetRegistry;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Front,
    Left,
    Right,
    Up,
    Down,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl FromStr for Direction {
    type Err = RealizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_uppercase();
        Ok(match norm.as_str() {
            "FRONT" | "STRAIGHT" => Direction::Front,
            "LEFT" => Direction::Left,
            "RIGHT" => Direction::Right,
            "UP" => Direction::Up,
            "DOWN" => Direction::Down,
            "UPLEFT" => Direction::UpLeft,
            "UPRIGHT" => Direction::UpRight,
            "DOWNLEFT" => Direction::DownLeft,
            "DOWNRIGHT" => Direction::DownRight,
            _ => return Err(RealizerError::unknown("direction", s)),
        })
    }
}

impl Direction {
    /// `(yaw, pitch)` rotation for an offset of `angle` radians.
    pub fn angles(self, angle: f32) -> (f32, f32) {
        let (x, y) = match self {
            Direction::Front => (0.0, 0.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::Up => (0.0, 1.0),
            Direction::Down => (0.0, -1.0),
            Direction::UpLeft => (-1.0, 1.0),
            Direction::UpRight => (1.0, 1.0),
            Direction::DownLeft => (-1.0, -1.0),
            Direction::DownRight => (1.0, -1.0),
        };
        (x * angle, y * angle)
    }
}

/// `(yaw, pitch)` that points from `origin` at `point`.
pub fn look_at(origin: [f32; 3], point: [f32; 3]) -> (f32, f32) {
    let dx = point[0] - origin[0];
    let dy = point[1] - origin[1];
    let dz = point[2] - origin[2];
    let yaw = dx.atan2(dz);
    let pitch = dy.atan2((dx * dx + dz * dz).sqrt());
    (yaw, pitch)
}

/// Resolve the total gaze rotation: the named target (if any), then the
/// symbolic direction offset on top of it.
pub fn resolve_angles(
    params: &GazeParams,
    cfg: &GazeConfig,
    targets: &TargetRegistry,
) -> Result<(f32, f32), RealizerError> {
    let (mut yaw, mut pitch) = match &params.target {
        Some(name) => look_at(cfg.eye_origin, targets.get(name)?),
        None => (0.0, 0.0),
    };
    if let Some(dir) = &params.direction {
        let (dy, dp) = dir
            .parse::<Direction>()?
            .angles(params.offset_angle.unwrap_or(cfg.offset_angle));
        yaw += dy;
        pitch += dp;
    }
    Ok((yaw, pitch))
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct YawPitch {
    yaw: f32,
    pitch: f32,
}

impl YawPitch {
    fn lerp(a: YawPitch, b: YawPitch, t: f32) -> YawPitch {
        YawPitch {
            yaw: lerp_f32(a.yaw, b.yaw, t),
            pitch: lerp_f32(a.pitch, b.pitch, t),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GazeRealizer {
    animator: PhaseAnimator,
    params: GazeParams,
    head_share: f32,
    max: YawPitch,
    lid_follow: f32,
    eyes_initial: YawPitch,
    eyes_target: YawPitch,
    eyes: YawPitch,
    head_initial: YawPitch,
    head_target: YawPitch,
    head: YawPitch,
}

impl GazeRealizer {
    pub fn new(
        animator: PhaseAnimator,
        params: &GazeParams,
        ctx: &BuildContext<'_>,
        fallbacks: &mut Vec<RealizerError>,
    ) -> Self {
        let cfg = &ctx.config().gaze;
        let (yaw, pitch) = match resolve_angles(params, cfg, ctx.tick.targets) {
            Ok(a) => a,
            Err(e) => {
                fallbacks.push(e);
                (0.0, 0.0)
            }
        };
        let head_share = match params.influence {
            Influence::Head => cfg.head_share.clamp(0.0, 1.0),
            Influence::Eyes => 0.0,
        };
        let eyes_initial = YawPitch {
            yaw: ctx.baseline(channels::EYES_YAW),
            pitch: ctx.baseline(channels::EYES_PITCH),
        };
        let head_initial = YawPitch {
            yaw: ctx.baseline(channels::HEAD_YAW),
            pitch: ctx.baseline(channels::HEAD_PITCH),
        };
        let mut r = Self {
            animator,
            params: params.clone(),
            head_share,
            max: YawPitch {
                yaw: cfg.max_yaw.max(f32::EPSILON),
                pitch: cfg.max_pitch.max(f32::EPSILON),
            },
            lid_follow: cfg.lid_follow,
            eyes_initial,
            eyes_target: eyes_initial,
            eyes: eyes_initial,
            head_initial,
            head_target: head_initial,
            head: head_initial,
        };
        r.retarget(yaw, pitch);
        r
    }

    fn drives_head(&self) -> bool {
        self.head_share > 0.0
    }

    /// Split a total rotation between eyes and head, normalized per axis.
    fn retarget(&mut self, yaw: f32, pitch: f32) {
        let norm = |v: f32, max: f32, share: f32| (v * share / max).clamp(-1.0, 1.0);
        let eyes_share = 1.0 - self.head_share;
        self.eyes_target = YawPitch {
            yaw: norm(yaw, self.max.yaw, eyes_share),
            pitch: norm(pitch, self.max.pitch, eyes_share),
        };
        if self.drives_head() {
            self.head_target = YawPitch {
                yaw: norm(yaw, self.max.yaw, self.head_share),
                pitch: norm(pitch, self.max.pitch, self.head_share),
            };
        }
    }

    /// Downward eye pitch pulls the upper lids along.
    pub fn lid_tension(&self) -> f32 {
        (-self.eyes.pitch * self.lid_follow).clamp(0.0, 1.0)
    }

    pub fn eyes(&self) -> (f32, f32) {
        (self.eyes.yaw, self.eyes.pitch)
    }
}

impl Realize for GazeRealizer {
    fn animator(&self) -> &PhaseAnimator {
        &self.animator
    }

    fn animator_mut(&mut self) -> &mut PhaseAnimator {
        &mut self.animator
    }

    fn update(&mut self, sample: PhaseSample, ctx: &TickContext<'_>) {
        let tracking = matches!(sample.phase, Phase::Intro | Phase::Hold);
        if self.params.dynamic && self.params.target.is_some() && tracking {
            // a target removed mid-flight keeps the last resolved direction
            if let Ok((yaw, pitch)) = resolve_angles(&self.params, &ctx.config.gaze, ctx.targets) {
                self.retarget(yaw, pitch);
            }
        }
        self.eyes = YawPitch::lerp(self.eyes_initial, self.eyes_target, sample.factor);
        if self.drives_head() {
            self.head = YawPitch::lerp(self.head_initial, self.head_target, sample.factor);
        }
    }

    fn emit(&self, out: &mut Contributions<'_>) {
        out.channel(channels::EYES_YAW, self.eyes.yaw);
        out.channel(channels::EYES_PITCH, self.eyes.pitch);
        if self.drives_head() {
            out.channel(channels::HEAD_YAW, self.head.yaw);
            out.channel(channels::HEAD_PITCH, self.head.pitch);
        }
        let lid = self.lid_tension();
        if lid > 0.0 {
            out.channel(channels::LID_L, lid);
            out.channel(channels::LID_R, lid);
        }
    }

    fn committed(&self) -> Vec<(String, f32)> {
        if !self.animator.timeline().shift {
            return Vec::new();
        }
        let mut out = vec![
            (channels::EYES_YAW.to_string(), self.eyes.yaw),
            (channels::EYES_PITCH.to_string(), self.eyes.pitch),
        ];
        if self.drives_head() {
            out.push((channels::HEAD_YAW.to_string(), self.head.yaw));
            out.push((channels::HEAD_PITCH.to_string(), self.head.pitch));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Behavior;
    use crate::realizers::test_support::Harness;
    use crate::timeline::SyncSpec;

    fn approx(a: f32, b: f32, eps: f32) {
        assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
    }

    fn gaze(direction: Option<&str>, target: Option<&str>) -> GazeParams {
        GazeParams {
            direction: direction.map(str::to_string),
            target: target.map(str::to_string),
            ..GazeParams::default()
        }
    }

    #[test]
    fn parse_directions() {
        assert_eq!("up_left".parse::<Direction>().unwrap(), Direction::UpLeft);
        assert_eq!("DownRight".parse::<Direction>().unwrap(), Direction::DownRight);
        assert!("SIDEWAYS".parse::<Direction>().is_err());
        assert_eq!(Direction::UpLeft.angles(0.2), (-0.2, 0.2));
    }

    #[test]
    fn look_at_straight_and_right() {
        let o = [0.0, 1.6, 0.0];
        assert_eq!(look_at(o, [0.0, 1.6, 1.0]), (0.0, 0.0));
        let (yaw, pitch) = look_at(o, [1.0, 1.6, 1.0]);
        approx(yaw, std::f32::consts::FRAC_PI_4, 1e-6);
        approx(pitch, 0.0, 1e-6);
    }

    #[test]
    fn symbolic_direction_reaches_hold() {
        let mut h = Harness::new();
        let i = h.instruction(Behavior::Gaze(gaze(Some("RIGHT"), None)), SyncSpec::span(0.0, 2.0));
        let (mut r, fb) = h.build(&i);
        assert!(fb.is_empty());
        let (_, v) = h.step(&mut r, 1.0);
        approx(v[channels::EYES_YAW], 0.35 / 0.6, 1e-5);
        assert_eq!(v[channels::EYES_PITCH], 0.0);
        assert!(!v.contains_key(channels::HEAD_YAW));
    }

    #[test]
    fn unknown_target_falls_back_to_front() {
        let mut h = Harness::new();
        let i = h.instruction(Behavior::Gaze(gaze(None, Some("ghost"))), SyncSpec::span(0.0, 2.0));
        let (mut r, fb) = h.build(&i);
        assert_eq!(fb.len(), 1);
        let (_, v) = h.step(&mut r, 1.0);
        assert_eq!(v[channels::EYES_YAW], 0.0);
    }

    #[test]
    fn head_influence_splits_rotation() {
        let mut h = Harness::new();
        let mut p = gaze(Some("LEFT"), None);
        p.influence = Influence::Head;
        let i = h.instruction(Behavior::Gaze(p), SyncSpec::span(0.0, 2.0));
        let (mut r, _) = h.build(&i);
        let (_, v) = h.step(&mut r, 1.0);
        let half = -0.35 * 0.5 / 0.6;
        approx(v[channels::EYES_YAW], half, 1e-5);
        approx(v[channels::HEAD_YAW], half, 1e-5);
    }

    #[test]
    fn looking_down_tenses_lids() {
        let mut h = Harness::new();
        let i = h.instruction(Behavior::Gaze(gaze(Some("DOWN"), None)), SyncSpec::span(0.0, 2.0));
        let (mut r, _) = h.build(&i);
        let (_, v) = h.step(&mut r, 1.0);
        let pitch = -0.35 / 0.4;
        approx(v[channels::EYES_PITCH], pitch, 1e-5);
        approx(v[channels::LID_L], -pitch * 0.6, 1e-5);
    }

    #[test]
    fn dynamic_gaze_follows_moving_target() {
        let mut h = Harness::new();
        h.targets.set("user", [0.0, 1.6, 1.0]);
        let mut p = gaze(None, Some("user"));
        p.dynamic = true;
        let i = h.instruction(Behavior::Gaze(p), SyncSpec::span(0.0, 4.0));
        let (mut r, _) = h.build(&i);
        let (_, v) = h.step(&mut r, 1.0);
        approx(v[channels::EYES_YAW], 0.0, 1e-6);
        h.targets.set("user", [0.2, 1.6, 1.0]);
        let (_, v) = h.step(&mut r, 0.5);
        approx(v[channels::EYES_YAW], 0.2f32.atan2(1.0) / 0.6, 1e-5);
    }

    #[test]
    fn static_gaze_is_frozen_at_build() {
        let mut h = Harness::new();
        h.targets.set("user", [0.0, 1.6, 1.0]);
        let i = h.instruction(Behavior::Gaze(gaze(None, Some("user"))), SyncSpec::span(0.0, 4.0));
        let (mut r, _) = h.build(&i);
        h.targets.set("user", [0.5, 1.6, 1.0]);
        let (_, v) = h.step(&mut r, 1.0);
        approx(v[channels::EYES_YAW], 0.0, 1e-6);
    }

    #[test]
    fn shift_commits_eye_pose() {
        let mut h = Harness::new();
        let i = h.instruction(Behavior::GazeShift(gaze(Some("UP"), None)), SyncSpec::span(0.0, 1.0));
        let (mut r, _) = h.build(&i);
        h.step(&mut r, 2.0);
        let c = r.committed();
        assert_eq!(c[0].0, channels::EYES_YAW);
        approx(c[1].1, 0.35 / 0.4, 1e-5);
    }
}
