//! Per-kind realizers.
//!
//! Each realizer owns a [`PhaseAnimator`] plus strongly typed
//! initial/target/current state for the channels it drives. Realizers never
//! see each other: they only push values into a [`Contributions`] sink that
//! the scheduler composites after every realizer has advanced.

use hashbrown::HashMap;
use indexmap::IndexMap;
use log::trace;

use crate::accumulate::{TargetAccumulator, WeightCompositor};
use crate::block::Behavior;
use crate::config::Config;
use crate::emotion::EmotionGrid;
use crate::error::RealizerError;
use crate::instruction::Instruction;
use crate::lexicon::Lexicon;
use crate::outputs::Limb;
use crate::phase::{Easing, Phase, PhaseAnimator, PhaseSample};
use crate::targets::TargetRegistry;

pub mod blink;
pub mod face;
pub mod gaze;
pub mod gesture;
pub mod head;
pub mod speech;

pub use blink::{AutoBlink, BlinkRealizer};
pub use face::{AuTrack, FaceRealizer};
pub use gaze::{Direction, GazeRealizer};
pub use gesture::GestureRealizer;
pub use head::HeadRealizer;
pub use speech::SpeechRealizer;

/// Well-known channel names. Action units use their FACS id (`AU12`),
/// optionally suffixed `_L` / `_R`.
pub mod channels {
    pub const EYES_YAW: &str = "eyes.yaw";
    pub const EYES_PITCH: &str = "eyes.pitch";
    pub const HEAD_YAW: &str = "head.yaw";
    pub const HEAD_PITCH: &str = "head.pitch";
    pub const HEAD_ROLL: &str = "head.roll";
    /// Upper-lid closure, 0 open .. 1 closed.
    pub const LID_L: &str = "AU45_L";
    pub const LID_R: &str = "AU45_R";
}

/// Read-only view of scheduler state during a tick.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub now: f32,
    pub config: &'a Config,
    /// Channel values of the previous frame.
    pub settled: &'a HashMap<String, f32>,
    pub targets: &'a TargetRegistry,
}

impl TickContext<'_> {
    #[inline]
    pub fn settled(&self, channel: &str) -> f32 {
        self.settled.get(channel).copied().unwrap_or(0.0)
    }
}

/// Everything a realizer may consult when it is created.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    pub tick: TickContext<'a>,
    pub lexicon: &'a Lexicon,
    pub grid: &'a EmotionGrid,
    /// Committed values left behind by finished shifts.
    pub baselines: &'a IndexMap<String, f32>,
}

impl BuildContext<'_> {
    #[inline]
    pub fn baseline(&self, channel: &str) -> f32 {
        self.baselines.get(channel).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn config(&self) -> &Config {
        self.tick.config
    }
}

/// Write-only sink for one tick's contributions.
pub struct Contributions<'a> {
    channels: &'a mut WeightCompositor,
    ik: &'a mut TargetAccumulator,
}

impl<'a> Contributions<'a> {
    pub fn new(channels: &'a mut WeightCompositor, ik: &'a mut TargetAccumulator) -> Self {
        Self { channels, ik }
    }

    #[inline]
    pub fn channel(&mut self, name: &str, value: f32) {
        self.channels.add(name, value);
    }

    #[inline]
    pub fn ik(&mut self, limb: Limb, position: [f32; 3], factor: f32) {
        self.ik.add(limb, position, factor);
    }
}

/// Shared interface of every realizer.
pub trait Realize {
    fn animator(&self) -> &PhaseAnimator;
    fn animator_mut(&mut self) -> &mut PhaseAnimator;

    /// Recompute current values for `sample`.
    fn update(&mut self, _sample: PhaseSample, _ctx: &TickContext<'_>) {}

    /// Push current values; only called while the envelope is running.
    fn emit(&self, out: &mut Contributions<'_>);

    /// Values to persist as channel baselines once finished.
    fn committed(&self) -> Vec<(String, f32)> {
        Vec::new()
    }
}

#[derive(Clone, Debug)]
pub enum ChannelRealizer {
    Blink(BlinkRealizer),
    Face(FaceRealizer),
    Gaze(GazeRealizer),
    Head(HeadRealizer),
    Gesture(GestureRealizer),
    Speech(SpeechRealizer),
}

impl ChannelRealizer {
    /// Create the realizer for `instruction`. Recoverable problems (unknown
    /// targets or directions) are pushed to `fallbacks` and the realizer runs
    /// with a default; unrecoverable ones are returned.
    pub fn build(
        instruction: &Instruction,
        ctx: &BuildContext<'_>,
        fallbacks: &mut Vec<RealizerError>,
    ) -> Result<Self, RealizerError> {
        let easing = match instruction.behavior {
            Behavior::Blink(_) | Behavior::Head(_) => Easing::Sine,
            _ => Easing::Cosine,
        };
        let animator = PhaseAnimator::new(instruction.timeline, easing);
        let realizer = match &instruction.behavior {
            Behavior::Blink(p) => Self::Blink(BlinkRealizer::new(animator, p, &ctx.tick)),
            Behavior::FaceLexeme(p) | Behavior::FaceShift(p) => {
                Self::Face(FaceRealizer::lexeme(animator, p, ctx)?)
            }
            Behavior::FaceFacs(p) => Self::Face(FaceRealizer::facs(animator, p, ctx)?),
            Behavior::FaceEmotion(p) => Self::Face(FaceRealizer::emotion(animator, p, ctx)),
            Behavior::Gaze(p) | Behavior::GazeShift(p) => {
                Self::Gaze(GazeRealizer::new(animator, p, ctx, fallbacks))
            }
            Behavior::Head(p) => Self::Head(HeadRealizer::lexeme(animator, p, ctx)?),
            Behavior::HeadDirectionShift(p) => {
                Self::Head(HeadRealizer::direction(animator, p, ctx, fallbacks))
            }
            Behavior::Gesture(p) => {
                Self::Gesture(GestureRealizer::new(animator, p, ctx, fallbacks)?)
            }
            Behavior::Speech(p) => Self::Speech(SpeechRealizer::new(animator, p)),
        };
        Ok(realizer)
    }

    fn inner(&self) -> &dyn Realize {
        match self {
            Self::Blink(r) => r,
            Self::Face(r) => r,
            Self::Gaze(r) => r,
            Self::Head(r) => r,
            Self::Gesture(r) => r,
            Self::Speech(r) => r,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Realize {
        match self {
            Self::Blink(r) => r,
            Self::Face(r) => r,
            Self::Gaze(r) => r,
            Self::Head(r) => r,
            Self::Gesture(r) => r,
            Self::Speech(r) => r,
        }
    }

    /// Advance the local clock by `dt`, refresh values and contribute them.
    pub fn advance(
        &mut self,
        dt: f32,
        ctx: &TickContext<'_>,
        out: &mut Contributions<'_>,
    ) -> PhaseSample {
        let r = self.inner_mut();
        let sample = r.animator_mut().advance(dt);
        // a terminated realizer keeps the values it had when cut off
        if !r.animator().is_terminated() {
            r.update(sample, ctx);
        }
        if sample.phase.is_running() {
            r.emit(out);
        }
        trace!(
            "realizer at t={:.3}: {:?} factor={:.3}",
            r.animator().elapsed(),
            sample.phase,
            sample.factor
        );
        sample
    }

    /// Mark as finished; the next advance reports DONE.
    pub fn terminate(&mut self) {
        self.inner_mut().animator_mut().terminate();
    }

    pub fn is_terminated(&self) -> bool {
        self.inner().animator().is_terminated()
    }

    /// Phase reported by the last advance.
    pub fn phase(&self) -> Phase {
        self.inner().animator().last().phase
    }

    pub fn committed(&self) -> Vec<(String, f32)> {
        self.inner().committed()
    }
}
