//! BML Realizer Core (engine-agnostic)
//!
//! Turns behavior blocks (timed facial expressions, gaze, head motion,
//! gestures, speech) into per-tick channel values for a character rig:
//! blocks are composed onto a global timeline, split into per-kind queues,
//! promoted into phase-animated realizers and composited with a biased
//! average. Skeletons, IK solving and morph targets are left to the host.

pub mod accumulate;
pub mod block;
pub mod compose;
pub mod config;
pub mod diagnostics;
pub mod emotion;
pub mod error;
pub mod ids;
pub mod instruction;
pub mod interp;
pub mod lexicon;
pub mod outputs;
pub mod phase;
pub mod queue;
pub mod realizers;
pub mod scheduler;
pub mod targets;
pub mod timeline;

// Re-exports for hosts
pub use accumulate::{biased_average, WeightCompositor};
pub use block::{
    Behavior, BehaviorRecord, BlinkParams, Block, Composition, EmotionParams, FacsParams,
    GazeParams, GestureParams, Hands, HeadParams, HeadShiftParams, Influence, LexemeParams,
    QueueKind, Side, SpeechParams,
};
pub use compose::{ScheduleStack, ScheduledBlock};
pub use config::{BlinkConfig, Config, EmotionGridConfig, GazeConfig, GestureConfig, KindTiming, TimingTable};
pub use diagnostics::{Diagnostic, EvictReason, OrderingViolation, ViolationKind};
pub use emotion::EmotionGrid;
pub use error::RealizerError;
pub use ids::{BlockId, InstructionId};
pub use instruction::Instruction;
pub use lexicon::{AuDelta, EmotionPoint, Lexicon};
pub use outputs::{Frame, IkTarget, Limb, RealizerEvent};
pub use phase::{Easing, Phase, PhaseAnimator, PhaseSample};
pub use queue::InstructionQueue;
pub use realizers::channels;
pub use scheduler::{Scheduler, SubmitReport};
pub use timeline::{SyncSpec, SyncTimeline};
