//! Output contracts from the scheduler.
//!
//! A [`Frame`] carries the composited channel values for this tick, keyed by
//! channel name (action-unit ids, `eyes.*`, `head.*`), resolved IK targets
//! for the hand collaborator, and a separate list of semantic events.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::block::QueueKind;
use crate::ids::{BlockId, InstructionId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Limb {
    LeftHand,
    RightHand,
}

/// Resolved 3D goal for one limb plus the easing factor to apply it with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IkTarget {
    pub limb: Limb,
    pub position: [f32; 3],
    pub factor: f32,
}

/// Discrete signals emitted during a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
#[non_exhaustive]
pub enum RealizerEvent {
    BlockScheduled {
        block: BlockId,
        name: String,
        global_start: f32,
        global_end: f32,
    },
    BehaviorStarted {
        instruction: InstructionId,
        block: BlockId,
        kind: QueueKind,
        behavior: String,
    },
    BehaviorEnded {
        instruction: InstructionId,
        block: BlockId,
        kind: QueueKind,
        behavior: String,
        /// Cut short by a REPLACE block.
        interrupted: bool,
    },
    SpeechStarted {
        instruction: InstructionId,
        text: String,
        duration: f32,
    },
    SpeechEnded {
        instruction: InstructionId,
        text: String,
    },
    AutoBlink {
        instruction: InstructionId,
        duration: f32,
    },
}

/// Everything produced by one `Scheduler::tick`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Frame {
    pub time: f32,
    #[serde(default)]
    pub channels: IndexMap<String, f32>,
    #[serde(default)]
    pub ik_targets: Vec<IkTarget>,
    #[serde(default)]
    pub events: Vec<RealizerEvent>,
}

impl Frame {
    #[inline]
    pub fn clear(&mut self) {
        self.channels.clear();
        self.ik_targets.clear();
        self.events.clear();
    }

    #[inline]
    pub fn push_event(&mut self, event: RealizerEvent) {
        self.events.push(event);
    }

    /// Final value of `name`, or `None` when nothing drives it.
    #[inline]
    pub fn channel(&self, name: &str) -> Option<f32> {
        self.channels.get(name).copied()
    }

    pub fn ik_target(&self, limb: Limb) -> Option<&IkTarget> {
        self.ik_targets.iter().find(|t| t.limb == limb)
    }
}
