//! A scheduled behavior with its absolute placement on the global timeline.

use crate::block::{Behavior, Composition, QueueKind};
use crate::ids::{BlockId, InstructionId};
use crate::timeline::SyncTimeline;

#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub id: InstructionId,
    pub block: BlockId,
    /// Behavior id from the input, or a generated `type#index`.
    pub name: String,
    pub behavior: Behavior,
    /// Offsets from `start`, so `timeline.start == 0`.
    pub timeline: SyncTimeline,
    pub global_start: f32,
    pub global_end: f32,
    pub composition: Composition,
    /// Generated by the auto-blink timer rather than submitted.
    pub automatic: bool,
}

impl Instruction {
    #[inline]
    pub fn kind(&self) -> QueueKind {
        self.behavior.kind()
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.global_end - self.global_start
    }

    /// Half-open interval overlap of the global spans.
    #[inline]
    pub fn overlaps(&self, start: f32, end: f32) -> bool {
        self.global_start < end && start < self.global_end
    }
}
