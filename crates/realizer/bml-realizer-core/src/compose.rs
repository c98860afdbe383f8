//! Block composition: from a submitted [`Block`] to absolutely timed
//! [`Instruction`]s, plus the stack of scheduled blocks the composition
//! policies are resolved against.
//!
//! The block origin depends on the policy:
//! - MERGE, REPLACE, OVERWRITE: `now`
//! - APPEND: `max(now, tail_end)`, so the block never starts before the
//!   latest scheduled block has ended.
//!
//! Each behavior's sync points are rebased against that origin (resolving
//! back-references), filled in from the kind's defaults, and shifted so the
//! instruction's own timeline starts at 0.

use log::debug;

use crate::block::{Block, Composition};
use crate::config::TimingTable;
use crate::error::RealizerError;
use crate::ids::{BlockId, IdAllocator};
use crate::instruction::Instruction;
use crate::timeline::SyncTimeline;

/// Global span of one accepted block.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledBlock {
    pub id: BlockId,
    pub name: String,
    pub composition: Composition,
    pub global_start: f32,
    pub global_end: f32,
}

/// Previously scheduled blocks, ordered by insertion policy.
#[derive(Clone, Debug, Default)]
pub struct ScheduleStack {
    blocks: Vec<ScheduledBlock>,
}

impl ScheduleStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest `global_end` of any block on the stack.
    pub fn tail_end(&self) -> Option<f32> {
        self.blocks.iter().map(|b| b.global_end).reduce(f32::max)
    }

    /// Stable insertion by `global_start`; ties keep arrival order.
    pub fn insert_ordered(&mut self, block: ScheduledBlock) -> usize {
        let at = self
            .blocks
            .partition_point(|b| b.global_start <= block.global_start);
        self.blocks.insert(at, block);
        at
    }

    pub fn push(&mut self, block: ScheduledBlock) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// Slot substitution: a block ending before the current tail takes the
    /// tail's slot and the displaced tail goes back on top.
    pub fn overwrite(&mut self, block: ScheduledBlock) -> usize {
        match self.blocks.last() {
            Some(tail) if block.global_end < tail.global_end => {
                let at = self.blocks.len() - 1;
                self.blocks.insert(at, block);
                at
            }
            _ => self.push(block),
        }
    }

    pub fn place(&mut self, block: ScheduledBlock) -> usize {
        match block.composition {
            Composition::Merge => self.insert_ordered(block),
            Composition::Append | Composition::Replace => self.push(block),
            Composition::Overwrite => self.overwrite(block),
        }
    }

    /// Drop blocks that ended at or before `now`.
    pub fn prune(&mut self, now: f32) {
        self.blocks.retain(|b| b.global_end > now);
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledBlock> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Outcome of resolving one block.
#[derive(Debug)]
pub struct Resolution {
    pub block: ScheduledBlock,
    /// Surviving instructions in input order.
    pub instructions: Vec<Instruction>,
    /// Behavior name and reason for every record that could not be timed.
    pub dropped: Vec<(String, RealizerError)>,
    /// Records that referenced absolute time instead of the block origin.
    pub back_references: usize,
}

/// Origin that block-relative offsets are measured from.
pub fn block_origin(composition: Composition, now: f32, stack: &ScheduleStack) -> f32 {
    match composition {
        Composition::Append => stack.tail_end().map_or(now, |tail| tail.max(now)),
        Composition::Merge | Composition::Replace | Composition::Overwrite => now,
    }
}

pub fn resolve_block(
    block: &Block,
    id: BlockId,
    now: f32,
    stack: &ScheduleStack,
    timings: &TimingTable,
    ids: &mut IdAllocator,
) -> Resolution {
    let origin = block_origin(block.composition, now, stack);
    let back_references = block
        .behaviors
        .iter()
        .filter(|r| r.sync.has_back_reference())
        .count();
    let mut instructions = Vec::with_capacity(block.behaviors.len());
    let mut dropped = Vec::new();

    for (index, record) in block.behaviors.iter().enumerate() {
        let name = record.name(index);
        let behavior = &record.behavior;
        let spec = record.sync.rebased(origin, &name);
        let timeline = match SyncTimeline::resolve(
            &spec,
            timings.get(behavior.kind()),
            behavior.is_shift(),
            &name,
        ) {
            Ok(tl) => tl,
            Err(e) => {
                dropped.push((name, e));
                continue;
            }
        };
        instructions.push(Instruction {
            id: ids.alloc_instruction(),
            block: id,
            global_start: origin + timeline.start,
            global_end: origin + timeline.end,
            timeline: timeline.normalized(),
            name,
            behavior: behavior.clone(),
            composition: block.composition,
            automatic: false,
        });
    }

    let global_start = instructions
        .iter()
        .map(|i| i.global_start)
        .reduce(f32::min)
        .unwrap_or(origin);
    let global_end = instructions
        .iter()
        .map(|i| i.global_end)
        .reduce(f32::max)
        .unwrap_or(origin);
    debug!(
        "{id} '{}' {:?}: origin {origin} (+{}), span [{global_start}, {global_end}], {} instructions, {} dropped, {back_references} back-referenced",
        block.display_name(),
        block.composition,
        block.relative_start(),
        instructions.len(),
        dropped.len()
    );

    Resolution {
        block: ScheduledBlock {
            id,
            name: block.display_name().to_string(),
            composition: block.composition,
            global_start,
            global_end,
        },
        instructions,
        dropped,
        back_references,
    }
}
