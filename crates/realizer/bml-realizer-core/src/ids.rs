//! Identifiers and a simple allocator for scheduled entities.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct InstructionId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block#{}", self.0)
    }
}

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instr#{}", self.0)
    }
}

/// Monotonic allocator for BlockId and InstructionId.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_block: u32,
    next_instruction: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block = self.next_block.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_instruction(&mut self) -> InstructionId {
        let id = InstructionId(self.next_instruction);
        self.next_instruction = self.next_instruction.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
