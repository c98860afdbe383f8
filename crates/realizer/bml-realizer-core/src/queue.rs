//! Per-kind queue of not-yet-active instructions.
//!
//! Always ordered by ascending `global_start`; new entries are placed by
//! binary search after any entry with an equal start, so ties keep arrival
//! order. Overlaps in exclusive queues are reported, never corrected.

use std::collections::VecDeque;

use crate::block::QueueKind;
use crate::diagnostics::{OrderingViolation, ViolationKind};
use crate::ids::BlockId;
use crate::instruction::Instruction;

/// Tolerance for comparing global times.
const TIME_EPS: f32 = 1e-5;

#[derive(Clone, Debug)]
pub struct InstructionQueue {
    kind: QueueKind,
    items: VecDeque<Instruction>,
}

impl InstructionQueue {
    pub fn new(kind: QueueKind) -> Self {
        Self {
            kind,
            items: VecDeque::new(),
        }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    #[inline]
    fn slot_for(&self, global_start: f32) -> usize {
        self.items
            .partition_point(|i| i.global_start <= global_start)
    }

    /// Ordered insertion; returns the index the instruction landed at.
    pub fn insert(&mut self, instruction: Instruction) -> usize {
        let at = self.slot_for(instruction.global_start);
        self.items.insert(at, instruction);
        at
    }

    /// Index of the entry with the latest `global_end` among the first `at`.
    fn widest_before(&self, at: usize) -> Option<usize> {
        self.items
            .iter()
            .take(at)
            .enumerate()
            .fold(None, |best: Option<usize>, (i, item)| match best {
                Some(b) if self.items[b].global_end >= item.global_end => Some(b),
                _ => Some(i),
            })
    }

    /// Insert only if the instruction overlaps nothing already queued;
    /// otherwise hand it back. Earlier entries may reach past their
    /// neighbours, so the widest one decides.
    pub fn try_fit(&mut self, instruction: Instruction) -> Result<usize, Instruction> {
        let at = self.slot_for(instruction.global_start);
        let after_prev = self
            .widest_before(at)
            .map_or(true, |w| self.items[w].global_end <= instruction.global_start + TIME_EPS);
        let before_next = self
            .items
            .get(at)
            .map_or(true, |next| instruction.global_end <= next.global_start + TIME_EPS);
        if after_prev && before_next {
            self.items.insert(at, instruction);
            Ok(at)
        } else {
            Err(instruction)
        }
    }

    /// Remove every queued entry overlapping `[start, end)` that does not
    /// belong to block `spare`.
    pub fn evict_overlapping(&mut self, start: f32, end: f32, spare: BlockId) -> Vec<Instruction> {
        let mut evicted = Vec::new();
        let mut kept = VecDeque::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if item.block != spare && item.overlaps(start, end) {
                evicted.push(item);
            } else {
                kept.push_back(item);
            }
        }
        self.items = kept;
        evicted
    }

    /// Pop the head if it is due at `now`.
    pub fn pop_due(&mut self, now: f32) -> Option<Instruction> {
        match self.items.front() {
            Some(head) if head.global_start <= now => self.items.pop_front(),
            _ => None,
        }
    }

    /// Empty the queue, returning what was pending.
    pub fn purge(&mut self) -> Vec<Instruction> {
        self.items.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check the ordering invariant over the whole queue.
    pub fn check(&self) -> Vec<OrderingViolation> {
        let mut out = Vec::new();
        let mut widest = 0;
        for i in 1..self.items.len() {
            out.extend(self.check_index(i, widest));
            if self.items[i].global_end > self.items[widest].global_end {
                widest = i;
            }
        }
        out
    }

    /// Check the entries at `at` and right after it against what precedes them.
    pub fn check_around(&self, at: usize) -> Vec<OrderingViolation> {
        let mut out = Vec::new();
        for i in [at, at + 1] {
            if i == 0 || i >= self.items.len() {
                continue;
            }
            if let Some(w) = self.widest_before(i) {
                out.extend(self.check_index(i, w));
            }
        }
        out
    }

    /// Adjacent order first; otherwise overlap with the widest predecessor.
    fn check_index(&self, i: usize, widest: usize) -> Option<OrderingViolation> {
        if self.items[i].global_start < self.items[i - 1].global_start {
            self.check_pair(i - 1, i)
        } else {
            self.check_pair(widest, i)
        }
    }

    fn check_pair(&self, a: usize, b: usize) -> Option<OrderingViolation> {
        let (prev, next) = (&self.items[a], &self.items[b]);
        let problem = if next.global_start < prev.global_start {
            ViolationKind::Unsorted
        } else if !self.kind.allows_overlap() && prev.global_end > next.global_start + TIME_EPS {
            ViolationKind::Overlap {
                by: prev.global_end - next.global_start,
            }
        } else {
            return None;
        };
        Some(OrderingViolation {
            kind: self.kind,
            previous: prev.id,
            next: next.id,
            problem,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Behavior, BlinkParams, Composition, LexemeParams};
    use crate::config::TimingTable;
    use crate::ids::InstructionId;
    use crate::timeline::{SyncSpec, SyncTimeline};

    fn instr(id: u32, behavior: Behavior, start: f32, end: f32) -> Instruction {
        let timeline = SyncTimeline::resolve(
            &SyncSpec::span(0.0, end - start),
            TimingTable::default().get(behavior.kind()),
            false,
            "t",
        )
        .unwrap();
        Instruction {
            id: InstructionId(id),
            block: BlockId(id / 10),
            name: format!("i{id}"),
            behavior,
            timeline,
            global_start: start,
            global_end: end,
            composition: Composition::Merge,
            automatic: false,
        }
    }

    fn blink(id: u32, start: f32, end: f32) -> Instruction {
        instr(id, Behavior::Blink(BlinkParams::default()), start, end)
    }

    fn ids(q: &InstructionQueue) -> Vec<u32> {
        q.iter().map(|i| i.id.0).collect()
    }

    #[test]
    fn ordered_insert_keeps_ties_in_arrival_order() {
        let mut q = InstructionQueue::new(QueueKind::Blink);
        q.insert(blink(1, 5.0, 6.0));
        q.insert(blink(2, 1.0, 2.0));
        q.insert(blink(3, 5.0, 5.5));
        q.insert(blink(4, 3.0, 4.0));
        assert_eq!(ids(&q), vec![2, 4, 1, 3]);
        let starts: Vec<f32> = q.iter().map(|i| i.global_start).collect();
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn pop_due_respects_time() {
        let mut q = InstructionQueue::new(QueueKind::Blink);
        q.insert(blink(1, 1.0, 2.0));
        q.insert(blink(2, 3.0, 4.0));
        assert!(q.pop_due(0.5).is_none());
        assert_eq!(q.pop_due(1.0).map(|i| i.id.0), Some(1));
        assert!(q.pop_due(2.9).is_none());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn overlap_reported_only_for_exclusive_kinds() {
        let mut q = InstructionQueue::new(QueueKind::Blink);
        q.insert(blink(1, 0.0, 2.0));
        let at = q.insert(blink(2, 1.0, 3.0));
        let v = q.check_around(at);
        assert_eq!(v.len(), 1);
        assert!(matches!(v[0].problem, ViolationKind::Overlap { .. }));

        let smile = || {
            Behavior::FaceLexeme(LexemeParams {
                lexeme: "SMILE".into(),
                amount: 1.0,
            })
        };
        let mut f = InstructionQueue::new(QueueKind::Face);
        f.insert(instr(1, smile(), 0.0, 2.0));
        f.insert(instr(2, smile(), 1.0, 3.0));
        assert!(f.check().is_empty());
    }

    #[test]
    fn try_fit_uses_gaps() {
        let mut q = InstructionQueue::new(QueueKind::Blink);
        q.insert(blink(1, 0.0, 1.0));
        q.insert(blink(2, 3.0, 4.0));
        assert_eq!(q.try_fit(blink(3, 1.0, 3.0)), Ok(1));
        let rejected = q.try_fit(blink(4, 0.5, 1.5)).unwrap_err();
        assert_eq!(rejected.id.0, 4);
        assert_eq!(ids(&q), vec![1, 3, 2]);
    }

    #[test]
    fn try_fit_sees_entries_reaching_past_neighbours() {
        let mut q = InstructionQueue::new(QueueKind::Blink);
        q.insert(blink(1, 0.0, 5.0));
        q.insert(blink(2, 1.0, 2.0));
        // the gap after [1, 2] is still covered by [0, 5]
        let rejected = q.try_fit(blink(3, 3.0, 4.0)).unwrap_err();
        assert_eq!(rejected.id.0, 3);
        assert_eq!(q.try_fit(blink(4, 5.0, 6.0)), Ok(2));
        assert_eq!(ids(&q), vec![1, 2, 4]);
    }

    #[test]
    fn overlap_with_earlier_long_entry_is_reported() {
        let mut q = InstructionQueue::new(QueueKind::Blink);
        q.insert(blink(1, 0.0, 5.0));
        q.insert(blink(2, 1.0, 2.0));
        let at = q.insert(blink(3, 3.0, 4.0));
        let around = q.check_around(at);
        assert_eq!(around.len(), 1);
        assert_eq!((around[0].previous.0, around[0].next.0), (1, 3));
        match around[0].problem {
            ViolationKind::Overlap { by } => assert!((by - 2.0).abs() < 1e-6),
            other => panic!("unexpected violation {other:?}"),
        }
        let all = q.check();
        assert_eq!(
            all.iter().map(|v| (v.previous.0, v.next.0)).collect::<Vec<_>>(),
            vec![(1, 2), (1, 3)]
        );
    }

    #[test]
    fn evict_and_purge() {
        let mut q = InstructionQueue::new(QueueKind::Blink);
        q.insert(blink(10, 0.0, 1.0));
        q.insert(blink(11, 2.0, 3.0));
        q.insert(blink(20, 4.0, 5.0));
        q.insert(blink(30, 4.2, 4.4));
        let gone = q.evict_overlapping(2.5, 4.5, BlockId(3));
        assert_eq!(gone.iter().map(|i| i.id.0).collect::<Vec<_>>(), vec![11, 20]);
        assert_eq!(ids(&q), vec![10, 30]);
        assert_eq!(q.purge().len(), 2);
        assert!(q.is_empty());
    }
}
