//! Non-fatal diagnostics: dropped or evicted instructions, fallbacks and
//! ordering violations. Each one is logged when recorded and retained until
//! the host drains it.

use std::collections::VecDeque;
use std::fmt;

use log::{info, warn};
use serde::Serialize;

use crate::block::QueueKind;
use crate::error::RealizerError;
use crate::ids::{BlockId, InstructionId};

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViolationKind {
    /// `next.global_start < prev.global_start`.
    Unsorted,
    /// `prev.global_end > next.global_start` in an exclusive queue.
    Overlap { by: f32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderingViolation {
    pub kind: QueueKind,
    pub previous: InstructionId,
    pub next: InstructionId,
    pub problem: ViolationKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EvictReason {
    /// Cancelled by a REPLACE block.
    Replaced,
    /// Displaced by an OVERWRITE instruction that found no gap.
    OverwriteConflict,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "diagnostic", rename_all = "camelCase")]
pub enum Diagnostic {
    InstructionDropped {
        block: BlockId,
        behavior: String,
        error: RealizerError,
    },
    BlockDropped {
        block: BlockId,
        name: String,
        error: RealizerError,
    },
    InstructionEvicted {
        kind: QueueKind,
        instruction: InstructionId,
        behavior: String,
        reason: EvictReason,
    },
    /// The behavior runs with a documented default instead.
    Fallback {
        behavior: String,
        error: RealizerError,
    },
    OrderingViolation(OrderingViolation),
    EventsTruncated {
        dropped: usize,
    },
}

impl Diagnostic {
    /// The underlying error, for diagnostics raised by one.
    pub fn error(&self) -> Option<&RealizerError> {
        match self {
            Diagnostic::InstructionDropped { error, .. }
            | Diagnostic::BlockDropped { error, .. }
            | Diagnostic::Fallback { error, .. } => Some(error),
            Diagnostic::InstructionEvicted { .. }
            | Diagnostic::OrderingViolation(_)
            | Diagnostic::EventsTruncated { .. } => None,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Diagnostic::InstructionEvicted { .. } | Diagnostic::OrderingViolation(_) => "queue",
            Diagnostic::EventsTruncated { .. } => "output",
            _ => self.error().map_or("input", RealizerError::category),
        }
    }

    /// True when the affected behavior still runs, with a fallback.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Diagnostic::Fallback { error, .. } if error.is_recoverable())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::InstructionDropped {
                block,
                behavior,
                error,
            } => write!(f, "{block}: dropped '{behavior}': {error}"),
            Diagnostic::BlockDropped { block, name, error } => {
                write!(f, "{block} '{name}' dropped: {error}")
            }
            Diagnostic::InstructionEvicted {
                kind,
                instruction,
                behavior,
                reason,
            } => write!(f, "{kind} queue: evicted {instruction} '{behavior}' ({reason:?})"),
            Diagnostic::Fallback { behavior, error } => {
                write!(f, "'{behavior}': {error}; using default")
            }
            Diagnostic::OrderingViolation(v) => write!(
                f,
                "{} queue: ordering violation between {} and {}: {:?}",
                v.kind, v.previous, v.next, v.problem
            ),
            Diagnostic::EventsTruncated { dropped } => {
                write!(f, "event limit reached; {dropped} events discarded")
            }
        }
    }
}

/// Bounded log of undrained diagnostics; the oldest entries go first.
#[derive(Debug)]
pub struct DiagnosticsLog {
    entries: VecDeque<Diagnostic>,
    max: usize,
}

impl DiagnosticsLog {
    pub fn new(max: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max: max.max(1),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_recoverable() {
            info!("[{}] {diagnostic}", diagnostic.category());
        } else {
            warn!("[{}] {diagnostic}", diagnostic.category());
        }
        if self.entries.len() == self.max {
            self.entries.pop_front();
        }
        self.entries.push_back(diagnostic);
    }

    pub fn drain(&mut self) -> Vec<Diagnostic> {
        self.entries.drain(..).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
