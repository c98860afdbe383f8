//! Scheduler: owns the per-kind queues, the schedule stack, the active
//! realizers and the channel state, and drives them once per tick.
//!
//! Methods:
//! - submit / submit_json: resolve a block and place its instructions
//! - tick: promote → advance → composite, producing a [`Frame`]
//! - set_target / contribute: external inputs
//! - queue, active_count, check_queues, take_diagnostics, reset

use hashbrown::HashMap;
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::accumulate::{TargetAccumulator, WeightCompositor};
use crate::block::{Behavior, BlinkParams, Block, Composition, QueueKind};
use crate::compose::{self, ScheduleStack};
use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticsLog, EvictReason, OrderingViolation};
use crate::emotion::EmotionGrid;
use crate::error::RealizerError;
use crate::ids::{BlockId, IdAllocator};
use crate::instruction::Instruction;
use crate::lexicon::Lexicon;
use crate::outputs::{Frame, RealizerEvent};
use crate::phase::Phase;
use crate::queue::InstructionQueue;
use crate::realizers::blink::{auto_duration, auto_timeline};
use crate::realizers::{AutoBlink, BuildContext, ChannelRealizer, Contributions, TickContext};
use crate::targets::TargetRegistry;

/// What happened to a submitted block.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReport {
    /// `None` when the whole block was dropped.
    pub block: Option<BlockId>,
    pub scheduled: usize,
    pub dropped: usize,
    pub evicted: usize,
}

/// A promoted instruction and its realizer.
#[derive(Debug)]
struct Active {
    instruction: Instruction,
    realizer: ChannelRealizer,
    /// Promoted this tick; its clock starts at 0.
    fresh: bool,
    interrupted: bool,
}

pub struct Scheduler {
    config: Config,
    lexicon: Lexicon,
    grid: EmotionGrid,
    ids: IdAllocator,
    queues: Vec<InstructionQueue>,
    stack: ScheduleStack,
    active: Vec<Active>,
    /// Values committed by finished shifts.
    baselines: IndexMap<String, f32>,
    /// Channel values of the last frame.
    settled: HashMap<String, f32>,
    targets: TargetRegistry,
    external: Vec<(String, f32)>,
    compositor: WeightCompositor,
    ik: TargetAccumulator,
    auto_blink: AutoBlink,
    diagnostics: DiagnosticsLog,
    /// Events raised outside a tick, delivered with the next frame.
    pending_events: Vec<RealizerEvent>,
    frame: Frame,
    last_tick: Option<f32>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Scheduler {
    pub fn new(config: Config) -> Self {
        Self::with_lexicon(config, Lexicon::builtin())
    }

    pub fn with_lexicon(config: Config, lexicon: Lexicon) -> Self {
        let grid = EmotionGrid::new(lexicon.emotions(), &config.emotion);
        Self {
            lexicon,
            grid,
            ids: IdAllocator::new(),
            queues: QueueKind::ALL.iter().map(|k| InstructionQueue::new(*k)).collect(),
            stack: ScheduleStack::new(),
            active: Vec::new(),
            baselines: IndexMap::new(),
            settled: HashMap::new(),
            targets: TargetRegistry::new(),
            external: Vec::new(),
            compositor: WeightCompositor::new(config.epsilon),
            ik: TargetAccumulator::new(),
            auto_blink: AutoBlink::new(config.blink.seed),
            diagnostics: DiagnosticsLog::new(config.max_diagnostics),
            pending_events: Vec::new(),
            frame: Frame::default(),
            last_tick: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Parse and submit a JSON block. Only malformed JSON is an error.
    pub fn submit_json(&mut self, json: &str, now: f32) -> Result<SubmitReport, RealizerError> {
        let block = Block::from_json(json)?;
        Ok(self.submit(&block, now))
    }

    /// Resolve `block` against the current schedule and queue its
    /// instructions. Problems with individual behaviors are recorded as
    /// diagnostics; the rest of the block is still scheduled.
    pub fn submit(&mut self, block: &Block, now: f32) -> SubmitReport {
        let id = self.ids.alloc_block();
        let mut report = SubmitReport::default();

        if block.composition == Composition::Replace {
            report.evicted += self.cancel_all();
        }

        let resolution = compose::resolve_block(
            block,
            id,
            now,
            &self.stack,
            &self.config.timings,
            &mut self.ids,
        );
        report.dropped = resolution.dropped.len();
        for (behavior, error) in resolution.dropped {
            self.diagnostics.push(Diagnostic::InstructionDropped {
                block: id,
                behavior,
                error,
            });
        }
        if resolution.instructions.is_empty() {
            self.diagnostics.push(Diagnostic::BlockDropped {
                block: id,
                name: block.display_name().to_string(),
                error: RealizerError::EmptyBlock {
                    block: block.display_name().to_string(),
                },
            });
            return report;
        }

        let scheduled = resolution.block;
        for instruction in resolution.instructions {
            report.evicted += self.enqueue(instruction);
            report.scheduled += 1;
        }
        self.pending_events.push(RealizerEvent::BlockScheduled {
            block: id,
            name: scheduled.name.clone(),
            global_start: scheduled.global_start,
            global_end: scheduled.global_end,
        });
        self.stack.place(scheduled);
        report.block = Some(id);
        report
    }

    /// Place one instruction in its queue; returns how many queued
    /// instructions it evicted.
    fn enqueue(&mut self, instruction: Instruction) -> usize {
        let kind = instruction.kind();
        let queue = &mut self.queues[kind.index()];
        let mut evicted = Vec::new();
        let at = match instruction.composition {
            Composition::Overwrite => match queue.try_fit(instruction) {
                Ok(at) => at,
                Err(instruction) => {
                    evicted = queue.evict_overlapping(
                        instruction.global_start,
                        instruction.global_end,
                        instruction.block,
                    );
                    queue.insert(instruction)
                }
            },
            Composition::Merge | Composition::Append | Composition::Replace => {
                queue.insert(instruction)
            }
        };
        let violations = queue.check_around(at);
        let count = evicted.len();
        for e in evicted {
            self.diagnostics.push(Diagnostic::InstructionEvicted {
                kind,
                instruction: e.id,
                behavior: e.name,
                reason: EvictReason::OverwriteConflict,
            });
        }
        for v in violations {
            self.diagnostics.push(Diagnostic::OrderingViolation(v));
        }
        count
    }

    /// Purge every queue, terminate every active realizer and forget the
    /// schedule stack.
    fn cancel_all(&mut self) -> usize {
        let mut purged = 0;
        for queue in &mut self.queues {
            for i in queue.purge() {
                purged += 1;
                self.diagnostics.push(Diagnostic::InstructionEvicted {
                    kind: i.kind(),
                    instruction: i.id,
                    behavior: i.name,
                    reason: EvictReason::Replaced,
                });
            }
        }
        for a in &mut self.active {
            if !a.realizer.is_terminated() {
                a.realizer.terminate();
                a.interrupted = true;
            }
        }
        self.stack.clear();
        debug!("replace: purged {purged} queued, terminated {} active", self.active.len());
        purged
    }

    /// Advance to global time `now` and produce the frame.
    pub fn tick(&mut self, now: f32) -> &Frame {
        let dt = self.last_tick.map_or(0.0, |last| (now - last).max(0.0));
        self.last_tick = Some(now);
        self.frame.clear();
        self.frame.time = now;
        self.frame.events.append(&mut self.pending_events);

        // 1) Forget blocks that are over
        self.stack.prune(now);

        // 2) Automatic blinking
        self.auto_blink(now);

        // 3) Promote due instructions
        for k in 0..self.queues.len() {
            while let Some(instruction) = self.queues[k].pop_due(now) {
                self.activate(instruction, now);
            }
        }

        // 4) Advance realizers and collect contributions
        {
            let ctx = TickContext {
                now,
                config: &self.config,
                settled: &self.settled,
                targets: &self.targets,
            };
            let mut out = Contributions::new(&mut self.compositor, &mut self.ik);
            for a in &mut self.active {
                let step = if a.fresh { 0.0 } else { dt };
                a.fresh = false;
                a.realizer.advance(step, &ctx, &mut out);
            }
        }

        // 5) External producers
        for (channel, value) in self.external.drain(..) {
            self.compositor.add(&channel, value);
        }

        // 6) Retire finished realizers, committing shift results
        let (done, running): (Vec<Active>, Vec<Active>) = std::mem::take(&mut self.active)
            .into_iter()
            .partition(|a| a.realizer.phase() == Phase::Done);
        self.active = running;
        for a in done {
            self.retire(a);
        }

        // 7) Channels: baselines, overridden by this tick's contributions
        for (channel, value) in &self.baselines {
            self.frame.channels.insert(channel.clone(), *value);
        }
        self.compositor.finalize_into(&mut self.frame.channels);

        // 8) IK goals
        self.ik.finalize_into(&mut self.frame.ik_targets);

        // 9) Remember what was shown
        self.settled.clear();
        for (channel, value) in &self.frame.channels {
            self.settled.insert(channel.clone(), *value);
        }

        // 10) Bound the event list
        let max = self.config.max_events_per_tick;
        if self.frame.events.len() > max {
            let dropped = self.frame.events.len() - max;
            self.frame.events.truncate(max);
            self.diagnostics.push(Diagnostic::EventsTruncated { dropped });
        }

        &self.frame
    }

    fn auto_blink(&mut self, now: f32) {
        let cfg = &self.config.blink;
        if !cfg.enabled || !self.auto_blink.poll(now, cfg) {
            return;
        }
        let blinking = !self.queues[QueueKind::Blink.index()].is_empty()
            || self
                .active
                .iter()
                .any(|a| a.instruction.kind() == QueueKind::Blink);
        if blinking {
            return;
        }
        let Some(end) = auto_duration(&self.settled, cfg) else {
            debug!("auto blink skipped at {now}: lids already closed");
            return;
        };
        let timeline = match auto_timeline(&self.config.timings.blink, end) {
            Ok(tl) => tl,
            Err(e) => {
                debug!("auto blink skipped at {now}: {e}");
                return;
            }
        };
        let instruction = Instruction {
            id: self.ids.alloc_instruction(),
            block: self.ids.alloc_block(),
            name: "autoBlink".into(),
            behavior: Behavior::Blink(BlinkParams::default()),
            timeline,
            global_start: now,
            global_end: now + end,
            composition: Composition::Merge,
            automatic: true,
        };
        self.frame.push_event(RealizerEvent::AutoBlink {
            instruction: instruction.id,
            duration: end,
        });
        self.queues[QueueKind::Blink.index()].insert(instruction);
    }

    fn activate(&mut self, instruction: Instruction, now: f32) {
        let ctx = BuildContext {
            tick: TickContext {
                now,
                config: &self.config,
                settled: &self.settled,
                targets: &self.targets,
            },
            lexicon: &self.lexicon,
            grid: &self.grid,
            baselines: &self.baselines,
        };
        let mut fallbacks = Vec::new();
        let built = ChannelRealizer::build(&instruction, &ctx, &mut fallbacks);
        for error in fallbacks {
            self.diagnostics.push(Diagnostic::Fallback {
                behavior: instruction.name.clone(),
                error,
            });
        }
        let realizer = match built {
            Ok(r) => r,
            Err(error) => {
                self.diagnostics.push(Diagnostic::InstructionDropped {
                    block: instruction.block,
                    behavior: instruction.name,
                    error,
                });
                return;
            }
        };

        debug!(
            "{} '{}' promoted at {now} (scheduled {})",
            instruction.id, instruction.name, instruction.global_start
        );
        let kind = instruction.kind();
        if kind == QueueKind::Blink && !instruction.automatic {
            self.auto_blink.rearm(now, &self.config.blink);
        }
        self.frame.push_event(RealizerEvent::BehaviorStarted {
            instruction: instruction.id,
            block: instruction.block,
            kind,
            behavior: instruction.name.clone(),
        });
        if let ChannelRealizer::Speech(speech) = &realizer {
            self.frame.push_event(RealizerEvent::SpeechStarted {
                instruction: instruction.id,
                text: speech.text().to_string(),
                duration: instruction.duration(),
            });
        }
        self.active.push(Active {
            instruction,
            realizer,
            fresh: true,
            interrupted: false,
        });
    }

    fn retire(&mut self, a: Active) {
        for (channel, value) in a.realizer.committed() {
            self.baselines.insert(channel, value);
        }
        if let ChannelRealizer::Speech(speech) = &a.realizer {
            self.frame.push_event(RealizerEvent::SpeechEnded {
                instruction: a.instruction.id,
                text: speech.text().to_string(),
            });
        }
        debug!(
            "{} '{}' finished{}",
            a.instruction.id,
            a.instruction.name,
            if a.interrupted { " (interrupted)" } else { "" }
        );
        self.frame.push_event(RealizerEvent::BehaviorEnded {
            instruction: a.instruction.id,
            block: a.instruction.block,
            kind: a.instruction.kind(),
            behavior: a.instruction.name,
            interrupted: a.interrupted,
        });
    }

    /// Move or create a named target point.
    pub fn set_target(&mut self, name: &str, position: [f32; 3]) {
        self.targets.set(name, position);
    }

    pub fn remove_target(&mut self, name: &str) -> Option<[f32; 3]> {
        self.targets.remove(name)
    }

    /// Add an external contribution (e.g. lip-sync) to `channel` for the
    /// next tick only.
    pub fn contribute(&mut self, channel: &str, value: f32) {
        self.external.push((channel.to_string(), value));
    }

    /// Pending instructions of `kind`, ordered by global start.
    pub fn queue(&self, kind: QueueKind) -> &InstructionQueue {
        &self.queues[kind.index()]
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Instructions currently being realized, in promotion order.
    pub fn active_instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.active.iter().map(|a| &a.instruction)
    }

    pub fn stack(&self) -> &ScheduleStack {
        &self.stack
    }

    /// Run the ordering check over every queue. Violations are also
    /// recorded as diagnostics.
    pub fn check_queues(&mut self) -> Vec<OrderingViolation> {
        let violations: Vec<OrderingViolation> =
            self.queues.iter().flat_map(|q| q.check()).collect();
        for v in &violations {
            self.diagnostics.push(Diagnostic::OrderingViolation(v.clone()));
        }
        violations
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.drain()
    }

    /// Committed value of `channel`, if a shift left one.
    pub fn baseline(&self, channel: &str) -> Option<f32> {
        self.baselines.get(channel).copied()
    }

    /// The last produced frame.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Return to the freshly constructed state, keeping config and lexicon.
    pub fn reset(&mut self) {
        self.ids.reset();
        for q in &mut self.queues {
            q.purge();
        }
        self.stack.clear();
        self.active.clear();
        self.baselines.clear();
        self.settled.clear();
        self.targets.clear();
        self.external.clear();
        self.compositor.clear();
        self.ik = TargetAccumulator::new();
        self.auto_blink.reset(self.config.blink.seed);
        self.diagnostics.clear();
        self.pending_events.clear();
        self.frame = Frame::default();
        self.last_tick = None;
    }
}
