//! Speech produces no channel output of its own. Its timeline brackets the
//! utterance so the scheduler can signal the lip-sync collaborator, which
//! feeds mouth channels back through `Scheduler::contribute`.

use super::{Contributions, Realize};
use crate::block::SpeechParams;
use crate::phase::PhaseAnimator;

#[derive(Clone, Debug)]
pub struct SpeechRealizer {
    animator: PhaseAnimator,
    text: String,
}

impl SpeechRealizer {
    pub fn new(animator: PhaseAnimator, params: &SpeechParams) -> Self {
        Self {
            animator,
            text: params.text.clone(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Realize for SpeechRealizer {
    fn animator(&self) -> &PhaseAnimator {
        &self.animator
    }

    fn animator_mut(&mut self) -> &mut PhaseAnimator {
        &mut self.animator
    }

    fn emit(&self, _out: &mut Contributions<'_>) {}
}
