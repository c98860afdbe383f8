//! Facial expressions: lexemes, single action units and valence-arousal
//! emotions. One timeline drives any number of action-unit tracks.

use super::{BuildContext, Contributions, Realize, TickContext};
use crate::block::{EmotionParams, FacsParams, LexemeParams, Side};
use crate::error::RealizerError;
use crate::interp::lerp_f32;
use crate::lexicon::AuDelta;
use crate::phase::{PhaseAnimator, PhaseSample};

/// One action-unit channel moving from `initial` to `target`.
#[derive(Clone, Debug, PartialEq)]
pub struct AuTrack {
    pub channel: String,
    pub initial: f32,
    pub target: f32,
    pub current: f32,
}

impl AuTrack {
    pub fn new(channel: String, initial: f32, delta: f32) -> Self {
        Self {
            channel,
            initial,
            target: (initial + delta).clamp(-1.0, 1.0),
            current: initial,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FaceRealizer {
    animator: PhaseAnimator,
    tracks: Vec<AuTrack>,
}

impl FaceRealizer {
    fn from_deltas<'d>(
        animator: PhaseAnimator,
        deltas: impl IntoIterator<Item = &'d AuDelta>,
        amount: f32,
        ctx: &BuildContext<'_>,
    ) -> Self {
        let tracks = deltas
            .into_iter()
            .map(|d| AuTrack::new(d.au.clone(), ctx.baseline(&d.au), d.weight * amount))
            .collect();
        Self { animator, tracks }
    }

    pub fn lexeme(
        animator: PhaseAnimator,
        params: &LexemeParams,
        ctx: &BuildContext<'_>,
    ) -> Result<Self, RealizerError> {
        let deltas = ctx.lexicon.lexeme(&params.lexeme)?;
        Ok(Self::from_deltas(animator, deltas, params.amount, ctx))
    }

    pub fn facs(
        animator: PhaseAnimator,
        params: &FacsParams,
        ctx: &BuildContext<'_>,
    ) -> Result<Self, RealizerError> {
        let tracks = facs_channels(&params.au, params.side)?
            .into_iter()
            .map(|ch| {
                let initial = ctx.baseline(&ch);
                AuTrack::new(ch, initial, params.amount)
            })
            .collect();
        Ok(Self { animator, tracks })
    }

    pub fn emotion(animator: PhaseAnimator, params: &EmotionParams, ctx: &BuildContext<'_>) -> Self {
        let deltas = ctx.grid.blend(params.valence, params.arousal);
        Self::from_deltas(animator, &deltas, params.amount, ctx)
    }

    pub fn tracks(&self) -> &[AuTrack] {
        &self.tracks
    }
}

/// Channel names for an action unit given as `AU12` or `12`.
pub fn facs_channels(au: &str, side: Side) -> Result<Vec<String>, RealizerError> {
    let raw = au.trim().to_ascii_uppercase();
    let digits = raw.strip_prefix("AU").unwrap_or(&raw);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(RealizerError::unknown("action unit", au));
    }
    let base = format!("AU{digits}");
    Ok(match side {
        Side::Both => vec![base],
        Side::Left => vec![format!("{base}_L")],
        Side::Right => vec![format!("{base}_R")],
    })
}

impl Realize for FaceRealizer {
    fn animator(&self) -> &PhaseAnimator {
        &self.animator
    }

    fn animator_mut(&mut self) -> &mut PhaseAnimator {
        &mut self.animator
    }

    fn update(&mut self, sample: PhaseSample, _ctx: &TickContext<'_>) {
        for t in &mut self.tracks {
            t.current = lerp_f32(t.initial, t.target, sample.factor);
        }
    }

    fn emit(&self, out: &mut Contributions<'_>) {
        for t in &self.tracks {
            out.channel(&t.channel, t.current);
        }
    }

    fn committed(&self) -> Vec<(String, f32)> {
        if !self.animator.timeline().shift {
            return Vec::new();
        }
        self.tracks
            .iter()
            .map(|t| (t.channel.clone(), t.current))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Behavior;
    use crate::phase::Phase;
    use crate::realizers::test_support::Harness;
    use crate::realizers::ChannelRealizer;
    use crate::timeline::SyncSpec;

    fn smile(shift: bool) -> Behavior {
        let p = LexemeParams {
            lexeme: "smile".into(),
            amount: 1.0,
        };
        if shift {
            Behavior::FaceShift(p)
        } else {
            Behavior::FaceLexeme(p)
        }
    }

    #[test]
    fn lexeme_drives_every_unit() {
        let mut h = Harness::new();
        let i = h.instruction(smile(false), SyncSpec::span(0.0, 2.0));
        let (mut r, _) = h.build(&i);
        let (s, v) = h.step(&mut r, 1.0);
        assert_eq!(s.phase, Phase::Hold);
        assert!((v["AU12"] - 0.8).abs() < 1e-6);
        assert!((v["AU6"] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn starts_from_baseline() {
        let mut h = Harness::new();
        h.baselines.insert("AU12".into(), 0.5);
        let i = h.instruction(smile(false), SyncSpec::span(0.0, 2.0));
        let (mut r, _) = h.build(&i);
        let (_, v) = h.step(&mut r, 0.0);
        assert_eq!(v["AU12"], 0.5);
        let (_, v) = h.step(&mut r, 1.0);
        assert_eq!(v["AU12"], 1.0);
    }

    #[test]
    fn shift_commits_target() {
        let mut h = Harness::new();
        let i = h.instruction(smile(true), SyncSpec::span(0.0, 1.0));
        let (mut r, _) = h.build(&i);
        h.step(&mut r, 0.1);
        let (s, _) = h.step(&mut r, 1.0);
        assert_eq!(s.phase, Phase::Done);
        let committed = r.committed();
        assert!(committed.contains(&("AU12".to_string(), 0.8)));
    }

    #[test]
    fn unknown_lexeme_is_an_error() {
        let h = Harness::new();
        let i = h.instruction(
            Behavior::FaceLexeme(LexemeParams {
                lexeme: "WINK_TWICE".into(),
                amount: 1.0,
            }),
            SyncSpec::span(0.0, 1.0),
        );
        let mut fallbacks = Vec::new();
        let err = ChannelRealizer::build(&i, &h.build_ctx(), &mut fallbacks).unwrap_err();
        assert!(matches!(err, RealizerError::UnknownReference { .. }));
    }

    #[test]
    fn facs_channel_names() {
        assert_eq!(facs_channels("12", Side::Both).unwrap(), vec!["AU12"]);
        assert_eq!(facs_channels("au4", Side::Left).unwrap(), vec!["AU4_L"]);
        assert!(facs_channels("brow", Side::Both).is_err());
        assert!(facs_channels("AU", Side::Both).is_err());
    }

    #[test]
    fn emotion_blends_reference_points() {
        let mut h = Harness::new();
        let i = h.instruction(
            Behavior::FaceEmotion(EmotionParams {
                valence: 0.8,
                arousal: 0.4,
                amount: 1.0,
                shift: false,
            }),
            SyncSpec::span(0.0, 2.0),
        );
        let (mut r, _) = h.build(&i);
        let (_, v) = h.step(&mut r, 1.0);
        assert!(v["AU12"] > 0.5);
        assert!(v.get("AU9").map_or(true, |x| *x < 0.05));
    }
}
