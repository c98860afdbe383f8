//! Behavior blocks: the input model.
//!
//! ```json
//! { "id": "bml1", "composition": "MERGE",
//!   "behaviors": [ { "id": "b1", "type": "blink", "start": 0, "end": 1 } ] }
//! ```
//!
//! Symbolic names (lexemes, directions, targets) stay strings here and are
//! resolved when the behavior is activated, so an unknown name degrades one
//! behavior instead of rejecting the whole block.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RealizerError;
use crate::timeline::SyncSpec;

/// Rule for reconciling a new block with the existing schedule.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Composition {
    #[default]
    Merge,
    Append,
    Replace,
    Overwrite,
}

impl FromStr for Composition {
    type Err = RealizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MERGE" => Ok(Composition::Merge),
            "APPEND" => Ok(Composition::Append),
            "REPLACE" => Ok(Composition::Replace),
            "OVERWRITE" => Ok(Composition::Overwrite),
            _ => Err(RealizerError::unknown("composition", s)),
        }
    }
}

impl<'de> Deserialize<'de> for Composition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One per-kind instruction queue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKind {
    Blink,
    Face,
    Gaze,
    Head,
    Gesture,
    Speech,
}

impl QueueKind {
    pub const ALL: [QueueKind; 6] = [
        QueueKind::Blink,
        QueueKind::Face,
        QueueKind::Gaze,
        QueueKind::Head,
        QueueKind::Gesture,
        QueueKind::Speech,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Face expressions and gestures on different limbs legitimately overlap;
    /// everything else is exclusive within its queue.
    #[inline]
    pub fn allows_overlap(self) -> bool {
        matches!(self, QueueKind::Face | QueueKind::Gesture)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueueKind::Blink => "blink",
            QueueKind::Face => "face",
            QueueKind::Gaze => "gaze",
            QueueKind::Head => "head",
            QueueKind::Gesture => "gesture",
            QueueKind::Speech => "speech",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    #[default]
    Both,
    Left,
    Right,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Influence {
    #[default]
    Eyes,
    Head,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Hands {
    LeftHand,
    #[default]
    RightHand,
    BothHands,
}

fn one() -> f32 {
    1.0
}

fn half() -> f32 {
    0.5
}

fn one_u32() -> u32 {
    1
}

fn beat() -> String {
    "BEAT".to_string()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlinkParams {
    #[serde(default = "one")]
    pub amount: f32,
}

impl Default for BlinkParams {
    fn default() -> Self {
        Self { amount: 1.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LexemeParams {
    pub lexeme: String,
    #[serde(default = "one")]
    pub amount: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacsParams {
    pub au: String,
    #[serde(default = "one")]
    pub amount: f32,
    #[serde(default)]
    pub side: Side,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionParams {
    pub valence: f32,
    pub arousal: f32,
    #[serde(default = "one")]
    pub amount: f32,
    /// Persist the expression after the attack peak.
    #[serde(default)]
    pub shift: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeParams {
    /// Named point in the scheduler's target registry.
    #[serde(default)]
    pub target: Option<String>,
    /// Symbolic direction (LEFT, UPRIGHT, ...).
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub offset_angle: Option<f32>,
    #[serde(default)]
    pub influence: Influence,
    /// Re-sample a named target every tick while moving and holding.
    #[serde(default)]
    pub dynamic: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeadParams {
    pub lexeme: String,
    #[serde(default = "one_u32")]
    pub repetition: u32,
    #[serde(default = "half")]
    pub amount: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadShiftParams {
    pub direction: String,
    #[serde(default)]
    pub offset_angle: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GestureParams {
    #[serde(default)]
    pub mode: Hands,
    #[serde(default = "beat")]
    pub lexeme: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub position: Option<[f32; 3]>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeechParams {
    pub text: String,
}

/// Behavior payload, tagged by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Behavior {
    Blink(BlinkParams),
    FaceLexeme(LexemeParams),
    FaceShift(LexemeParams),
    FaceFacs(FacsParams),
    FaceEmotion(EmotionParams),
    Gaze(GazeParams),
    GazeShift(GazeParams),
    Head(HeadParams),
    HeadDirectionShift(HeadShiftParams),
    Gesture(GestureParams),
    Speech(SpeechParams),
}

impl Behavior {
    pub fn kind(&self) -> QueueKind {
        match self {
            Behavior::Blink(_) => QueueKind::Blink,
            Behavior::FaceLexeme(_)
            | Behavior::FaceShift(_)
            | Behavior::FaceFacs(_)
            | Behavior::FaceEmotion(_) => QueueKind::Face,
            Behavior::Gaze(_) | Behavior::GazeShift(_) => QueueKind::Gaze,
            Behavior::Head(_) | Behavior::HeadDirectionShift(_) => QueueKind::Head,
            Behavior::Gesture(_) => QueueKind::Gesture,
            Behavior::Speech(_) => QueueKind::Speech,
        }
    }

    /// Persistent pose change rather than a transient gesture.
    pub fn is_shift(&self) -> bool {
        match self {
            Behavior::FaceShift(_) | Behavior::GazeShift(_) | Behavior::HeadDirectionShift(_) => {
                true
            }
            Behavior::FaceEmotion(p) => p.shift,
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Behavior::Blink(_) => "blink",
            Behavior::FaceLexeme(_) => "faceLexeme",
            Behavior::FaceShift(_) => "faceShift",
            Behavior::FaceFacs(_) => "faceFacs",
            Behavior::FaceEmotion(_) => "faceEmotion",
            Behavior::Gaze(_) => "gaze",
            Behavior::GazeShift(_) => "gazeShift",
            Behavior::Head(_) => "head",
            Behavior::HeadDirectionShift(_) => "headDirectionShift",
            Behavior::Gesture(_) => "gesture",
            Behavior::Speech(_) => "speech",
        }
    }
}

/// A named behavior with its sync points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub sync: SyncSpec,
    #[serde(flatten)]
    pub behavior: Behavior,
}

impl BehaviorRecord {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            id: None,
            sync: SyncSpec::default(),
            behavior,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_sync(mut self, sync: SyncSpec) -> Self {
        self.sync = sync;
        self
    }

    /// Shorthand for `start`/`end` only.
    pub fn span(self, start: f32, end: f32) -> Self {
        self.with_sync(SyncSpec::span(start, end))
    }

    /// Record id, or `type#index` for anonymous records.
    pub fn name(&self, index: usize) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}#{}", self.behavior.type_name(), index),
        }
    }
}

/// Behaviors submitted together under one composition policy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub composition: Composition,
    #[serde(default)]
    pub behaviors: Vec<BehaviorRecord>,
}

impl Block {
    pub fn new(composition: Composition) -> Self {
        Self {
            id: None,
            composition,
            behaviors: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with(mut self, record: BehaviorRecord) -> Self {
        self.behaviors.push(record);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, RealizerError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Earliest block-relative start among records that do not back-reference.
    pub fn relative_start(&self) -> f32 {
        self.behaviors
            .iter()
            .filter_map(|r| r.sync.relative_start())
            .reduce(f32::min)
            .unwrap_or(0.0)
    }

    pub fn display_name(&self) -> &str {
        self.id.as_deref().unwrap_or("<anonymous>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_block_with_defaults() {
        let block = Block::from_json(
            r#"{ "id": "bml1", "behaviors": [
                { "id": "b1", "type": "blink", "start": 0, "end": 1 },
                { "type": "faceLexeme", "lexeme": "SMILE", "attackPeak": 0.4, "end": 2 },
                { "type": "gaze", "direction": "LEFT", "influence": "HEAD", "dynamic": true }
            ] }"#,
        )
        .expect("block parses");
        assert_eq!(block.composition, Composition::Merge);
        assert_eq!(block.behaviors.len(), 3);
        assert_eq!(block.behaviors[0].sync.end, Some(1.0));
        assert_eq!(block.behaviors[0].behavior, Behavior::Blink(BlinkParams::default()));
        assert_eq!(block.behaviors[1].sync.ready_point(), Some(0.4));
        assert_eq!(block.behaviors[1].name(1), "faceLexeme#1");
        match &block.behaviors[2].behavior {
            Behavior::Gaze(g) => {
                assert_eq!(g.influence, Influence::Head);
                assert!(g.dynamic);
            }
            other => panic!("unexpected behavior {other:?}"),
        }
    }

    #[test]
    fn composition_is_case_insensitive() {
        let b = Block::from_json(r#"{ "composition": "replace", "behaviors": [] }"#).unwrap();
        assert_eq!(b.composition, Composition::Replace);
        assert!(Block::from_json(r#"{ "composition": "SHUFFLE" }"#).is_err());
    }

    #[test]
    fn kinds_and_shift_flags() {
        let shift = Behavior::FaceShift(LexemeParams {
            lexeme: "SMILE".into(),
            amount: 1.0,
        });
        assert!(shift.is_shift());
        assert_eq!(shift.kind(), QueueKind::Face);
        let emo = Behavior::FaceEmotion(EmotionParams {
            valence: 0.5,
            arousal: 0.1,
            amount: 1.0,
            shift: false,
        });
        assert!(!emo.is_shift());
        assert!(QueueKind::Face.allows_overlap());
        assert!(!QueueKind::Gaze.allows_overlap());
    }

    #[test]
    fn relative_start_ignores_back_references() {
        let b = Block::new(Composition::Merge)
            .with(BehaviorRecord::new(Behavior::Blink(BlinkParams::default())).span(-4.0, 1.0))
            .with(BehaviorRecord::new(Behavior::Blink(BlinkParams::default())).span(0.5, 1.0));
        assert_eq!(b.relative_start(), 0.5);
    }

    #[test]
    fn record_round_trips_through_json() {
        let rec = BehaviorRecord::new(Behavior::Speech(SpeechParams {
            text: "hello".into(),
        }))
        .with_id("s1")
        .span(0.0, 1.5);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "speech");
        assert_eq!(json["end"], 1.5);
        let back: BehaviorRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }
}
