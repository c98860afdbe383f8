//! Facial lexemes and reference emotions, expressed as action-unit deltas.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RealizerError;

/// Weight added to one action-unit channel.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AuDelta {
    pub au: String,
    pub weight: f32,
}

impl AuDelta {
    pub fn new(au: &str, weight: f32) -> Self {
        Self {
            au: au.to_string(),
            weight,
        }
    }
}

/// A reference emotion placed in valence-arousal space.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionPoint {
    pub name: String,
    pub valence: f32,
    pub arousal: f32,
    #[serde(default)]
    pub aus: Vec<AuDelta>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Lexicon {
    /// Keyed by upper-case lexeme name.
    #[serde(default)]
    pub lexemes: IndexMap<String, Vec<AuDelta>>,
    #[serde(default)]
    pub emotions: Vec<EmotionPoint>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

fn aus(pairs: &[(&str, f32)]) -> Vec<AuDelta> {
    pairs.iter().map(|(au, w)| AuDelta::new(au, *w)).collect()
}

impl Lexicon {
    pub fn builtin() -> Self {
        let mut lexemes = IndexMap::new();
        for (name, deltas) in [
            ("RAISE_BROWS", aus(&[("AU1", 0.6), ("AU2", 0.6)])),
            ("FROWN", aus(&[("AU4", 0.8)])),
            ("SMILE", aus(&[("AU6", 0.4), ("AU12", 0.8)])),
            ("BIG_SMILE", aus(&[("AU6", 0.7), ("AU12", 1.0), ("AU25", 0.4)])),
            ("LIP_CORNER_DEPRESSOR", aus(&[("AU15", 0.7)])),
            ("WIDEN_EYES", aus(&[("AU5", 0.7)])),
            ("SQUINT", aus(&[("AU7", 0.6)])),
            ("NOSE_WRINKLE", aus(&[("AU9", 0.7)])),
            ("PRESS_LIPS", aus(&[("AU24", 0.7)])),
            ("OPEN_MOUTH", aus(&[("AU25", 0.6), ("AU26", 0.6)])),
        ] {
            lexemes.insert(name.to_string(), deltas);
        }

        let emotion = |name: &str, valence: f32, arousal: f32, pairs: &[(&str, f32)]| EmotionPoint {
            name: name.to_string(),
            valence,
            arousal,
            aus: aus(pairs),
        };
        let emotions = vec![
            emotion("NEUTRAL", 0.0, 0.0, &[]),
            emotion("HAPPINESS", 0.8, 0.4, &[("AU6", 0.6), ("AU12", 0.9)]),
            emotion("CONTENTMENT", 0.6, -0.5, &[("AU12", 0.4)]),
            emotion(
                "SADNESS",
                -0.7,
                -0.5,
                &[("AU1", 0.7), ("AU4", 0.4), ("AU15", 0.6)],
            ),
            emotion(
                "ANGER",
                -0.6,
                0.7,
                &[("AU4", 0.9), ("AU5", 0.4), ("AU7", 0.5), ("AU24", 0.5)],
            ),
            emotion(
                "FEAR",
                -0.2,
                0.9,
                &[("AU1", 0.7), ("AU2", 0.5), ("AU4", 0.4), ("AU5", 0.8), ("AU20", 0.5)],
            ),
            emotion("SURPRISE", 0.4, 0.9, &[("AU1", 0.8), ("AU2", 0.8), ("AU5", 0.6), ("AU26", 0.5)]),
            emotion("DISGUST", -0.8, 0.2, &[("AU9", 0.8), ("AU15", 0.4)]),
        ];

        Self { lexemes, emotions }
    }

    /// Built-in lexicon extended (or overridden by name) with `json`.
    pub fn from_json(json: &str) -> Result<Self, RealizerError> {
        let mut lex = Self::builtin();
        lex.extend_from_json(json)?;
        Ok(lex)
    }

    pub fn extend_from_json(&mut self, json: &str) -> Result<(), RealizerError> {
        let patch: Lexicon = serde_json::from_str(json)?;
        for (name, deltas) in patch.lexemes {
            self.lexemes.insert(name.to_ascii_uppercase(), deltas);
        }
        for point in patch.emotions {
            match self.emotions.iter_mut().find(|e| e.name == point.name) {
                Some(existing) => *existing = point,
                None => self.emotions.push(point),
            }
        }
        Ok(())
    }

    /// Case-insensitive lexeme lookup.
    pub fn lexeme(&self, name: &str) -> Result<&[AuDelta], RealizerError> {
        self.lexemes
            .get(&name.to_ascii_uppercase())
            .map(Vec::as_slice)
            .ok_or_else(|| RealizerError::unknown("lexeme", name))
    }

    pub fn emotions(&self) -> &[EmotionPoint] {
        &self.emotions
    }
}
