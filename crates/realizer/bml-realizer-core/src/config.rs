//! Core configuration for bml-realizer-core.
//!
//! Every section is `#[serde(default)]`, so a partial JSON document only
//! overrides the fields it names.

use serde::{Deserialize, Serialize};

use crate::block::QueueKind;
use crate::error::RealizerError;

/// Configuration for the scheduler and its realizers.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Compositor threshold below which a channel's magnitude sum counts as empty.
    pub epsilon: f32,

    /// Maximum events to retain per tick; extra events are discarded.
    pub max_events_per_tick: usize,

    /// Maximum undrained diagnostics kept by the scheduler.
    pub max_diagnostics: usize,

    /// Default sync points per queue kind.
    pub timings: TimingTable,

    pub blink: BlinkConfig,
    pub gaze: GazeConfig,
    pub gesture: GestureConfig,
    pub emotion: EmotionGridConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            max_events_per_tick: 1024,
            max_diagnostics: 256,
            timings: TimingTable::default(),
            blink: BlinkConfig::default(),
            gaze: GazeConfig::default(),
            gesture: GestureConfig::default(),
            emotion: EmotionGridConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, RealizerError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Default sync points for one kind, in seconds. Missing sync points of an
/// incoming behavior are derived from these as fractions of its own span.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KindTiming {
    pub start: f32,
    pub attack_peak: f32,
    /// When absent, relax is placed halfway between attack peak and end.
    #[serde(default)]
    pub relax: Option<f32>,
    pub end: f32,
}

impl KindTiming {
    pub const fn new(start: f32, attack_peak: f32, relax: Option<f32>, end: f32) -> Self {
        Self {
            start,
            attack_peak,
            relax,
            end,
        }
    }

    #[inline]
    pub fn span(&self) -> f32 {
        (self.end - self.start).max(0.0)
    }

    /// Position of `t` within the default span as a fraction in [0, 1].
    #[inline]
    pub fn fraction(&self, t: f32) -> f32 {
        let span = self.span();
        if span > 0.0 {
            ((t - self.start) / span).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingTable {
    pub blink: KindTiming,
    pub face: KindTiming,
    pub gaze: KindTiming,
    pub head: KindTiming,
    pub gesture: KindTiming,
    pub speech: KindTiming,
}

impl Default for TimingTable {
    fn default() -> Self {
        Self {
            blink: KindTiming::new(0.0, 0.25, Some(0.25), 0.5),
            face: KindTiming::new(0.0, 0.5, Some(1.5), 2.0),
            gaze: KindTiming::new(0.0, 0.3, Some(1.7), 2.0),
            head: KindTiming::new(0.0, 0.3, None, 1.5),
            gesture: KindTiming::new(0.0, 0.5, Some(1.5), 2.0),
            speech: KindTiming::new(0.0, 0.0, Some(1.0), 1.0),
        }
    }
}

impl TimingTable {
    pub fn get(&self, kind: QueueKind) -> &KindTiming {
        match kind {
            QueueKind::Blink => &self.blink,
            QueueKind::Face => &self.face,
            QueueKind::Gaze => &self.gaze,
            QueueKind::Head => &self.head,
            QueueKind::Gesture => &self.gesture,
            QueueKind::Speech => &self.speech,
        }
    }
}

/// Automatic blinking.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BlinkConfig {
    pub enabled: bool,
    /// Re-trigger delay range in seconds.
    pub min_interval: f32,
    pub max_interval: f32,
    pub seed: u64,
    /// Auto blinks shorter than this are skipped (lids already closed).
    pub min_duration: f32,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval: 2.0,
            max_interval: 6.0,
            seed: 0x5eed,
            min_duration: 0.05,
        }
    }
}

/// Gaze resolution. Angles are radians; output channels are normalized so
/// that `max_yaw`/`max_pitch` map to 1.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GazeConfig {
    pub max_yaw: f32,
    pub max_pitch: f32,
    /// Symbolic direction offset used when a behavior gives none.
    pub offset_angle: f32,
    /// Fraction of the rotation taken by the head when influence is HEAD.
    pub head_share: f32,
    /// Upper-lid closure per unit of downward eye pitch.
    pub lid_follow: f32,
    pub eye_origin: [f32; 3],
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            max_yaw: 0.6,
            max_pitch: 0.4,
            offset_angle: 0.35,
            head_share: 0.5,
            lid_follow: 0.6,
            eye_origin: [0.0, 1.6, 0.0],
        }
    }
}

/// Rest positions for the hand IK targets and gesture amplitudes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GestureConfig {
    pub left_rest: [f32; 3],
    pub right_rest: [f32; 3],
    /// Offset from rest for a beat with no explicit position.
    pub beat_offset: [f32; 3],
    /// Distance from rest a pointing hand travels toward its target.
    pub point_reach: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            left_rest: [-0.2, 0.9, 0.1],
            right_rest: [0.2, 0.9, 0.1],
            beat_offset: [0.0, 0.15, 0.2],
            point_reach: 0.45,
        }
    }
}

/// Valence-arousal blend grid.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmotionGridConfig {
    /// Nodes per axis over [-1, 1].
    pub resolution: usize,
    /// Influence radius of each reference emotion.
    pub radius: f32,
}

impl Default for EmotionGridConfig {
    fn default() -> Self {
        Self {
            resolution: 21,
            radius: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_overrides_defaults() {
        let cfg = Config::from_json(r#"{ "blink": { "enabled": false }, "epsilon": 0.001 }"#)
            .expect("config parses");
        assert!(!cfg.blink.enabled);
        assert_eq!(cfg.blink.max_interval, 6.0);
        assert_eq!(cfg.epsilon, 0.001);
        assert_eq!(cfg.timings, TimingTable::default());
    }

    #[test]
    fn kind_fraction() {
        let t = TimingTable::default();
        assert_eq!(t.get(QueueKind::Blink).fraction(0.25), 0.5);
        assert_eq!(t.get(QueueKind::Blink).fraction(2.0), 1.0);
        let degenerate = KindTiming::new(1.0, 1.0, None, 1.0);
        assert_eq!(degenerate.fraction(1.0), 0.0);
    }
}
