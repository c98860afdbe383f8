//! Sync-point timing for one behavior instance.
//!
//! Incoming behaviors carry a sparse [`SyncSpec`] (block-relative seconds,
//! negative values are absolute back-references). [`SyncTimeline::resolve`]
//! fills the gaps from the kind's defaults, repairs out-of-order points and
//! rejects timelines that cannot be ordered.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::KindTiming;
use crate::error::RealizerError;

/// A sync-point value as written in the input.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SyncValue {
    /// Offset from the block origin.
    Offset(f32),
    /// Absolute global time, encoded in the input as `-time`.
    Absolute(f32),
}

impl SyncValue {
    #[inline]
    pub fn from_raw(v: f32) -> Self {
        if v < 0.0 {
            SyncValue::Absolute(-v)
        } else {
            SyncValue::Offset(v)
        }
    }

    /// Offset of this value relative to `origin`.
    #[inline]
    pub fn rebase(self, origin: f32) -> f32 {
        match self {
            SyncValue::Offset(v) => v,
            SyncValue::Absolute(t) => t - origin,
        }
    }
}

/// Sparse sync points of one behavior record.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<f32>,
    /// BML synonym of `ready`; `ready` wins when both are given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack_peak: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_start: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_end: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relax: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f32>,
}

impl SyncSpec {
    pub fn span(start: f32, end: f32) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }

    #[inline]
    pub fn ready_point(&self) -> Option<f32> {
        self.ready.or(self.attack_peak)
    }

    /// Block-relative start, ignoring back-references.
    pub fn relative_start(&self) -> Option<f32> {
        self.start.filter(|s| *s >= 0.0)
    }

    pub fn has_back_reference(&self) -> bool {
        self.fields().iter().flatten().any(|v| *v < 0.0)
    }

    /// Converts every back-reference into an offset from `origin`.
    /// References into the past are clamped to the origin.
    pub fn rebased(&self, origin: f32, behavior: &str) -> SyncSpec {
        let fix = |v: Option<f32>| {
            v.map(|raw| {
                let rel = SyncValue::from_raw(raw).rebase(origin);
                if rel < 0.0 {
                    warn!(
                        "behavior '{behavior}': back-reference {raw} precedes block origin {origin}; clamped"
                    );
                    0.0
                } else {
                    rel
                }
            })
        };
        SyncSpec {
            start: fix(self.start),
            ready: fix(self.ready_point()),
            attack_peak: None,
            stroke_start: fix(self.stroke_start),
            stroke: fix(self.stroke),
            stroke_end: fix(self.stroke_end),
            relax: fix(self.relax),
            end: fix(self.end),
        }
    }

    fn fields(&self) -> [Option<f32>; 7] {
        [
            self.start,
            self.ready_point(),
            self.stroke_start,
            self.stroke,
            self.stroke_end,
            self.relax,
            self.end,
        ]
    }
}

/// Fully resolved, ordered sync points.
///
/// Invariant: `start <= attack_peak <= stroke_start <= stroke <= stroke_end
/// <= relax <= end`. A shift timeline has `relax == end` and no outro.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncTimeline {
    pub start: f32,
    pub attack_peak: f32,
    pub stroke_start: f32,
    pub stroke: f32,
    pub stroke_end: f32,
    pub relax: f32,
    pub end: f32,
    #[serde(default)]
    pub shift: bool,
}

impl SyncTimeline {
    /// Resolve `spec` (already rebased, block-relative) against `defaults`.
    pub fn resolve(
        spec: &SyncSpec,
        defaults: &KindTiming,
        shift: bool,
        behavior: &str,
    ) -> Result<Self, RealizerError> {
        let start = spec.start.unwrap_or(defaults.start);
        let end = spec.end.unwrap_or(start + defaults.span());

        if !start.is_finite() || !end.is_finite() {
            return Err(RealizerError::MalformedTiming {
                behavior: behavior.to_string(),
                reason: "non-finite start or end".into(),
            });
        }
        if end < start {
            return Err(RealizerError::MalformedTiming {
                behavior: behavior.to_string(),
                reason: format!("end {end} precedes start {start}"),
            });
        }
        let span = end - start;
        if span <= f32::EPSILON {
            return Err(RealizerError::ZeroDuration {
                behavior: behavior.to_string(),
            });
        }

        let ready = spec.ready_point();
        let attack = fit(
            behavior,
            "ready",
            ready,
            start + span * defaults.fraction(defaults.attack_peak),
            start,
            end,
        );

        let relax = if shift {
            end
        } else {
            let derived = match (ready, defaults.relax) {
                (None, Some(r)) => start + span * defaults.fraction(r),
                _ => (end - attack) / 2.0 + attack,
            };
            fit(behavior, "relax", spec.relax, derived, attack, end)
        };

        let stroke_start = fit(behavior, "strokeStart", spec.stroke_start, attack, attack, relax);
        let stroke = fit(behavior, "stroke", spec.stroke, stroke_start, stroke_start, relax);
        let stroke_end = fit(behavior, "strokeEnd", spec.stroke_end, stroke, stroke, relax);

        Ok(Self {
            start,
            attack_peak: attack,
            stroke_start,
            stroke,
            stroke_end,
            relax,
            end,
            shift,
        })
    }

    /// Default-shaped timeline spanning `[0, end]`.
    pub fn scaled(defaults: &KindTiming, end: f32, shift: bool) -> Result<Self, RealizerError> {
        Self::resolve(&SyncSpec::span(0.0, end), defaults, shift, "scaled")
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.end - self.start
    }

    /// Same timeline with every point expressed as an offset from `start`.
    pub fn normalized(&self) -> Self {
        let s = self.start;
        Self {
            start: 0.0,
            attack_peak: self.attack_peak - s,
            stroke_start: self.stroke_start - s,
            stroke: self.stroke - s,
            stroke_end: self.stroke_end - s,
            relax: self.relax - s,
            end: self.end - s,
            shift: self.shift,
        }
    }

    pub fn is_ordered(&self) -> bool {
        let pts = [
            self.start,
            self.attack_peak,
            self.stroke_start,
            self.stroke,
            self.stroke_end,
            self.relax,
            self.end,
        ];
        pts.windows(2).all(|w| w[0] <= w[1])
    }
}

/// Supplied value clamped into `[lo, hi]` (with a warning when it had to
/// move), or the derived value when nothing was supplied.
fn fit(behavior: &str, field: &str, supplied: Option<f32>, derived: f32, lo: f32, hi: f32) -> f32 {
    match supplied {
        Some(v) => {
            let fixed = v.clamp(lo, hi);
            if fixed != v {
                warn!("behavior '{behavior}': {field}={v} outside [{lo}, {hi}]; repaired to {fixed}");
            }
            fixed
        }
        None => derived.clamp(lo, hi),
    }
}
