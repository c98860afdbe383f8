//! Error types for behavior realization.
//!
//! Nothing here is fatal to the scheduler: the [`crate::Scheduler`] turns every
//! error raised while resolving or activating a behavior into a
//! [`crate::Diagnostic`] and keeps going. Only input parsing surfaces errors to
//! the caller.

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RealizerError {
    /// Sync points that cannot be turned into an ordered timeline.
    #[error("malformed timing for '{behavior}': {reason}")]
    MalformedTiming { behavior: String, reason: String },

    /// The resolved timeline has no extent.
    #[error("zero-duration behavior '{behavior}'")]
    ZeroDuration { behavior: String },

    /// Unrecognized lexeme, emotion, direction or target name.
    #[error("unknown {kind} '{name}'")]
    UnknownReference { kind: String, name: String },

    /// A block with no schedulable behaviors left.
    #[error("block '{block}' has no schedulable behaviors")]
    EmptyBlock { block: String },

    #[error("parse error: {reason}")]
    Parse { reason: String },
}

impl RealizerError {
    pub fn unknown(kind: &str, name: &str) -> Self {
        Self::UnknownReference {
            kind: kind.to_string(),
            name: name.to_string(),
        }
    }

    /// Error category for logging.
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MalformedTiming { .. } | Self::ZeroDuration { .. } => "timing",
            Self::UnknownReference { .. } => "reference",
            Self::EmptyBlock { .. } | Self::Parse { .. } => "input",
        }
    }

    /// Whether the affected behavior can still run with a fallback.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownReference { .. })
    }
}

impl From<serde_json::Error> for RealizerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        let e = RealizerError::ZeroDuration {
            behavior: "b1".into(),
        };
        assert_eq!(e.category(), "timing");
        assert!(!e.is_recoverable());

        let e = RealizerError::unknown("lexeme", "WINK_TWICE");
        assert_eq!(e.category(), "reference");
        assert!(e.is_recoverable());
        assert_eq!(e.to_string(), "unknown lexeme 'WINK_TWICE'");
    }

    #[test]
    fn from_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let e: RealizerError = err.into();
        assert_eq!(e.category(), "input");
    }
}
