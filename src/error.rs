//! Media load failures.

use thiserror::Error;

/// A video or image could not be fetched, decoded, or played.
///
/// This is the only failure the controller knows about. It is surfaced as the
/// `Error` state with a retry affordance and never returned to the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaLoadError {
    #[error("failed to fetch {src}: {reason}")]
    Fetch { src: String, reason: String },

    #[error("failed to decode {src}: {reason}")]
    Decode { src: String, reason: String },

    #[error("playback pipeline failed for {src}: {reason}")]
    Pipeline { src: String, reason: String },
}

impl MediaLoadError {
    pub fn fetch(src: &str, reason: impl ToString) -> Self {
        Self::Fetch {
            src: src.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(src: &str, reason: impl ToString) -> Self {
        Self::Decode {
            src: src.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn pipeline(src: &str, reason: impl ToString) -> Self {
        Self::Pipeline {
            src: src.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Source the failure belongs to.
    pub fn src(&self) -> &str {
        match self {
            Self::Fetch { src, .. } | Self::Decode { src, .. } | Self::Pipeline { src, .. } => src,
        }
    }
}
