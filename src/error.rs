use thiserror::Error;

use crate::engine::status::{Phase, SaveStatus};

/// Failures a save session can surface.
///
/// Host-level failures are flattened to their message so the error can be
/// recorded on the session and handed to the caller at the same time.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SaveError {
    #[error("phase {phase:?} entered out of order (session status {status:?})")]
    PhaseOutOfOrder { phase: Phase, status: SaveStatus },

    #[error("no payload available for the data-uri reader")]
    EmptyPayload,

    #[error("save of {0} was aborted")]
    Aborted(String),

    #[error("save of {0} has already finished")]
    AlreadyFinished(String),

    #[error("{0}")]
    Host(String),
}

impl From<anyhow::Error> for SaveError {
    fn from(e: anyhow::Error) -> Self {
        SaveError::Host(e.to_string())
    }
}
