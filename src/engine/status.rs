// Save lifecycle state machine — statuses, phases, and the pure transition function.

use crate::error::SaveError;

/// Status of a save session. Transitions are monotonic: once a terminal
/// status is reached the session never returns to `Pending` or `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Pending,
    Processing,
    Complete,
    Cancelled,
    Error,
}

impl SaveStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SaveStatus::Complete | SaveStatus::Cancelled | SaveStatus::Error
        )
    }
}

/// The six phases a session runs through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    BeforeSave,
    StartSave,
    CreateOutput,
    DeliverOutput,
    EndSave,
    AfterSave,
}

impl Phase {
    /// The status a session must be in for this phase to run.
    pub fn expected_status(self) -> SaveStatus {
        match self {
            Phase::BeforeSave | Phase::StartSave => SaveStatus::Pending,
            Phase::CreateOutput | Phase::DeliverOutput | Phase::EndSave => SaveStatus::Processing,
            Phase::AfterSave => SaveStatus::Complete,
        }
    }
}

/// Attempt to enter `phase` from `current`, returning the status the session
/// holds while the phase runs.
///
/// The pre-state assertion is what makes double `save()` calls and saves
/// after `abort()` fail fast instead of re-executing work.
pub fn enter(phase: Phase, current: SaveStatus) -> Result<SaveStatus, SaveError> {
    if current != phase.expected_status() {
        return Err(SaveError::PhaseOutOfOrder {
            phase,
            status: current,
        });
    }

    Ok(match phase {
        Phase::StartSave => SaveStatus::Processing,
        Phase::EndSave => SaveStatus::Complete,
        _ => current,
    })
}

/// Status recorded when a phase fails. Cancellation wins over failure.
pub fn fail(current: SaveStatus) -> SaveStatus {
    match current {
        SaveStatus::Cancelled => SaveStatus::Cancelled,
        _ => SaveStatus::Error,
    }
}

/// Status after an `abort()` request, or `None` when the session is already
/// terminal and cannot be cancelled.
pub fn cancel(current: SaveStatus) -> Option<SaveStatus> {
    match current {
        SaveStatus::Pending | SaveStatus::Processing => Some(SaveStatus::Cancelled),
        _ => None,
    }
}
