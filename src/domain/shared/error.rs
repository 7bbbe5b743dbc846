//! Session, call and engine errors

use super::value_objects::{CallId, SlotId};
use crate::domain::agent::SetupStage;
use thiserror::Error;

/// Status reported by the signaling engine for a failed primitive
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid agent state: {0}")]
    InvalidState(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Engine failure: {0}")]
    Internal(String),
}

/// Errors surfaced by the session controller
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// A setup stage failed; everything acquired before it was rolled back
    #[error("Error in {stage}")]
    Setup {
        stage: SetupStage,
        #[source]
        source: EngineError,
    },

    /// Operation attempted on a session that cannot accept it
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SessionError {
    /// Setup failure at `stage`
    pub fn setup(stage: SetupStage, source: EngineError) -> Self {
        SessionError::Setup { stage, source }
    }

    /// Failed setup stage, if this is a setup error
    pub fn stage(&self) -> Option<SetupStage> {
        match self {
            SessionError::Setup { stage, .. } => Some(*stage),
            SessionError::InvalidState(_) => None,
        }
    }
}

/// Per-call failures. Never fatal to the session; handed to the
/// observability sink instead of being returned to the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("Failed to answer {call_id}: {source}")]
    AnswerFailure {
        call_id: CallId,
        #[source]
        source: EngineError,
    },

    #[error("Failed to connect {from} -> {to} for {call_id}: {source}")]
    MediaConnectFailure {
        call_id: CallId,
        from: SlotId,
        to: SlotId,
        #[source]
        source: EngineError,
    },

    #[error("Call info unavailable for {call_id}: {source}")]
    InfoUnavailable {
        call_id: CallId,
        #[source]
        source: EngineError,
    },
}

impl CallError {
    /// Call the failure belongs to
    pub fn call_id(&self) -> CallId {
        match self {
            CallError::AnswerFailure { call_id, .. }
            | CallError::MediaConnectFailure { call_id, .. }
            | CallError::InfoUnavailable { call_id, .. } => *call_id,
        }
    }
}
