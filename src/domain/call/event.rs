//! Session events handed to the observability sink

use crate::domain::agent::SetupStage;
use crate::domain::call::value_object::{MediaState, SignalingState};
use crate::domain::shared::error::{CallError, EngineError};
use crate::domain::shared::value_objects::{AccountId, CallId, SlotId, TransportId};
use std::fmt;

/// Non-fatal problem noticed during setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupWarning {
    pub stage: SetupStage,
    pub message: String,
}

impl fmt::Display for SetupWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

/// Something observable that happened in a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StageCompleted {
        stage: SetupStage,
    },
    SetupWarning(SetupWarning),
    SetupFailed {
        stage: SetupStage,
        error: EngineError,
    },
    TransportBound {
        transport_id: TransportId,
        description: String,
    },
    AccountAdded {
        account_id: AccountId,
        identity: String,
    },
    IncomingCall {
        account_id: AccountId,
        call_id: CallId,
        remote_party: String,
    },
    CallAnswered {
        call_id: CallId,
        status: u16,
    },
    CallStateChanged {
        call_id: CallId,
        state: SignalingState,
        state_text: String,
    },
    MediaPatched {
        call_id: CallId,
        call_slot: SlotId,
        device_slot: SlotId,
    },
    MediaUnrouted {
        call_id: CallId,
        media_state: MediaState,
    },
    CallFailure(CallError),
    SessionShutdown,
}

impl SessionEvent {
    /// Dotted event name, also used as the metric name suffix
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::StageCompleted { .. } => "setup.stage_completed",
            SessionEvent::SetupWarning(_) => "setup.warning",
            SessionEvent::SetupFailed { .. } => "setup.failed",
            SessionEvent::TransportBound { .. } => "transport.bound",
            SessionEvent::AccountAdded { .. } => "account.added",
            SessionEvent::IncomingCall { .. } => "call.incoming",
            SessionEvent::CallAnswered { .. } => "call.answered",
            SessionEvent::CallStateChanged { .. } => "call.state_changed",
            SessionEvent::MediaPatched { .. } => "media.patched",
            SessionEvent::MediaUnrouted { .. } => "media.unrouted",
            SessionEvent::CallFailure(_) => "call.failure",
            SessionEvent::SessionShutdown => "session.shutdown",
        }
    }

    /// Call the event concerns, if any
    pub fn call_id(&self) -> Option<CallId> {
        match self {
            SessionEvent::IncomingCall { call_id, .. }
            | SessionEvent::CallAnswered { call_id, .. }
            | SessionEvent::CallStateChanged { call_id, .. }
            | SessionEvent::MediaPatched { call_id, .. }
            | SessionEvent::MediaUnrouted { call_id, .. } => Some(*call_id),
            SessionEvent::CallFailure(err) => Some(err.call_id()),
            _ => None,
        }
    }
}
