//! Call value objects

use serde::{Deserialize, Serialize};
use std::fmt;

/// Signaling state of a call, as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalingState {
    /// Dialog exists but nothing has been exchanged yet
    Null,
    /// INVITE received, not yet answered
    Incoming,
    /// Provisional response with SDP sent/received
    EarlyMedia,
    /// 2xx sent, waiting for ACK
    Connecting,
    /// ACK received, call established
    Confirmed,
    /// Call ended
    Disconnected,
}

impl SignalingState {
    /// Whether the call has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, SignalingState::Disconnected)
    }

    /// Whether an answer is still meaningful in this state
    pub fn is_answerable(&self) -> bool {
        matches!(self, SignalingState::Incoming | SignalingState::EarlyMedia)
    }

    /// Engine state text, as the engine prints it
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalingState::Null => "NULL",
            SignalingState::Incoming => "INCOMING",
            SignalingState::EarlyMedia => "EARLY",
            SignalingState::Connecting => "CONNECTING",
            SignalingState::Confirmed => "CONFIRMED",
            SignalingState::Disconnected => "DISCONNECTED",
        }
    }
}

impl fmt::Display for SignalingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a call's media path is usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MediaState {
    #[default]
    None,
    Active,
    /// Media exists but is on hold
    Inactive,
    Error,
}

impl MediaState {
    /// Whether audio can flow
    pub fn is_active(&self) -> bool {
        matches!(self, MediaState::Active)
    }
}

impl fmt::Display for MediaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaState::None => "none",
            MediaState::Active => "active",
            MediaState::Inactive => "inactive",
            MediaState::Error => "error",
        };
        f.write_str(name)
    }
}
