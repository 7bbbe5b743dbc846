//! Call info - the engine's view of a call at query time

use super::value_object::{MediaState, SignalingState};
use crate::domain::shared::value_objects::{AccountId, CallId, SlotId};
use serde::{Deserialize, Serialize};

/// Snapshot returned by the engine's call-info query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    pub call_id: CallId,
    pub account_id: Option<AccountId>,
    /// Remote party as the engine prints it, e.g. `"Bob" <sip:bob@example.com>`
    pub remote_party: String,
    pub state: SignalingState,
    pub state_text: String,
    /// Last SIP status code seen on the dialog
    pub last_status: Option<u16>,
    pub media_state: MediaState,
    /// Conference slot of the call's audio, valid while media is active
    pub audio_slot: Option<SlotId>,
}

impl CallInfo {
    /// Call info with no media and no status yet
    pub fn new(call_id: CallId, remote_party: &str, state: SignalingState) -> Self {
        Self {
            call_id,
            account_id: None,
            remote_party: remote_party.to_string(),
            state,
            state_text: state.as_str().to_string(),
            last_status: None,
            media_state: MediaState::None,
            audio_slot: None,
        }
    }

    /// Set the media state and slot
    pub fn with_media(mut self, media_state: MediaState, audio_slot: Option<SlotId>) -> Self {
        self.media_state = media_state;
        self.audio_slot = audio_slot;
        self
    }

    /// Slot to patch into the sound device, if media is usable
    pub fn active_slot(&self) -> Option<SlotId> {
        if self.media_state.is_active() {
            self.audio_slot
        } else {
            None
        }
    }
}
