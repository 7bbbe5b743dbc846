//! Call record - the tracker's mirror of one engine call

use crate::domain::call::entity::CallInfo;
use crate::domain::call::value_object::{MediaState, SignalingState};
use crate::domain::shared::value_objects::{AccountId, CallId, SlotId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call record
///
/// Mirrors what the engine last reported for a call. Transition legality
/// is not checked here; the engine owns protocol correctness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    call_id: CallId,
    account_id: Option<AccountId>,
    remote_party: String,
    state: SignalingState,
    state_text: String,
    last_status: Option<u16>,
    media_state: MediaState,
    /// Set only while media is active
    audio_slot: Option<SlotId>,
    state_changes: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl CallRecord {
    /// First observation of a call
    pub fn observe(info: &CallInfo) -> Self {
        let now = Utc::now();
        let mut record = Self {
            call_id: info.call_id,
            account_id: info.account_id,
            remote_party: info.remote_party.clone(),
            state: SignalingState::Null,
            state_text: String::new(),
            last_status: None,
            media_state: MediaState::None,
            audio_slot: None,
            state_changes: 0,
            created_at: now,
            updated_at: now,
            ended_at: None,
        };
        record.apply_signaling(info);
        record.apply_media(info);
        record
    }

    /// Mirror a reported signaling state.
    ///
    /// Returns false without touching the record once it is terminal.
    pub fn apply_signaling(&mut self, info: &CallInfo) -> bool {
        if self.is_terminal() {
            return false;
        }

        let now = Utc::now();
        if self.state != info.state || self.state_text != info.state_text {
            self.state_changes += 1;
        }
        self.state = info.state;
        self.state_text = info.state_text.clone();
        self.last_status = info.last_status.or(self.last_status);
        if !info.remote_party.is_empty() {
            self.remote_party = info.remote_party.clone();
        }
        if self.account_id.is_none() {
            self.account_id = info.account_id;
        }
        self.updated_at = now;

        if info.state.is_terminal() {
            self.ended_at = Some(now);
            self.media_state = MediaState::None;
            self.audio_slot = None;
        }
        true
    }

    /// Mirror a reported media state. Returns false once terminal.
    pub fn apply_media(&mut self, info: &CallInfo) -> bool {
        if self.is_terminal() {
            return false;
        }

        self.media_state = info.media_state;
        self.audio_slot = info.active_slot();
        self.updated_at = Utc::now();
        true
    }

    /// Whether the call has ended
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Engine call identifier
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    /// Account the call arrived on
    pub fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    /// Remote party as the engine prints it
    pub fn remote_party(&self) -> &str {
        &self.remote_party
    }

    /// Last mirrored signaling state
    pub fn state(&self) -> SignalingState {
        self.state
    }

    /// Engine text for the last mirrored state
    pub fn state_text(&self) -> &str {
        &self.state_text
    }

    /// Last SIP status seen on the dialog
    pub fn last_status(&self) -> Option<u16> {
        self.last_status
    }

    /// Last mirrored media state
    pub fn media_state(&self) -> MediaState {
        self.media_state
    }

    /// Bridge slot while media is active
    pub fn audio_slot(&self) -> Option<SlotId> {
        self.audio_slot
    }

    /// Number of distinct signaling states mirrored
    pub fn state_changes(&self) -> u32 {
        self.state_changes
    }

    /// When the call was first observed
    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    /// When anything on the record last changed
    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    /// When the call was seen ending
    pub fn ended_at(&self) -> Option<&DateTime<Utc>> {
        self.ended_at.as_ref()
    }

    /// Time from first observation to the end, once the call ended
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.ended_at.map(|ended| ended - self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(state: SignalingState) -> CallInfo {
        CallInfo::new(CallId::new(7), "sip:bob@example.com", state)
    }

    #[test]
    fn test_call_record_lifecycle() {
        let mut record = CallRecord::observe(&info(SignalingState::Incoming));
        assert_eq!(record.state(), SignalingState::Incoming);
        assert_eq!(record.state_changes(), 1);

        assert!(record.apply_signaling(&info(SignalingState::Connecting)));
        assert!(record.apply_signaling(&info(SignalingState::Confirmed)));
        assert!(record.apply_media(
            &info(SignalingState::Confirmed).with_media(MediaState::Active, Some(SlotId::new(3)))
        ));
        assert_eq!(record.audio_slot(), Some(SlotId::new(3)));

        assert!(record.apply_signaling(&info(SignalingState::Disconnected)));
        assert!(record.is_terminal());
        assert!(record.ended_at().is_some());
        assert_eq!(record.audio_slot(), None);
        assert_eq!(record.media_state(), MediaState::None);
        assert_eq!(record.state_changes(), 4);
        assert!(record.updated_at() >= record.created_at());
        let ended = *record.ended_at().unwrap();
        assert_eq!(record.duration(), Some(ended - *record.created_at()));
    }

    #[test]
    fn test_terminal_record_ignores_updates() {
        let mut record = CallRecord::observe(&info(SignalingState::Disconnected));
        assert!(!record.apply_signaling(&info(SignalingState::Confirmed)));
        assert!(!record.apply_media(
            &info(SignalingState::Confirmed).with_media(MediaState::Active, Some(SlotId::new(1)))
        ));
        assert_eq!(record.state(), SignalingState::Disconnected);
    }

    #[test]
    fn test_slot_only_kept_while_active() {
        let mut record = CallRecord::observe(
            &info(SignalingState::Confirmed).with_media(MediaState::Active, Some(SlotId::new(2))),
        );
        assert_eq!(record.audio_slot(), Some(SlotId::new(2)));

        record.apply_media(
            &info(SignalingState::Confirmed).with_media(MediaState::Inactive, Some(SlotId::new(2))),
        );
        assert_eq!(record.media_state(), MediaState::Inactive);
        assert_eq!(record.audio_slot(), None);
    }

    #[test]
    fn test_repeated_state_is_not_a_change() {
        let mut record = CallRecord::observe(&info(SignalingState::Incoming));
        record.apply_signaling(&info(SignalingState::Incoming));
        assert_eq!(record.state_changes(), 1);
    }
}
