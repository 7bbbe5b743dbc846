//! Engine driver - injects network-side events into a [`LocalEngine`]
//!
//! [`LocalEngine`]: super::LocalEngine

use super::local::{AgentCore, EngineEvent, Shared};
use super::EngineResult;
use crate::domain::agent::AgentState;
use crate::domain::call::{CallInfo, MediaState, SignalingState};
use crate::domain::shared::error::EngineError;
use crate::domain::shared::value_objects::{CallId, SlotId};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

/// Status carried by a BYE-terminated dialog
const BYE_OK: u16 = 200;

/// Driver for the local engine's network side
#[derive(Clone)]
pub struct EngineDriver {
    shared: Arc<Shared>,
}

impl EngineDriver {
    /// Driver over the engine's shared state
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// An INVITE arrives; the engine picks the call id
    pub async fn incoming_call(&self, remote_party: &str) -> EngineResult<CallId> {
        let mut core = self.shared.core.lock().await;
        let call_id = CallId::new(core.next_call);
        self.admit(&mut core, call_id, remote_party)
    }

    /// An INVITE arrives and is given `call_id`
    pub async fn incoming_call_with_id(
        &self,
        call_id: CallId,
        remote_party: &str,
    ) -> EngineResult<CallId> {
        let mut core = self.shared.core.lock().await;
        self.admit(&mut core, call_id, remote_party)
    }

    /// Add the call to the table and queue its event. The caller holds the
    /// core lock from id selection through insertion.
    fn admit(
        &self,
        core: &mut AgentCore,
        call_id: CallId,
        remote_party: &str,
    ) -> EngineResult<CallId> {
        core.require(AgentState::Started, "incoming call")?;

        let account_id = core.default_account().ok_or_else(|| {
            EngineError::InvalidState("No account to route the call to".to_string())
        })?;

        // Identifiers are never reused within one agent
        if core.calls.contains_key(&call_id) {
            return Err(EngineError::InvalidArgument(format!(
                "{} is already in use",
                call_id
            )));
        }
        let next_call = call_id.as_u32().checked_add(1).ok_or_else(|| {
            EngineError::InvalidArgument(format!("{} is out of range", call_id))
        })?;

        let mut info = CallInfo::new(call_id, remote_party, SignalingState::Incoming);
        info.account_id = Some(account_id);
        core.calls.insert(call_id, info);
        core.next_call = core.next_call.max(next_call);

        info!("Incoming call {} from {}", call_id, remote_party);
        self.shared.emit(
            core,
            EngineEvent::IncomingCall {
                account_id,
                call_id,
            },
        );
        Ok(call_id)
    }

    /// The remote side moved the dialog to `state`
    pub async fn set_call_state(&self, call_id: CallId, state: SignalingState) -> EngineResult<()> {
        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Started, "call state change")?;
        core.set_call_state(call_id, state, None)?;
        self.shared.emit(&core, EngineEvent::CallState(call_id));
        Ok(())
    }

    /// The remote side sent BYE
    pub async fn remote_hangup(&self, call_id: CallId) -> EngineResult<()> {
        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Started, "remote hangup")?;
        core.set_call_state(call_id, SignalingState::Disconnected, Some(BYE_OK))?;
        self.shared.emit(&core, EngineEvent::CallState(call_id));
        Ok(())
    }

    /// Media for the call changed. Returns the call's slot.
    pub async fn set_media_state(
        &self,
        call_id: CallId,
        media_state: MediaState,
    ) -> EngineResult<Option<SlotId>> {
        self.change_media(call_id, media_state, None).await
    }

    /// Media became active on a specific bridge slot
    pub async fn activate_media_on(&self, call_id: CallId, slot: SlotId) -> EngineResult<SlotId> {
        self.change_media(call_id, MediaState::Active, Some(slot))
            .await?
            .ok_or_else(|| EngineError::Internal(format!("No slot assigned to {}", call_id)))
    }

    async fn change_media(
        &self,
        call_id: CallId,
        media_state: MediaState,
        slot: Option<SlotId>,
    ) -> EngineResult<Option<SlotId>> {
        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Started, "media state change")?;
        let audio_slot = core.set_media(call_id, media_state, slot)?;
        self.shared.emit(&core, EngineEvent::MediaState(call_id));
        Ok(audio_slot)
    }

    /// Wait until every queued event, including events queued by the
    /// handlers themselves, has been handled
    pub async fn settle(&self) {
        loop {
            let events = self.shared.core.lock().await.events.clone();
            let Some(events) = events else {
                return;
            };

            let (ack_tx, ack_rx) = oneshot::channel();
            if events.send(EngineEvent::Flush(ack_tx)).is_err() || ack_rx.await.is_err() {
                return;
            }

            if self.shared.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::AccountConfig;
    use crate::domain::agent::LogLevel;
    use crate::domain::transport::TransportConfig;
    use crate::domain::shared::value_objects::AccountId;
    use crate::infrastructure::engine::{EngineEventHandler, LocalEngine, SignalingEngine};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EngineEventHandler for Recorder {
        async fn on_incoming_call(&self, account_id: AccountId, call_id: CallId) {
            self.seen
                .lock()
                .await
                .push(format!("incoming {} {}", account_id, call_id));
        }

        async fn on_call_state_changed(&self, call_id: CallId) {
            self.seen.lock().await.push(format!("state {}", call_id));
        }

        async fn on_call_media_state_changed(&self, call_id: CallId) {
            self.seen.lock().await.push(format!("media {}", call_id));
        }
    }

    async fn engine_with(handler: Arc<Recorder>, with_account: bool) -> LocalEngine {
        let engine = LocalEngine::new();
        engine.create_agent().await.unwrap();
        engine.configure_agent(handler, LogLevel::default()).await.unwrap();
        engine
            .create_transport(
                &TransportConfig::udp(0).with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            )
            .await
            .unwrap();
        engine.start_agent().await.unwrap();
        if with_account {
            engine.add_account(&AccountConfig::default()).await.unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn test_events_dispatched_in_order() {
        let recorder = Arc::new(Recorder::default());
        let engine = engine_with(recorder.clone(), true).await;
        let driver = engine.driver();

        let call_id = driver
            .incoming_call_with_id(CallId::new(7), "sip:bob@example.com")
            .await
            .unwrap();
        driver
            .set_call_state(call_id, SignalingState::Confirmed)
            .await
            .unwrap();
        driver
            .activate_media_on(call_id, SlotId::new(3))
            .await
            .unwrap();
        driver.remote_hangup(call_id).await.unwrap();
        driver.settle().await;

        let seen = recorder.seen.lock().await.clone();
        assert_eq!(
            seen,
            vec![
                "incoming acc#0 call#7",
                "state call#7",
                "media call#7",
                "state call#7",
            ]
        );
    }

    #[tokio::test]
    async fn test_incoming_call_requires_account() {
        let engine = engine_with(Arc::new(Recorder::default()), false).await;
        let result = engine.driver().incoming_call("sip:bob@example.com").await;
        assert!(matches!(result, Err(EngineError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_call_ids_are_not_reused() {
        let engine = engine_with(Arc::new(Recorder::default()), true).await;
        let driver = engine.driver();

        let first = driver.incoming_call("sip:bob@example.com").await.unwrap();
        driver.remote_hangup(first).await.unwrap();
        let second = driver.incoming_call("sip:carol@example.com").await.unwrap();
        assert_ne!(first, second);

        let reused = driver
            .incoming_call_with_id(first, "sip:dave@example.com")
            .await;
        assert!(matches!(reused, Err(EngineError::InvalidArgument(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_invites_get_distinct_ids() {
        let engine = engine_with(Arc::new(Recorder::default()), true).await;
        let driver = engine.driver();

        let mut tasks = Vec::new();
        for n in 0..200 {
            let driver = driver.clone();
            tasks.push(tokio::spawn(async move {
                driver.incoming_call(&format!("sip:caller{}@example.com", n)).await
            }));
        }

        let mut ids = HashSet::new();
        for task in tasks {
            let call_id = task.await.unwrap().unwrap();
            assert!(ids.insert(call_id), "{} handed out twice", call_id);
        }
        assert_eq!(ids.len(), 200);
        driver.settle().await;
    }

    #[tokio::test]
    async fn test_last_call_id_is_rejected() {
        let engine = engine_with(Arc::new(Recorder::default()), true).await;
        let driver = engine.driver();

        let result = driver
            .incoming_call_with_id(CallId::new(u32::MAX), "sip:bob@example.com")
            .await;
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
        assert!(engine.call_info(CallId::new(u32::MAX)).await.is_err());

        // The counter is untouched, so automatic ids keep working
        let call_id = driver.incoming_call("sip:bob@example.com").await.unwrap();
        assert_eq!(call_id, CallId::new(0));
    }

    #[tokio::test]
    async fn test_settle_without_handler_returns() {
        let engine = LocalEngine::new();
        engine.driver().settle().await;
    }
}
