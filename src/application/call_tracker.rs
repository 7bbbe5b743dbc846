//! Call state tracker
//!
//! Mirrors each call's signaling and media state as reported by the engine.
//! Updates for one call are serialized through that call's own lock; calls
//! never wait on each other except to look up or insert a map entry.

use super::context::SessionContext;
use crate::domain::call::{CallInfo, CallRecord, SessionEvent};
use crate::domain::shared::error::CallError;
use crate::domain::shared::value_objects::{AccountId, CallId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

type CallSlot = Arc<Mutex<Option<CallRecord>>>;

/// Tracker of every call seen in a session
pub struct CallStateTracker {
    ctx: SessionContext,
    calls: RwLock<HashMap<CallId, CallSlot>>,
}

impl CallStateTracker {
    /// Empty tracker
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            calls: RwLock::new(HashMap::new()),
        }
    }

    async fn slot(&self, call_id: CallId) -> CallSlot {
        if let Some(slot) = self.calls.read().await.get(&call_id) {
            return slot.clone();
        }
        self.calls
            .write()
            .await
            .entry(call_id)
            .or_default()
            .clone()
    }

    async fn query(&self, call_id: CallId) -> Result<CallInfo, CallError> {
        self.ctx
            .engine
            .call_info(call_id)
            .await
            .map_err(|source| CallError::InfoUnavailable { call_id, source })
    }

    /// Record a new inbound call
    pub async fn observe_incoming(
        &self,
        account_id: AccountId,
        call_id: CallId,
    ) -> Result<CallRecord, CallError> {
        let slot = self.slot(call_id).await;
        let mut entry = slot.lock().await;
        let mut info = self.query(call_id).await?;
        info.account_id.get_or_insert(account_id);

        let record = match entry.as_mut() {
            Some(record) => {
                debug!("{} already tracked", call_id);
                record.apply_signaling(&info);
                record.clone()
            }
            None => entry.insert(CallRecord::observe(&info)).clone(),
        };
        drop(entry);

        debug!("Tracking {} from {}", call_id, record.remote_party());
        self.ctx
            .sink
            .record(SessionEvent::IncomingCall {
                account_id,
                call_id,
                remote_party: record.remote_party().to_string(),
            })
            .await;
        Ok(record)
    }

    /// Refresh a call after the engine reported a signaling change.
    ///
    /// A call seen for the first time is created. A call that already ended
    /// is left alone and `None` is returned; the engine does not reuse call
    /// identifiers within a run.
    pub async fn on_call_state_changed(
        &self,
        call_id: CallId,
    ) -> Result<Option<CallRecord>, CallError> {
        let slot = self.slot(call_id).await;
        let mut entry = slot.lock().await;
        if entry.as_ref().is_some_and(CallRecord::is_terminal) {
            debug!("Ignoring state change for ended {}", call_id);
            return Ok(None);
        }

        let info = self.query(call_id).await?;
        let record = match entry.as_mut() {
            Some(record) => {
                record.apply_signaling(&info);
                record.clone()
            }
            None => entry.insert(CallRecord::observe(&info)).clone(),
        };
        drop(entry);

        match record.duration() {
            Some(duration) => debug!(
                "{} ended after {}ms",
                call_id,
                duration.num_milliseconds()
            ),
            None => debug!("{} now {}", call_id, record.state_text()),
        }
        self.ctx
            .sink
            .record(SessionEvent::CallStateChanged {
                call_id,
                state: record.state(),
                state_text: record.state_text().to_string(),
            })
            .await;
        Ok(Some(record))
    }

    /// Mirror media info already fetched by the media router.
    /// Returns false if the call had ended.
    pub async fn record_media(&self, info: &CallInfo) -> bool {
        let slot = self.slot(info.call_id).await;
        let mut entry = slot.lock().await;
        match entry.as_mut() {
            Some(record) => record.apply_media(info),
            None => {
                *entry = Some(CallRecord::observe(info));
                true
            }
        }
    }

    /// Current record of `call_id`, if the call was ever seen
    pub async fn get(&self, call_id: CallId) -> Option<CallRecord> {
        let slot = self.calls.read().await.get(&call_id).cloned()?;
        let entry = slot.lock().await;
        entry.clone()
    }

    /// Every tracked call, ordered by id
    pub async fn snapshot(&self) -> Vec<CallRecord> {
        let slots: Vec<CallSlot> = self.calls.read().await.values().cloned().collect();
        let mut records = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(record) = slot.lock().await.clone() {
                records.push(record);
            }
        }
        records.sort_by_key(|record| record.call_id());
        records
    }

    /// Ids of calls that have not ended
    pub async fn active_calls(&self) -> Vec<CallId> {
        self.snapshot()
            .await
            .into_iter()
            .filter(|record| !record.is_terminal())
            .map(|record| record.call_id())
            .collect()
    }
}
