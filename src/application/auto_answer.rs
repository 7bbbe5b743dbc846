//! Auto-answer policy - accept every inbound call with 200 OK

use super::context::SessionContext;
use crate::domain::call::SessionEvent;
use crate::domain::shared::error::CallError;
use crate::domain::shared::value_objects::{AccountId, CallId};
use std::collections::HashSet;
use tokio::sync::Mutex;
use tracing::debug;

/// What the policy did with an incoming call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Answered,
    /// The call was answered before; nothing was sent
    AlreadyAnswered,
}

/// Answers each call exactly once, no custom headers
pub struct AutoAnswerPolicy {
    ctx: SessionContext,
    answered: Mutex<HashSet<CallId>>,
}

impl AutoAnswerPolicy {
    /// Policy with nothing answered yet
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            answered: Mutex::new(HashSet::new()),
        }
    }

    /// Answer `call_id` with 200 OK.
    ///
    /// An engine failure is returned for observation only; the call is not
    /// retried or rejected here and stays marked as answered.
    pub async fn on_incoming_call(
        &self,
        account_id: AccountId,
        call_id: CallId,
    ) -> Result<AnswerOutcome, CallError> {
        if !self.answered.lock().await.insert(call_id) {
            debug!("{} was already answered", call_id);
            return Ok(AnswerOutcome::AlreadyAnswered);
        }

        let status = rsip::StatusCode::OK;
        let code = status.code();
        debug!("Answering {} on {} with {}", call_id, account_id, code);
        self.ctx
            .engine
            .answer_call(call_id, status)
            .await
            .map_err(|source| CallError::AnswerFailure { call_id, source })?;

        self.ctx
            .sink
            .record(SessionEvent::CallAnswered {
                call_id,
                status: code,
            })
            .await;
        Ok(AnswerOutcome::Answered)
    }

    /// Whether an answer was attempted for a call that is still live
    pub async fn has_answered(&self, call_id: CallId) -> bool {
        self.answered.lock().await.contains(&call_id)
    }

    /// Drop an ended call. Call ids are never reused by the engine, so a
    /// forgotten call cannot be answered twice.
    pub async fn forget(&self, call_id: CallId) -> bool {
        self.answered.lock().await.remove(&call_id)
    }
}
