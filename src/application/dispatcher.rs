//! Engine event dispatcher
//!
//! The single [`EngineEventHandler`] installed at configure time. Each
//! callback delegates to the policy, tracker and router, and hands any
//! per-call failure to the observability sink instead of propagating it.

use super::auto_answer::AutoAnswerPolicy;
use super::call_tracker::CallStateTracker;
use super::context::SessionContext;
use super::media_router::MediaRouter;
use crate::domain::call::SessionEvent;
use crate::domain::shared::error::CallError;
use crate::domain::shared::value_objects::{AccountId, CallId};
use crate::infrastructure::engine::EngineEventHandler;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Routes engine callbacks to the policy, tracker and router
pub struct CallEventDispatcher {
    ctx: SessionContext,
    policy: AutoAnswerPolicy,
    tracker: Arc<CallStateTracker>,
    router: MediaRouter,
}

impl CallEventDispatcher {
    /// Dispatcher sharing `tracker` with the session handle
    pub fn new(ctx: SessionContext, tracker: Arc<CallStateTracker>) -> Self {
        Self {
            policy: AutoAnswerPolicy::new(ctx.clone()),
            router: MediaRouter::new(ctx.clone()),
            tracker,
            ctx,
        }
    }

    async fn report(&self, failure: CallError) {
        debug!("Reporting failure on {}", failure.call_id());
        self.ctx.sink.record(SessionEvent::CallFailure(failure)).await;
    }

    /// Keep the answered set bounded by live calls
    async fn forget_if_ended(&self, call_id: CallId) {
        let ended = self
            .tracker
            .get(call_id)
            .await
            .is_some_and(|record| record.is_terminal());
        if ended && self.policy.forget(call_id).await {
            debug!("Forgot answered {}", call_id);
        }
    }
}

#[async_trait]
impl EngineEventHandler for CallEventDispatcher {
    async fn on_incoming_call(&self, account_id: AccountId, call_id: CallId) {
        // Track first so the record exists before the answer changes state
        if let Err(failure) = self.tracker.observe_incoming(account_id, call_id).await {
            self.report(failure).await;
        }
        if let Err(failure) = self.policy.on_incoming_call(account_id, call_id).await {
            self.report(failure).await;
        }
        self.forget_if_ended(call_id).await;
    }

    async fn on_call_state_changed(&self, call_id: CallId) {
        if let Err(failure) = self.tracker.on_call_state_changed(call_id).await {
            self.report(failure).await;
        }
        self.forget_if_ended(call_id).await;
    }

    async fn on_call_media_state_changed(&self, call_id: CallId) {
        match self.router.on_media_state_changed(call_id).await {
            Ok(routing) => {
                self.tracker.record_media(&routing.info).await;
                for failure in routing.failures {
                    self.report(failure).await;
                }
            }
            Err(failure) => self.report(failure).await,
        }
    }
}
