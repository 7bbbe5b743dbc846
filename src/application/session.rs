//! Session controller
//!
//! Brings a session up stage by stage: create the agent, verify a reference
//! URI, configure handlers, bind the transport, start, add the account.
//! Any fatal stage failure after the agent exists destroys it before the
//! error is returned, so a caller never sees a half-initialized agent.

use super::account_registrar::AccountRegistrar;
use super::call_tracker::CallStateTracker;
use super::context::SessionContext;
use super::dispatcher::CallEventDispatcher;
use super::transport_binder::TransportBinder;
use crate::domain::account::AccountConfig;
use crate::domain::agent::{AgentState, LogLevel, SetupStage};
use crate::domain::call::{CallRecord, SessionEvent, SetupWarning};
use crate::domain::shared::error::{EngineError, SessionError};
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{AccountId, CallId, SlotId, TransportId};
use crate::domain::transport::TransportConfig;
use crate::infrastructure::engine::{EngineResult, SignalingEngine};
use crate::infrastructure::observability::{ObservabilitySink, TracingSink};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Session tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Engine console verbosity
    pub log_level: LogLevel,
    /// Bridge slot of the local sound device
    pub device_slot: SlotId,
    /// URI checked once during setup
    pub reference_uri: String,
    /// Fail setup when the reference URI does not verify
    pub strict_uri_check: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            device_slot: SlotId::SOUND_DEVICE,
            reference_uri: "sip:VH3@sip-10001.accounts.qos.vocal-dev.com".to_string(),
            strict_uri_check: false,
        }
    }
}

/// Orchestrates setup and teardown of one session
pub struct SessionController {
    engine: Arc<dyn SignalingEngine>,
    sink: Arc<dyn ObservabilitySink>,
    options: SessionOptions,
}

impl SessionController {
    /// Controller logging through [`TracingSink`] with default options
    pub fn new(engine: Arc<dyn SignalingEngine>) -> Self {
        Self {
            engine,
            sink: Arc::new(TracingSink::new()),
            options: SessionOptions::default(),
        }
    }

    /// Send session events to `sink` instead
    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the setup options
    pub fn with_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    /// Options used by the next `initialize`
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Run every setup stage in order and return the live session
    pub async fn initialize(
        &self,
        transport: &TransportConfig,
        account: &AccountConfig,
    ) -> Result<AgentHandle> {
        let engine = self.engine.as_ref();

        self.run_stage(SetupStage::AgentCreate, engine.create_agent().await)
            .await?;

        let mut warnings = Vec::new();
        match engine.verify_uri(&self.options.reference_uri) {
            Ok(()) => {
                self.sink
                    .record(SessionEvent::StageCompleted {
                        stage: SetupStage::UriVerify,
                    })
                    .await;
            }
            Err(e) if self.options.strict_uri_check => {
                return Err(self.fail(SetupStage::UriVerify, e).await);
            }
            Err(e) => {
                let warning = SetupWarning {
                    stage: SetupStage::UriVerify,
                    message: e.to_string(),
                };
                self.sink
                    .record(SessionEvent::SetupWarning(warning.clone()))
                    .await;
                warnings.push(warning);
            }
        }

        let ctx = SessionContext::new(
            self.engine.clone(),
            self.sink.clone(),
            self.options.device_slot,
        );
        let tracker = Arc::new(CallStateTracker::new(ctx.clone()));
        let dispatcher = Arc::new(CallEventDispatcher::new(ctx, tracker.clone()));
        self.run_stage(
            SetupStage::AgentInit,
            engine
                .configure_agent(dispatcher, self.options.log_level)
                .await,
        )
        .await?;

        let transport_id = self
            .run_stage(
                SetupStage::TransportCreate,
                TransportBinder::bind(engine, transport).await,
            )
            .await?;
        self.sink
            .record(SessionEvent::TransportBound {
                transport_id,
                description: format!("{} {}", transport.protocol, transport.socket_addr()),
            })
            .await;

        self.run_stage(SetupStage::AgentStart, engine.start_agent().await)
            .await?;

        let account_id = self
            .run_stage(
                SetupStage::AccountAdd,
                AccountRegistrar::register(engine, account).await,
            )
            .await?;
        self.sink
            .record(SessionEvent::AccountAdded {
                account_id,
                identity: account.identity.clone(),
            })
            .await;

        info!(
            "Session up: {} on {}, {} warning(s)",
            account.identity,
            transport.socket_addr(),
            warnings.len()
        );
        Ok(AgentHandle {
            engine: self.engine.clone(),
            sink: self.sink.clone(),
            tracker,
            transport_id,
            account_id,
            warnings,
            destroyed: AtomicBool::new(false),
        })
    }

    /// Destroy the session's agent
    pub async fn shutdown(&self, handle: &AgentHandle) -> Result<()> {
        handle.shutdown().await
    }

    async fn run_stage<T>(&self, stage: SetupStage, result: EngineResult<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.sink.record(SessionEvent::StageCompleted { stage }).await;
                Ok(value)
            }
            Err(e) => Err(self.fail(stage, e).await),
        }
    }

    async fn fail(&self, stage: SetupStage, e: EngineError) -> SessionError {
        self.sink
            .record(SessionEvent::SetupFailed {
                stage,
                error: e.clone(),
            })
            .await;

        if stage.requires_rollback() {
            warn!("Destroying agent after {} failed", stage);
            if let Err(destroy_err) = self.engine.destroy_agent().await {
                error!("Rollback after {} failed: {}", stage, destroy_err);
            }
        }
        SessionError::setup(stage, e)
    }
}

/// A live session. Required by every operation after setup.
pub struct AgentHandle {
    engine: Arc<dyn SignalingEngine>,
    sink: Arc<dyn ObservabilitySink>,
    tracker: Arc<CallStateTracker>,
    transport_id: TransportId,
    account_id: AccountId,
    warnings: Vec<SetupWarning>,
    destroyed: AtomicBool,
}

impl AgentHandle {
    /// Transport created during setup
    pub fn transport_id(&self) -> TransportId {
        self.transport_id
    }

    /// Account registered during setup
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Non-fatal problems noticed during setup
    pub fn warnings(&self) -> &[SetupWarning] {
        &self.warnings
    }

    /// Whether `shutdown` already destroyed the agent
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Every call seen so far
    pub async fn calls(&self) -> Vec<CallRecord> {
        self.tracker.snapshot().await
    }

    /// Tracked record of one call
    pub async fn call(&self, call_id: CallId) -> Option<CallRecord> {
        self.tracker.get(call_id).await
    }

    /// Lifecycle state as the engine reports it
    pub async fn agent_state(&self) -> AgentState {
        self.engine.agent_state().await
    }

    /// Hang up every call that has not ended. Returns how many were hung up.
    pub async fn hangup_all(&self) -> Result<usize> {
        if self.is_destroyed() {
            return Err(SessionError::InvalidState(
                "hangup_all on a destroyed agent".to_string(),
            ));
        }

        let mut hung_up = 0;
        for call_id in self.tracker.active_calls().await {
            match self.engine.hangup_call(call_id).await {
                Ok(()) => hung_up += 1,
                Err(e) => warn!("Failed to hang up {}: {}", call_id, e),
            }
        }
        info!("Hung up {} call(s)", hung_up);
        Ok(hung_up)
    }

    /// Destroy the agent. A second shutdown is an error.
    pub async fn shutdown(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Err(SessionError::InvalidState(
                "Agent already destroyed".to_string(),
            ));
        }

        self.engine
            .destroy_agent()
            .await
            .map_err(|e| SessionError::InvalidState(e.to_string()))?;
        self.sink.record(SessionEvent::SessionShutdown).await;
        Ok(())
    }
}
