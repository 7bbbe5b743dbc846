//! Blocking session boundary
//!
//! Hosts that cannot run async code get a single blocking `initialize`
//! returning a status string: `"OK"`, or `"Error in <stage>"` naming the
//! setup stage that failed. Callers pattern-match on these strings.

use crate::application::{AgentHandle, SessionController};
use crate::domain::account::AccountConfig;
use crate::domain::agent::{AgentState, SetupStage};
use crate::domain::shared::error::{EngineError, SessionError};
use crate::domain::shared::result::Result;
use crate::domain::transport::TransportConfig;
use std::future::Future;
use tokio::runtime::Runtime;
use tracing::{info, warn};

pub const STATUS_OK: &str = "OK";
pub const STATUS_INVALID_STATE: &str = "Error: invalid state";

/// Status string for an operation result
pub fn status_of<T>(result: &Result<T>) -> String {
    match result {
        Ok(_) => STATUS_OK.to_string(),
        Err(e @ SessionError::Setup { .. }) => e.to_string(),
        Err(SessionError::InvalidState(_)) => STATUS_INVALID_STATE.to_string(),
    }
}

/// Owns the runtime the session's engine runs on, and at most one session.
///
/// Every method blocks; none may be called from inside an async context.
pub struct SessionHost {
    runtime: Runtime,
    controller: SessionController,
    session: Option<AgentHandle>,
}

impl SessionHost {
    /// Host with its own multi-threaded runtime
    pub fn new(controller: SessionController) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("sip-session")
            .build()?;
        Ok(Self {
            runtime,
            controller,
            session: None,
        })
    }

    /// Bring the session up. Only one agent may exist per host.
    pub fn initialize(&mut self, transport: &TransportConfig, account: &AccountConfig) -> String {
        if self.session.is_some() {
            warn!("initialize called while a session is live");
            let result: Result<()> = Err(SessionError::setup(
                SetupStage::AgentCreate,
                EngineError::InvalidState("An agent is already running".to_string()),
            ));
            return status_of(&result);
        }

        let result = self
            .runtime
            .block_on(self.controller.initialize(transport, account));
        let status = status_of(&result);
        if let Ok(handle) = result {
            self.session = Some(handle);
        }
        info!("initialize: {}", status);
        status
    }

    /// Hang up all calls of the live session
    pub fn hangup_all(&self) -> std::result::Result<usize, String> {
        let result = match &self.session {
            Some(handle) => self.runtime.block_on(handle.hangup_all()),
            None => Err(SessionError::InvalidState("No session".to_string())),
        };
        result.map_err(|e| status_of::<()>(&Err(e)))
    }

    /// Destroy the live session
    pub fn shutdown(&mut self) -> String {
        let result = match self.session.take() {
            Some(handle) => self.runtime.block_on(self.controller.shutdown(&handle)),
            None => Err(SessionError::InvalidState("No session".to_string())),
        };
        status_of(&result)
    }

    /// Live session, if any
    pub fn session(&self) -> Option<&AgentHandle> {
        self.session.as_ref()
    }

    /// Engine lifecycle state of the live session
    pub fn agent_state(&self) -> Option<AgentState> {
        self.session
            .as_ref()
            .map(|handle| self.runtime.block_on(handle.agent_state()))
    }

    /// Run a future on the host's runtime
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl Drop for SessionHost {
    fn drop(&mut self) {
        if let Some(handle) = self.session.take() {
            if let Err(e) = self.runtime.block_on(handle.shutdown()) {
                warn!("Shutdown on drop failed: {}", e);
            }
        }
    }
}
