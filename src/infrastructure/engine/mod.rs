//! Signaling engine boundary
//!
//! The engine owns SIP encoding, transactions, RTP and the audio device.
//! The session only drives its lifecycle through [`SignalingEngine`] and
//! receives its events through [`EngineEventHandler`].

pub mod driver;
pub mod local;
pub mod transport;

pub use driver::EngineDriver;
pub use local::{EngineCall, LocalEngine};
pub use transport::BoundTransport;

use crate::domain::account::AccountConfig;
use crate::domain::agent::{AgentState, LogLevel};
use crate::domain::call::CallInfo;
use crate::domain::shared::error::EngineError;
use crate::domain::shared::value_objects::{AccountId, CallId, SlotId, TransportId};
use crate::domain::transport::TransportConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Engine result type
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Callbacks the engine invokes from its own event task.
///
/// Implementations must return promptly; nothing else is dispatched
/// until a callback returns.
#[async_trait]
pub trait EngineEventHandler: Send + Sync {
    /// A new inbound dialog arrived for `account_id`
    async fn on_incoming_call(&self, account_id: AccountId, call_id: CallId);

    /// The call's signaling state changed
    async fn on_call_state_changed(&self, call_id: CallId);

    /// The call's media became usable or unusable
    async fn on_call_media_state_changed(&self, call_id: CallId);
}

/// Primitive operations of a signaling/media engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalingEngine: Send + Sync {
    /// Create the agent
    async fn create_agent(&self) -> EngineResult<()>;

    /// Check that `uri` is a usable SIP URI
    fn verify_uri(&self, uri: &str) -> EngineResult<()>;

    /// Install the event handler and console verbosity
    async fn configure_agent(
        &self,
        handler: Arc<dyn EngineEventHandler>,
        log_level: LogLevel,
    ) -> EngineResult<()>;

    /// Bind a listening transport
    async fn create_transport(&self, config: &TransportConfig) -> EngineResult<TransportId>;

    /// Start processing network events
    async fn start_agent(&self) -> EngineResult<()>;

    /// Add an account and begin registering it
    async fn add_account(&self, config: &AccountConfig) -> EngineResult<AccountId>;

    /// Send a final or provisional response to an incoming call
    async fn answer_call(&self, call_id: CallId, status: rsip::StatusCode) -> EngineResult<()>;

    /// Current view of a call
    async fn call_info(&self, call_id: CallId) -> EngineResult<CallInfo>;

    /// Add a directed link on the conference bridge
    async fn connect_slot(&self, from: SlotId, to: SlotId) -> EngineResult<()>;

    /// Terminate a call
    async fn hangup_call(&self, call_id: CallId) -> EngineResult<()>;

    /// Destroy the agent and everything it owns
    async fn destroy_agent(&self) -> EngineResult<()>;

    async fn agent_state(&self) -> AgentState;
}
