//! Local engine - an in-process [`SignalingEngine`]
//!
//! Enforces the agent lifecycle, binds real listening sockets, keeps the
//! call table and conference bridge, and dispatches events on its own task.
//! Network-side happenings (an INVITE arriving, the remote hanging up, media
//! coming up) are injected through an [`EngineDriver`].

use super::driver::EngineDriver;
use super::transport::BoundTransport;
use super::{EngineEventHandler, EngineResult, SignalingEngine};
use crate::domain::account::AccountConfig;
use crate::domain::agent::{AgentState, LogLevel};
use crate::domain::call::{CallInfo, MediaState, SignalingState};
use crate::domain::shared::error::EngineError;
use crate::domain::shared::value_objects::{AccountId, CallId, SipUri, SlotId, TransportId};
use crate::domain::transport::TransportConfig;
use crate::infrastructure::media::ConferenceBridge;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Status sent when the local side hangs up a call that was never answered
const DECLINE: u16 = 603;

pub(crate) enum EngineEvent {
    IncomingCall { account_id: AccountId, call_id: CallId },
    CallState(CallId),
    MediaState(CallId),
    /// Acknowledged once every earlier event has been handled
    Flush(oneshot::Sender<()>),
}

/// Engine primitive invoked by the session, kept for inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    AnswerCall { call_id: CallId, status: u16 },
    ConnectSlot { from: SlotId, to: SlotId },
    HangupCall { call_id: CallId },
}

struct RegisteredAccount {
    identity: SipUri,
    registrar: SipUri,
    credential_count: usize,
}

pub(crate) struct AgentCore {
    pub(crate) state: AgentState,
    log_level: LogLevel,
    pub(crate) events: Option<mpsc::UnboundedSender<EngineEvent>>,
    event_task: Option<JoinHandle<()>>,
    transports: BTreeMap<TransportId, BoundTransport>,
    accounts: BTreeMap<AccountId, RegisteredAccount>,
    pub(crate) calls: HashMap<CallId, CallInfo>,
    pub(crate) bridge: ConferenceBridge,
    next_transport: u32,
    next_account: u32,
    pub(crate) next_call: u32,
}

impl AgentCore {
    fn new() -> Self {
        Self {
            state: AgentState::Uninitialized,
            log_level: LogLevel::default(),
            events: None,
            event_task: None,
            transports: BTreeMap::new(),
            accounts: BTreeMap::new(),
            calls: HashMap::new(),
            bridge: ConferenceBridge::new(),
            next_transport: 0,
            next_account: 0,
            next_call: 0,
        }
    }

    /// Fail unless the agent is in `expected` state
    pub(crate) fn require(&self, expected: AgentState, op: &str) -> EngineResult<()> {
        if self.state != expected {
            return Err(EngineError::InvalidState(format!(
                "{} requires agent {}, agent is {}",
                op, expected, self.state
            )));
        }
        Ok(())
    }

    /// Account that inbound calls are routed to
    pub(crate) fn default_account(&self) -> Option<AccountId> {
        self.accounts.keys().next().copied()
    }

    fn call_mut(&mut self, call_id: CallId) -> EngineResult<&mut CallInfo> {
        self.calls
            .get_mut(&call_id)
            .ok_or_else(|| EngineError::NotFound(format!("No such call: {}", call_id)))
    }

    /// Move a call to `state`. Disconnecting releases its bridge slot.
    pub(crate) fn set_call_state(
        &mut self,
        call_id: CallId,
        state: SignalingState,
        status: Option<u16>,
    ) -> EngineResult<()> {
        let call = self.call_mut(call_id)?;
        if call.state.is_terminal() {
            return Err(EngineError::InvalidState(format!(
                "{} is already disconnected",
                call_id
            )));
        }

        call.state = state;
        call.state_text = state.as_str().to_string();
        if status.is_some() {
            call.last_status = status;
        }

        if state.is_terminal() {
            let slot = call.audio_slot.take();
            call.media_state = MediaState::None;
            if let Some(slot) = slot {
                self.bridge.release(slot);
            }
        }
        Ok(())
    }

    /// Change a call's media state. Becoming active gives the call a slot
    /// (`slot` if given); leaving active drops the slot's links.
    pub(crate) fn set_media(
        &mut self,
        call_id: CallId,
        media_state: MediaState,
        slot: Option<SlotId>,
    ) -> EngineResult<Option<SlotId>> {
        let current = {
            let call = self.call_mut(call_id)?;
            if call.state.is_terminal() {
                return Err(EngineError::InvalidState(format!(
                    "{} is already disconnected",
                    call_id
                )));
            }
            call.audio_slot
        };

        let audio_slot = if media_state.is_active() {
            let assigned = match (slot, current) {
                (Some(wanted), Some(old)) if wanted != old => {
                    // The old slot stays linked unless the move succeeds
                    self.bridge.reserve(wanted, call_id)?;
                    self.bridge.release(old);
                    wanted
                }
                (Some(wanted), _) => {
                    self.bridge.reserve(wanted, call_id)?;
                    wanted
                }
                (None, Some(old)) => old,
                (None, None) => self.bridge.allocate(call_id)?,
            };
            Some(assigned)
        } else {
            if let Some(old) = current {
                self.bridge.disconnect_all(old);
            }
            current
        };

        let call = self.call_mut(call_id)?;
        call.media_state = media_state;
        call.audio_slot = audio_slot;
        Ok(audio_slot)
    }
}

pub(crate) struct Shared {
    pub(crate) core: Mutex<AgentCore>,
    journal: Mutex<Vec<EngineCall>>,
    pub(crate) pending: Arc<AtomicUsize>,
}

impl Shared {
    /// Queue an event for the handler; dropped when no handler is installed
    pub(crate) fn emit(&self, core: &AgentCore, event: EngineEvent) {
        if let Some(events) = &core.events {
            self.pending.fetch_add(1, Ordering::SeqCst);
            if events.send(event).is_err() {
                self.pending.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    async fn record(&self, call: EngineCall) {
        self.journal.lock().await.push(call);
    }
}

/// In-process signaling engine
#[derive(Clone)]
pub struct LocalEngine {
    shared: Arc<Shared>,
}

impl LocalEngine {
    /// Engine with no agent yet
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(AgentCore::new()),
                journal: Mutex::new(Vec::new()),
                pending: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Handle for injecting network-side events
    pub fn driver(&self) -> EngineDriver {
        EngineDriver::new(self.shared.clone())
    }

    /// Every answer, connect and hangup the engine was asked to perform
    pub async fn journal(&self) -> Vec<EngineCall> {
        self.shared.journal.lock().await.clone()
    }

    /// Answers issued for one call
    pub async fn answers_for(&self, call_id: CallId) -> Vec<u16> {
        self.journal()
            .await
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::AnswerCall { call_id: id, status } if id == call_id => Some(status),
                _ => None,
            })
            .collect()
    }

    /// Connect requests issued, in order
    pub async fn connect_requests(&self) -> Vec<(SlotId, SlotId)> {
        self.journal()
            .await
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::ConnectSlot { from, to } => Some((from, to)),
                _ => None,
            })
            .collect()
    }

    /// Links currently present on the conference bridge
    pub async fn bridge_links(&self) -> Vec<(SlotId, SlotId)> {
        self.shared.core.lock().await.bridge.links()
    }

    /// Bound address of every transport
    pub async fn transport_addrs(&self) -> Vec<SocketAddr> {
        let core = self.shared.core.lock().await;
        core.transports.values().map(|t| t.local_addr()).collect()
    }

    /// Number of accounts added
    pub async fn account_count(&self) -> usize {
        self.shared.core.lock().await.accounts.len()
    }

    /// Registrar of an added account
    pub async fn account_registrar(&self, account_id: AccountId) -> Option<String> {
        let core = self.shared.core.lock().await;
        core.accounts
            .get(&account_id)
            .map(|account| account.registrar.to_string())
    }

    /// Console level set at configure time
    pub async fn log_level(&self) -> LogLevel {
        self.shared.core.lock().await.log_level
    }
}

impl Default for LocalEngine {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_events(
    handler: Arc<dyn EngineEventHandler>,
    mut events: mpsc::UnboundedReceiver<EngineEvent>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Flush(ack) => {
                let _ = ack.send(());
                continue;
            }
            EngineEvent::IncomingCall {
                account_id,
                call_id,
            } => handler.on_incoming_call(account_id, call_id).await,
            EngineEvent::CallState(call_id) => handler.on_call_state_changed(call_id).await,
            EngineEvent::MediaState(call_id) => handler.on_call_media_state_changed(call_id).await,
        }
        pending.fetch_sub(1, Ordering::SeqCst);
    }
    debug!("Engine event loop finished");
}

#[async_trait]
impl SignalingEngine for LocalEngine {
    async fn create_agent(&self) -> EngineResult<()> {
        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Uninitialized, "create_agent")?;
        core.state = AgentState::Created;
        info!("Agent created");
        Ok(())
    }

    fn verify_uri(&self, uri: &str) -> EngineResult<()> {
        SipUri::parse(uri)
            .map(|_| ())
            .map_err(EngineError::InvalidArgument)
    }

    async fn configure_agent(
        &self,
        handler: Arc<dyn EngineEventHandler>,
        log_level: LogLevel,
    ) -> EngineResult<()> {
        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Created, "configure_agent")?;

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_events(handler, rx, self.shared.pending.clone()));

        core.events = Some(tx);
        core.event_task = Some(task);
        core.log_level = log_level;
        core.state = AgentState::Configured;
        info!("Agent configured (console level {})", log_level.value());
        Ok(())
    }

    async fn create_transport(&self, config: &TransportConfig) -> EngineResult<TransportId> {
        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Configured, "create_transport")?;

        let transport = BoundTransport::bind(config).await?;
        let id = TransportId::new(core.next_transport);
        core.next_transport += 1;
        core.transports.insert(id, transport);
        Ok(id)
    }

    async fn start_agent(&self) -> EngineResult<()> {
        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Configured, "start_agent")?;
        if core.transports.is_empty() {
            return Err(EngineError::InvalidState(
                "start_agent requires at least one transport".to_string(),
            ));
        }
        core.state = AgentState::Started;
        let endpoints: Vec<String> = core.transports.values().map(|t| t.describe()).collect();
        info!("Agent started on {}", endpoints.join(", "));
        Ok(())
    }

    async fn add_account(&self, config: &AccountConfig) -> EngineResult<AccountId> {
        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Started, "add_account")?;

        let (identity, registrar) = config.validate()?;
        let id = AccountId::new(core.next_account);
        core.next_account += 1;
        info!("Account {} added as {}, registering with {}", identity, id, registrar);
        core.accounts.insert(
            id,
            RegisteredAccount {
                identity,
                registrar,
                credential_count: config.credentials.len(),
            },
        );
        Ok(id)
    }

    async fn answer_call(&self, call_id: CallId, status: rsip::StatusCode) -> EngineResult<()> {
        let code = status.code();
        self.shared
            .record(EngineCall::AnswerCall { call_id, status: code })
            .await;

        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Started, "answer_call")?;

        let state = core.call_mut(call_id)?.state;
        if !state.is_answerable() {
            return Err(EngineError::InvalidState(format!(
                "{} cannot be answered in state {}",
                call_id, state
            )));
        }

        let next = match status.kind() {
            rsip::StatusCodeKind::Provisional if code == 183 => SignalingState::EarlyMedia,
            rsip::StatusCodeKind::Provisional => state,
            rsip::StatusCodeKind::Successful => SignalingState::Connecting,
            _ => SignalingState::Disconnected,
        };

        core.set_call_state(call_id, next, Some(code))?;
        if next != state {
            self.shared.emit(&core, EngineEvent::CallState(call_id));
        }
        debug!("Answered {} with {}", call_id, code);
        Ok(())
    }

    async fn call_info(&self, call_id: CallId) -> EngineResult<CallInfo> {
        let core = self.shared.core.lock().await;
        if !core.state.is_live() {
            return Err(EngineError::InvalidState(format!(
                "call_info on agent that is {}",
                core.state
            )));
        }
        core.calls
            .get(&call_id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("No such call: {}", call_id)))
    }

    async fn connect_slot(&self, from: SlotId, to: SlotId) -> EngineResult<()> {
        self.shared.record(EngineCall::ConnectSlot { from, to }).await;

        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Started, "connect_slot")?;
        if core.bridge.connect(from, to)? {
            debug!("Connected {} -> {}", from, to);
        }
        Ok(())
    }

    async fn hangup_call(&self, call_id: CallId) -> EngineResult<()> {
        self.shared.record(EngineCall::HangupCall { call_id }).await;

        let mut core = self.shared.core.lock().await;
        core.require(AgentState::Started, "hangup_call")?;

        let answerable = core.call_mut(call_id)?.state.is_answerable();
        let status = answerable.then_some(DECLINE);
        core.set_call_state(call_id, SignalingState::Disconnected, status)?;
        self.shared.emit(&core, EngineEvent::CallState(call_id));
        Ok(())
    }

    async fn destroy_agent(&self) -> EngineResult<()> {
        let mut core = self.shared.core.lock().await;
        if !core.state.is_live() {
            return Err(EngineError::InvalidState(format!(
                "destroy_agent on agent that is {}",
                core.state
            )));
        }

        core.events = None;
        if let Some(task) = core.event_task.take() {
            task.abort();
        }
        self.shared.pending.store(0, Ordering::SeqCst);

        let open_calls = core.calls.values().filter(|c| !c.state.is_terminal()).count();
        if open_calls > 0 {
            warn!("Destroying agent with {} open call(s)", open_calls);
        }

        for account in core.accounts.values() {
            debug!(
                "Dropping account {} ({} credential(s))",
                account.identity, account.credential_count
            );
        }

        core.transports.clear();
        core.accounts.clear();
        core.calls.clear();
        core.bridge = ConferenceBridge::new();
        core.state = AgentState::Destroyed;
        info!("Agent destroyed");
        Ok(())
    }

    async fn agent_state(&self) -> AgentState {
        self.shared.core.lock().await.state
    }
}
