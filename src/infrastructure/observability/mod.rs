//! Observability sinks for session events
//!
//! Per-call failures never abort the session; they end up here instead.

pub mod memory;

pub use memory::MemorySink;

use crate::domain::call::SessionEvent;
use crate::domain::shared::error::CallError;
use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Receiver of session events
#[async_trait]
pub trait ObservabilitySink: Send + Sync {
    async fn record(&self, event: SessionEvent);
}

/// Logs every event and bumps the matching counters
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    /// Create a tracing sink
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ObservabilitySink for TracingSink {
    async fn record(&self, event: SessionEvent) {
        match &event {
            SessionEvent::StageCompleted { stage } => {
                debug!("Setup stage {} completed", stage);
            }
            SessionEvent::SetupWarning(warning) => {
                warn!("Setup warning: {}", warning);
                counter!("sip_setup_warnings_total", "stage" => warning.stage.name()).increment(1);
            }
            SessionEvent::SetupFailed { stage, error } => {
                error!("Error in {}: {}", stage, error);
                counter!("sip_setup_failures_total", "stage" => stage.name()).increment(1);
            }
            SessionEvent::TransportBound {
                transport_id,
                description,
            } => {
                info!("Transport {} bound: {}", transport_id, description);
            }
            SessionEvent::AccountAdded {
                account_id,
                identity,
            } => {
                info!("Account {} added: {}", account_id, identity);
                counter!("sip_registrations_total").increment(1);
            }
            SessionEvent::IncomingCall {
                call_id,
                remote_party,
                ..
            } => {
                info!("Incoming call from {}!! ({})", remote_party, call_id);
                counter!("sip_calls_total").increment(1);
            }
            SessionEvent::CallAnswered { call_id, status } => {
                info!("Answered {} with {}", call_id, status);
                counter!("sip_calls_answered_total").increment(1);
            }
            SessionEvent::CallStateChanged {
                call_id,
                state_text,
                ..
            } => {
                info!("Call {} state={}", call_id, state_text);
            }
            SessionEvent::MediaPatched {
                call_id,
                call_slot,
                device_slot,
            } => {
                info!(
                    "Media active for {}: {} <-> {}",
                    call_id, call_slot, device_slot
                );
            }
            SessionEvent::MediaUnrouted {
                call_id,
                media_state,
            } => {
                debug!("Media for {} is {}, nothing to route", call_id, media_state);
            }
            SessionEvent::CallFailure(failure) => {
                warn!("{}", failure);
                let metric = match failure {
                    CallError::AnswerFailure { .. } => "sip_call_answer_failures",
                    CallError::MediaConnectFailure { .. } => "sip_media_connect_failures",
                    CallError::InfoUnavailable { .. } => "sip_call_info_failures",
                };
                counter!(metric).increment(1);
            }
            SessionEvent::SessionShutdown => {
                info!("Session shut down");
            }
        }
    }
}

/// Forwards every event to several sinks, in order
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ObservabilitySink>>,
}

impl FanoutSink {
    /// Fan-out with no sinks
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink; events reach sinks in insertion order
    pub fn with(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl ObservabilitySink for FanoutSink {
    async fn record(&self, event: SessionEvent) {
        for sink in &self.sinks {
            sink.record(event.clone()).await;
        }
    }
}
