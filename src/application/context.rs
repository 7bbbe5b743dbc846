//! Session context shared by the event handlers

use crate::domain::shared::value_objects::SlotId;
use crate::infrastructure::engine::SignalingEngine;
use crate::infrastructure::observability::ObservabilitySink;
use std::sync::Arc;

/// What every handler needs: the engine, where to report, and the local
/// audio device slot
#[derive(Clone)]
pub struct SessionContext {
    pub engine: Arc<dyn SignalingEngine>,
    pub sink: Arc<dyn ObservabilitySink>,
    pub device_slot: SlotId,
}

impl SessionContext {
    /// Context shared by the policy, tracker and router
    pub fn new(
        engine: Arc<dyn SignalingEngine>,
        sink: Arc<dyn ObservabilitySink>,
        device_slot: SlotId,
    ) -> Self {
        Self {
            engine,
            sink,
            device_slot,
        }
    }
}
