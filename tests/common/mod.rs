//! Shared helpers for integration tests

#![allow(dead_code)]

use autoanswer::application::{AgentHandle, SessionController, SessionOptions};
use autoanswer::domain::account::AccountConfig;
use autoanswer::domain::transport::TransportConfig;
use autoanswer::infrastructure::engine::{EngineDriver, LocalEngine};
use autoanswer::infrastructure::observability::{FanoutSink, MemorySink, TracingSink};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

/// UDP on loopback, port picked by the OS
pub fn loopback() -> TransportConfig {
    TransportConfig::udp(0).with_bind_address(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// A controller over a fresh local engine, recording events in memory
pub struct Harness {
    pub engine: LocalEngine,
    pub driver: EngineDriver,
    pub sink: MemorySink,
    pub controller: SessionController,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default())
    }

    pub fn with_options(options: SessionOptions) -> Self {
        let engine = LocalEngine::new();
        let sink = MemorySink::default();
        let fanout = FanoutSink::new()
            .with(Arc::new(TracingSink::new()))
            .with(Arc::new(sink.clone()));
        let controller = SessionController::new(Arc::new(engine.clone()))
            .with_sink(Arc::new(fanout))
            .with_options(options);
        Self {
            driver: engine.driver(),
            engine,
            sink,
            controller,
        }
    }

    /// Initialize on loopback with the default account
    pub async fn start(&self) -> AgentHandle {
        self.controller
            .initialize(&loopback(), &AccountConfig::default())
            .await
            .expect("Failed to initialize session")
    }
}
