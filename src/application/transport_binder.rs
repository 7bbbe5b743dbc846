//! Transport stage

use crate::domain::shared::value_objects::TransportId;
use crate::domain::transport::TransportConfig;
use crate::infrastructure::engine::{EngineResult, SignalingEngine};
use tracing::debug;

/// Binds the session's listening transport
pub struct TransportBinder;

impl TransportBinder {
    /// Create the transport; the engine's result is returned unchanged
    pub async fn bind(
        engine: &dyn SignalingEngine,
        config: &TransportConfig,
    ) -> EngineResult<TransportId> {
        debug!(
            "Creating {} transport on {}",
            config.protocol,
            config.socket_addr()
        );
        engine.create_transport(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::error::EngineError;
    use crate::domain::transport::TransportProtocol;
    use crate::infrastructure::engine::MockSignalingEngine;

    #[tokio::test]
    async fn test_bind_passes_config_through() {
        let mut engine = MockSignalingEngine::new();
        engine
            .expect_create_transport()
            .withf(|config| config.protocol == TransportProtocol::Udp && config.port == 5080)
            .times(1)
            .returning(|_| Ok(TransportId::new(0)));

        let id = TransportBinder::bind(&engine, &TransportConfig::udp(5080))
            .await
            .unwrap();
        assert_eq!(id, TransportId::new(0));
    }

    #[tokio::test]
    async fn test_bind_returns_engine_error_unchanged() {
        let mut engine = MockSignalingEngine::new();
        engine
            .expect_create_transport()
            .returning(|_| Err(EngineError::Transport("address in use".to_string())));

        let result = TransportBinder::bind(&engine, &TransportConfig::udp(5080)).await;
        assert_eq!(
            result,
            Err(EngineError::Transport("address in use".to_string()))
        );
    }
}
