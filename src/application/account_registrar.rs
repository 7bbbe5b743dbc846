//! Account stage

use crate::domain::account::AccountConfig;
use crate::domain::shared::value_objects::AccountId;
use crate::infrastructure::engine::{EngineResult, SignalingEngine};
use tracing::info;

/// Adds the session's account to the engine
pub struct AccountRegistrar;

impl AccountRegistrar {
    /// Validate locally, then add the account. Registration with the
    /// registrar proceeds asynchronously inside the engine.
    pub async fn register(
        engine: &dyn SignalingEngine,
        config: &AccountConfig,
    ) -> EngineResult<AccountId> {
        let (identity, registrar) = config.validate()?;
        info!(
            "Registering {} with {} ({} credential(s))",
            identity,
            registrar,
            config.credentials.len()
        );
        engine.add_account(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::error::EngineError;
    use crate::infrastructure::engine::MockSignalingEngine;

    #[tokio::test]
    async fn test_register_default_account() {
        let mut engine = MockSignalingEngine::new();
        engine
            .expect_add_account()
            .withf(|config| config.credentials.len() == 1)
            .times(1)
            .returning(|_| Ok(AccountId::new(0)));

        let id = AccountRegistrar::register(&engine, &AccountConfig::default())
            .await
            .unwrap();
        assert_eq!(id, AccountId::new(0));
    }

    #[tokio::test]
    async fn test_empty_credentials_never_reach_engine() {
        // No expectations: any engine call panics
        let engine = MockSignalingEngine::new();
        let mut account = AccountConfig::default();
        account.credentials.clear();

        let result = AccountRegistrar::register(&engine, &account).await;
        assert!(matches!(result, Err(EngineError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_engine_rejection_is_returned() {
        let mut engine = MockSignalingEngine::new();
        engine
            .expect_add_account()
            .returning(|_| Err(EngineError::InvalidState("agent is Configured".to_string())));

        let result = AccountRegistrar::register(&engine, &AccountConfig::default()).await;
        assert!(matches!(result, Err(EngineError::InvalidState(_))));
    }
}
