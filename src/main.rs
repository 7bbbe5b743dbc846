use anyhow::Context;
use autoanswer::config::Config;
use autoanswer::infrastructure::engine::LocalEngine;
use autoanswer::interface::status_of;
use autoanswer::SessionController;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("autoanswer.toml"));
    let config = Config::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    // RUST_LOG wins over the configured filter. The engine's console level
    // applies to the engine module only.
    let engine_level = config.session.log_level.as_tracing_level();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "{},autoanswer::infrastructure::engine={}",
                config.logging.filter,
                engine_level.to_string().to_lowercase()
            ))
        })
        .context("Invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting autoanswer");
    info!(
        "Account {} via {}, {} transport on {}",
        config.account.identity,
        config.account.registrar,
        config.transport.protocol,
        config.transport.socket_addr()
    );

    let engine = LocalEngine::new();
    let controller =
        SessionController::new(Arc::new(engine.clone())).with_options(config.session.clone());

    let result = controller
        .initialize(&config.transport, &config.account)
        .await;
    println!("{}", status_of(&result));
    let handle = match result {
        Ok(handle) => handle,
        Err(e) => anyhow::bail!("Session setup failed: {:?}", e),
    };

    for warning in handle.warnings() {
        warn!("{}", warning);
    }
    for addr in engine.transport_addrs().await {
        info!("Listening on {}", addr);
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    let hung_up = handle.hangup_all().await?;
    if hung_up > 0 {
        info!("Hung up {} call(s)", hung_up);
    }
    for record in handle.calls().await {
        match record.duration() {
            Some(duration) => info!(
                "{} from {} started {}, lasted {}s",
                record.call_id(),
                record.remote_party(),
                record.created_at(),
                duration.num_seconds()
            ),
            None => info!(
                "{} from {} still {} since {}",
                record.call_id(),
                record.remote_party(),
                record.state_text(),
                record.updated_at()
            ),
        }
    }
    controller.shutdown(&handle).await?;
    Ok(())
}
