use std::{path::PathBuf, sync::Arc, time::Instant};

use tracing::info;

use vitals_core::Registry;
use vitals_observe::init_logger;

mod config;
mod http;

use config::AgentConfig;
use http::ScrapeState;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) config
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let cfg = AgentConfig::load(path.as_deref())?;

    // 2) logger
    init_logger(&cfg.logger)?;
    info!(listen = %cfg.listen, "logger initialized");

    // 3) registry (process resource metrics are registered on first access)
    let registry = Registry::global().clone();

    let started = Instant::now();
    registry
        .namespace_for("vitals.agent")
        .register_callback("uptime_seconds", &[], move || {
            Ok(started.elapsed().as_secs_f64().into())
        })?;

    // 4) scrape endpoint
    let state = ScrapeState::new(Arc::clone(&registry))?;
    let listener = tokio::net::TcpListener::bind(cfg.listen).await?;
    info!(addr = %listener.local_addr()?, metrics = registry.len(), "serving /metrics");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    Ok(())
}
