//! `inkwell run`: the long-lived runtime
//!
//! Startup is fail-fast (config, device lease, device identification, plugin
//! discovery and load). After that the coordinator runs until Ctrl-C or SIGTERM, restores
//! any overridden refresh rate, and the plugins are stopped.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use inkwell_builtin::builtin_catalog;
use inkwell_core::{
    Coordinator, PluginRuntime, PublishTarget, ScreenPublisher, SystemClock, bootstrap,
};

use crate::config::{ConfigLoader, RawInkwellConfig};

pub async fn run(raw: RawInkwellConfig) -> Result<()> {
    let config = ConfigLoader::finalize_from_env(raw)?;
    let client = super::connect(&config)?;
    let catalog = builtin_catalog().context("Failed to register built-in plugins")?;

    let started = bootstrap(
        client.as_ref(),
        &config.device_id,
        &config.plugin_dir,
        &catalog,
        &config.coordinator.lock_dir(),
    )
    .await
    .context("Startup failed")?;

    let runtime = PluginRuntime::new(
        started.registry.clone(),
        ScreenPublisher::new(client.clone()),
        PublishTarget::from(&started.profile.device),
    )
    .with_render_timeout(config.render_timeout);

    let mut coordinator = Coordinator::new(
        config.device_id.clone(),
        client,
        Arc::new(runtime),
        Arc::new(SystemClock),
        config.coordinator.clone(),
    )?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    info!(device = %config.device_id, plugins = %config.plugin_dir.display(), "inkwell running");
    let result = coordinator.run_with_lease(started.lease, shutdown).await;

    started.registry.stop();
    result.context("Coordinator stopped")?;
    info!("inkwell stopped");
    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown requested");
    shutdown.cancel();
}
