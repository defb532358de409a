//! Render-and-publish cycle over every active plugin
//!
//! Each plugin renders and publishes as its own task, so one plugin's
//! failure (or slow publish) never holds up the others.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::coordinator::{CycleReason, CycleReport, RefreshCycle};
use crate::plugins::{LoadedPlugin, PluginRegistry};
use crate::publisher::{PublishTarget, ScreenPublisher};

/// Default bound on a single plugin render
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(120);

/// What happened to one plugin in a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCycle {
    pub plugin: String,
    /// Failure that forced the fallback image
    pub render_error: Option<String>,
    /// Published screen id, or the publish failure
    pub screen: Result<String, String>,
}

/// Drives plugin renders and screen publishing for one device
pub struct PluginRuntime {
    registry: Arc<PluginRegistry>,
    publisher: ScreenPublisher,
    target: PublishTarget,
    render_timeout: Duration,
}

impl PluginRuntime {
    pub fn new(
        registry: Arc<PluginRegistry>,
        publisher: ScreenPublisher,
        target: PublishTarget,
    ) -> Self {
        Self {
            registry,
            publisher,
            target,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Render and publish every active plugin concurrently
    pub async fn render_all(&self) -> Vec<PluginCycle> {
        let mut tasks = JoinSet::new();
        for plugin in self.registry.active() {
            let publisher = self.publisher.clone();
            let target = self.target.clone();
            let timeout = self.render_timeout;
            tasks.spawn(async move { render_and_publish(&plugin, &publisher, &target, timeout).await });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => error!(error = %e, "Plugin cycle task failed"),
            }
        }
        results.sort_by(|a, b| a.plugin.cmp(&b.plugin));
        results
    }
}

async fn render_and_publish(
    plugin: &LoadedPlugin,
    publisher: &ScreenPublisher,
    target: &PublishTarget,
    timeout: Duration,
) -> PluginCycle {
    let outcome = plugin.render(timeout).await;
    if let Some(e) = &outcome.error {
        error!(plugin = %plugin.name(), error = %e, "Plugin render failed, publishing error image");
    }

    let screen = publisher
        .publish(plugin.name(), target, &outcome.png)
        .await
        .map_err(|e| {
            error!(plugin = %plugin.name(), error = %e, "Failed to publish screen");
            e.to_string()
        });

    PluginCycle {
        plugin: plugin.name().to_string(),
        render_error: outcome.error,
        screen,
    }
}

#[async_trait]
impl RefreshCycle for PluginRuntime {
    async fn run_cycle(&self, reason: CycleReason) -> CycleReport {
        let results = self.render_all().await;
        let mut report = CycleReport::default();
        for result in &results {
            if result.render_error.is_some() {
                report.fallbacks += 1;
            }
            match result.screen {
                Ok(_) => report.published += 1,
                Err(_) => report.publish_failures += 1,
            }
        }
        info!(%reason, plugins = results.len(), "Plugin cycle finished");
        report
    }
}
