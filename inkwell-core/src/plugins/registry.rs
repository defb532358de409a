//! PluginRegistry - owns plugin instances and their lifecycle

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use inkwell_plugin_api::render::panic_message;
use inkwell_plugin_api::{
    DeviceMetadata, Dimensions, Plugin, PluginCatalog, PluginContext, PluginInit, RenderOutcome,
    render,
};

use super::discovery::PluginDescriptor;
use super::error::RegistryError;

/// State of a loaded plugin
#[derive(Debug, Clone, PartialEq)]
pub enum PluginState {
    /// Constructed, `on_start` not yet run
    Loaded,
    /// Started and scheduled for rendering
    Ready,
    /// `on_start` failed; never rendered
    Excluded { reason: String },
    /// `on_stop` has run
    Stopped,
}

/// Outcome of the most recent render
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Failure description when the fallback image was produced
    pub error: Option<String>,
}

/// A plugin instance with its fixed render context
pub struct LoadedPlugin {
    descriptor: PluginDescriptor,
    context: PluginContext,
    instance: Arc<Mutex<Box<dyn Plugin>>>,
    state: RwLock<PluginState>,
    last_execution: Mutex<Option<ExecutionRecord>>,
}

impl LoadedPlugin {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    pub fn state(&self) -> PluginState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: PluginState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn is_ready(&self) -> bool {
        self.state() == PluginState::Ready
    }

    pub fn last_execution(&self) -> Option<ExecutionRecord> {
        self.last_execution
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Render on the blocking pool, bounded by `timeout`.
    ///
    /// Never fails: errors, panics, timeouts and a still-running previous
    /// render all produce the fallback image.
    pub async fn render(&self, timeout: Duration) -> RenderOutcome {
        let instance = Arc::clone(&self.instance);
        let ctx = self.context.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut guard = match instance.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    return RenderOutcome::failed(&ctx, "previous render is still running");
                }
            };
            render(&mut **guard, &ctx)
        });

        let outcome = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => RenderOutcome::failed(&self.context, format!("render task failed: {e}")),
            Err(_) => RenderOutcome::failed(
                &self.context,
                format!("render timed out after {}s", timeout.as_secs()),
            ),
        };

        *self
            .last_execution
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(ExecutionRecord {
            at: Utc::now(),
            elapsed: outcome.elapsed,
            error: outcome.error.clone(),
        });
        outcome
    }

    fn with_instance<T>(&self, f: impl FnOnce(&mut dyn Plugin) -> T) -> T {
        let mut guard = self.instance.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **guard)
    }
}

/// Information about a plugin, for listing
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub entry: String,
    pub dimensions: Dimensions,
    pub state: PluginState,
    pub last_execution: Option<ExecutionRecord>,
}

/// All plugin instances, in discovery order
pub struct PluginRegistry {
    plugins: Vec<Arc<LoadedPlugin>>,
}

impl PluginRegistry {
    /// Instantiate every descriptor through the catalog.
    ///
    /// All-or-nothing: the first unknown entry or failing constructor aborts.
    pub fn load(
        descriptors: Vec<PluginDescriptor>,
        catalog: &PluginCatalog,
        device: &DeviceMetadata,
        dimensions: Dimensions,
    ) -> Result<Self, RegistryError> {
        let plugins = descriptors
            .into_iter()
            .map(|descriptor| load_plugin(descriptor, catalog, device, dimensions).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { plugins })
    }

    /// Run `on_start` for every plugin, sequentially, in discovery order.
    ///
    /// A failing or panicking `on_start` excludes that plugin from
    /// scheduling; the others still start.
    pub fn start(&self) {
        for plugin in &self.plugins {
            if plugin.state() != PluginState::Loaded {
                continue;
            }

            let ctx = plugin.context.clone();
            let result = plugin.with_instance(|instance| {
                std::panic::catch_unwind(AssertUnwindSafe(|| instance.on_start(&ctx)))
            });

            match result {
                Ok(Ok(())) => {
                    tracing::info!(plugin = %plugin.name(), dimensions = %ctx.dimensions, "Plugin started");
                    plugin.set_state(PluginState::Ready);
                }
                Ok(Err(e)) => {
                    tracing::error!(plugin = %plugin.name(), error = %e, "Plugin on_start failed, excluding from scheduling");
                    plugin.set_state(PluginState::Excluded {
                        reason: e.to_string(),
                    });
                }
                Err(payload) => {
                    let reason = format!("panic: {}", panic_message(payload.as_ref()));
                    tracing::error!(plugin = %plugin.name(), error = %reason, "Plugin panicked in on_start, excluding from scheduling");
                    plugin.set_state(PluginState::Excluded { reason });
                }
            }
        }
    }

    /// Run `on_stop` for every started plugin; failures are logged
    pub fn stop(&self) {
        for plugin in &self.plugins {
            if !plugin.is_ready() {
                continue;
            }

            let result = plugin.with_instance(|instance| {
                std::panic::catch_unwind(AssertUnwindSafe(|| instance.on_stop()))
            });
            match result {
                Ok(Ok(())) => tracing::debug!(plugin = %plugin.name(), "Plugin stopped"),
                Ok(Err(e)) => {
                    tracing::warn!(plugin = %plugin.name(), error = %e, "Plugin on_stop returned error")
                }
                Err(_) => tracing::warn!(plugin = %plugin.name(), "Plugin panicked in on_stop"),
            }
            plugin.set_state(PluginState::Stopped);
        }
    }

    /// Plugins eligible for rendering
    pub fn active(&self) -> Vec<Arc<LoadedPlugin>> {
        self.plugins
            .iter()
            .filter(|p| p.is_ready())
            .cloned()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<LoadedPlugin>> {
        self.plugins.iter().find(|p| p.name() == name).cloned()
    }

    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.plugins
            .iter()
            .map(|p| PluginInfo {
                name: p.name().to_string(),
                entry: p.descriptor.entry.clone(),
                dimensions: p.context.dimensions,
                state: p.state(),
                last_execution: p.last_execution(),
            })
            .collect()
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }
}

fn load_plugin(
    descriptor: PluginDescriptor,
    catalog: &PluginCatalog,
    device: &DeviceMetadata,
    dimensions: Dimensions,
) -> Result<LoadedPlugin, RegistryError> {
    let factory = catalog
        .get(&descriptor.entry)
        .ok_or_else(|| RegistryError::UnknownEntry {
            plugin: descriptor.name.clone(),
            entry: descriptor.entry.clone(),
        })?;

    let init = PluginInit {
        name: descriptor.name.clone(),
        dimensions,
        config: descriptor.config.clone(),
        device: device.clone(),
    };

    let instance = std::panic::catch_unwind(AssertUnwindSafe(|| factory(&init)))
        .map_err(|payload| RegistryError::ConstructFailed {
            plugin: descriptor.name.clone(),
            source: inkwell_plugin_api::PluginError::custom(format!(
                "panic: {}",
                panic_message(payload.as_ref())
            )),
        })?
        .map_err(|source| RegistryError::ConstructFailed {
            plugin: descriptor.name.clone(),
            source,
        })?;

    tracing::info!(plugin = %descriptor.name, entry = %descriptor.entry, "Plugin loaded");

    Ok(LoadedPlugin {
        context: init.context(),
        descriptor,
        instance: Arc::new(Mutex::new(instance)),
        state: RwLock::new(PluginState::Loaded),
        last_execution: Mutex::new(None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell_plugin_api::{Canvas, FromInit, PluginError};
    use std::path::PathBuf;

    struct Blank;

    impl Plugin for Blank {
        fn draw(&mut self, _: &mut Canvas, _: &PluginContext) -> Result<(), PluginError> {
            Ok(())
        }
    }

    impl FromInit for Blank {
        fn from_init(_: &PluginInit) -> Result<Self, PluginError> {
            Ok(Blank)
        }
    }

    struct BadStart;

    impl Plugin for BadStart {
        fn on_start(&mut self, _: &PluginContext) -> Result<(), PluginError> {
            Err(PluginError::resource("no API token"))
        }

        fn draw(&mut self, _: &mut Canvas, _: &PluginContext) -> Result<(), PluginError> {
            Ok(())
        }
    }

    impl FromInit for BadStart {
        fn from_init(_: &PluginInit) -> Result<Self, PluginError> {
            Ok(BadStart)
        }
    }

    struct NeedsConfig;

    impl Plugin for NeedsConfig {
        fn draw(&mut self, _: &mut Canvas, _: &PluginContext) -> Result<(), PluginError> {
            Ok(())
        }
    }

    impl FromInit for NeedsConfig {
        fn from_init(init: &PluginInit) -> Result<Self, PluginError> {
            init.config
                .get("required")
                .map(|_| NeedsConfig)
                .ok_or_else(|| PluginError::config("`required` missing"))
        }
    }

    fn catalog() -> PluginCatalog {
        let mut catalog = PluginCatalog::new();
        catalog.register_type::<Blank>("ok").unwrap();
        catalog.register_type::<BadStart>("bad-start").unwrap();
        catalog.register_type::<NeedsConfig>("needs-config").unwrap();
        catalog
    }

    fn descriptor(name: &str, entry: &str) -> PluginDescriptor {
        PluginDescriptor {
            name: name.into(),
            dir: PathBuf::from(name),
            enabled: true,
            config: serde_json::json!({}),
            entry: entry.into(),
        }
    }

    fn dims() -> Dimensions {
        Dimensions::new(64, 32).unwrap()
    }

    #[test]
    fn test_unknown_entry_is_fatal() {
        let result = PluginRegistry::load(
            vec![descriptor("a", "ok"), descriptor("b", "missing")],
            &catalog(),
            &DeviceMetadata::default(),
            dims(),
        );
        assert!(matches!(
            result,
            Err(RegistryError::UnknownEntry { plugin, .. }) if plugin == "b"
        ));
    }

    #[test]
    fn test_constructor_failure_is_fatal() {
        let result = PluginRegistry::load(
            vec![descriptor("strict", "needs-config")],
            &catalog(),
            &DeviceMetadata::default(),
            dims(),
        );
        assert!(matches!(result, Err(RegistryError::ConstructFailed { .. })));
    }

    #[test]
    fn test_start_excludes_failing_plugins_only() {
        let registry = PluginRegistry::load(
            vec![descriptor("a", "ok"), descriptor("b", "bad-start")],
            &catalog(),
            &DeviceMetadata::default(),
            dims(),
        )
        .unwrap();

        registry.start();

        let active: Vec<_> = registry.active().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(active, vec!["a"]);
        assert!(matches!(
            registry.get("b").unwrap().state(),
            PluginState::Excluded { reason } if reason.contains("no API token")
        ));
    }

    #[test]
    fn test_stop_marks_started_plugins() {
        let registry = PluginRegistry::load(
            vec![descriptor("a", "ok"), descriptor("b", "bad-start")],
            &catalog(),
            &DeviceMetadata::default(),
            dims(),
        )
        .unwrap();
        registry.start();
        registry.stop();

        assert_eq!(registry.get("a").unwrap().state(), PluginState::Stopped);
        assert!(matches!(
            registry.get("b").unwrap().state(),
            PluginState::Excluded { .. }
        ));
        assert!(registry.active().is_empty());
    }

    #[tokio::test]
    async fn test_render_records_last_execution() {
        let registry = PluginRegistry::load(
            vec![descriptor("a", "ok")],
            &catalog(),
            &DeviceMetadata::default(),
            dims(),
        )
        .unwrap();
        registry.start();

        let plugin = registry.get("a").unwrap();
        assert!(plugin.last_execution().is_none());

        let outcome = plugin.render(Duration::from_secs(5)).await;
        assert!(!outcome.is_fallback());
        assert_eq!(plugin.last_execution().unwrap().error, None);
    }
}
