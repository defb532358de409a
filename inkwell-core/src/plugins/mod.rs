//! Plugin system for inkwell
//!
//! - [`discover`]: scan the plugin root for `config.json` + `plugin.toml` pairs
//! - [`PluginRegistry`]: instantiate plugins through the [`PluginCatalog`],
//!   run their lifecycle hooks and render them in isolation
//! - [`RegistryError`]: fatal discovery/load errors
//!
//! # Lifecycle
//!
//! Discovery and loading are all-or-nothing. `start()` then calls each
//! plugin's `on_start` in discovery order; a plugin whose `on_start` fails is
//! excluded from scheduling while the rest keep running.
//!
//! [`PluginCatalog`]: inkwell_plugin_api::PluginCatalog

mod discovery;
mod error;
mod registry;

pub use discovery::{
    CONFIG_FILE, ENTRY_FILE, PluginDescriptor, TEMPLATE_DIR, discover, discover_all,
};
pub use error::RegistryError;
pub use registry::{ExecutionRecord, LoadedPlugin, PluginInfo, PluginRegistry, PluginState};

/// Default plugin root
pub fn default_plugin_dir() -> std::path::PathBuf {
    inkwell_paths::plugin_dir()
}
