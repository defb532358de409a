//! Plugin registry error types
//!
//! Every variant is fatal at startup: a malformed plugin directory is an
//! operator error and the runtime refuses to schedule a partial plugin set.

use std::path::PathBuf;
use thiserror::Error;

use inkwell_plugin_api::PluginError;

/// Errors that can occur while discovering or loading plugins
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Plugin root directory not found
    #[error("Plugin directory not found: {path}")]
    PluginDirNotFound { path: PathBuf },

    /// Plugin directory has no configuration file
    #[error("Plugin '{plugin}' is missing its configuration file {path}")]
    MissingConfig { plugin: String, path: PathBuf },

    /// Plugin directory has no entry-point file
    #[error("Plugin '{plugin}' is missing its entry point {path}")]
    MissingEntryPoint { plugin: String, path: PathBuf },

    /// Configuration file could not be parsed or lacks required keys
    #[error("Plugin '{plugin}' has an invalid configuration: {reason}")]
    InvalidConfig { plugin: String, reason: String },

    /// Entry-point file could not be parsed
    #[error("Plugin '{plugin}' has an invalid entry point: {reason}")]
    InvalidEntryPoint { plugin: String, reason: String },

    /// Entry point names nothing in the plugin catalog
    #[error("Plugin '{plugin}' names unknown entry '{entry}'")]
    UnknownEntry { plugin: String, entry: String },

    /// The plugin constructor failed
    #[error("Plugin '{plugin}' failed to load: {source}")]
    ConstructFailed {
        plugin: String,
        #[source]
        source: PluginError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
