//! On-disk plugin discovery
//!
//! Each immediate subdirectory of the plugin root is one plugin:
//!
//! ```text
//! plugins/
//!   clock/
//!     config.json   {"enabled": true, "config": {...}}
//!     plugin.toml   entry = "clock"
//!   example/        reserved template, never loaded
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::error::RegistryError;

/// Per-plugin configuration file
pub const CONFIG_FILE: &str = "config.json";
/// Per-plugin entry-point file
pub const ENTRY_FILE: &str = "plugin.toml";
/// Reserved template directory
pub const TEMPLATE_DIR: &str = "example";

/// A discovered plugin
#[derive(Debug, Clone, PartialEq)]
pub struct PluginDescriptor {
    /// Directory name, unique within the root
    pub name: String,
    /// Plugin directory
    pub dir: PathBuf,
    pub enabled: bool,
    /// Opaque JSON object handed to the constructor
    pub config: serde_json::Value,
    /// Catalog key from `plugin.toml`
    pub entry: String,
}

#[derive(Deserialize)]
struct ConfigFile {
    enabled: bool,
    config: serde_json::Value,
}

#[derive(Deserialize)]
struct EntryFile {
    entry: String,
}

/// Discover every plugin under `root`, enabled or not, sorted by name.
///
/// Fails on the first malformed plugin directory.
pub fn discover_all(root: &Path) -> Result<Vec<PluginDescriptor>, RegistryError> {
    if !root.is_dir() {
        return Err(RegistryError::PluginDirNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            tracing::warn!(dir = %path.display(), "Skipping plugin directory with non-UTF-8 name");
            continue;
        };
        if name == TEMPLATE_DIR || name.starts_with('.') {
            continue;
        }
        dirs.push((name.to_string(), path));
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));

    dirs.into_iter()
        .map(|(name, dir)| read_descriptor(name, dir))
        .collect()
}

/// Discover enabled plugins under `root`; disabled plugins are logged and skipped
pub fn discover(root: &Path) -> Result<Vec<PluginDescriptor>, RegistryError> {
    let all = discover_all(root)?;
    Ok(all
        .into_iter()
        .filter(|d| {
            if !d.enabled {
                tracing::info!(plugin = %d.name, "Plugin disabled, skipping");
            }
            d.enabled
        })
        .collect())
}

fn read_descriptor(name: String, dir: PathBuf) -> Result<PluginDescriptor, RegistryError> {
    let config_path = dir.join(CONFIG_FILE);
    let entry_path = dir.join(ENTRY_FILE);

    if !config_path.is_file() {
        return Err(RegistryError::MissingConfig {
            plugin: name,
            path: config_path,
        });
    }
    if !entry_path.is_file() {
        return Err(RegistryError::MissingEntryPoint {
            plugin: name,
            path: entry_path,
        });
    }

    let config: ConfigFile = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
        .map_err(|e| RegistryError::InvalidConfig {
            plugin: name.clone(),
            reason: e.to_string(),
        })?;
    if !config.config.is_object() {
        return Err(RegistryError::InvalidConfig {
            plugin: name,
            reason: "`config` must be a JSON object".to_string(),
        });
    }

    let entry: EntryFile = toml::from_str(&std::fs::read_to_string(&entry_path)?).map_err(|e| {
        RegistryError::InvalidEntryPoint {
            plugin: name.clone(),
            reason: e.to_string(),
        }
    })?;
    if entry.entry.trim().is_empty() {
        return Err(RegistryError::InvalidEntryPoint {
            plugin: name,
            reason: "`entry` is empty".to_string(),
        });
    }

    tracing::debug!(plugin = %name, entry = %entry.entry, enabled = config.enabled, "Discovered plugin");

    Ok(PluginDescriptor {
        name,
        dir,
        enabled: config.enabled,
        config: config.config,
        entry: entry.entry,
    })
}
