//! XDG Base Directory paths for inkwell.
//!
//! The runtime is a long-lived service on small hosts, so it follows XDG
//! paths on every platform rather than platform-native locations.

use std::path::PathBuf;

/// Get the inkwell config directory.
///
/// Returns `$XDG_CONFIG_HOME/inkwell` if set, otherwise `~/.config/inkwell`.
/// This is where `config.toml` and the default plugin directory live.
///
/// # Examples
///
/// ```
/// use inkwell_paths::config_dir;
///
/// let plugin_dir = config_dir().join("plugins");
/// ```
pub fn config_dir() -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", ".config")
}

/// Get the inkwell state directory.
///
/// Returns `$XDG_STATE_HOME/inkwell` if set, otherwise `~/.local/state/inkwell`.
/// Coordinator lock files are kept here.
pub fn state_dir() -> PathBuf {
    xdg_dir("XDG_STATE_HOME", ".local/state")
}

/// Default directory scanned for plugins.
pub fn plugin_dir() -> PathBuf {
    config_dir().join("plugins")
}

fn xdg_dir(var: &str, home_relative: &str) -> PathBuf {
    if let Ok(base) = std::env::var(var) {
        PathBuf::from(base).join("inkwell")
    } else if let Some(home) = dirs::home_dir() {
        home.join(home_relative).join("inkwell")
    } else {
        PathBuf::from(home_relative).join("inkwell")
    }
}
