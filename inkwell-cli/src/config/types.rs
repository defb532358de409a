use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use inkwell_core::CoordinatorConfig;

/// Default per-request timeout for the device registry
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default plugin render timeout
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 120;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawInkwellConfig {
    #[serde(default)]
    pub api: RawApiConfig,

    #[serde(default)]
    pub device: RawDeviceConfig,

    #[serde(default)]
    pub plugins: RawPluginsConfig,

    #[serde(default)]
    pub coordinator: RawCoordinatorConfig,
}

impl RawInkwellConfig {
    /// Plugin root, falling back to the default under the config dir
    pub fn plugin_dir(&self) -> PathBuf {
        self.plugins
            .dir
            .clone()
            .unwrap_or_else(inkwell_paths::plugin_dir)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawApiConfig {
    /// Device registry base URL
    pub base_url: Option<String>,

    /// Bearer token for the registry
    pub api_key: Option<String>,

    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDeviceConfig {
    /// Registry id of the managed device
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPluginsConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCoordinatorConfig {
    pub safety_margin_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub verify_grace_secs: Option<u64>,
    pub override_rate: Option<bool>,
    pub recovery_rate_secs: Option<u64>,
    pub render_timeout_secs: Option<u64>,
}

/// Final configuration with defaults applied and validated
#[derive(Debug, Clone)]
pub struct InkwellConfig {
    pub api: ApiConfig,
    pub device_id: String,
    pub plugin_dir: PathBuf,
    pub coordinator: CoordinatorConfig,
    pub render_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_config_partial_parsing() {
        let toml_str = r#"
[coordinator]
poll_interval_secs = 15
"#;
        let raw: RawInkwellConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(raw.coordinator.poll_interval_secs, Some(15));
        assert!(raw.coordinator.safety_margin_secs.is_none());
        assert!(raw.api.base_url.is_none());
        assert!(raw.device.id.is_none());
    }

    #[test]
    fn test_raw_config_full_parsing() {
        let toml_str = r#"
[api]
base_url = "https://display.example.com"
api_key = "secret"
timeout_secs = 5

[device]
id = "42"

[plugins]
dir = "/srv/inkwell/plugins"

[coordinator]
safety_margin_secs = 90
override_rate = false
"#;
        let raw: RawInkwellConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(raw.api.base_url.as_deref(), Some("https://display.example.com"));
        assert_eq!(raw.api.timeout_secs, Some(5));
        assert_eq!(raw.device.id.as_deref(), Some("42"));
        assert_eq!(raw.plugin_dir(), PathBuf::from("/srv/inkwell/plugins"));
        assert_eq!(raw.coordinator.override_rate, Some(false));
    }

    #[test]
    fn test_plugin_dir_defaults_under_config_dir() {
        let raw = RawInkwellConfig::default();
        assert!(raw.plugin_dir().ends_with("inkwell/plugins"));
    }
}
