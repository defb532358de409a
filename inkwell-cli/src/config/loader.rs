use super::types::{
    ApiConfig, DEFAULT_RENDER_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, InkwellConfig, RawApiConfig,
    RawCoordinatorConfig, RawDeviceConfig, RawInkwellConfig, RawPluginsConfig,
};
use anyhow::{Context, Result, bail};
use inkwell_core::CoordinatorConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable holding the registry API key
pub const API_KEY_ENV: &str = "INKWELL_API_KEY";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged raw configuration (user, then project, then `explicit`)
    pub fn load(explicit: Option<&Path>) -> Result<RawInkwellConfig> {
        let mut layers = Vec::new();

        // Layer 1: User config
        let user_path = Self::user_config_path();
        if user_path.exists() {
            layers.push(user_path);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            layers.push(project_path);
        }

        // Layer 3: Explicit --config, which must exist
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            layers.push(path.to_path_buf());
        }

        Self::load_layers(&layers)
    }

    /// Merge the given files in order; later files win key by key
    pub fn load_layers(paths: &[PathBuf]) -> Result<RawInkwellConfig> {
        let mut raw = RawInkwellConfig::default();
        for path in paths {
            tracing::debug!(path = %path.display(), "Loading config layer");
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let layer: RawInkwellConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            raw = Self::merge_raw(raw, layer);
        }
        Ok(raw)
    }

    /// User config path (`$XDG_CONFIG_HOME/inkwell/config.toml`)
    pub fn user_config_path() -> PathBuf {
        inkwell_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with INKWELL_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("INKWELL_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".inkwell/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    pub fn merge_raw(base: RawInkwellConfig, overlay: RawInkwellConfig) -> RawInkwellConfig {
        RawInkwellConfig {
            api: RawApiConfig {
                base_url: overlay.api.base_url.or(base.api.base_url),
                api_key: overlay.api.api_key.or(base.api.api_key),
                timeout_secs: overlay.api.timeout_secs.or(base.api.timeout_secs),
            },
            device: RawDeviceConfig {
                id: overlay.device.id.or(base.device.id),
            },
            plugins: RawPluginsConfig {
                dir: overlay.plugins.dir.or(base.plugins.dir),
            },
            coordinator: RawCoordinatorConfig {
                safety_margin_secs: overlay
                    .coordinator
                    .safety_margin_secs
                    .or(base.coordinator.safety_margin_secs),
                poll_interval_secs: overlay
                    .coordinator
                    .poll_interval_secs
                    .or(base.coordinator.poll_interval_secs),
                verify_grace_secs: overlay
                    .coordinator
                    .verify_grace_secs
                    .or(base.coordinator.verify_grace_secs),
                override_rate: overlay
                    .coordinator
                    .override_rate
                    .or(base.coordinator.override_rate),
                recovery_rate_secs: overlay
                    .coordinator
                    .recovery_rate_secs
                    .or(base.coordinator.recovery_rate_secs),
                render_timeout_secs: overlay
                    .coordinator
                    .render_timeout_secs
                    .or(base.coordinator.render_timeout_secs),
            },
        }
    }

    /// Apply defaults and validate.
    ///
    /// `env_api_key` (from [`API_KEY_ENV`]) takes precedence over any file.
    pub fn finalize(raw: RawInkwellConfig, env_api_key: Option<String>) -> Result<InkwellConfig> {
        let base_url = raw
            .api
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .context("api.base_url is not set")?;
        let device_id = raw
            .device
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .context("device.id is not set")?;

        let defaults = CoordinatorConfig::default();
        let secs_or = |value: Option<u64>, default: Duration| {
            value.map(Duration::from_secs).unwrap_or(default)
        };
        let coordinator = CoordinatorConfig {
            safety_margin: secs_or(raw.coordinator.safety_margin_secs, defaults.safety_margin),
            poll_interval: secs_or(raw.coordinator.poll_interval_secs, defaults.poll_interval),
            verify_grace: secs_or(raw.coordinator.verify_grace_secs, defaults.verify_grace),
            override_rate: raw.coordinator.override_rate.unwrap_or(defaults.override_rate),
            recovery_rate: secs_or(raw.coordinator.recovery_rate_secs, defaults.recovery_rate),
            lock_dir: None,
        };
        coordinator
            .validate()
            .context("Invalid [coordinator] settings")?;

        let render_timeout = Duration::from_secs(
            raw.coordinator
                .render_timeout_secs
                .unwrap_or(DEFAULT_RENDER_TIMEOUT_SECS),
        );
        if render_timeout.is_zero() {
            bail!("coordinator.render_timeout_secs must be positive");
        }

        Ok(InkwellConfig {
            api: ApiConfig {
                base_url,
                api_key: env_api_key
                    .filter(|key| !key.is_empty())
                    .or(raw.api.api_key.clone()),
                timeout: Duration::from_secs(raw.api.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            },
            device_id,
            plugin_dir: raw.plugin_dir(),
            coordinator,
            render_timeout,
        })
    }

    /// [`finalize`](Self::finalize) with the API key taken from the environment
    pub fn finalize_from_env(raw: RawInkwellConfig) -> Result<InkwellConfig> {
        Self::finalize(raw, std::env::var(API_KEY_ENV).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn minimal() -> RawInkwellConfig {
        toml::from_str(
            r#"
[api]
base_url = "https://display.example.com"

[device]
id = "7"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_later_layer_overrides_only_set_keys() {
        let dir = TempDir::new().unwrap();
        let user = write(
            &dir,
            "user.toml",
            r#"
[api]
base_url = "https://user.example.com"
api_key = "user-key"

[coordinator]
safety_margin_secs = 90
poll_interval_secs = 45
"#,
        );
        let project = write(
            &dir,
            "project.toml",
            r#"
[api]
base_url = "https://project.example.com"

[device]
id = "abc"

[coordinator]
poll_interval_secs = 20
"#,
        );

        let raw = ConfigLoader::load_layers(&[user, project]).unwrap();

        assert_eq!(raw.api.base_url.as_deref(), Some("https://project.example.com"));
        assert_eq!(raw.api.api_key.as_deref(), Some("user-key"));
        assert_eq!(raw.device.id.as_deref(), Some("abc"));
        assert_eq!(raw.coordinator.safety_margin_secs, Some(90));
        assert_eq!(raw.coordinator.poll_interval_secs, Some(20));
    }

    #[test]
    fn test_invalid_toml_names_the_file() {
        let dir = TempDir::new().unwrap();
        let bad = write(&dir, "bad.toml", "[api\nbase_url = ");

        let err = ConfigLoader::load_layers(&[bad]).unwrap_err();
        assert!(format!("{err}").contains("bad.toml"));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let err = ConfigLoader::load(Some(Path::new("/nonexistent/inkwell.toml"))).unwrap_err();
        assert!(format!("{err}").contains("Config file not found"));
    }

    #[test]
    fn test_finalize_applies_defaults() {
        let config = ConfigLoader::finalize(minimal(), None).unwrap();

        assert_eq!(config.api.base_url, "https://display.example.com");
        assert_eq!(config.api.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.api.api_key.is_none());
        assert_eq!(config.device_id, "7");
        assert_eq!(config.coordinator, CoordinatorConfig::default());
        assert_eq!(
            config.render_timeout,
            Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_env_api_key_wins() {
        let mut raw = minimal();
        raw.api.api_key = Some("from-file".into());

        let config = ConfigLoader::finalize(raw.clone(), Some("from-env".into())).unwrap();
        assert_eq!(config.api.api_key.as_deref(), Some("from-env"));

        let config = ConfigLoader::finalize(raw, Some(String::new())).unwrap();
        assert_eq!(config.api.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_missing_required_keys_are_fatal() {
        let mut raw = minimal();
        raw.api.base_url = None;
        let err = ConfigLoader::finalize(raw, None).unwrap_err();
        assert!(format!("{err}").contains("api.base_url"));

        let mut raw = minimal();
        raw.device.id = Some("  ".into());
        let err = ConfigLoader::finalize(raw, None).unwrap_err();
        assert!(format!("{err}").contains("device.id"));
    }

    #[test]
    fn test_poll_interval_above_margin_rejected() {
        let mut raw = minimal();
        raw.coordinator.safety_margin_secs = Some(30);
        raw.coordinator.poll_interval_secs = Some(60);

        assert!(ConfigLoader::finalize(raw, None).is_err());
    }

    #[test]
    fn test_verify_grace_must_stay_below_floor() {
        let mut raw = minimal();
        raw.coordinator.verify_grace_secs = Some(60);

        assert!(ConfigLoader::finalize(raw, None).is_err());
    }

    #[test]
    fn test_sample_config_is_valid() {
        let raw: RawInkwellConfig =
            toml::from_str(include_str!("../../../demos/config.toml")).unwrap();
        let config = ConfigLoader::finalize(raw, None).unwrap();

        assert_eq!(config.device_id, "1");
        assert_eq!(config.plugin_dir, PathBuf::from("demos/plugins"));
        assert_eq!(config.coordinator, CoordinatorConfig::default());
    }

    #[test]
    fn test_zero_render_timeout_rejected() {
        let mut raw = minimal();
        raw.coordinator.render_timeout_secs = Some(0);

        assert!(ConfigLoader::finalize(raw, None).is_err());
    }
}
