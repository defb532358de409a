pub mod plugins;
pub mod render;
pub mod run;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use inkwell_core::{HttpClientConfig, HttpDeviceClient};

use crate::config::InkwellConfig;

/// Registry client for the configured API
pub fn connect(config: &InkwellConfig) -> Result<Arc<HttpDeviceClient>> {
    let client = HttpDeviceClient::new(HttpClientConfig {
        base_url: config.api.base_url.clone(),
        api_key: config.api.api_key.clone(),
        timeout: config.api.timeout,
    })
    .context("Failed to build device registry client")?;
    Ok(Arc::new(client))
}
