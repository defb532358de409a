//! Fail-fast startup: take the device lease, identify the device, then
//! discover, load and start plugins
//!
//! Every step before [`PluginRegistry::start`] is fatal on error, so a
//! misconfigured installation never schedules a partial plugin set and a
//! second instance for the same device never starts a plugin.

use std::path::Path;
use std::sync::Arc;

use inkwell_plugin_api::PluginCatalog;

use crate::coordinator::{CoordinatorLease, identify};
use crate::device::{DeviceClient, DeviceProfile};
use crate::error::InkwellError;
use crate::plugins::{PluginRegistry, discover};

/// A device profile and its started plugins
pub struct Bootstrap {
    /// Hand to [`Coordinator::run_with_lease`](crate::Coordinator::run_with_lease)
    pub lease: CoordinatorLease,
    pub profile: DeviceProfile,
    pub registry: Arc<PluginRegistry>,
}

pub async fn bootstrap(
    client: &dyn DeviceClient,
    device_id: &str,
    plugin_dir: &Path,
    catalog: &PluginCatalog,
    lock_dir: &Path,
) -> Result<Bootstrap, InkwellError> {
    let lease = CoordinatorLease::acquire(device_id, lock_dir)?;
    let profile = identify(client, device_id).await?;
    tracing::info!(
        device = %profile.device.id,
        friendly_id = %profile.device.friendly_id,
        dimensions = %profile.dimensions,
        rate = profile.device.refresh_rate,
        "Device identified"
    );

    let descriptors = discover(plugin_dir)?;
    let registry = PluginRegistry::load(
        descriptors,
        catalog,
        &profile.metadata(),
        profile.dimensions,
    )?;
    registry.start();
    tracing::info!(
        loaded = registry.plugin_count(),
        active = registry.active().len(),
        "Plugins started"
    );

    Ok(Bootstrap {
        lease,
        profile,
        registry: Arc::new(registry),
    })
}
