//! Screen publishing
//!
//! Each plugin owns exactly one live screen per device, identified by the
//! stable prefix `<plugin>_<friendly_id>`. Publishing deletes every screen
//! under that prefix, then creates the replacement with a fresh time-ordered
//! suffix and attaches it to the device's playlist.
//!
//! Calls for different plugins touch disjoint prefixes and may run
//! concurrently. Two concurrent publishes for the same plugin are not
//! supported; the refresh cycle never issues them.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use uuid::Uuid;

use crate::device::{DeviceClient, DeviceClientError, DeviceRecord, NewScreen, ScreenRecord};

/// Errors from publishing a screen
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Device has no playlist to publish into")]
    NoPlaylist,

    #[error("Failed to list screens: {0}")]
    List(#[source] DeviceClientError),

    #[error("Failed to remove previous screen {screen_id}: {source}")]
    Remove {
        screen_id: String,
        #[source]
        source: DeviceClientError,
    },

    #[error("Failed to create screen: {0}")]
    Create(#[source] DeviceClientError),

    #[error("Failed to attach screen {screen_id} to playlist: {source}")]
    Attach {
        screen_id: String,
        #[source]
        source: DeviceClientError,
    },
}

/// Where screens are published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub device_id: String,
    pub friendly_id: String,
    pub model_id: String,
    pub playlist_id: Option<String>,
}

impl From<&DeviceRecord> for PublishTarget {
    fn from(device: &DeviceRecord) -> Self {
        Self {
            device_id: device.id.clone(),
            friendly_id: device.friendly_id.clone(),
            model_id: device.model_id.clone(),
            playlist_id: device.playlist_id.clone(),
        }
    }
}

/// Stable identity of a plugin's screen on a device
pub fn stable_name(plugin_name: &str, friendly_id: &str) -> String {
    format!("{plugin_name}_{friendly_id}")
}

/// True if `screen_name` belongs to `stable` (exactly, or `stable` + `_suffix`)
pub fn belongs_to(screen_name: &str, stable: &str) -> bool {
    screen_name
        .strip_prefix(stable)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
}

#[derive(Clone)]
pub struct ScreenPublisher {
    client: Arc<dyn DeviceClient>,
}

impl ScreenPublisher {
    pub fn new(client: Arc<dyn DeviceClient>) -> Self {
        Self { client }
    }

    /// Replace the plugin's screen with `png`, returning the new screen id
    pub async fn publish(
        &self,
        plugin_name: &str,
        target: &PublishTarget,
        png: &[u8],
    ) -> Result<String, PublishError> {
        let playlist_id = target.playlist_id.as_deref().ok_or(PublishError::NoPlaylist)?;
        let stable = stable_name(plugin_name, &target.friendly_id);

        let stale: Vec<ScreenRecord> = self
            .client
            .get_screens()
            .await
            .map_err(PublishError::List)?
            .into_iter()
            .filter(|s| belongs_to(&s.name, &stable))
            .collect();

        for screen in stale {
            tracing::debug!(plugin = %plugin_name, screen = %screen.id, "Removing previous screen");
            match self.client.remove_screen(&screen.id).await {
                Ok(()) | Err(DeviceClientError::NotFound { .. }) => {}
                Err(source) => {
                    return Err(PublishError::Remove {
                        screen_id: screen.id,
                        source,
                    });
                }
            }
        }

        let name = format!("{stable}_{}", Uuid::now_v7().simple());
        let screen_id = self
            .client
            .add_screen(NewScreen {
                content: STANDARD.encode(png),
                file_name: format!("{name}.png"),
                name,
                label: plugin_name.to_string(),
                model_id: target.model_id.clone(),
            })
            .await
            .map_err(PublishError::Create)?;

        self.client
            .add_screen_to_playlist(playlist_id, &screen_id)
            .await
            .map_err(|source| PublishError::Attach {
                screen_id: screen_id.clone(),
                source,
            })?;

        tracing::info!(plugin = %plugin_name, device = %target.device_id, screen = %screen_id, "Screen published");
        Ok(screen_id)
    }
}
