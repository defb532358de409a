//! Device registry client trait

use async_trait::async_trait;

use super::error::DeviceClientError;
use super::types::{DeviceRecord, DeviceUpdate, ModelRecord, NewScreen, ScreenRecord};

/// Thin I/O boundary to the service that owns device, model and screen records.
///
/// Implementations must bound every call with a timeout so a slow registry
/// cannot wedge the coordinator.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Fetch a device record
    async fn get_device(&self, id: &str) -> Result<DeviceRecord, DeviceClientError>;

    /// Update mutable device fields
    async fn update_device(&self, id: &str, update: DeviceUpdate)
    -> Result<(), DeviceClientError>;

    /// Fetch a device model
    async fn get_model(&self, id: &str) -> Result<ModelRecord, DeviceClientError>;

    /// List all screens
    async fn get_screens(&self) -> Result<Vec<ScreenRecord>, DeviceClientError>;

    /// Create a screen, returning its id
    async fn add_screen(&self, screen: NewScreen) -> Result<String, DeviceClientError>;

    /// Delete a screen
    async fn remove_screen(&self, id: &str) -> Result<(), DeviceClientError>;

    /// Append a screen to a playlist
    async fn add_screen_to_playlist(
        &self,
        playlist_id: &str,
        screen_id: &str,
    ) -> Result<(), DeviceClientError>;
}
