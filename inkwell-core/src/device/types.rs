//! Records exchanged with the device registry

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use inkwell_plugin_api::{DeviceMetadata, Dimensions, PluginError};

/// A device as reported by the registry.
///
/// `updated_at` is the device's last refresh; it changes only when the device
/// itself fetches new content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub friendly_id: String,
    /// Seconds between device wake-ups
    pub refresh_rate: u64,
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub playlist_id: Option<String>,
    #[serde(deserialize_with = "de_id")]
    pub model_id: String,
}

impl DeviceRecord {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_rate)
    }

    /// Last refresh timestamp
    pub fn last_refresh_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Panel geometry of a device model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub rotation: i32,
}

/// A published screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Payload for creating a screen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewScreen {
    /// Base64-encoded PNG
    pub content: String,
    pub name: String,
    pub label: String,
    pub file_name: String,
    pub model_id: String,
}

/// Partial device update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceUpdate {
    pub refresh_rate: u64,
}

/// Everything the runtime learns about its device at startup
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub device: DeviceRecord,
    pub model: ModelRecord,
    pub dimensions: Dimensions,
}

impl DeviceProfile {
    pub fn new(device: DeviceRecord, model: ModelRecord) -> Result<Self, PluginError> {
        let dimensions = Dimensions::from_model(model.width, model.height, model.rotation)?;
        Ok(Self {
            device,
            model,
            dimensions,
        })
    }

    pub fn metadata(&self) -> DeviceMetadata {
        DeviceMetadata {
            id: self.device.id.clone(),
            friendly_id: self.device.friendly_id.clone(),
            model_id: self.device.model_id.clone(),
            rotation: self.model.rotation,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Registries disagree on numeric vs string ids; accept both
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn de_opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<RawId>::deserialize(deserializer).map(|id| id.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_record_accepts_numeric_ids() {
        let json = r#"{
            "id": 7,
            "friendly_id": "A1B2C3",
            "refresh_rate": 900,
            "updated_at": "2026-03-01T10:00:00.250Z",
            "playlist_id": 3,
            "model_id": "og"
        }"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.id, "7");
        assert_eq!(device.playlist_id.as_deref(), Some("3"));
        assert_eq!(device.model_id, "og");
        assert_eq!(device.refresh_interval(), Duration::from_secs(900));
        assert_eq!(device.updated_at.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_device_record_null_playlist() {
        let json = r#"{
            "id": "7",
            "friendly_id": "A1B2C3",
            "refresh_rate": 900,
            "updated_at": "2026-03-01T10:00:00Z",
            "playlist_id": null,
            "model_id": 1
        }"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert!(device.playlist_id.is_none());
    }

    #[test]
    fn test_profile_swaps_rotated_geometry() {
        let device = DeviceRecord {
            id: "1".into(),
            friendly_id: "F".into(),
            refresh_rate: 300,
            updated_at: Utc::now(),
            playlist_id: None,
            model_id: "m".into(),
        };
        let model = ModelRecord {
            id: "m".into(),
            width: 800,
            height: 480,
            rotation: 90,
        };
        let profile = DeviceProfile::new(device, model).unwrap();
        assert_eq!((profile.dimensions.width, profile.dimensions.height), (480, 800));
        assert_eq!(profile.metadata().rotation, 90);
    }

    #[test]
    fn test_profile_rejects_zero_geometry() {
        let device = DeviceRecord {
            id: "1".into(),
            friendly_id: "F".into(),
            refresh_rate: 300,
            updated_at: Utc::now(),
            playlist_id: None,
            model_id: "m".into(),
        };
        let model = ModelRecord {
            id: "m".into(),
            width: 0,
            height: 480,
            rotation: 0,
        };
        assert!(DeviceProfile::new(device, model).is_err());
    }
}
