//! Plugin types passed across the render contract

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Fixed canvas dimensions for a plugin instance.
///
/// Never zero in either axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Create dimensions, rejecting zero-sized canvases
    pub fn new(width: u32, height: u32) -> Result<Self, PluginError> {
        if width == 0 || height == 0 {
            return Err(PluginError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Derive canvas dimensions from a device model's panel geometry.
    ///
    /// Width and height are swapped when the panel is mounted at an odd
    /// multiple of 90 degrees.
    pub fn from_model(width: u32, height: u32, rotation: i32) -> Result<Self, PluginError> {
        if is_odd_quarter_turn(rotation) {
            Self::new(height, width)
        } else {
            Self::new(width, height)
        }
    }

    /// Total pixel count
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// True for 90, 270, -90, 450, ... degrees
pub fn is_odd_quarter_turn(rotation: i32) -> bool {
    (rotation.rem_euclid(360) / 90) % 2 == 1
}

/// Metadata about the managed device, handed to every plugin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMetadata {
    /// Device record id
    pub id: String,
    /// Human-facing device identifier, used in screen names
    pub friendly_id: String,
    /// Device model record id
    pub model_id: String,
    /// Panel rotation in degrees
    pub rotation: i32,
}

/// Everything a plugin constructor receives
#[derive(Debug, Clone)]
pub struct PluginInit {
    /// Plugin name (directory-derived, unique)
    pub name: String,
    /// Canvas dimensions for the lifetime of the instance
    pub dimensions: Dimensions,
    /// Opaque `config` object from the plugin's `config.json`
    pub config: serde_json::Value,
    /// Device the plugin renders for
    pub device: DeviceMetadata,
}

impl PluginInit {
    /// Deserialize the opaque config payload into a typed struct
    pub fn config_as<T: DeserializeOwned>(&self) -> Result<T, PluginError> {
        serde_json::from_value(self.config.clone())
            .map_err(|e| PluginError::config(format!("{}: {}", self.name, e)))
    }

    /// Context handed to lifecycle hooks and `draw`
    pub fn context(&self) -> PluginContext {
        PluginContext {
            name: self.name.clone(),
            dimensions: self.dimensions,
            device: self.device.clone(),
        }
    }
}

/// Read-only context for lifecycle hooks and drawing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginContext {
    pub name: String,
    pub dimensions: Dimensions,
    pub device: DeviceMetadata,
}

impl PluginContext {
    /// Stable screen identity for this plugin on this device
    pub fn stable_name(&self) -> String {
        format!("{}_{}", self.name, self.device.friendly_id)
    }
}
