//! Error types for inkwell-core

use thiserror::Error;

pub use crate::coordinator::CoordinatorError;
pub use crate::device::DeviceClientError;
pub use crate::plugins::RegistryError;
pub use crate::publisher::PublishError;

/// Top-level error type for inkwell-core
#[derive(Error, Debug)]
pub enum InkwellError {
    #[error("Plugin registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Device client error: {0}")]
    Device(#[from] DeviceClientError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_registry_error() {
        let err: InkwellError = RegistryError::PluginDirNotFound {
            path: "/nope".into(),
        }
        .into();
        assert!(err.to_string().starts_with("Plugin registry error:"));
    }

    #[test]
    fn test_wraps_coordinator_error() {
        let err: InkwellError = CoordinatorError::InvalidConfig("bad".into()).into();
        assert!(matches!(err, InkwellError::Coordinator(_)));
    }
}
