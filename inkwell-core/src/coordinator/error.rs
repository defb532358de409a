//! Coordinator errors

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::device::DeviceClientError;

/// Fatal coordinator conditions.
///
/// Transient poll failures never surface here; they are logged and retried.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Device '{device}' unreachable: {source}")]
    DeviceUnreachable {
        device: String,
        #[source]
        source: DeviceClientError,
    },

    #[error("Device refresh rate {seconds}s is below the {floor}s minimum")]
    RefreshRateTooLow { seconds: u64, floor: u64 },

    #[error("Invalid device geometry: {0}")]
    InvalidGeometry(String),

    #[error("A coordinator is already running for device '{device}' (pid {pid})")]
    AlreadyRunning { device: String, pid: u32 },

    #[error("Invalid coordinator configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to manage lock file {path}: {source}")]
    LockIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoordinatorError {
    pub(crate) fn rate_too_low(rate: Duration, floor: Duration) -> Self {
        Self::RefreshRateTooLow {
            seconds: rate.as_secs(),
            floor: floor.as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_too_low_display() {
        let err = CoordinatorError::rate_too_low(Duration::from_secs(30), Duration::from_secs(60));
        assert_eq!(
            err.to_string(),
            "Device refresh rate 30s is below the 60s minimum"
        );
    }

    #[test]
    fn test_already_running_display() {
        let err = CoordinatorError::AlreadyRunning {
            device: "7".into(),
            pid: 4242,
        };
        assert!(err.to_string().contains("pid 4242"));
    }

    #[test]
    fn test_unreachable_keeps_source() {
        use std::error::Error;
        let err = CoordinatorError::DeviceUnreachable {
            device: "7".into(),
            source: DeviceClientError::Timeout,
        };
        assert_eq!(err.source().unwrap().to_string(), "Request timed out");
    }
}
