//! Temporary device refresh-rate override
//!
//! While resynchronizing, the coordinator may shorten the device's refresh
//! rate so a confirmed refresh shows up quickly. [`RateOverride`] owns that
//! change: [`RateOverride::restore`] writes the original rate back and only
//! marks the guard restored once a write succeeds, so a failed restore can be
//! retried later. A guard dropped while still owed spawns a best-effort
//! restore.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::device::{DeviceClient, DeviceClientError, DeviceUpdate};

const RESTORE_ATTEMPTS: u32 = 3;
const RESTORE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// An applied refresh-rate override that must be restored
#[must_use = "dropping the guard restores the rate in the background"]
pub struct RateOverride {
    client: Arc<dyn DeviceClient>,
    device_id: String,
    original: u64,
    temporary: u64,
    restored: bool,
}

impl std::fmt::Debug for RateOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateOverride")
            .field("device_id", &self.device_id)
            .field("original", &self.original)
            .field("temporary", &self.temporary)
            .field("restored", &self.restored)
            .finish()
    }
}

impl RateOverride {
    /// Set the device to `temporary` seconds, remembering `original`
    pub async fn apply(
        client: Arc<dyn DeviceClient>,
        device_id: &str,
        original: u64,
        temporary: u64,
    ) -> Result<Self, DeviceClientError> {
        client
            .update_device(
                device_id,
                DeviceUpdate {
                    refresh_rate: temporary,
                },
            )
            .await?;
        info!(device = %device_id, original, temporary, "Device refresh rate overridden");
        Ok(Self {
            client,
            device_id: device_id.to_string(),
            original,
            temporary,
            restored: false,
        })
    }

    pub fn original_secs(&self) -> u64 {
        self.original
    }

    pub fn temporary_secs(&self) -> u64 {
        self.temporary
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    /// Write the original rate back, retrying transient failures
    pub async fn restore(&mut self) -> Result<(), DeviceClientError> {
        let mut attempt = 1;
        loop {
            match self.try_restore().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < RESTORE_ATTEMPTS && e.is_transient() => {
                    warn!(device = %self.device_id, attempt, error = %e, "Failed to restore refresh rate, retrying");
                    tokio::time::sleep(RESTORE_RETRY_DELAY).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        device = %self.device_id,
                        rate = self.original,
                        error = %e,
                        "Failed to restore refresh rate; device left at temporary rate"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// A single restore attempt. Idempotent once a write has succeeded.
    pub async fn try_restore(&mut self) -> Result<(), DeviceClientError> {
        if self.restored {
            return Ok(());
        }
        self.client
            .update_device(
                &self.device_id,
                DeviceUpdate {
                    refresh_rate: self.original,
                },
            )
            .await?;
        self.restored = true;
        info!(device = %self.device_id, rate = self.original, "Device refresh rate restored");
        Ok(())
    }
}

impl Drop for RateOverride {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        warn!(device = %self.device_id, "Rate override dropped without restore");

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            error!(device = %self.device_id, rate = self.original, "No runtime to restore refresh rate");
            return;
        };
        let client = self.client.clone();
        let device_id = std::mem::take(&mut self.device_id);
        let update = DeviceUpdate {
            refresh_rate: self.original,
        };
        handle.spawn(async move {
            if let Err(e) = client.update_device(&device_id, update).await {
                error!(device = %device_id, error = %e, "Background refresh rate restore failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceRecord, MockDeviceClient};
    use chrono::Utc;

    fn mock() -> Arc<MockDeviceClient> {
        let mock = Arc::new(MockDeviceClient::new());
        mock.insert_device(DeviceRecord {
            id: "1".into(),
            friendly_id: "ABC".into(),
            refresh_rate: 900,
            updated_at: Utc::now(),
            playlist_id: None,
            model_id: "m".into(),
        });
        mock
    }

    #[tokio::test]
    async fn test_apply_then_restore() {
        let mock = mock();
        let mut guard = RateOverride::apply(mock.clone(), "1", 900, 60).await.unwrap();
        assert_eq!(mock.device("1").unwrap().refresh_rate, 60);

        guard.restore().await.unwrap();
        assert!(guard.is_restored());
        guard.restore().await.unwrap();
        assert_eq!(mock.rate_updates(), vec![60, 900]);
    }

    #[tokio::test]
    async fn test_failed_apply_changes_nothing() {
        let mock = mock();
        mock.fail_next(DeviceClientError::Timeout);
        assert!(RateOverride::apply(mock.clone(), "1", 900, 60).await.is_err());
        assert_eq!(mock.device("1").unwrap().refresh_rate, 900);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_retries_transient_failure() {
        let mock = mock();
        let mut guard = RateOverride::apply(mock.clone(), "1", 900, 60).await.unwrap();
        mock.fail_next(DeviceClientError::Timeout);

        guard.restore().await.unwrap();
        assert_eq!(mock.device("1").unwrap().refresh_rate, 900);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_restore_stays_owed() {
        let mock = mock();
        let mut guard = RateOverride::apply(mock.clone(), "1", 900, 60).await.unwrap();
        mock.fail_rate_updates(900, RESTORE_ATTEMPTS as usize);

        assert!(guard.restore().await.is_err());
        assert!(!guard.is_restored());
        assert_eq!(mock.device("1").unwrap().refresh_rate, 60);

        guard.try_restore().await.unwrap();
        assert!(guard.is_restored());
        assert_eq!(mock.device("1").unwrap().refresh_rate, 900);
    }

    #[tokio::test]
    async fn test_drop_restores_in_background() {
        let mock = mock();
        let guard = RateOverride::apply(mock.clone(), "1", 900, 60).await.unwrap();
        drop(guard);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(mock.rate_updates(), vec![60, 900]);
    }
}
