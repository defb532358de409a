//! Coordinator timing configuration

use std::path::PathBuf;
use std::time::Duration;

use super::error::CoordinatorError;

/// Lowest device refresh rate the drift window arithmetic supports
pub const MIN_REFRESH_RATE: Duration = Duration::from_secs(60);

/// Timing knobs for the refresh coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Lead time before the predicted refresh at which plugins render
    pub safety_margin: Duration,
    /// Tick between status polls while waiting for a refresh
    pub poll_interval: Duration,
    /// Delay after the predicted refresh before verifying it happened
    pub verify_grace: Duration,
    /// Temporarily shorten the device rate while resynchronizing
    pub override_rate: bool,
    /// Device rate used while resynchronizing
    pub recovery_rate: Duration,
    /// Directory for the per-device lock file; defaults to the state dir
    pub lock_dir: Option<PathBuf>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_secs(60),
            poll_interval: Duration::from_secs(30),
            verify_grace: Duration::from_secs(30),
            override_rate: true,
            recovery_rate: MIN_REFRESH_RATE,
            lock_dir: None,
        }
    }
}

impl CoordinatorConfig {
    #[must_use]
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.lock_dir.clone().unwrap_or_else(inkwell_paths::state_dir)
    }

    /// Reject timing combinations the state machine cannot honour.
    ///
    /// The poll tick must not exceed the safety margin, otherwise an
    /// imminent trigger could fire more than two margins early.
    pub fn validate(&self) -> Result<(), CoordinatorError> {
        if self.safety_margin.is_zero() {
            return Err(invalid("safety_margin must be positive"));
        }
        if self.poll_interval.is_zero() {
            return Err(invalid("poll_interval must be positive"));
        }
        if self.poll_interval > self.safety_margin {
            return Err(invalid(format!(
                "poll_interval ({}s) must not exceed safety_margin ({}s)",
                self.poll_interval.as_secs(),
                self.safety_margin.as_secs()
            )));
        }
        if self.verify_grace >= MIN_REFRESH_RATE {
            return Err(invalid(format!(
                "verify_grace ({}s) must be below {}s",
                self.verify_grace.as_secs(),
                MIN_REFRESH_RATE.as_secs()
            )));
        }
        if self.recovery_rate < MIN_REFRESH_RATE {
            return Err(CoordinatorError::rate_too_low(
                self.recovery_rate,
                MIN_REFRESH_RATE,
            ));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> CoordinatorError {
    CoordinatorError::InvalidConfig(reason.into())
}
