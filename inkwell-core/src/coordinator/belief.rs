//! Belief about the device's refresh timing, and the plan derived from it

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use super::config::CoordinatorConfig;
use crate::clock::same_instant;

/// What the coordinator currently believes about the device.
///
/// Held in memory only; a restarted process starts from [`BeliefState::unknown`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeliefState {
    /// Last refresh timestamp seen in any poll
    pub last_observed_refresh: Option<DateTime<Utc>>,
    /// A timestamp change is due by the next poll
    pub expecting_refresh_next_poll: bool,
    /// Rate the device was running at its last observed refresh
    pub interval: Duration,
    /// `last_observed_refresh` was seen to change, so predictions are valid
    pub synced: bool,
}

/// Result of comparing a polled timestamp against the belief
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Advanced { at: DateTime<Utc> },
    Unchanged,
}

impl BeliefState {
    pub fn unknown() -> Self {
        Self {
            last_observed_refresh: None,
            expecting_refresh_next_poll: false,
            interval: Duration::ZERO,
            synced: false,
        }
    }

    /// Belief right after a confirmed timestamp change
    pub fn synced(at: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            last_observed_refresh: Some(at),
            expecting_refresh_next_poll: false,
            interval,
            synced: true,
        }
    }

    /// Record a polled timestamp.
    ///
    /// Only a differing timestamp counts as a refresh; elapsed time alone
    /// never does.
    pub fn observe(&mut self, timestamp: DateTime<Utc>) -> Observation {
        match self.last_observed_refresh {
            Some(last) if same_instant(last, timestamp) => Observation::Unchanged,
            _ => {
                self.last_observed_refresh = Some(timestamp);
                self.expecting_refresh_next_poll = false;
                Observation::Advanced { at: timestamp }
            }
        }
    }

    /// Drop predictions until a fresh change is observed
    pub fn desync(&mut self) {
        self.synced = false;
        self.expecting_refresh_next_poll = false;
    }

    pub fn predicted_next(&self) -> Option<DateTime<Utc>> {
        if !self.synced {
            return None;
        }
        self.last_observed_refresh.map(|t| later(t, self.interval))
    }
}

/// When to render and when to verify for the next predicted refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPlan {
    pub predicted: DateTime<Utc>,
    pub trigger_at: DateTime<Utc>,
    pub verify_at: DateTime<Utc>,
    /// The trigger falls before the next poll tick could react; fire now
    pub imminent: bool,
}

/// Plan the next render cycle, or `None` without a synced belief
pub fn plan(
    belief: &BeliefState,
    config: &CoordinatorConfig,
    now: DateTime<Utc>,
) -> Option<RefreshPlan> {
    let predicted = belief.predicted_next()?;
    let trigger_at = earlier(predicted, config.safety_margin);
    Some(RefreshPlan {
        predicted,
        trigger_at,
        verify_at: later(predicted, config.verify_grace),
        imminent: trigger_at <= later(now, config.poll_interval),
    })
}

pub(crate) fn later(t: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|d| t.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub(crate) fn earlier(t: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(by)
        .ok()
        .and_then(|d| t.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
