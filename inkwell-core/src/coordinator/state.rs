//! Coordinator states and the events it broadcasts

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Synchronization state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No reliable belief about device timing
    Unsynced,
    /// Polling until the device's refresh timestamp changes
    WaitingForRefresh,
    /// Predicting and sleeping until the next trigger
    SteadyState,
    /// Rendering and verifying the predicted refresh
    Refreshing,
    /// An expected refresh did not happen
    Disconnected,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unsynced => "unsynced",
            Self::WaitingForRefresh => "waiting_for_refresh",
            Self::SteadyState => "steady_state",
            Self::Refreshing => "refreshing",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Why a render cycle ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleReason {
    /// First render after startup, before any sync
    Initial,
    /// Ahead of a predicted refresh
    Scheduled,
    /// After a missed refresh, in case the device is woken manually
    Defensive,
}

impl fmt::Display for CycleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::Scheduled => "scheduled",
            Self::Defensive => "defensive",
        };
        f.write_str(s)
    }
}

/// Summary of one render-and-publish cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Plugins whose image was published
    pub published: usize,
    /// Plugins that published the fallback error image
    pub fallbacks: usize,
    /// Plugins whose publish failed
    pub publish_failures: usize,
}

/// Notifications for observers of the coordinator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    StateChanged {
        from: SyncState,
        to: SyncState,
    },
    RenderTriggered {
        at: DateTime<Utc>,
        reason: CycleReason,
        predicted: Option<DateTime<Utc>>,
    },
    CycleCompleted {
        reason: CycleReason,
        report: CycleReport,
    },
    RefreshConfirmed {
        observed: DateTime<Utc>,
        next_predicted: DateTime<Utc>,
    },
    RefreshMissed {
        expected: DateTime<Utc>,
        last_observed: DateTime<Utc>,
    },
    RateOverridden {
        original_secs: u64,
        temporary_secs: u64,
    },
    RateRestored {
        original_secs: u64,
    },
    Recovered {
        observed: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_matches_serde() {
        for state in [
            SyncState::Unsynced,
            SyncState::WaitingForRefresh,
            SyncState::SteadyState,
            SyncState::Refreshing,
            SyncState::Disconnected,
        ] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    #[test]
    fn test_event_is_tagged() {
        let event = CoordinatorEvent::RateRestored { original_secs: 900 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "rate_restored");
        assert_eq!(json["original_secs"], 900);
    }
}
