//! Device-synchronized refresh coordinator
//!
//! The device decides when it wakes and fetches content; the coordinator
//! only sees its last-refresh timestamp and refresh rate through polling.
//! From those it predicts the next refresh and triggers a render cycle one
//! safety margin ahead of it.
//!
//! ```text
//! Unsynced ─► WaitingForRefresh ─► SteadyState ─► Refreshing ─┬─► SteadyState
//!                   ▲                                         │
//!                   └──────────────── Disconnected ◄──────────┘
//! ```
//!
//! - [`Coordinator`]: the state machine
//! - [`RefreshCycle`]: what it triggers (see [`crate::PluginRuntime`])
//! - [`RateOverride`]: scoped temporary refresh-rate change used in recovery
//! - [`CoordinatorLease`]: at most one coordinator per device

mod belief;
mod config;
mod error;
mod lease;
mod machine;
mod override_guard;
mod state;

pub use belief::{BeliefState, Observation, RefreshPlan, plan};
pub use config::{CoordinatorConfig, MIN_REFRESH_RATE};
pub use error::CoordinatorError;
pub use lease::{CoordinatorLease, is_process_alive, lock_path, read_lock_pid};
pub use machine::{CYCLE_SHUTDOWN_GRACE, Coordinator, RefreshCycle, identify};
pub use override_guard::RateOverride;
pub use state::{CoordinatorEvent, CycleReason, CycleReport, SyncState};
