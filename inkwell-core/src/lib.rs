//! inkwell-core: runtime for an intermittently connected e-ink display
//!
//! - **Device client** - [`DeviceClient`] trait with [`HttpDeviceClient`] and
//!   the scriptable [`MockDeviceClient`]
//! - **Plugins** - [`discover`] and [`PluginRegistry`] for crash-contained
//!   plugin execution
//! - **Publishing** - [`ScreenPublisher`] keeps one live screen per plugin
//! - **Coordination** - [`Coordinator`] predicts the device's next refresh
//!   and runs [`PluginRuntime`] just ahead of it
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  poll   ┌──────────────┐
//! │ Coordinator│────────►│ DeviceClient │◄──────────┐
//! └─────┬──────┘         └──────────────┘           │
//!       │ run_cycle                                 │ screens
//! ┌─────▼───────┐ render ┌────────────────┐ ┌───────┴────────┐
//! │PluginRuntime├───────►│ PluginRegistry │ │ ScreenPublisher│
//! └─────┬───────┘        └────────────────┘ └───────▲────────┘
//!       └───────────────────── publish ─────────────┘
//! ```

pub mod bootstrap;
pub mod clock;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod plugins;
pub mod publisher;
pub mod runtime;

// Re-export key types for convenience
pub use bootstrap::{Bootstrap, bootstrap};
pub use clock::{Clock, SystemClock, TokioClock};
pub use coordinator::{
    BeliefState, Coordinator, CoordinatorConfig, CoordinatorError, CoordinatorEvent, CycleReason,
    CycleReport, MIN_REFRESH_RATE, RateOverride, RefreshCycle, SyncState, identify,
};
pub use device::{
    DeviceClient, DeviceClientError, DeviceProfile, DeviceRecord, HttpClientConfig,
    HttpDeviceClient, MockDeviceClient, ModelRecord, ScreenRecord,
};
pub use error::InkwellError;
pub use plugins::{PluginDescriptor, PluginInfo, PluginRegistry, PluginState, RegistryError, discover};
pub use publisher::{PublishError, PublishTarget, ScreenPublisher};
pub use runtime::{DEFAULT_RENDER_TIMEOUT, PluginCycle, PluginRuntime};
