//! Device registry boundary
//!
//! - [`DeviceClient`]: the async trait the runtime talks to
//! - [`HttpDeviceClient`]: REST implementation with bounded timeouts
//! - [`MockDeviceClient`]: scriptable in-memory registry
//!
//! Only the device itself changes `updated_at` (by fetching content). The
//! runtime writes to the device record in exactly one place: the temporary
//! refresh-rate override used while resynchronizing.

mod client;
mod error;
mod http;
mod mock;
mod types;

pub use client::DeviceClient;
pub use error::DeviceClientError;
pub use http::{DEFAULT_TIMEOUT, HttpClientConfig, HttpDeviceClient};
pub use mock::{MockCall, MockDeviceClient};
pub use types::{DeviceProfile, DeviceRecord, DeviceUpdate, ModelRecord, NewScreen, ScreenRecord};
