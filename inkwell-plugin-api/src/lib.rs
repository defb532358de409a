//! inkwell-plugin-api - the render contract for inkwell display plugins
//!
//! A plugin paints one image per refresh cycle onto a fixed-size, white
//! [`Canvas`]. The host handles everything else: failures inside
//! [`Plugin::draw`] (returned errors and panics alike) become a fallback error
//! image, so a broken plugin is visible on the device itself.
//!
//! # Example
//!
//! ```ignore
//! use inkwell_plugin_api::{Canvas, FromInit, Plugin, PluginCatalog, PluginContext, PluginError, PluginInit};
//!
//! pub struct Hello;
//!
//! impl Plugin for Hello {
//!     fn draw(&mut self, canvas: &mut Canvas, ctx: &PluginContext) -> Result<(), PluginError> {
//!         // draw with embedded-graphics
//!         Ok(())
//!     }
//! }
//!
//! impl FromInit for Hello {
//!     fn from_init(_init: &PluginInit) -> Result<Self, PluginError> {
//!         Ok(Hello)
//!     }
//! }
//!
//! let mut catalog = PluginCatalog::new();
//! catalog.register_type::<Hello>("hello")?;
//! ```

pub mod canvas;
pub mod catalog;
pub mod error;
pub mod fallback;
pub mod render;
pub mod types;

pub use canvas::Canvas;
pub use catalog::{PluginCatalog, PluginFactory};
pub use error::PluginError;
pub use render::{RenderOutcome, encode_png, error_image, render, render_to_base64};
pub use types::*;

/// The render contract every plugin implements.
///
/// Lifecycle hooks default to no-ops; only `draw` is required.
pub trait Plugin: Send {
    /// Called once at registry startup. Acquire external resources here.
    ///
    /// An error excludes the plugin from scheduling.
    fn on_start(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called once at shutdown for plugins whose `on_start` succeeded
    fn on_stop(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Paint onto `canvas`, which is pre-filled white and sized to `ctx.dimensions`
    fn draw(&mut self, canvas: &mut Canvas, ctx: &PluginContext) -> Result<(), PluginError>;
}

/// Construction from the registry's init payload
pub trait FromInit: Plugin + Sized {
    fn from_init(init: &PluginInit) -> Result<Self, PluginError>;
}
