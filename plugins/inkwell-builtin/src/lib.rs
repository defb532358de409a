//! inkwell-builtin - plugins that ship with inkwell
//!
//! | Entry     | Plugin              |
//! |-----------|---------------------|
//! | `clock`   | [`ClockPlugin`]     |
//! | `message` | [`MessagePlugin`]   |
//!
//! A plugin directory selects one of these with `entry = "<name>"` in its
//! `plugin.toml`.

pub mod clock;
pub mod message;
mod text;

pub use clock::{ClockConfig, ClockPlugin};
pub use message::{MessageConfig, MessagePlugin};

use inkwell_plugin_api::{PluginCatalog, PluginError};

/// Register every built-in plugin
pub fn register_builtins(catalog: &mut PluginCatalog) -> Result<(), PluginError> {
    catalog.register_type::<ClockPlugin>("clock")?;
    catalog.register_type::<MessagePlugin>("message")?;
    Ok(())
}

/// A catalog holding only the built-ins
pub fn builtin_catalog() -> Result<PluginCatalog, PluginError> {
    let mut catalog = PluginCatalog::new();
    register_builtins(&mut catalog)?;
    Ok(catalog)
}
