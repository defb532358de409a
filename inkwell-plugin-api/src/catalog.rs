//! Compile-time plugin registration table
//!
//! Plugin directories name an `entry` in their `plugin.toml`; the registry
//! resolves that entry here. Registering a type is all it takes for a
//! dropped-in plugin directory to run.

use std::collections::BTreeMap;

use crate::error::PluginError;
use crate::types::PluginInit;
use crate::{FromInit, Plugin};

/// Constructor stored in the catalog
pub type PluginFactory = fn(&PluginInit) -> Result<Box<dyn Plugin>, PluginError>;

/// Maps entry names to plugin constructors
#[derive(Default, Clone)]
pub struct PluginCatalog {
    entries: BTreeMap<String, PluginFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw constructor under `entry`
    pub fn register(&mut self, entry: &str, factory: PluginFactory) -> Result<(), PluginError> {
        if self.entries.contains_key(entry) {
            return Err(PluginError::DuplicateEntry(entry.to_string()));
        }
        self.entries.insert(entry.to_string(), factory);
        Ok(())
    }

    /// Register a plugin type under `entry`
    pub fn register_type<P>(&mut self, entry: &str) -> Result<(), PluginError>
    where
        P: FromInit + 'static,
    {
        self.register(entry, construct::<P>)
    }

    /// Look up the constructor for `entry`
    pub fn get(&self, entry: &str) -> Option<PluginFactory> {
        self.entries.get(entry).copied()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains_key(entry)
    }

    /// Registered entry names, sorted
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

fn construct<P: FromInit + 'static>(init: &PluginInit) -> Result<Box<dyn Plugin>, PluginError> {
    Ok(Box::new(P::from_init(init)?))
}
