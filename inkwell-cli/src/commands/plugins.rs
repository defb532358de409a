//! `inkwell plugins`: list what discovery would find

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use inkwell_builtin::builtin_catalog;
use inkwell_core::plugins::{PluginDescriptor, discover_all};
use inkwell_plugin_api::PluginCatalog;

use crate::config::RawInkwellConfig;

pub fn run(raw: &RawInkwellConfig) -> Result<()> {
    let dir = raw.plugin_dir();
    let plugins = discover_all(&dir)
        .with_context(|| format!("Failed to discover plugins in {}", dir.display()))?;

    if plugins.is_empty() {
        println!("No plugins installed");
        println!();
        println!("Plugin directory: {}", dir.display());
        println!();
        println!("To add a plugin:");
        println!("  1. Create a directory: mkdir -p {}/my-clock", dir.display());
        println!("  2. Add plugin.toml:     entry = \"clock\"");
        println!("  3. Add config.json:     {{\"enabled\": true, \"config\": {{}}}}");
        return Ok(());
    }

    let catalog = builtin_catalog()?;
    println!("{}", table(&plugins, &catalog));
    Ok(())
}

fn table(plugins: &[PluginDescriptor], catalog: &PluginCatalog) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Plugin").fg(Color::Cyan),
        Cell::new("Entry").fg(Color::Cyan),
        Cell::new("Enabled").fg(Color::Cyan),
    ]);

    for plugin in plugins {
        let entry = if catalog.contains(&plugin.entry) {
            Cell::new(&plugin.entry)
        } else {
            Cell::new(format!("{} (unknown)", plugin.entry)).fg(Color::Red)
        };
        let enabled = if plugin.enabled { "yes" } else { "no" };

        table.add_row(vec![Cell::new(&plugin.name), entry, Cell::new(enabled)]);
    }
    table
}
