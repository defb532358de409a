//! `inkwell render`: draw one plugin once, straight to a PNG file

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;

use inkwell_builtin::builtin_catalog;
use inkwell_core::identify;
use inkwell_core::plugins::discover_all;
use inkwell_plugin_api::render::panic_message;
use inkwell_plugin_api::{
    DeviceMetadata, Dimensions, PluginCatalog, PluginInit, RenderOutcome, render,
};

use crate::config::{ConfigLoader, RawInkwellConfig};

/// Arguments for the render command
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Plugin directory name
    pub plugin: String,

    /// Output PNG path
    #[arg(short, long)]
    pub out: PathBuf,

    /// Canvas width (with --height, skips asking the device for its geometry)
    #[arg(long, requires = "height")]
    pub width: Option<u32>,

    /// Canvas height
    #[arg(long, requires = "width")]
    pub height: Option<u32>,
}

pub async fn run(args: RenderArgs, raw: RawInkwellConfig) -> Result<()> {
    let dir = raw.plugin_dir();
    let descriptor = discover_all(&dir)
        .with_context(|| format!("Failed to discover plugins in {}", dir.display()))?
        .into_iter()
        .find(|d| d.name == args.plugin);
    let Some(descriptor) = descriptor else {
        bail!("No plugin named '{}' in {}", args.plugin, dir.display());
    };

    let (dimensions, device) = match (args.width, args.height) {
        (Some(width), Some(height)) => (Dimensions::new(width, height)?, DeviceMetadata::default()),
        _ => {
            let config = ConfigLoader::finalize_from_env(raw)?;
            let client = super::connect(&config)?;
            let profile = identify(client.as_ref(), &config.device_id).await?;
            (profile.dimensions, profile.metadata())
        }
    };

    let init = PluginInit {
        name: descriptor.name.clone(),
        dimensions,
        config: descriptor.config.clone(),
        device,
    };
    let catalog = builtin_catalog()?;
    let entry = descriptor.entry.clone();
    let outcome = tokio::task::spawn_blocking(move || render_once(&entry, &catalog, &init))
        .await
        .context("Render task failed")?;

    std::fs::write(&args.out, &outcome.png)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    match &outcome.error {
        None => println!(
            "Rendered {} ({}) to {} in {:?}",
            descriptor.name,
            dimensions,
            args.out.display(),
            outcome.elapsed
        ),
        Some(error) => {
            eprintln!("Plugin {} failed: {}", descriptor.name, error);
            println!("Wrote fallback image to {}", args.out.display());
        }
    }
    Ok(())
}

/// Construct, start, draw and stop a plugin. Any failure yields the fallback image.
fn render_once(entry: &str, catalog: &PluginCatalog, init: &PluginInit) -> RenderOutcome {
    let ctx = init.context();
    let Some(factory) = catalog.get(entry) else {
        return RenderOutcome::failed(&ctx, format!("Unknown plugin entry: {entry}"));
    };

    let mut plugin = match std::panic::catch_unwind(AssertUnwindSafe(|| factory(init))) {
        Ok(Ok(plugin)) => plugin,
        Ok(Err(e)) => return RenderOutcome::failed(&ctx, e.to_string()),
        Err(payload) => {
            return RenderOutcome::failed(&ctx, format!("panic: {}", panic_message(payload.as_ref())));
        }
    };

    match std::panic::catch_unwind(AssertUnwindSafe(|| plugin.on_start(&ctx))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return RenderOutcome::failed(&ctx, e.to_string()),
        Err(payload) => {
            return RenderOutcome::failed(&ctx, format!("panic: {}", panic_message(payload.as_ref())));
        }
    }

    let outcome = render(plugin.as_mut(), &ctx);
    if let Err(e) = plugin.on_stop() {
        tracing::warn!(plugin = %ctx.name, error = %e, "Plugin on_stop returned error");
    }
    outcome
}
