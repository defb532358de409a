//! `inkwell status`: one-shot device report

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use inkwell_core::{BeliefState, DeviceClient, DeviceRecord, MIN_REFRESH_RATE, ModelRecord};

use crate::config::{ConfigLoader, RawInkwellConfig};

pub async fn run(raw: RawInkwellConfig) -> Result<()> {
    let config = ConfigLoader::finalize_from_env(raw)?;
    let client = super::connect(&config)?;

    let device = client
        .get_device(&config.device_id)
        .await
        .with_context(|| format!("Failed to fetch device {}", config.device_id))?;
    let model = match client.get_model(&device.model_id).await {
        Ok(model) => Some(model),
        Err(e) => {
            tracing::warn!(model = %device.model_id, error = %e, "Failed to fetch device model");
            None
        }
    };

    println!("{}", status_table(&device, model.as_ref(), Utc::now()));
    Ok(())
}

/// Next refresh assuming the device keeps its current rate
fn predicted_next(device: &DeviceRecord) -> Option<DateTime<Utc>> {
    BeliefState::synced(device.last_refresh_at(), device.refresh_interval()).predicted_next()
}

fn status_table(device: &DeviceRecord, model: Option<&ModelRecord>, now: DateTime<Utc>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let rate = if device.refresh_interval() < MIN_REFRESH_RATE {
        Cell::new(format!("{}s (below {}s floor)", device.refresh_rate, MIN_REFRESH_RATE.as_secs()))
            .fg(Color::Red)
    } else {
        Cell::new(format!("{}s", device.refresh_rate))
    };

    let next = match predicted_next(device) {
        Some(at) if at >= now => Cell::new(format!("{} (in {}s)", at.to_rfc3339(), (at - now).num_seconds())),
        Some(at) => Cell::new(format!("{} (overdue by {}s)", at.to_rfc3339(), (now - at).num_seconds()))
            .fg(Color::Yellow),
        None => Cell::new("unknown"),
    };

    let panel = model.map_or_else(
        || "unknown".to_string(),
        |m| format!("{}x{} @ {}°", m.width, m.height, m.rotation),
    );

    table.add_row(vec![Cell::new("Device").fg(Color::Cyan), Cell::new(&device.id)]);
    table.add_row(vec![Cell::new("Friendly id").fg(Color::Cyan), Cell::new(&device.friendly_id)]);
    table.add_row(vec![Cell::new("Panel").fg(Color::Cyan), Cell::new(panel)]);
    table.add_row(vec![
        Cell::new("Playlist").fg(Color::Cyan),
        Cell::new(device.playlist_id.as_deref().unwrap_or("none")),
    ]);
    table.add_row(vec![Cell::new("Refresh rate").fg(Color::Cyan), rate]);
    table.add_row(vec![
        Cell::new("Last refresh").fg(Color::Cyan),
        Cell::new(device.last_refresh_at().to_rfc3339()),
    ]);
    table.add_row(vec![Cell::new("Next refresh").fg(Color::Cyan), next]);
    table
}
