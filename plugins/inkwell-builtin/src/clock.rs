//! Date and time face
//!
//! ```json
//! { "enabled": true, "config": { "time_format": "%H:%M", "utc_offset_minutes": 60 } }
//! ```
//!
//! Formats are `strftime` strings, checked in `on_start`; an invalid format
//! excludes the plugin.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use serde::Deserialize;

use inkwell_plugin_api::{Canvas, FromInit, Plugin, PluginContext, PluginError, PluginInit};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub time_format: String,
    pub date_format: String,
    /// Offset from UTC for the displayed time
    pub utc_offset_minutes: i32,
    /// Draw a frame around the face
    pub border: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            time_format: "%H:%M".to_string(),
            date_format: "%A %d %B %Y".to_string(),
            utc_offset_minutes: 0,
            border: true,
        }
    }
}

pub struct ClockPlugin {
    config: ClockConfig,
    offset: Option<FixedOffset>,
    now: fn() -> DateTime<Utc>,
}

impl ClockPlugin {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            offset: None,
            now: Utc::now,
        }
    }

    /// Replace the time source
    #[must_use]
    pub fn with_time_source(mut self, now: fn() -> DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Formatted (time, date) for `at`
    pub fn format(&self, at: DateTime<Utc>) -> (String, String) {
        let offset = self.offset.unwrap_or_else(|| Utc.fix());
        let local = at.with_timezone(&offset);
        (
            local.format(&self.config.time_format).to_string(),
            local.format(&self.config.date_format).to_string(),
        )
    }
}

fn check_format(field: &str, format: &str) -> Result<(), PluginError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(PluginError::config(format!(
            "{field} '{format}' is not a valid strftime format"
        )));
    }
    Ok(())
}

impl Plugin for ClockPlugin {
    fn on_start(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        check_format("time_format", &self.config.time_format)?;
        check_format("date_format", &self.config.date_format)?;

        let offset = FixedOffset::east_opt(self.config.utc_offset_minutes.saturating_mul(60))
            .ok_or_else(|| {
                PluginError::config(format!(
                    "utc_offset_minutes {} is out of range",
                    self.config.utc_offset_minutes
                ))
            })?;
        self.offset = Some(offset);
        tracing::debug!(plugin = %ctx.name, %offset, "Clock configured");
        Ok(())
    }

    fn draw(&mut self, canvas: &mut Canvas, _ctx: &PluginContext) -> Result<(), PluginError> {
        let (time, date) = self.format((self.now)());
        let size = canvas.size();
        let center = Point::new(size.width as i32 / 2, size.height as i32 / 2);

        if self.config.border && size.width > 8 && size.height > 8 {
            let _ = Rectangle::new(Point::new(2, 2), Size::new(size.width - 4, size.height - 4))
                .into_styled(PrimitiveStyle::with_stroke(Rgb888::BLACK, 2))
                .draw(canvas);
        }

        let centered = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Bottom)
            .build();
        let _ = Text::with_text_style(
            &time,
            center,
            MonoTextStyle::new(&FONT_10X20, Rgb888::BLACK),
            centered,
        )
        .draw(canvas);

        let below = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build();
        let _ = Text::with_text_style(
            &date,
            center + Point::new(0, 6),
            MonoTextStyle::new(&FONT_6X10, Rgb888::BLACK),
            below,
        )
        .draw(canvas);

        Ok(())
    }
}

impl FromInit for ClockPlugin {
    fn from_init(init: &PluginInit) -> Result<Self, PluginError> {
        Ok(Self::new(init.config_as()?))
    }
}
