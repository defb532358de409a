//! Render entry points: draw, encode, and convert failures into fallback images

use std::any::Any;
use std::io::Cursor;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ImageFormat;

use crate::Plugin;
use crate::canvas::Canvas;
use crate::error::PluginError;
use crate::fallback;
use crate::types::{Dimensions, PluginContext};

/// Result of one render: always carries well-formed PNG bytes
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    /// Encoded PNG (the plugin's drawing, or the fallback error image)
    pub png: Vec<u8>,
    /// Failure description when `png` is the fallback image
    pub error: Option<String>,
    /// Wall time spent drawing and encoding
    pub elapsed: Duration,
}

impl RenderOutcome {
    /// True when the plugin failed and `png` holds the error image
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }

    /// Standard-alphabet base64 of the PNG, as uploaded to the device registry
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }

    /// Build a fallback outcome without invoking the plugin at all
    pub fn failed(ctx: &PluginContext, message: impl Into<String>) -> Self {
        let started = Instant::now();
        let message = message.into();
        Self {
            png: error_image(ctx.dimensions, &ctx.name, &message),
            error: Some(message),
            elapsed: started.elapsed(),
        }
    }
}

/// Render a plugin onto a fresh white canvas.
///
/// Errors and panics from `draw` (or from encoding its output) are converted
/// into the fallback error image; this function itself never fails.
pub fn render(plugin: &mut dyn Plugin, ctx: &PluginContext) -> RenderOutcome {
    let started = Instant::now();
    let mut canvas = Canvas::new(ctx.dimensions);

    let drawn = std::panic::catch_unwind(AssertUnwindSafe(|| plugin.draw(&mut canvas, ctx)));

    let failure = match drawn {
        Ok(Ok(())) => match encode_png(&canvas) {
            Ok(png) => {
                return RenderOutcome {
                    png,
                    error: None,
                    elapsed: started.elapsed(),
                };
            }
            Err(e) => e.to_string(),
        },
        Ok(Err(e)) => e.to_string(),
        Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
    };

    tracing::debug!(plugin = %ctx.name, error = %failure, "Rendering fallback image");
    RenderOutcome {
        png: error_image(ctx.dimensions, &ctx.name, &failure),
        error: Some(failure),
        elapsed: started.elapsed(),
    }
}

/// Render and return the PNG as base64
pub fn render_to_base64(plugin: &mut dyn Plugin, ctx: &PluginContext) -> String {
    render(plugin, ctx).to_base64()
}

/// Encode a canvas as PNG
pub fn encode_png(canvas: &Canvas) -> Result<Vec<u8>, PluginError> {
    let mut bytes = Cursor::new(Vec::new());
    canvas
        .image()
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| PluginError::Encoding(e.to_string()))?;
    Ok(bytes.into_inner())
}

/// Encoded fallback error image
pub fn error_image(dimensions: Dimensions, plugin_name: &str, message: &str) -> Vec<u8> {
    let canvas = fallback::error_canvas(dimensions, plugin_name, message);
    match encode_png(&canvas) {
        Ok(png) => png,
        Err(e) => {
            tracing::error!(plugin = %plugin_name, error = %e, "Failed to encode error image");
            Dimensions::new(1, 1)
                .ok()
                .and_then(|one| encode_png(&Canvas::new(one)).ok())
                .unwrap_or_default()
        }
    }
}

/// Best-effort description of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
