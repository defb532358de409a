//! Static text: a title and a word-wrapped body

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text};
use serde::Deserialize;

use inkwell_plugin_api::fallback::wrap_message;
use inkwell_plugin_api::{Canvas, FromInit, Plugin, PluginContext, PluginError, PluginInit};

use crate::text::{columns, rows};

const MARGIN: u32 = 8;
const LINE_GAP: u32 = 3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageConfig {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// White text on black
    #[serde(default)]
    pub inverted: bool,
}

pub struct MessagePlugin {
    config: MessageConfig,
}

impl MessagePlugin {
    pub fn new(config: MessageConfig) -> Self {
        Self { config }
    }

    fn colors(&self) -> (Rgb888, Rgb888) {
        if self.config.inverted {
            (Rgb888::WHITE, Rgb888::BLACK)
        } else {
            (Rgb888::BLACK, Rgb888::WHITE)
        }
    }
}

impl Plugin for MessagePlugin {
    fn draw(&mut self, canvas: &mut Canvas, _ctx: &PluginContext) -> Result<(), PluginError> {
        let (ink, paper) = self.colors();
        if self.config.inverted {
            let _ = canvas.clear(paper);
        }

        let size = canvas.size();
        let inner = size.width.saturating_sub(2 * MARGIN);
        if inner == 0 {
            return Err(PluginError::render(format!(
                "canvas {}px wide leaves no room for text",
                size.width
            )));
        }

        let title_height = FONT_10X20.character_size.height;
        let title: String = self
            .config
            .title
            .chars()
            .take(columns(&FONT_10X20, inner))
            .collect();
        let _ = Text::with_baseline(
            &title,
            Point::new(MARGIN as i32, MARGIN as i32),
            MonoTextStyle::new(&FONT_10X20, ink),
            Baseline::Top,
        )
        .draw(canvas);

        let rule_y = (MARGIN + title_height + 4) as i32;
        let _ = Line::new(
            Point::new(MARGIN as i32, rule_y),
            Point::new((size.width - MARGIN) as i32, rule_y),
        )
        .into_styled(PrimitiveStyle::with_stroke(ink, 1))
        .draw(canvas);

        let body_top = rule_y as u32 + 6;
        let available = size.height.saturating_sub(body_top + MARGIN);
        let lines = wrap_message(
            &self.config.body,
            columns(&FONT_6X10, inner),
            rows(&FONT_6X10, available, LINE_GAP),
        );

        let style = MonoTextStyle::new(&FONT_6X10, ink);
        let step = FONT_6X10.character_size.height + LINE_GAP;
        for (i, line) in lines.iter().enumerate() {
            let y = body_top + i as u32 * step;
            let _ = Text::with_baseline(line, Point::new(MARGIN as i32, y as i32), style, Baseline::Top)
                .draw(canvas);
        }

        Ok(())
    }
}

impl FromInit for MessagePlugin {
    fn from_init(init: &PluginInit) -> Result<Self, PluginError> {
        let config: MessageConfig = init.config_as()?;
        if config.title.trim().is_empty() {
            return Err(PluginError::config("title must not be empty"));
        }
        Ok(Self::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell_plugin_api::{DeviceMetadata, Dimensions, render};

    fn init(config: serde_json::Value) -> PluginInit {
        PluginInit {
            name: "message".into(),
            dimensions: Dimensions::new(160, 90).unwrap(),
            config,
            device: DeviceMetadata::default(),
        }
    }

    #[test]
    fn test_title_is_required() {
        let result = MessagePlugin::from_init(&init(serde_json::json!({"body": "hi"})));
        assert!(matches!(result, Err(PluginError::Config(_))));

        let blank = MessagePlugin::from_init(&init(serde_json::json!({"title": "  "})));
        assert!(blank.is_err());
    }

    #[test]
    fn test_renders_title_and_rule() {
        let init = init(serde_json::json!({
            "title": "Hello",
            "body": "a fairly long body that will need more than one line to fit"
        }));
        let mut plugin = MessagePlugin::from_init(&init).unwrap();
        let outcome = render(&mut plugin, &init.context());
        assert!(!outcome.is_fallback());

        let img = image::load_from_memory(&outcome.png).unwrap().to_rgb8();
        // horizontal rule under the title
        assert_eq!(img.get_pixel(80, 32).0, [0, 0, 0]);
        // corner stays paper
        assert_eq!(img.get_pixel(159, 89).0, [255, 255, 255]);
    }

    #[test]
    fn test_inverted_background() {
        let init = init(serde_json::json!({"title": "Night", "inverted": true}));
        let mut plugin = MessagePlugin::from_init(&init).unwrap();
        let outcome = render(&mut plugin, &init.context());

        let img = image::load_from_memory(&outcome.png).unwrap().to_rgb8();
        assert_eq!(img.get_pixel(159, 89).0, [0, 0, 0]);
    }

    #[test]
    fn test_too_narrow_canvas_falls_back() {
        let init = PluginInit {
            dimensions: Dimensions::new(10, 90).unwrap(),
            ..init(serde_json::json!({"title": "x"}))
        };
        let mut plugin = MessagePlugin::from_init(&init).unwrap();
        let outcome = render(&mut plugin, &init.context());
        assert!(outcome.is_fallback());
        assert!(image::load_from_memory(&outcome.png).is_ok());
    }
}
