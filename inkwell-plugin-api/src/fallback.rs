//! Fallback error image
//!
//! This is the failure boundary of the render contract, so nothing in here
//! may fail: text is drawn with built-in monospace fonts (no assets to load)
//! into an infallible [`Canvas`].

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle, ascii::FONT_10X20};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

use crate::canvas::Canvas;
use crate::types::Dimensions;

/// Upper bound on message lines, regardless of canvas height
pub const MAX_ERROR_LINES: usize = 8;

/// Banner background
pub const BANNER_COLOR: Rgb888 = Rgb888::BLACK;

const FONT: &MonoFont<'static> = &FONT_10X20;
const PADDING: u32 = 4;
const LINE_GAP: u32 = 4;
const ELLIPSIS: &str = "...";

/// Height of the banner strip in pixels
pub fn banner_height() -> u32 {
    FONT.character_size.height + 2 * PADDING
}

/// Paint the error layout for `plugin_name` onto a fresh canvas
pub fn error_canvas(dimensions: Dimensions, plugin_name: &str, message: &str) -> Canvas {
    let mut canvas = Canvas::new(dimensions);
    let banner = banner_height();

    let _ = Rectangle::new(Point::zero(), Size::new(dimensions.width, banner))
        .into_styled(PrimitiveStyle::with_fill(BANNER_COLOR))
        .draw(&mut canvas);

    let cols = max_columns(dimensions.width);
    let title = truncate_line(&format!("ERROR: {plugin_name}"), cols);
    let _ = Text::with_baseline(
        &title,
        Point::new(PADDING as i32, PADDING as i32),
        MonoTextStyle::new(FONT, Rgb888::WHITE),
        Baseline::Top,
    )
    .draw(&mut canvas);

    let body_style = MonoTextStyle::new(FONT, Rgb888::BLACK);
    let line_height = FONT.character_size.height + LINE_GAP;
    let mut y = banner + PADDING;
    for line in wrap_message(message, cols, max_lines(dimensions.height)) {
        let _ = Text::with_baseline(
            &line,
            Point::new(PADDING as i32, y as i32),
            body_style,
            Baseline::Top,
        )
        .draw(&mut canvas);
        y += line_height;
    }

    canvas
}

/// Characters of the fallback font that fit across `width`
pub fn max_columns(width: u32) -> usize {
    let char_width = FONT.character_size.width + FONT.character_spacing;
    (width.saturating_sub(2 * PADDING) / char_width) as usize
}

/// Message lines that fit below the banner, capped at [`MAX_ERROR_LINES`]
pub fn max_lines(height: u32) -> usize {
    let line_height = FONT.character_size.height + LINE_GAP;
    let available = height.saturating_sub(banner_height() + PADDING) / line_height;
    (available as usize).min(MAX_ERROR_LINES)
}

/// Word-wrap `message` into at most `max_lines` lines of `cols` characters.
///
/// Words longer than a line are hard-split. When the text does not fit, the
/// last kept line ends in `...`.
pub fn wrap_message(message: &str, cols: usize, max_lines: usize) -> Vec<String> {
    if cols == 0 || max_lines == 0 {
        return Vec::new();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in message.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while !word.is_empty() {
            let used = current.chars().count();
            let needed = if used == 0 { word.len() } else { used + 1 + word.len() };

            if needed <= cols {
                if used > 0 {
                    current.push(' ');
                }
                current.extend(word.drain(..));
            } else if used > 0 {
                lines.push(std::mem::take(&mut current));
            } else {
                current.extend(word.drain(..cols));
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            *last = with_ellipsis(last, cols);
        }
    }
    lines
}

fn truncate_line(line: &str, cols: usize) -> String {
    if line.chars().count() <= cols {
        line.to_string()
    } else {
        with_ellipsis(line, cols)
    }
}

fn with_ellipsis(line: &str, cols: usize) -> String {
    let keep = cols.saturating_sub(ELLIPSIS.len());
    let mut out: String = line.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out.chars().take(cols).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_short_message_single_line() {
        assert_eq!(wrap_message("connection refused", 40, 8), vec!["connection refused"]);
    }

    #[test]
    fn test_wrap_breaks_on_words() {
        let lines = wrap_message("the quick brown fox jumps", 10, 8);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn test_wrap_hard_splits_long_words() {
        let lines = wrap_message("abcdefghijkl", 5, 8);
        assert_eq!(lines, vec!["abcde", "fghij", "kl"]);
    }

    #[test]
    fn test_wrap_truncates_with_ellipsis() {
        let message = "one two three four five six seven eight nine ten";
        let lines = wrap_message(message, 9, 2);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "one two");
        assert!(lines[1].ends_with("..."));
        assert!(lines[1].chars().count() <= 9);
    }

    #[test]
    fn test_wrap_degenerate_inputs() {
        assert!(wrap_message("anything", 0, 8).is_empty());
        assert!(wrap_message("anything", 10, 0).is_empty());
        assert!(wrap_message("   ", 10, 8).is_empty());
        assert_eq!(wrap_message("abcdef", 2, 1), vec![".."]);
    }

    #[test]
    fn test_max_lines_capped() {
        assert_eq!(max_lines(10_000), MAX_ERROR_LINES);
        assert_eq!(max_lines(10), 0);
    }

    #[test]
    fn test_error_canvas_has_banner() {
        let dims = Dimensions::new(800, 480).unwrap();
        let canvas = error_canvas(dims, "clock", "boom");

        assert_eq!(canvas.pixel(799, 1), Some(BANNER_COLOR));
        assert_eq!(canvas.pixel(799, 479), Some(Rgb888::WHITE));
    }

    #[test]
    fn test_error_canvas_survives_tiny_canvas() {
        let dims = Dimensions::new(1, 1).unwrap();
        let canvas = error_canvas(dims, "a-very-long-plugin-name", &"x".repeat(10_000));
        assert_eq!(canvas.width(), 1);
    }
}
