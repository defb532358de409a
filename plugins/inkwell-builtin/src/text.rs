//! Shared text layout helpers

use embedded_graphics::mono_font::MonoFont;

/// Characters of `font` that fit across `width` pixels
pub(crate) fn columns(font: &MonoFont<'_>, width: u32) -> usize {
    let advance = font.character_size.width + font.character_spacing;
    if advance == 0 {
        return 0;
    }
    (width / advance) as usize
}

/// Lines of `font` that fit in `height` pixels with `gap` between lines
pub(crate) fn rows(font: &MonoFont<'_>, height: u32, gap: u32) -> usize {
    let line = font.character_size.height + gap;
    if line == 0 {
        return 0;
    }
    ((height + gap) / line) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};

    #[test]
    fn test_columns() {
        assert_eq!(columns(&FONT_10X20, 800), 80);
        assert_eq!(columns(&FONT_6X10, 5), 0);
    }

    #[test]
    fn test_rows_counts_gaps_between_lines() {
        // 3 lines of 10px with 2px gaps = 34px
        assert_eq!(rows(&FONT_6X10, 34, 2), 3);
        assert_eq!(rows(&FONT_6X10, 33, 2), 2);
    }
}
