//! Monospace text-run layout used to answer per-character range measurements.
//!
//! A run describes how one text node was laid out: where its first glyph sits,
//! the inline extent its lines wrap within, and the fixed advance of every
//! character. Character boxes are glyph-height tall and centred inside their
//! line box (half-leading above and below), which matches what a range
//! measurement returns in a browser.

use crate::geometry::{Point, Rect};

/// Wrapping tolerance so runs that fill a line exactly do not spill over.
const WRAP_EPSILON: f32 = 0.01;

/// Layout of a single text node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextRun {
    /// Top-left corner of the first line box, at the first character.
    pub start: Point,
    /// Inline start of continuation lines.
    pub line_left: f32,
    /// Inline end every line wraps at.
    pub line_right: f32,
    /// Advance of every character.
    pub advance: f32,
    /// Height of a line box.
    pub line_height: f32,
    /// Height of a character box (ascent + descent).
    pub glyph_height: f32,
}

impl TextRun {
    /// A run whose glyphs fill the whole line box.
    pub const fn new(start: Point, line_left: f32, line_right: f32, advance: f32, line_height: f32) -> Self {
        Self {
            start,
            line_left,
            line_right,
            advance,
            line_height,
            glyph_height: line_height,
        }
    }

    #[must_use]
    pub const fn with_glyph_height(mut self, glyph_height: f32) -> Self {
        self.glyph_height = glyph_height;
        self
    }

    /// Bounding box of the character at `index`.
    pub fn char_rect(&self, index: usize) -> Rect {
        let mut left = self.start.x;
        let mut line = 0u32;
        for position in 0..=index {
            if position > 0 {
                left += self.advance;
            }
            let overflows = left + self.advance > self.line_right + WRAP_EPSILON;
            if overflows && left > self.line_left + WRAP_EPSILON {
                line += 1;
                left = self.line_left;
            }
        }
        let half_leading = (self.line_height - self.glyph_height).max(0.0) / 2.0;
        let top = (line as f32).mul_add(self.line_height, self.start.y) + half_leading;
        Rect::new(left, top, self.advance, self.glyph_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> TextRun {
        // 10 characters per full line between x=0 and x=100.
        TextRun::new(Point::new(40.0, 0.0), 0.0, 100.0, 10.0, 20.0)
    }

    #[test]
    fn first_line_starts_at_run_origin() {
        let rect = run().char_rect(0);
        assert_eq!(rect, Rect::new(40.0, 0.0, 10.0, 20.0));
    }

    #[test]
    fn wraps_back_to_line_left() {
        // Six characters fit on the first line (40..100).
        let text = run();
        assert_eq!(text.char_rect(5).x, 90.0);
        let wrapped = text.char_rect(6);
        assert_eq!((wrapped.x, wrapped.y), (0.0, 20.0));
        assert_eq!(text.char_rect(16).y, 40.0);
    }

    #[test]
    fn glyph_boxes_sit_inside_half_leading() {
        let rect = run().with_glyph_height(14.0).char_rect(0);
        assert_eq!((rect.y, rect.height), (3.0, 14.0));
    }
}
