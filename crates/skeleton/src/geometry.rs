//! Placeholder geometry.
//!
//! Generic elements get a single box covering the whole border box. Text
//! content gets one bar per wrapped line, reconstructed from the boxes of the
//! first and last visible characters of each text node. All rectangles are
//! relative to the element's top-left corner.

use crate::adapter::LayoutAdapter;
use crate::options::{Kind, Options, Precision};
use dom::Rect;
use log::trace;

pub type PlaceholderRect = Rect;

/// Horizontal nudge applied to the first line so it never touches the edge.
pub const FIRST_LINE_INSET: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// One box over the whole element.
    Generic,
    /// One bar per line of text.
    Text,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub shape: Shape,
    pub rects: Vec<PlaceholderRect>,
}

/// At least one direct child text node with something other than whitespace.
pub fn is_probably_text<A: LayoutAdapter>(adapter: &A, element: A::Handle) -> bool {
    adapter.child_nodes(element).into_iter().any(|child| {
        adapter
            .text_content(child)
            .is_some_and(|text| !text.trim().is_empty())
    })
}

/// Placeholder rectangles for `element`, or `None` when nothing should be drawn.
pub fn compute_rects<A: LayoutAdapter>(
    adapter: &A,
    element: A::Handle,
    rect: Rect,
    options: &Options,
) -> Option<Vec<PlaceholderRect>> {
    compute_geometry(adapter, element, rect, options).map(|geometry| geometry.rects)
}

pub fn compute_geometry<A: LayoutAdapter>(
    adapter: &A,
    element: A::Handle,
    rect: Rect,
    options: &Options,
) -> Option<Geometry> {
    if rect.is_empty() {
        return None;
    }
    let custom = adapter.local_name(element).is_some_and(|tag| tag.contains('-'));
    let shape = match &options.kind {
        Some(Kind::None) => return None,
        _ if custom => Shape::Generic,
        Some(Kind::Text) | None if is_probably_text(adapter, element) => Shape::Text,
        Some(_) => Shape::Generic,
        None => return None,
    };
    let rects = match shape {
        Shape::Generic => vec![full_box(rect)],
        Shape::Text => {
            let precision = options.precision.unwrap_or_default();
            let lines = text_lines(adapter, element, rect, precision);
            if lines.is_empty() {
                trace!("{element:?} has no measurable text, using a single box");
                return Some(Geometry {
                    shape: Shape::Generic,
                    rects: vec![full_box(rect)],
                });
            }
            lines
        }
    };
    Some(Geometry { shape, rects })
}

fn full_box(rect: Rect) -> PlaceholderRect {
    Rect::new(0.0, 0.0, rect.width, rect.height)
}

fn text_lines<A: LayoutAdapter>(adapter: &A, element: A::Handle, rect: Rect, precision: Precision) -> Vec<PlaceholderRect> {
    let line_height = adapter.line_height(element);
    if line_height <= 0.0 {
        return Vec::new();
    }
    let mut lines = Vec::new();
    for child in adapter.child_nodes(element) {
        let Some(text) = adapter.text_content(child) else {
            continue;
        };
        let Some((first, last)) = visible_span(text) else {
            continue;
        };
        let (Some(start), Some(end)) = (adapter.char_box(child, first), adapter.char_box(child, last)) else {
            continue;
        };
        let count = ((end.bottom() - start.y) / line_height).round().max(1.0) as usize;
        let top = start.y - rect.y;
        let first_x = (start.x - rect.x).max(0.0) + FIRST_LINE_INSET;
        let trailing_gap = (rect.right() - end.right()).max(0.0);
        for index in 0..count {
            let x = if index == 0 { first_x } else { 0.0 };
            let mut width = rect.width - x;
            if precision == Precision::Trim && index + 1 == count {
                width -= trailing_gap;
            }
            lines.push(Rect::new(
                x,
                (index as f32).mul_add(line_height, top),
                width.max(0.0),
                line_height,
            ));
        }
    }
    lines
}

/// Character indices of the first and last non-whitespace characters.
fn visible_span(text: &str) -> Option<(usize, usize)> {
    let mut visible = text
        .chars()
        .enumerate()
        .filter(|(_, character)| !character.is_whitespace())
        .map(|(index, _)| index);
    let first = visible.next()?;
    Some((first, visible.last().unwrap_or(first)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_span_skips_surrounding_whitespace() {
        assert_eq!(visible_span("  ab c \n"), Some((2, 5)));
        assert_eq!(visible_span("x"), Some((0, 0)));
        assert_eq!(visible_span(" \t "), None);
    }
}
