//! Inline style declarations and the inherited text style subset.

use core::mem;
use smallvec::SmallVec;

/// `line-height: normal` resolves to this multiple of the font size.
pub const NORMAL_LINE_HEIGHT: f32 = 1.2;

/// Initial `font-size` in pixels.
pub const INITIAL_FONT_SIZE: f32 = 16.0;

/// Inline declarations on one element, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: SmallVec<[(String, String); 4]>,
}

impl InlineStyle {
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    /// Set a declaration, returning the previous value.
    pub fn set(&mut self, property: &str, value: &str) -> Option<String> {
        if let Some(slot) = self
            .declarations
            .iter_mut()
            .find(|(name, _)| name == property)
        {
            return Some(mem::replace(&mut slot.1, value.to_owned()));
        }
        self.declarations
            .push((property.to_owned(), value.to_owned()));
        None
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        let index = self
            .declarations
            .iter()
            .position(|(name, _)| name == property)?;
        Some(self.declarations.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Serialize as a `style` attribute value.
    pub fn to_css(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Specified text properties on a node. `None` inherits from the parent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpecifiedText {
    pub font_size: Option<f32>,
    /// Line height in pixels; `None` inherits, and at the root means `normal`.
    pub line_height: Option<f32>,
}

/// Computed text style.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    /// Computed line-height in pixels when specified; None represents 'normal'.
    pub line_height: Option<f32>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: INITIAL_FONT_SIZE,
            line_height: None,
        }
    }
}

impl TextStyle {
    /// Used line height in pixels.
    pub fn used_line_height(&self) -> f32 {
        self.line_height
            .unwrap_or(self.font_size * NORMAL_LINE_HEIGHT)
    }
}
