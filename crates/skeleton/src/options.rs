//! Decoration options and their layered resolution.
//!
//! Options come from three layers, lowest precedence first: global defaults,
//! per-tag defaults, and the marker attributes on the element itself. Layers
//! are merged field by field; a later layer only overwrites the fields it
//! actually carries. Values are not validated: whatever the markers say is
//! passed on, and only fields that need a number are coerced.

use crate::adapter::TreeAdapter;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker carrying the decoration kind. `none` opts the element (and its unmarked subtree) out.
pub const KIND_ATTR: &str = "data-sk";

/// Set on every node the engine creates so it never decorates its own output.
pub const DECORATION_ATTR: &str = "data-sk-decoration";

/// What a decoration looks like.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Kind {
    /// Thin bar per text line.
    Text,
    /// Box with rounded corners taken from the roundness class.
    Round,
    /// Square box.
    Rect,
    /// Blocking cover over the whole element, faded in and out.
    Overlay,
    /// Opt-out.
    None,
    /// Unrecognised kind, kept verbatim and drawn as a box.
    Other(String),
}

impl Kind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Round => "round",
            Self::Rect => "rect",
            Self::Overlay => "overlay",
            Self::None => "none",
            Self::Other(raw) => raw.as_str(),
        }
    }

    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<&str> for Kind {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Self::Text,
            "round" => Self::Round,
            "rect" => Self::Rect,
            "overlay" => Self::Overlay,
            "none" => Self::None,
            _ => Self::Other(raw.to_owned()),
        }
    }
}

impl From<String> for Kind {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<Kind> for String {
    fn from(kind: Kind) -> Self {
        kind.as_str().to_owned()
    }
}

/// How closely text placeholders follow the measured text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Shorten the first and last line at the measured text boundaries.
    #[default]
    Trim,
    /// Full-width lines; only the first line is inset.
    Box,
}

impl Precision {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "trim" => Some(Self::Trim),
            "box" => Some(Self::Box),
            _ => None,
        }
    }
}

/// One option field, addressed by its marker attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Kind,
    Radius,
    ScaleX,
    ScaleY,
    TranslateX,
    TranslateY,
    Width,
    Height,
    Origin,
    Precision,
    ZIndex,
    FadeIn,
    FadeOut,
    Slot,
    Subtree,
}

/// Marker attribute for every field.
pub const MARKERS: [(&str, Field); 15] = [
    (KIND_ATTR, Field::Kind),
    ("data-sk-r", Field::Radius),
    ("data-sk-scale-x", Field::ScaleX),
    ("data-sk-scale-y", Field::ScaleY),
    ("data-sk-translate-x", Field::TranslateX),
    ("data-sk-translate-y", Field::TranslateY),
    ("data-sk-w", Field::Width),
    ("data-sk-h", Field::Height),
    ("data-sk-origin", Field::Origin),
    ("data-sk-p", Field::Precision),
    ("data-sk-z", Field::ZIndex),
    ("data-sk-fade-in", Field::FadeIn),
    ("data-sk-fade-out", Field::FadeOut),
    ("data-sk-slot", Field::Slot),
    ("data-sk-id", Field::Subtree),
];

/// Decoration options. `None` means "inherit from the next layer down".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub kind: Option<Kind>,
    /// Roundness class (`xs` .. `full`) or a raw length.
    pub radius: Option<String>,
    pub scale_x: Option<String>,
    pub scale_y: Option<String>,
    pub translate_x: Option<String>,
    pub translate_y: Option<String>,
    /// Explicit width, overriding measured geometry.
    pub width: Option<String>,
    /// Explicit height, overriding measured geometry.
    pub height: Option<String>,
    /// Transform origin.
    pub origin: Option<String>,
    pub precision: Option<Precision>,
    pub z_index: Option<i32>,
    pub fade_in_ms: Option<u64>,
    pub fade_out_ms: Option<u64>,
    /// Slot name forwarded to framework bindings.
    pub slot: Option<String>,
    /// Identifier of the decorated subtree.
    pub subtree: Option<String>,
}

/// Overwrite every listed field of `$base` that `$overlay` carries.
macro_rules! overwrite_fields {
    ($base:expr, $overlay:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$overlay.$field {
                $base.$field = Some(value.clone());
            }
        )+
    };
}

impl Options {
    /// Read the marker attributes of `node`.
    pub fn from_element<A: TreeAdapter>(adapter: &A, node: A::Handle) -> Self {
        let mut options = Self::default();
        for (attribute, field) in MARKERS {
            if let Some(raw) = adapter.attr(node, attribute) {
                options.set(field, raw);
            }
        }
        options
    }

    /// Build from `(attribute, value)` pairs; attributes that are not markers are ignored.
    pub fn from_attributes<'pair, I>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (&'pair str, &'pair str)>,
    {
        let mut options = Self::default();
        for (name, raw) in attributes {
            if let Some((_, field)) = MARKERS.iter().find(|(attribute, _)| *attribute == name) {
                options.set(*field, raw);
            }
        }
        options
    }

    /// Assign one field from its raw attribute value. Numeric fields that fail
    /// to coerce are left absent.
    pub fn set(&mut self, field: Field, raw: &str) {
        let text = Some(raw.to_owned());
        match field {
            Field::Kind => self.kind = Some(Kind::from(raw)),
            Field::Radius => self.radius = text,
            Field::ScaleX => self.scale_x = text,
            Field::ScaleY => self.scale_y = text,
            Field::TranslateX => self.translate_x = text,
            Field::TranslateY => self.translate_y = text,
            Field::Width => self.width = text,
            Field::Height => self.height = text,
            Field::Origin => self.origin = text,
            Field::Precision => self.precision = coerce(field, raw, Precision::parse),
            Field::ZIndex => self.z_index = coerce(field, raw, |value| value.trim().parse().ok()),
            Field::FadeIn => self.fade_in_ms = coerce(field, raw, parse_millis),
            Field::FadeOut => self.fade_out_ms = coerce(field, raw, parse_millis),
            Field::Slot => self.slot = text,
            Field::Subtree => self.subtree = text,
        }
    }

    /// Shallow merge: every field present in `overlay` replaces the one in `self`.
    pub fn merge(&mut self, overlay: &Self) {
        overwrite_fields!(
            self,
            overlay,
            kind,
            radius,
            scale_x,
            scale_y,
            translate_x,
            translate_y,
            width,
            height,
            origin,
            precision,
            z_index,
            fade_in_ms,
            fade_out_ms,
            slot,
            subtree,
        );
    }

    #[must_use]
    pub fn merged(mut self, overlay: &Self) -> Self {
        self.merge(overlay);
        self
    }
}

fn coerce<T>(field: Field, raw: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
    let parsed = parse(raw);
    if parsed.is_none() {
        debug!("ignoring malformed {field:?} marker value {raw:?}");
    }
    parsed
}

/// Milliseconds, with an optional `ms` suffix.
fn parse_millis(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    trimmed
        .strip_suffix("ms")
        .unwrap_or(trimmed)
        .trim()
        .parse()
        .ok()
}

/// Merges the configuration layers for one element. Side-effect free.
#[derive(Clone, Copy, Debug)]
pub struct OptionResolver<'tables> {
    defaults: &'tables Options,
    tags: &'tables BTreeMap<String, Options>,
}

impl<'tables> OptionResolver<'tables> {
    pub const fn new(defaults: &'tables Options, tags: &'tables BTreeMap<String, Options>) -> Self {
        Self { defaults, tags }
    }

    /// Global defaults, then the defaults for `tag`, then the element's own markers.
    pub fn resolve(&self, tag: &str, dataset: &Options) -> Options {
        let layered = self.tags.get(tag).map_or_else(
            || self.defaults.clone(),
            |tag_defaults| self.defaults.clone().merged(tag_defaults),
        );
        layered.merged(dataset)
    }

    pub fn resolve_element<A: TreeAdapter>(&self, adapter: &A, node: A::Handle) -> Options {
        let tag = adapter.local_name(node).unwrap_or_default();
        self.resolve(tag, &Options::from_element(adapter, node))
    }
}
