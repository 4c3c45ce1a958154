//! Turns a placeholder rectangle into positioning instructions.
//!
//! Two strategies exist. With native anchor positioning the decoration is
//! tethered to its candidate through an anchor name and only carries offsets
//! local to the candidate. Without it the decoration floats inside the root,
//! which the controller turns into a containing block, at coordinates
//! computed from the measured rectangles.

use crate::options::{Kind, Options};
use dom::{Point, Rect};

/// Which strategy an engine uses, decided once from the platform probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionMode {
    Anchor,
    Float,
}

impl PositionMode {
    /// A failed probe (`None`) falls back to floating.
    pub const fn from_probe(probe: Option<bool>, force_float: bool) -> Self {
        match probe {
            Some(true) if !force_float => Self::Anchor,
            _ => Self::Float,
        }
    }
}

/// Per-placement context for the chosen strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode<'name> {
    /// Candidate carries `anchor-name: name`.
    Anchor { name: &'name str },
    /// Scroll offset of the root.
    Float { scroll: Point },
}

/// Kind for an element without one: text when the first placeholder is
/// indented, round otherwise.
pub fn infer_kind(rect: &Rect) -> Kind {
    if rect.x > 0.0 { Kind::Text } else { Kind::Round }
}

/// Border radius for a roundness class; unknown classes are used verbatim.
pub fn radius_for_class(class: &str) -> String {
    let fixed = match class.trim() {
        "xs" => "2px",
        "s" => "4px",
        "m" => "8px",
        "l" => "12px",
        "xl" => "16px",
        "full" => "9999px",
        other => return other.to_owned(),
    };
    fixed.to_owned()
}

fn radius_for(kind: &Kind, class: Option<&str>) -> String {
    match kind {
        Kind::Text => "4px".to_owned(),
        Kind::Round => radius_for_class(class.unwrap_or("m")),
        Kind::Rect | Kind::Overlay | Kind::None | Kind::Other(_) => "0".to_owned(),
    }
}

/// CSS pixel length rounded to two decimals.
pub fn px(value: f32) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0px".to_owned()
    } else {
        format!("{rounded}px")
    }
}

/// Bare numbers become pixel lengths; anything else passes through.
fn length(raw: &str) -> String {
    raw.trim()
        .parse::<f32>()
        .map_or_else(|_| raw.trim().to_owned(), px)
}

/// Where and how one decoration is drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    pub kind: Kind,
    /// Anchor name to tether to; `None` when floating.
    pub anchor: Option<String>,
    /// Offset from the anchor in anchor mode, from the root's padding box when floating.
    pub left: f32,
    pub top: f32,
    pub width: String,
    pub height: String,
    pub radius: String,
    pub transform: String,
    pub transform_origin: String,
    pub z_index: Option<i32>,
}

/// Position one placeholder. `rect` is relative to the element, `element` and
/// `container` are viewport rectangles.
pub fn place(options: &Options, rect: &Rect, element: &Rect, container: &Rect, mode: Mode<'_>) -> Placement {
    let kind = options.kind.clone().unwrap_or_else(|| infer_kind(rect));
    let (anchor, left, top) = match mode {
        Mode::Anchor { name } => (Some(name.to_owned()), rect.x, rect.y),
        Mode::Float { scroll } => (
            None,
            rect.x + element.x - container.x + scroll.x,
            rect.y + element.y - container.y + scroll.y,
        ),
    };
    let default_scale_y = if kind == Kind::Text { "0.5" } else { "1" };
    let transform = format!(
        "translate({}, {}) scale({}, {})",
        options.translate_x.as_deref().map_or_else(|| "0px".to_owned(), length),
        options.translate_y.as_deref().map_or_else(|| "0px".to_owned(), length),
        options.scale_x.as_deref().map_or("1", str::trim),
        options.scale_y.as_deref().map_or(default_scale_y, str::trim),
    );
    Placement {
        radius: radius_for(&kind, options.radius.as_deref()),
        kind,
        anchor,
        left,
        top,
        width: options.width.as_deref().map_or_else(|| px(rect.width), length),
        height: options.height.as_deref().map_or_else(|| px(rect.height), length),
        transform,
        transform_origin: options.origin.clone().unwrap_or_else(|| "center".to_owned()),
        z_index: options.z_index,
    }
}

impl Placement {
    /// Inline declarations for the decoration node, in application order.
    pub fn styles(&self) -> Vec<(&'static str, String)> {
        let mut styles = vec![("position", "absolute".to_owned())];
        styles.extend(self.anchor.as_ref().map_or_else(
            || vec![("left", px(self.left)), ("top", px(self.top))],
            |name| {
                vec![
                    ("position-anchor", name.clone()),
                    ("inset-inline-start", format!("calc(anchor(start) + {})", px(self.left))),
                    ("inset-block-start", format!("calc(anchor(start) + {})", px(self.top))),
                ]
            },
        ));
        styles.extend([
            ("width", self.width.clone()),
            ("height", self.height.clone()),
            ("border-radius", self.radius.clone()),
            ("transform", self.transform.clone()),
            ("transform-origin", self.transform_origin.clone()),
        ]);
        if let Some(z_index) = self.z_index {
            styles.push(("z-index", z_index.to_string()));
        }
        styles.push(("pointer-events", "none".to_owned()));
        styles
    }
}
