//! In-memory document host.
//!
//! A parent-linked element/text tree with attributes, inline styles,
//! inherited text style and embedder-assigned layout, plus the two observer
//! kinds a decoration engine reacts to (attribute and size) and a manual
//! animation clock. Everything is single-threaded: observers deliver batched
//! records only when the embedder drains [`Document::take_events`].

mod animation;
mod document;
mod geometry;
mod observer;
mod style;
mod text;

pub use animation::{Animation, AnimationId};
pub use document::{Document, DomNode, NodeKind};
pub use geometry::{Point, Rect};
pub use indextree::NodeId;
pub use observer::{HostEvent, MutationRecord, ObserverId, ResizeEntry};
pub use style::{INITIAL_FONT_SIZE, InlineStyle, NORMAL_LINE_HEIGHT, SpecifiedText, TextStyle};
pub use text::TextRun;
