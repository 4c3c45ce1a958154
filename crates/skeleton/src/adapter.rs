//! Host abstraction.
//!
//! The engine never touches a concrete document. Read-only tree access,
//! layout measurement and mutation are split into three traits so the pure
//! parts (option resolution, participation) only need [`TreeAdapter`].
//! [`dom::Document`] implements all three.

use anyhow::Result;
use core::fmt::Debug;
use core::hash::Hash;
use dom::{Document, HostEvent, ObserverId, Point, Rect};

/// Structural access to the document.
pub trait TreeAdapter {
    type Handle: Copy + Eq + Hash + Debug + 'static;

    fn parent_node(&self, node: Self::Handle) -> Option<Self::Handle>;

    /// Child nodes (elements and text) in tree order.
    fn child_nodes(&self, node: Self::Handle) -> Vec<Self::Handle>;

    /// Lowercase tag name; `None` for non-elements.
    fn local_name(&self, node: Self::Handle) -> Option<&str>;

    /// Character data; `None` for non-text nodes.
    fn text_content(&self, node: Self::Handle) -> Option<&str>;

    fn attr(&self, node: Self::Handle, name: &str) -> Option<&str>;
}

/// Layout measurement. All rectangles are in viewport coordinates.
pub trait LayoutAdapter: TreeAdapter {
    /// Border box; zero for nodes that are not rendered.
    fn border_box(&self, node: Self::Handle) -> Rect;

    /// Used line height from the computed style of `node`.
    fn line_height(&self, node: Self::Handle) -> f32;

    /// Bounding box of one character of a text node (a one-character range measurement).
    fn char_box(&self, text_node: Self::Handle, index: usize) -> Option<Rect>;

    /// Content scroll offset of a scroll container.
    fn scroll_position(&self, node: Self::Handle) -> Point;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatcherId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransitionId(pub u64);

/// A batch delivered by the host event loop.
#[derive(Clone, Debug, PartialEq)]
pub enum Signal<N> {
    /// Watched attributes changed on these targets.
    Attributes { watcher: WatcherId, targets: Vec<N> },
    /// Watched elements changed size.
    Resized {
        watcher: WatcherId,
        entries: Vec<(N, Rect)>,
    },
    /// A transition started with [`HostDocument::start_transition`] completed.
    TransitionEnd { transition: TransitionId, node: N },
}

/// Mutation, observation and animation services.
pub trait HostDocument: LayoutAdapter {
    fn create_node(&mut self, tag: &str) -> Self::Handle;

    /// # Errors
    /// Fails when either node is gone or the insertion is structurally invalid.
    fn insert_child(&mut self, parent: Self::Handle, child: Self::Handle) -> Result<()>;

    /// Destroy a node. Removing a node that is already gone is a no-op.
    fn remove_node(&mut self, node: Self::Handle);

    fn inline_style(&self, node: Self::Handle, property: &str) -> Option<String>;

    /// # Errors
    /// Fails when the node is gone.
    fn set_inline_style(&mut self, node: Self::Handle, property: &str, value: &str) -> Result<()>;

    fn clear_inline_style(&mut self, node: Self::Handle, property: &str);

    /// # Errors
    /// Fails when the node is not a live element.
    fn set_attr(&mut self, node: Self::Handle, name: &str, value: &str) -> Result<()>;

    fn clear_attr(&mut self, node: Self::Handle, name: &str);

    /// Watch one attribute of `target`.
    fn watch_attribute(&mut self, target: Self::Handle, name: &str) -> WatcherId;

    fn create_size_watcher(&mut self) -> WatcherId;

    fn watch_size(&mut self, watcher: WatcherId, target: Self::Handle);

    fn unwatch_size(&mut self, watcher: WatcherId, target: Self::Handle);

    /// Stop a watcher. Disconnecting twice is a no-op.
    fn disconnect_watcher(&mut self, watcher: WatcherId);

    fn start_transition(&mut self, node: Self::Handle, name: &str, duration_ms: u64) -> TransitionId;

    fn drain_signals(&mut self) -> Vec<Signal<Self::Handle>>;

    /// Native anchor positioning support; `None` when it cannot be probed.
    fn probe_anchor_positioning(&self) -> Option<bool>;
}

impl TreeAdapter for Document {
    type Handle = dom::NodeId;

    fn parent_node(&self, node: Self::Handle) -> Option<Self::Handle> {
        self.parent(node)
    }

    fn child_nodes(&self, node: Self::Handle) -> Vec<Self::Handle> {
        self.children(node).collect()
    }

    fn local_name(&self, node: Self::Handle) -> Option<&str> {
        self.tag_name(node)
    }

    fn text_content(&self, node: Self::Handle) -> Option<&str> {
        self.text(node)
    }

    fn attr(&self, node: Self::Handle, name: &str) -> Option<&str> {
        self.attribute(node, name)
    }
}

impl LayoutAdapter for Document {
    fn border_box(&self, node: Self::Handle) -> Rect {
        self.bounding_rect(node)
    }

    fn line_height(&self, node: Self::Handle) -> f32 {
        self.computed_text_style(node).used_line_height()
    }

    fn char_box(&self, text_node: Self::Handle, index: usize) -> Option<Rect> {
        self.char_rect(text_node, index)
    }

    fn scroll_position(&self, node: Self::Handle) -> Point {
        self.scroll_offset(node)
    }
}

impl HostDocument for Document {
    fn create_node(&mut self, tag: &str) -> Self::Handle {
        self.create_element(tag)
    }

    fn insert_child(&mut self, parent: Self::Handle, child: Self::Handle) -> Result<()> {
        self.append_child(parent, child)
    }

    fn remove_node(&mut self, node: Self::Handle) {
        self.remove(node);
    }

    fn inline_style(&self, node: Self::Handle, property: &str) -> Option<String> {
        self.style(node)?.get(property).map(str::to_owned)
    }

    fn set_inline_style(&mut self, node: Self::Handle, property: &str, value: &str) -> Result<()> {
        self.set_style(node, property, value).map(|_| ())
    }

    fn clear_inline_style(&mut self, node: Self::Handle, property: &str) {
        self.remove_style(node, property);
    }

    fn set_attr(&mut self, node: Self::Handle, name: &str, value: &str) -> Result<()> {
        self.set_attribute(node, name, value)
    }

    fn clear_attr(&mut self, node: Self::Handle, name: &str) {
        self.remove_attribute(node, name);
    }

    fn watch_attribute(&mut self, target: Self::Handle, name: &str) -> WatcherId {
        WatcherId(self.observe_attributes(target, &[name]).as_u64())
    }

    fn create_size_watcher(&mut self) -> WatcherId {
        WatcherId(self.create_resize_observer().as_u64())
    }

    fn watch_size(&mut self, watcher: WatcherId, target: Self::Handle) {
        self.observe_size(ObserverId(watcher.0), target);
    }

    fn unwatch_size(&mut self, watcher: WatcherId, target: Self::Handle) {
        self.unobserve_size(ObserverId(watcher.0), target);
    }

    fn disconnect_watcher(&mut self, watcher: WatcherId) {
        self.disconnect(ObserverId(watcher.0));
    }

    fn start_transition(&mut self, node: Self::Handle, name: &str, duration_ms: u64) -> TransitionId {
        TransitionId(self.animate(node, name, duration_ms).as_u64())
    }

    fn drain_signals(&mut self) -> Vec<Signal<Self::Handle>> {
        self.take_events()
            .into_iter()
            .map(|event| match event {
                HostEvent::Mutations { observer, records } => Signal::Attributes {
                    watcher: WatcherId(observer.as_u64()),
                    targets: records.into_iter().map(|record| record.target).collect(),
                },
                HostEvent::Resize { observer, entries } => Signal::Resized {
                    watcher: WatcherId(observer.as_u64()),
                    entries: entries
                        .into_iter()
                        .map(|entry| (entry.target, entry.rect))
                        .collect(),
                },
                HostEvent::AnimationFinished { animation, node } => Signal::TransitionEnd {
                    transition: TransitionId(animation.as_u64()),
                    node,
                },
            })
            .collect()
    }

    fn probe_anchor_positioning(&self) -> Option<bool> {
        self.anchor_positioning()
    }
}
