//! Parent-linked document tree.
//!
//! Nodes live in an [`indextree`] arena. Layout is not computed here: the
//! embedder assigns border boxes with [`Document::set_layout`] and text runs
//! with [`Document::set_text_run`], exactly the values a browser would report
//! through its measurement APIs. Disconnected nodes measure as zero.

use crate::animation::{Animation, AnimationId, Timeline};
use crate::geometry::{Point, Rect};
use crate::observer::{HostEvent, ObserverId, ObserverRegistry};
use crate::style::{InlineStyle, SpecifiedText, TextStyle};
use crate::text::TextRun;
use anyhow::{Result, anyhow, bail};
use core::mem;
use indextree::{Arena, Node, NodeId};
use log::trace;
use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DomNode {
    pub kind: NodeKind,
    pub attrs: SmallVec<[(String, String); 4]>,
    pub style: InlineStyle,
    pub text_style: SpecifiedText,
    /// Border box in viewport coordinates.
    pub layout: Rect,
    /// Content scroll offset of a scroll container.
    pub scroll: Point,
    /// Layout of a text node.
    pub text_run: Option<TextRun>,
}

impl DomNode {
    fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
            },
            ..Self::default()
        }
    }

    fn text(text: &str) -> Self {
        Self {
            kind: NodeKind::Text {
                text: text.to_owned(),
            },
            ..Self::default()
        }
    }
}

/// The live document: tree, observers and animation clock.
#[derive(Debug)]
pub struct Document {
    arena: Arena<DomNode>,
    root: NodeId,
    observers: ObserverRegistry,
    timeline: Timeline,
    /// Result of the platform anchor-positioning probe; `None` when the probe fails.
    anchor_positioning: Option<bool>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Border box of `node`, or zero when it is not attached under `root`.
fn measure(arena: &Arena<DomNode>, root: NodeId, node: NodeId) -> Rect {
    if node.is_removed(arena) {
        return Rect::ZERO;
    }
    let connected = node.ancestors(arena).any(|ancestor| ancestor == root);
    match arena.get(node) {
        Some(entry) if connected && !entry.is_removed() => entry.get().layout,
        _ => Rect::ZERO,
    }
}

/// Non-empty, without whitespace, quotes, `/`, `=` or `>`.
fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|character| character.is_whitespace() || matches!(character, '"' | '\'' | '/' | '=' | '>'))
}

impl Document {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(DomNode::default());
        Self {
            arena,
            root,
            observers: ObserverRegistry::default(),
            timeline: Timeline::default(),
            anchor_positioning: Some(false),
        }
    }

    /// The document node.
    #[inline]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// The node behind `id`; `None` once it was removed, even if its slot was reused.
    pub fn node(&self, id: NodeId) -> Option<&DomNode> {
        self.arena
            .get(id)
            .filter(|entry| !entry.is_removed() && !id.is_removed(&self.arena))
            .map(Node::get)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut DomNode> {
        if id.is_removed(&self.arena) {
            return None;
        }
        self.arena
            .get_mut(id)
            .filter(|entry| !entry.is_removed())
            .map(Node::get_mut)
    }

    /// Number of nodes that have not been removed, the document node included.
    pub fn live_nodes(&self) -> usize {
        self.arena.iter().filter(|entry| !entry.is_removed()).count()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.arena.new_node(DomNode::element(tag))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.new_node(DomNode::text(text))
    }

    /// Append `child` as the last child of `parent`, moving it if it is already attached.
    ///
    /// # Errors
    /// Fails if either node was removed or the append would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return Err(anyhow!("cannot append {child:?} to {parent:?}: node removed"));
        }
        child.detach(&mut self.arena);
        parent
            .checked_append(child, &mut self.arena)
            .map_err(|err| anyhow!("cannot append {child:?} to {parent:?}: {err}"))
    }

    /// Create an element and append it to `parent`.
    ///
    /// # Errors
    /// See [`Document::append_child`].
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let node = self.create_element(tag);
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Create a text node and append it to `parent`.
    ///
    /// # Errors
    /// See [`Document::append_child`].
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        let node = self.create_text(text);
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Take `node` out of the tree, keeping it (and its subtree) alive.
    pub fn detach(&mut self, node: NodeId) {
        if self.node(node).is_some() {
            node.detach(&mut self.arena);
        }
    }

    /// Destroy `node` and its subtree. Returns false if it was already gone.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if node == self.root || self.node(node).is_none() {
            return false;
        }
        trace!("removing node {node:?}");
        node.remove_subtree(&mut self.arena);
        true
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?;
        self.arena.get(node)?.parent()
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.children(&self.arena)
    }

    /// `node` and all nodes below it, in tree order.
    pub fn descendants(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.descendants(&self.arena)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.node(node).is_some() && node.ancestors(&self.arena).any(|ancestor| ancestor == self.root)
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            NodeKind::Document | NodeKind::Text { .. } => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.node(node)?.kind {
            NodeKind::Text { text } => Some(text.as_str()),
            NodeKind::Document | NodeKind::Element { .. } => None,
        }
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute and notify attribute observers.
    ///
    /// # Errors
    /// Fails if `node` is not a live element or `name` is not a valid attribute name.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        if !is_valid_attribute_name(name) {
            bail!("invalid attribute name {name:?}");
        }
        let entry = self
            .node_mut(node)
            .filter(|entry| matches!(entry.kind, NodeKind::Element { .. }))
            .ok_or_else(|| anyhow!("{node:?} is not an element"))?;
        let old_value = entry
            .attrs
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|slot| mem::replace(&mut slot.1, value.to_owned()));
        if old_value.is_none() {
            entry.attrs.push((name.to_owned(), value.to_owned()));
        }
        self.observers.record_attribute(node, name, old_value.as_deref());
        Ok(())
    }

    /// Remove an attribute, notifying observers when it existed.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        let entry = self.node_mut(node)?;
        let index = entry.attrs.iter().position(|(key, _)| key == name)?;
        let (_, old_value) = entry.attrs.remove(index);
        self.observers
            .record_attribute(node, name, Some(&old_value));
        Some(old_value)
    }

    pub fn style(&self, node: NodeId) -> Option<&InlineStyle> {
        Some(&self.node(node)?.style)
    }

    /// Set an inline declaration, returning the previous value.
    ///
    /// # Errors
    /// Fails if `node` was removed.
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<Option<String>> {
        let entry = self
            .node_mut(node)
            .ok_or_else(|| anyhow!("{node:?} was removed"))?;
        Ok(entry.style.set(property, value))
    }

    pub fn remove_style(&mut self, node: NodeId, property: &str) -> Option<String> {
        self.node_mut(node)?.style.remove(property)
    }

    /// Assign the border box the layout engine produced for `node`.
    pub fn set_layout(&mut self, node: NodeId, rect: Rect) {
        if let Some(entry) = self.node_mut(node) {
            entry.layout = rect;
        }
    }

    /// Border box in viewport coordinates; zero for disconnected nodes.
    pub fn bounding_rect(&self, node: NodeId) -> Rect {
        measure(&self.arena, self.root, node)
    }

    pub fn set_scroll_offset(&mut self, node: NodeId, offset: Point) {
        if let Some(entry) = self.node_mut(node) {
            entry.scroll = offset;
        }
    }

    pub fn scroll_offset(&self, node: NodeId) -> Point {
        self.node(node).map_or(Point::ZERO, |entry| entry.scroll)
    }

    pub fn set_text_style(&mut self, node: NodeId, text_style: SpecifiedText) {
        if let Some(entry) = self.node_mut(node) {
            entry.text_style = text_style;
        }
    }

    /// Text style after inheritance from ancestors.
    pub fn computed_text_style(&self, node: NodeId) -> TextStyle {
        let mut computed = TextStyle::default();
        let mut font_size = None;
        let mut line_height = None;
        for ancestor in node.ancestors(&self.arena) {
            let Some(entry) = self.node(ancestor) else {
                continue;
            };
            font_size = font_size.or(entry.text_style.font_size);
            line_height = line_height.or(entry.text_style.line_height);
            if font_size.is_some() && line_height.is_some() {
                break;
            }
        }
        if let Some(size) = font_size {
            computed.font_size = size;
        }
        computed.line_height = line_height;
        computed
    }

    /// Assign the layout of a text node.
    ///
    /// # Errors
    /// Fails if `node` is not a live text node.
    pub fn set_text_run(&mut self, node: NodeId, run: TextRun) -> Result<()> {
        let entry = self
            .node_mut(node)
            .filter(|entry| matches!(entry.kind, NodeKind::Text { .. }))
            .ok_or_else(|| anyhow!("{node:?} is not a text node"))?;
        entry.text_run = Some(run);
        Ok(())
    }

    /// Bounding box of one character of a connected, laid-out text node.
    pub fn char_rect(&self, node: NodeId, index: usize) -> Option<Rect> {
        if !self.is_connected(node) {
            return None;
        }
        let entry = self.node(node)?;
        let NodeKind::Text { text } = &entry.kind else {
            return None;
        };
        if index >= text.chars().count() {
            return None;
        }
        entry.text_run.map(|run| run.char_rect(index))
    }

    /// Watch attribute changes on `target`. An empty filter reports all attributes.
    pub fn observe_attributes(&mut self, target: NodeId, filter: &[&str]) -> ObserverId {
        self.observers.create_mutation(target, filter)
    }

    pub fn create_resize_observer(&mut self) -> ObserverId {
        self.observers.create_resize()
    }

    /// Returns false when `observer` is not a live resize observer.
    pub fn observe_size(&mut self, observer: ObserverId, target: NodeId) -> bool {
        self.observers.observe_size(observer, target)
    }

    pub fn unobserve_size(&mut self, observer: ObserverId, target: NodeId) {
        self.observers.unobserve_size(observer, target);
    }

    /// Disconnect an observer. Disconnecting twice is a no-op.
    pub fn disconnect(&mut self, observer: ObserverId) -> bool {
        self.observers.disconnect(observer)
    }

    pub fn is_observer_active(&self, observer: ObserverId) -> bool {
        self.observers.is_active(observer)
    }

    pub fn active_observers(&self) -> usize {
        self.observers.active_count()
    }

    pub fn animate(&mut self, node: NodeId, name: &str, duration_ms: u64) -> AnimationId {
        self.timeline.start(node, name, duration_ms)
    }

    pub fn advance_time(&mut self, delta_ms: u64) {
        self.timeline.advance(delta_ms);
    }

    pub fn running_animations(&self, node: NodeId) -> impl Iterator<Item = &Animation> {
        self.timeline.running_on(node)
    }

    pub const fn now_ms(&self) -> u64 {
        self.timeline.now_ms()
    }

    /// Drain everything the event loop would deliver now: observer batches first, then
    /// finished animations.
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        let arena = &self.arena;
        let root = self.root;
        let mut events = self
            .observers
            .collect(|node| measure(arena, root, node));
        events.extend(
            self.timeline
                .drain_finished()
                .into_iter()
                .map(|animation| HostEvent::AnimationFinished {
                    animation: animation.id,
                    node: animation.node,
                }),
        );
        events
    }

    pub fn set_anchor_positioning(&mut self, supported: Option<bool>) {
        self.anchor_positioning = supported;
    }

    /// Whether native anchor positioning is available; `None` when it cannot be determined.
    pub const fn anchor_positioning(&self) -> Option<bool> {
        self.anchor_positioning
    }

    /// Live elements under `scope` carrying attribute `name`.
    pub fn elements_with_attribute(&self, scope: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&node| self.attribute(node, name).is_some())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_nodes_measure_zero() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.append_element(root, "DIV").unwrap();
        doc.set_layout(div, Rect::new(0.0, 0.0, 50.0, 20.0));
        assert_eq!(doc.tag_name(div), Some("div"));
        assert_eq!(doc.bounding_rect(div).width, 50.0);

        doc.detach(div);
        assert_eq!(doc.parent(div), None);
        assert_eq!(doc.bounding_rect(div), Rect::ZERO);
    }

    #[test]
    fn computed_text_style_inherits_per_property() {
        let mut doc = Document::new();
        let root = doc.root();
        let outer = doc.append_element(root, "div").unwrap();
        let inner = doc.append_element(outer, "p").unwrap();
        doc.set_text_style(
            outer,
            SpecifiedText {
                font_size: Some(20.0),
                line_height: Some(30.0),
            },
        );
        doc.set_text_style(
            inner,
            SpecifiedText {
                font_size: Some(10.0),
                line_height: None,
            },
        );
        let computed = doc.computed_text_style(inner);
        assert_eq!(computed.font_size, 10.0);
        assert_eq!(computed.line_height, Some(30.0));
    }

    #[test]
    fn removed_nodes_are_gone() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.append_element(root, "div").unwrap();
        let span = doc.append_element(div, "span").unwrap();
        assert!(doc.remove(div));
        assert!(!doc.remove(div));
        assert!(doc.node(span).is_none());
        assert!(doc.set_attribute(span, "id", "x").is_err());
        assert_eq!(doc.live_nodes(), 1);
    }

    #[test]
    fn malformed_attribute_names_are_rejected() {
        let mut doc = Document::new();
        let div = doc.append_element(doc.root(), "div").unwrap();
        assert!(doc.set_attribute(div, "", "x").is_err());
        assert!(doc.set_attribute(div, "data x", "x").is_err());
        assert!(doc.set_attribute(div, "data-x", "a b").is_ok());
        assert_eq!(doc.attribute(div, "data-x"), Some("a b"));
    }
}
