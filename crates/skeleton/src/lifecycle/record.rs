use crate::adapter::{HostDocument, WatcherId};
use crate::factory::Role;
use anyhow::Result;
use dom::Rect;
use log::warn;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum State {
    Disabled,
    Enabled,
    /// Terminal.
    Disposed,
}

/// A materialized decoration node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoration<N> {
    pub node: N,
    /// Candidate the decoration covers.
    pub owner: N,
    pub role: Role,
    /// Fade-out duration for overlays.
    pub fade_out_ms: u64,
}

/// Something the engine overwrites on a host node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Style(&'static str),
    Attr(&'static str),
}

/// Previous values of everything overwritten, restored in reverse order.
#[derive(Debug)]
pub struct SavedValues<N> {
    entries: Vec<(N, Slot, Option<String>)>,
}

impl<N> Default for SavedValues<N> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<N: Copy + Eq> SavedValues<N> {
    /// Overwrite `slot` on `node`, remembering the value it had before the
    /// first overwrite.
    ///
    /// # Errors
    /// Fails when the host rejects the write, typically because `node` is gone.
    pub fn apply<H>(&mut self, host: &mut H, node: N, slot: Slot, value: &str) -> Result<()>
    where
        H: HostDocument<Handle = N>,
    {
        let saved = self
            .entries
            .iter()
            .any(|(saved_node, saved_slot, _)| *saved_node == node && *saved_slot == slot);
        if !saved {
            let previous = match slot {
                Slot::Style(property) => host.inline_style(node, property),
                Slot::Attr(name) => host.attr(node, name).map(str::to_owned),
            };
            self.entries.push((node, slot, previous));
        }
        match slot {
            Slot::Style(property) => host.set_inline_style(node, property, value),
            Slot::Attr(name) => host.set_attr(node, name, value),
        }
    }

    /// Put every saved value back. Nodes that are gone are skipped.
    pub fn restore<H>(&mut self, host: &mut H)
    where
        H: HostDocument<Handle = N>,
    {
        while let Some((node, slot, previous)) = self.entries.pop() {
            let restored = match (slot, previous) {
                (Slot::Style(property), Some(value)) => host.set_inline_style(node, property, &value),
                (Slot::Style(property), None) => {
                    host.clear_inline_style(node, property);
                    Ok(())
                }
                (Slot::Attr(name), Some(value)) => host.set_attr(node, name, &value),
                (Slot::Attr(name), None) => {
                    host.clear_attr(node, name);
                    Ok(())
                }
            };
            if let Err(err) = restored {
                warn!("could not restore {slot:?}: {err}");
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything one attached root owns.
#[derive(Debug)]
pub struct LifecycleRecord<N> {
    pub root: N,
    pub attachment: u64,
    pub state: State,
    pub enablement: Option<WatcherId>,
    pub resize: Option<WatcherId>,
    pub observed: HashSet<N>,
    /// Rectangles the last recomputation measured.
    pub measured: HashMap<N, Rect>,
    pub decorations: Vec<Decoration<N>>,
    pub root_values: SavedValues<N>,
    pub content_values: SavedValues<N>,
}

impl<N> LifecycleRecord<N> {
    pub fn new(root: N, attachment: u64) -> Self {
        Self {
            root,
            attachment,
            state: State::Disabled,
            enablement: None,
            resize: None,
            observed: HashSet::new(),
            measured: HashMap::new(),
            decorations: Vec::new(),
            root_values: SavedValues::default(),
            content_values: SavedValues::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::Document;

    #[test]
    fn restore_puts_back_the_first_saved_value() {
        let mut doc = Document::new();
        let div = doc.append_element(doc.root(), "div").unwrap();
        doc.set_style(div, "color", "red").unwrap();
        let mut saved = SavedValues::default();

        saved.apply(&mut doc, div, Slot::Style("color"), "transparent").unwrap();
        saved.apply(&mut doc, div, Slot::Style("color"), "blue").unwrap();
        saved.apply(&mut doc, div, Slot::Attr("aria-busy"), "true").unwrap();
        assert_eq!(doc.attribute(div, "aria-busy"), Some("true"));

        saved.restore(&mut doc);
        assert!(saved.is_empty());
        assert_eq!(doc.style(div).and_then(|style| style.get("color")), Some("red"));
        assert_eq!(doc.attribute(div, "aria-busy"), None);

        saved.restore(&mut doc);
        assert_eq!(doc.style(div).and_then(|style| style.get("color")), Some("red"));
    }
}
