//! Which elements of a subtree receive decorations.
//!
//! Every element either carries its own decision (an explicit kind marker, or
//! an implicitly excluded tag) or inherits the nearest decision above it, up
//! to and including the root. Where no such decision exists on the path, an
//! implicitly included tag opts itself and its unmarked descendants in.

use crate::adapter::TreeAdapter;
use crate::options::{DECORATION_ATTR, KIND_ATTR, Kind};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

/// Tags that behave as if marked `none`.
pub const IMPLICIT_EXCLUDE: &[&str] = &[
    "script", "style", "template", "noscript", "head", "meta", "link", "br",
];

/// Tags decorated even without any marker.
pub const IMPLICIT_INCLUDE: &[&str] = &[
    "img", "svg", "video", "canvas", "iframe", "picture", "input", "button", "select", "textarea",
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "a", "span", "label", "li", "td", "th", "code", "pre",
    "strong", "em", "b", "i", "small",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Participation {
    Included,
    Excluded,
}

/// A decision that cascades to unmarked descendants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    OptIn,
    OptOut,
}

/// Compiled tag tables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParticipationRules {
    implicit_exclude: HashSet<String>,
    implicit_include: HashSet<String>,
}

impl Default for ParticipationRules {
    fn default() -> Self {
        static BUILTIN: OnceCell<ParticipationRules> = OnceCell::new();
        BUILTIN
            .get_or_init(|| Self::build(IMPLICIT_EXCLUDE.iter().copied(), IMPLICIT_INCLUDE.iter().copied()))
            .clone()
    }
}

impl ParticipationRules {
    pub fn build<'tag>(
        implicit_exclude: impl IntoIterator<Item = &'tag str>,
        implicit_include: impl IntoIterator<Item = &'tag str>,
    ) -> Self {
        let lower = |tag: &str| tag.trim().to_ascii_lowercase();
        Self {
            implicit_exclude: implicit_exclude.into_iter().map(lower).collect(),
            implicit_include: implicit_include.into_iter().map(lower).collect(),
        }
    }

    pub fn is_implicitly_excluded(&self, tag: &str) -> bool {
        self.implicit_exclude.contains(tag)
    }

    pub fn is_implicitly_included(&self, tag: &str) -> bool {
        self.implicit_include.contains(tag)
    }

    fn own_decision<A: TreeAdapter>(&self, adapter: &A, node: A::Handle) -> Option<Decision> {
        if let Some(marker) = adapter.attr(node, KIND_ATTR) {
            return Some(if Kind::from(marker).is_none() {
                Decision::OptOut
            } else {
                Decision::OptIn
            });
        }
        adapter
            .local_name(node)
            .filter(|tag| self.is_implicitly_excluded(tag))
            .map(|_| Decision::OptOut)
    }

    /// The decision `node` hands down: its own, else the inherited one, else
    /// an opt-in when its tag is implicitly included.
    fn effective<A: TreeAdapter>(&self, adapter: &A, node: A::Handle, inherited: Option<Decision>) -> Option<Decision> {
        self.own_decision(adapter, node)
            .or(inherited)
            .or_else(|| self.implied(adapter, node))
    }

    fn implied<A: TreeAdapter>(&self, adapter: &A, node: A::Handle) -> Option<Decision> {
        adapter
            .local_name(node)
            .is_some_and(|tag| self.is_implicitly_included(tag))
            .then_some(Decision::OptIn)
    }

    /// Decide one element by walking its ancestors up to `root`.
    ///
    /// The root itself, non-elements, decoration nodes and nodes outside the
    /// root's subtree are always excluded.
    pub fn classify<A: TreeAdapter>(&self, adapter: &A, root: A::Handle, node: A::Handle) -> Participation {
        if node == root || adapter.local_name(node).is_none() {
            return Participation::Excluded;
        }
        let mut explicit = None;
        let mut implied = None;
        let mut current = Some(node);
        let mut reached_root = false;
        while let Some(ancestor) = current {
            if adapter.attr(ancestor, DECORATION_ATTR).is_some() {
                return Participation::Excluded;
            }
            if explicit.is_none() {
                explicit = self.own_decision(adapter, ancestor);
            }
            if implied.is_none() {
                implied = self.implied(adapter, ancestor);
            }
            if ancestor == root {
                reached_root = true;
                break;
            }
            current = adapter.parent_node(ancestor);
        }
        if !reached_root {
            return Participation::Excluded;
        }
        settle(explicit.or(implied))
    }

    /// Every participating element below `root`, in document order.
    pub fn select<A: TreeAdapter>(&self, adapter: &A, root: A::Handle) -> Vec<A::Handle> {
        let mut selected = Vec::new();
        if adapter.attr(root, DECORATION_ATTR).is_some() {
            return selected;
        }
        let mut stack: Vec<(A::Handle, Option<Decision>)> = Vec::new();
        push_children(adapter, root, self.effective(adapter, root, None), &mut stack);
        while let Some((node, inherited)) = stack.pop() {
            if adapter.local_name(node).is_none() || adapter.attr(node, DECORATION_ATTR).is_some() {
                continue;
            }
            let decision = self.effective(adapter, node, inherited);
            if settle(decision) == Participation::Included {
                selected.push(node);
            }
            push_children(adapter, node, decision, &mut stack);
        }
        selected
    }
}

fn settle(decision: Option<Decision>) -> Participation {
    if decision == Some(Decision::OptIn) {
        Participation::Included
    } else {
        Participation::Excluded
    }
}

/// Push children in reverse so the stack pops them in tree order.
fn push_children<A: TreeAdapter>(
    adapter: &A,
    node: A::Handle,
    decision: Option<Decision>,
    stack: &mut Vec<(A::Handle, Option<Decision>)>,
) {
    stack.extend(
        adapter
            .child_nodes(node)
            .into_iter()
            .rev()
            .map(|child| (child, decision)),
    );
}
