//! Read phase of a recomputation.
//!
//! Everything is measured before anything is written so the host never sees
//! interleaved reads and writes.

use super::record::Slot;
use crate::adapter::{LayoutAdapter, TreeAdapter};
use crate::config::RuleTables;
use crate::factory::Role;
use crate::geometry::{Shape, compute_geometry};
use crate::options::Kind;
use crate::participation::ParticipationRules;
use crate::positioning::{Mode, Placement, PositionMode, infer_kind, place};
use dom::Rect;
use log::trace;

/// One decoration to create.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedDecoration<N> {
    pub owner: N,
    pub role: Role,
    pub placement: Placement,
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
}

/// Result of the read phase.
#[derive(Debug)]
pub struct Plan<N> {
    /// Every selected candidate with its measured border box, decorated or not.
    pub candidates: Vec<(N, Rect)>,
    /// Writes applied to candidates: content hiding and anchor names.
    pub content: Vec<(N, Slot, String)>,
    pub decorations: Vec<PlannedDecoration<N>>,
}

/// Anchor name of the `index`-th candidate of an attachment.
pub fn anchor_name(attachment: u64, index: usize) -> String {
    format!("--sk-{attachment}-{index}")
}

pub fn plan<A: LayoutAdapter>(
    adapter: &A,
    root: A::Handle,
    attachment: u64,
    rules: &ParticipationRules,
    tables: &RuleTables,
    mode: PositionMode,
) -> Plan<A::Handle> {
    let resolver = tables.resolver();
    let container = adapter.border_box(root);
    let scroll = adapter.scroll_position(root);
    let mut plan = Plan {
        candidates: Vec::new(),
        content: Vec::new(),
        decorations: Vec::new(),
    };
    let mut overlays = Vec::new();

    for (index, node) in rules.select(adapter, root).into_iter().enumerate() {
        if is_covered(adapter, root, node, &overlays) {
            trace!("{node:?} sits under an overlay");
            continue;
        }
        let rect = adapter.border_box(node);
        plan.candidates.push((node, rect));
        let mut options = resolver.resolve_element(adapter, node);

        let (rects, hide) = if options.kind == Some(Kind::Overlay) {
            overlays.push(node);
            if rect.is_empty() {
                continue;
            }
            (vec![Rect::new(0.0, 0.0, rect.width, rect.height)], None)
        } else {
            let Some(geometry) = compute_geometry(adapter, node, rect, &options) else {
                continue;
            };
            let hide = match geometry.shape {
                Shape::Text => ("color", "transparent"),
                Shape::Generic => ("opacity", "0"),
            };
            (geometry.rects, Some(hide))
        };
        let Some(first) = rects.first() else {
            continue;
        };
        if options.kind.is_none() {
            options.kind = Some(infer_kind(first));
        }

        let anchor = (mode == PositionMode::Anchor).then(|| anchor_name(attachment, index));
        if let Some(name) = &anchor {
            plan.content.push((node, Slot::Style("anchor-name"), name.clone()));
        }
        if let Some((property, value)) = hide {
            plan.content.push((node, Slot::Style(property), value.to_owned()));
        }

        let placement_mode = anchor
            .as_deref()
            .map_or(Mode::Float { scroll }, |name| Mode::Anchor { name });
        let role = if options.kind == Some(Kind::Overlay) {
            Role::Overlay
        } else {
            Role::Skeleton
        };
        trace!("{node:?}: {} placeholder(s) as {role:?}", rects.len());
        plan.decorations.extend(rects.iter().map(|placeholder| PlannedDecoration {
            owner: node,
            role,
            placement: place(&options, placeholder, &rect, &container, placement_mode),
            fade_in_ms: options.fade_in_ms.unwrap_or_default(),
            fade_out_ms: options.fade_out_ms.unwrap_or_default(),
        }));
    }
    plan
}

/// Whether an ancestor of `node` below `root` is one of `overlays`.
fn is_covered<A: TreeAdapter>(adapter: &A, root: A::Handle, node: A::Handle, overlays: &[A::Handle]) -> bool {
    if overlays.is_empty() {
        return false;
    }
    let mut current = adapter.parent_node(node);
    while let Some(ancestor) = current {
        if ancestor == root {
            return false;
        }
        if overlays.contains(&ancestor) {
            return true;
        }
        current = adapter.parent_node(ancestor);
    }
    false
}
