//! Per-root lifecycle.
//!
//! Two watchers drive a controller: the enablement watcher on the root's
//! enable attribute, alive from attach to dispose, and the size watcher,
//! alive only while enabled. Every size batch triggers one recomputation,
//! which tears down the previous decorations and rebuilds them from scratch.
//! Failures are logged and swallowed; the engine is a best-effort layer.

mod plan;
mod record;
mod removals;

pub use plan::{Plan, PlannedDecoration, anchor_name, plan};
pub use record::{Decoration, LifecycleRecord, SavedValues, Slot, State};
pub use removals::PendingRemovals;

use crate::adapter::{HostDocument, WatcherId};
use crate::config::{EngineConfig, is_enabled};
use crate::factory::{Role, materialize};
use crate::participation::ParticipationRules;
use crate::positioning::PositionMode;
use anyhow::Result;
use core::fmt::Debug;
use core::hash::Hash;
use dom::Rect;
use log::{debug, trace, warn};
use std::collections::HashSet;

pub const FADE_IN_ANIMATION: &str = "sk-fade-in";
pub const FADE_OUT_ANIMATION: &str = "sk-fade-out";

/// Engine state a controller works against.
pub struct Context<'env, H: HostDocument> {
    pub host: &'env mut H,
    pub config: &'env EngineConfig,
    pub rules: &'env ParticipationRules,
    pub mode: PositionMode,
    pub removals: &'env mut PendingRemovals<H::Handle>,
}

#[derive(Debug)]
pub struct Controller<N> {
    record: LifecycleRecord<N>,
}

impl<N: Copy + Eq + Hash + Debug> Controller<N> {
    /// Start watching the enable attribute, enabling at once if it is already set.
    pub fn attach<H>(cx: &mut Context<'_, H>, root: N, attachment: u64) -> Self
    where
        H: HostDocument<Handle = N>,
    {
        let mut record = LifecycleRecord::new(root, attachment);
        record.enablement = Some(cx.host.watch_attribute(root, &cx.config.enable_attribute));
        let mut controller = Self { record };
        if is_enabled(cx.host.attr(root, &cx.config.enable_attribute)) {
            controller.enable(cx);
        }
        controller
    }

    pub const fn root(&self) -> N {
        self.record.root
    }

    pub const fn attachment(&self) -> u64 {
        self.record.attachment
    }

    pub const fn state(&self) -> State {
        self.record.state
    }

    pub fn decoration_nodes(&self) -> Vec<N> {
        self.record
            .decorations
            .iter()
            .map(|decoration| decoration.node)
            .collect()
    }

    pub fn is_enablement_watcher(&self, watcher: WatcherId) -> bool {
        self.record.enablement == Some(watcher)
    }

    pub fn is_resize_watcher(&self, watcher: WatcherId) -> bool {
        self.record.resize == Some(watcher)
    }

    /// The enable attribute changed.
    pub fn on_attributes<H>(&mut self, cx: &mut Context<'_, H>)
    where
        H: HostDocument<Handle = N>,
    {
        let enabled = is_enabled(cx.host.attr(self.record.root, &cx.config.enable_attribute));
        match (self.record.state, enabled) {
            (State::Disabled, true) => self.enable(cx),
            (State::Enabled, false) => self.disable(cx),
            _ => {}
        }
    }

    /// A batch of size changes arrived.
    pub fn on_resize<H>(&mut self, cx: &mut Context<'_, H>, entries: &[(N, Rect)])
    where
        H: HostDocument<Handle = N>,
    {
        if self.record.state != State::Enabled {
            return;
        }
        let root = self.record.root;
        let root_gone = entries
            .iter()
            .any(|(node, rect)| *node == root && rect.is_empty())
            && cx.host.parent_node(root).is_none();
        if root_gone {
            debug!("root {root:?} left the document, disabling");
            self.disable(cx);
            return;
        }
        let stale = entries
            .iter()
            .any(|(node, rect)| self.record.measured.get(node) != Some(rect));
        if stale {
            self.recompute(cx);
        } else {
            trace!("size batch for {root:?} carries nothing new");
        }
    }

    pub fn enable<H>(&mut self, cx: &mut Context<'_, H>)
    where
        H: HostDocument<Handle = N>,
    {
        if self.record.state != State::Disabled {
            return;
        }
        let root = self.record.root;
        debug!("enabling decorations on {root:?}");
        self.record.state = State::Enabled;
        if let Err(err) = self.mark_root(cx) {
            warn!("could not prepare root {root:?}: {err}");
        }
        let watcher = cx.host.create_size_watcher();
        cx.host.watch_size(watcher, root);
        self.record.resize = Some(watcher);
        self.record.observed.insert(root);
    }

    fn mark_root<H>(&mut self, cx: &mut Context<'_, H>) -> Result<()>
    where
        H: HostDocument<Handle = N>,
    {
        let root = self.record.root;
        let values = &mut self.record.root_values;
        values.apply(cx.host, root, Slot::Style("pointer-events"), "none")?;
        values.apply(cx.host, root, Slot::Attr("aria-busy"), "true")?;
        if cx.mode == PositionMode::Float && cx.host.inline_style(root, "position").is_none() {
            values.apply(cx.host, root, Slot::Style("position"), "relative")?;
        }
        Ok(())
    }

    /// Restore everything and stop size observation. The enablement watcher stays.
    pub fn disable<H>(&mut self, cx: &mut Context<'_, H>)
    where
        H: HostDocument<Handle = N>,
    {
        if self.record.state != State::Enabled {
            return;
        }
        debug!("disabling decorations on {:?}", self.record.root);
        self.clear_decorations(cx);
        self.record.content_values.restore(cx.host);
        self.record.root_values.restore(cx.host);
        if let Some(watcher) = self.record.resize.take() {
            cx.host.disconnect_watcher(watcher);
        }
        self.record.observed.clear();
        self.record.measured.clear();
        self.record.state = State::Disabled;
    }

    /// Tear everything down. Disposing twice is a no-op.
    pub fn dispose<H>(&mut self, cx: &mut Context<'_, H>)
    where
        H: HostDocument<Handle = N>,
    {
        if self.record.state == State::Disposed {
            return;
        }
        if let Some(watcher) = self.record.enablement.take() {
            cx.host.disconnect_watcher(watcher);
        }
        self.disable(cx);
        self.record.state = State::Disposed;
    }

    /// Remove skeletons at once; start fading overlays out and hand them to
    /// the pending removals.
    fn clear_decorations<H>(&mut self, cx: &mut Context<'_, H>)
    where
        H: HostDocument<Handle = N>,
    {
        for decoration in self.record.decorations.drain(..) {
            match decoration.role {
                Role::Skeleton => cx.host.remove_node(decoration.node),
                Role::Overlay => {
                    let animation = format!("{FADE_OUT_ANIMATION} {}ms forwards", decoration.fade_out_ms);
                    if let Err(err) = cx.host.set_inline_style(decoration.node, "animation", &animation) {
                        debug!("overlay {:?} already gone: {err}", decoration.node);
                    }
                    let transition =
                        cx.host
                            .start_transition(decoration.node, FADE_OUT_ANIMATION, decoration.fade_out_ms);
                    cx.removals.track(transition, decoration.node);
                }
            }
        }
    }

    fn recompute<H>(&mut self, cx: &mut Context<'_, H>)
    where
        H: HostDocument<Handle = N>,
    {
        let root = self.record.root;
        let _span = tracing::info_span!("skeleton.recompute").entered();
        self.clear_decorations(cx);
        self.record.content_values.restore(cx.host);

        let plan = plan(
            &*cx.host,
            root,
            self.record.attachment,
            cx.rules,
            &cx.config.tables,
            cx.mode,
        );
        trace!(
            "{root:?}: {} candidate(s), {} decoration(s)",
            plan.candidates.len(),
            plan.decorations.len()
        );

        for (node, slot, value) in &plan.content {
            if let Err(err) = self.record.content_values.apply(cx.host, *node, *slot, value) {
                warn!("could not update {node:?}: {err}");
            }
        }
        for planned in &plan.decorations {
            match self.build_decoration(cx, planned) {
                Ok(decoration) => self.record.decorations.push(decoration),
                Err(err) => warn!("could not decorate {:?}: {err}", planned.owner),
            }
        }
        self.sync_observed(cx, &plan);
    }

    fn build_decoration<H>(&self, cx: &mut Context<'_, H>, planned: &PlannedDecoration<N>) -> Result<Decoration<N>>
    where
        H: HostDocument<Handle = N>,
    {
        let node = materialize(cx.host, &cx.config.factories, planned.role)?;
        let placed = Self::style_decoration(cx.host, node, planned)
            .and_then(|()| cx.host.insert_child(self.record.root, node));
        if let Err(err) = placed {
            cx.host.remove_node(node);
            return Err(err);
        }
        if planned.role == Role::Overlay {
            cx.host.start_transition(node, FADE_IN_ANIMATION, planned.fade_in_ms);
        }
        Ok(Decoration {
            node,
            owner: planned.owner,
            role: planned.role,
            fade_out_ms: planned.fade_out_ms,
        })
    }

    fn style_decoration<H>(host: &mut H, node: N, planned: &PlannedDecoration<N>) -> Result<()>
    where
        H: HostDocument<Handle = N>,
    {
        for (property, value) in planned.placement.styles() {
            host.set_inline_style(node, property, &value)?;
        }
        if planned.role == Role::Overlay {
            let animation = format!("{FADE_IN_ANIMATION} {}ms", planned.fade_in_ms);
            host.set_inline_style(node, "animation", &animation)?;
        }
        Ok(())
    }

    /// Observe the root and every current candidate, and nothing else.
    fn sync_observed<H>(&mut self, cx: &mut Context<'_, H>, plan: &Plan<N>)
    where
        H: HostDocument<Handle = N>,
    {
        let Some(watcher) = self.record.resize else {
            return;
        };
        let root = self.record.root;
        let wanted: HashSet<N> = plan
            .candidates
            .iter()
            .map(|(node, _)| *node)
            .chain([root])
            .collect();
        for stale in self.record.observed.difference(&wanted) {
            cx.host.unwatch_size(watcher, *stale);
        }
        for fresh in wanted.difference(&self.record.observed) {
            cx.host.watch_size(watcher, *fresh);
        }
        self.record.observed = wanted;
        self.record.measured = plan.candidates.iter().copied().collect();
        self.record.measured.insert(root, cx.host.border_box(root));
    }
}
