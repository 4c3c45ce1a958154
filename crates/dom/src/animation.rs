//! A manual animation clock.
//!
//! Animations only run when the embedder advances time. Finished animations
//! are reported through the event queue so that code awaiting completion is
//! driven by the same loop as the observers.

use core::mem;
use indextree::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

impl AnimationId {
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// A running or finished animation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Animation {
    pub id: AnimationId,
    pub node: NodeId,
    pub name: String,
    pub ends_at_ms: u64,
}

#[derive(Debug, Default)]
pub struct Timeline {
    now_ms: u64,
    next_id: u64,
    running: Vec<Animation>,
    finished: Vec<Animation>,
}

impl Timeline {
    pub fn start(&mut self, node: NodeId, name: &str, duration_ms: u64) -> AnimationId {
        self.next_id += 1;
        let animation = Animation {
            id: AnimationId(self.next_id),
            node,
            name: name.to_owned(),
            ends_at_ms: self.now_ms.saturating_add(duration_ms),
        };
        let id = animation.id;
        if duration_ms == 0 {
            self.finished.push(animation);
        } else {
            self.running.push(animation);
        }
        id
    }

    pub fn advance(&mut self, delta_ms: u64) {
        self.now_ms = self.now_ms.saturating_add(delta_ms);
        let now = self.now_ms;
        let (done, still_running): (Vec<_>, Vec<_>) = mem::take(&mut self.running)
            .into_iter()
            .partition(|animation| animation.ends_at_ms <= now);
        self.running = still_running;
        self.finished.extend(done);
    }

    pub fn drain_finished(&mut self) -> Vec<Animation> {
        mem::take(&mut self.finished)
    }

    pub fn running_on(&self, node: NodeId) -> impl Iterator<Item = &Animation> {
        self.running
            .iter()
            .filter(move |animation| animation.node == node)
    }

    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }
}
