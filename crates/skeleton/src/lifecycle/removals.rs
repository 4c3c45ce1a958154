use crate::adapter::{HostDocument, TransitionId};
use core::fmt::Debug;
use log::trace;
use std::collections::HashMap;

/// Overlays fading out, removed when their transition ends.
///
/// Kept by the engine rather than by a lifecycle record so removal still
/// happens after the record is disposed.
#[derive(Debug)]
pub struct PendingRemovals<N> {
    fading: HashMap<TransitionId, N>,
}

impl<N> Default for PendingRemovals<N> {
    fn default() -> Self {
        Self {
            fading: HashMap::new(),
        }
    }
}

impl<N: Copy + Debug> PendingRemovals<N> {
    pub fn track(&mut self, transition: TransitionId, node: N) {
        self.fading.insert(transition, node);
    }

    /// Remove the node whose fade ended. Unknown transitions are ignored.
    pub fn finish<H>(&mut self, transition: TransitionId, host: &mut H) -> bool
    where
        H: HostDocument<Handle = N>,
    {
        let Some(node) = self.fading.remove(&transition) else {
            return false;
        };
        trace!("fade-out of {node:?} finished");
        host.remove_node(node);
        true
    }

    pub fn len(&self) -> usize {
        self.fading.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fading.is_empty()
    }
}
