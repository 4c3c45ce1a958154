//! Attribute and size observers.
//!
//! Observers never call back synchronously. Records accumulate while the
//! document is mutated and are handed out in batches by
//! [`Document::take_events`](crate::Document::take_events), one batch per
//! observer, in observer creation order. Size observations are read at
//! delivery time: a target reports when its size differs from the last size it
//! reported, and once initially if it is non-empty when observation starts.

use crate::animation::AnimationId;
use crate::geometry::Rect;
use core::mem;
use indextree::NodeId;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Handle of a registered observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

impl ObserverId {
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// One attribute change on an observed element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub attribute: String,
    pub old_value: Option<String>,
}

/// New border box of an observed element. A detached element reports a zero rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResizeEntry {
    pub target: NodeId,
    pub rect: Rect,
}

/// A batch delivered from the host event loop.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    Mutations {
        observer: ObserverId,
        records: Vec<MutationRecord>,
    },
    Resize {
        observer: ObserverId,
        entries: Vec<ResizeEntry>,
    },
    AnimationFinished {
        animation: AnimationId,
        node: NodeId,
    },
}

#[derive(Debug)]
struct SizeTarget {
    node: NodeId,
    /// Last reported size; `None` until the first delivery after `observe`.
    last: Option<Rect>,
}

#[derive(Debug)]
enum Observer {
    Mutation {
        target: NodeId,
        /// Attribute names to report; empty reports every attribute.
        filter: SmallVec<[String; 2]>,
        pending: Vec<MutationRecord>,
    },
    Resize {
        targets: Vec<SizeTarget>,
    },
}

#[derive(Debug, Default)]
pub struct ObserverRegistry {
    next_id: u64,
    observers: BTreeMap<ObserverId, Observer>,
}

impl ObserverRegistry {
    fn mint(&mut self) -> ObserverId {
        self.next_id += 1;
        ObserverId(self.next_id)
    }

    pub fn create_mutation(&mut self, target: NodeId, filter: &[&str]) -> ObserverId {
        let id = self.mint();
        self.observers.insert(
            id,
            Observer::Mutation {
                target,
                filter: filter.iter().map(|name| (*name).to_owned()).collect(),
                pending: Vec::new(),
            },
        );
        id
    }

    pub fn create_resize(&mut self) -> ObserverId {
        let id = self.mint();
        self.observers
            .insert(id, Observer::Resize { targets: Vec::new() });
        id
    }

    /// Start observing `node`. Observing an already observed node is a no-op.
    pub fn observe_size(&mut self, observer: ObserverId, node: NodeId) -> bool {
        let Some(Observer::Resize { targets }) = self.observers.get_mut(&observer) else {
            return false;
        };
        if !targets.iter().any(|target| target.node == node) {
            targets.push(SizeTarget { node, last: None });
        }
        true
    }

    pub fn unobserve_size(&mut self, observer: ObserverId, node: NodeId) {
        if let Some(Observer::Resize { targets }) = self.observers.get_mut(&observer) {
            targets.retain(|target| target.node != node);
        }
    }

    /// Drop an observer and its undelivered records. Unknown ids are ignored.
    pub fn disconnect(&mut self, observer: ObserverId) -> bool {
        self.observers.remove(&observer).is_some()
    }

    pub fn is_active(&self, observer: ObserverId) -> bool {
        self.observers.contains_key(&observer)
    }

    pub fn active_count(&self) -> usize {
        self.observers.len()
    }

    pub fn record_attribute(&mut self, node: NodeId, attribute: &str, old_value: Option<&str>) {
        for observer in self.observers.values_mut() {
            if let Observer::Mutation {
                target,
                filter,
                pending,
            } = observer
                && *target == node
                && (filter.is_empty() || filter.iter().any(|name| name == attribute))
            {
                pending.push(MutationRecord {
                    target: node,
                    attribute: attribute.to_owned(),
                    old_value: old_value.map(str::to_owned),
                });
            }
        }
    }

    /// Collect one batch per observer with something to report.
    pub fn collect<F>(&mut self, measure: F) -> Vec<HostEvent>
    where
        F: Fn(NodeId) -> Rect,
    {
        let mut events = Vec::new();
        for (&id, observer) in &mut self.observers {
            match observer {
                Observer::Mutation { pending, .. } => {
                    if !pending.is_empty() {
                        events.push(HostEvent::Mutations {
                            observer: id,
                            records: mem::take(pending),
                        });
                    }
                }
                Observer::Resize { targets } => {
                    let entries: Vec<ResizeEntry> = targets
                        .iter_mut()
                        .filter_map(|target| {
                            let current = measure(target.node);
                            let report = target
                                .last
                                .map_or(!current.is_empty(), |last| !last.same_size(&current));
                            target.last = Some(current);
                            report.then_some(ResizeEntry {
                                target: target.node,
                                rect: current,
                            })
                        })
                        .collect();
                    if !entries.is_empty() {
                        events.push(HostEvent::Resize {
                            observer: id,
                            entries,
                        });
                    }
                }
            }
        }
        events
    }
}
