//! The engine facade.
//!
//! An [`Engine`] owns the host document and every attached root. The host
//! event loop calls [`Engine::pump`] whenever it has batches to deliver; each
//! batch is handled to completion before the next one. Everything is
//! single-threaded: the engine state lives behind `Rc<RefCell<_>>` so that
//! disposal handles can reach it without borrowing the engine.

use crate::adapter::{HostDocument, Signal};
use crate::config::EngineConfig;
use crate::lifecycle::{Context, Controller, PendingRemovals, State};
use crate::participation::ParticipationRules;
use crate::positioning::PositionMode;
use core::cell::{Cell, RefCell};
use core::fmt;
use log::{debug, info, trace, warn};
use std::rc::{Rc, Weak};
use tracing::info_span;

/// Upper bound on pump rounds in [`Engine::flush`].
const MAX_FLUSH_ROUNDS: usize = 16;

struct Inner<H: HostDocument> {
    host: H,
    config: EngineConfig,
    rules: ParticipationRules,
    mode: PositionMode,
    next_attachment: u64,
    controllers: Vec<Controller<H::Handle>>,
    removals: PendingRemovals<H::Handle>,
}

/// Split the engine state into a controller context and the controller list.
macro_rules! context {
    ($inner:expr) => {{
        let Inner {
            host,
            config,
            rules,
            mode,
            controllers,
            removals,
            ..
        } = $inner;
        (
            Context {
                host,
                config: &*config,
                rules: &*rules,
                mode: *mode,
                removals,
            },
            controllers,
        )
    }};
}

impl<H: HostDocument> Inner<H> {
    fn position(&self, root: H::Handle) -> Option<usize> {
        self.controllers
            .iter()
            .position(|controller| controller.root() == root)
    }

    fn attach(&mut self, root: H::Handle) -> u64 {
        if let Some(index) = self.position(root) {
            debug!("{root:?} is already attached, replacing the previous attachment");
            let attachment = self.controllers[index].attachment();
            self.dispose(root, attachment);
        }
        self.next_attachment += 1;
        let attachment = self.next_attachment;
        let (mut cx, controllers) = context!(self);
        let controller = Controller::attach(&mut cx, root, attachment);
        controllers.push(controller);
        attachment
    }

    fn dispose(&mut self, root: H::Handle, attachment: u64) -> bool {
        let Some(index) = self
            .controllers
            .iter()
            .position(|controller| controller.root() == root && controller.attachment() == attachment)
        else {
            return false;
        };
        let (mut cx, controllers) = context!(self);
        let mut controller = controllers.remove(index);
        controller.dispose(&mut cx);
        true
    }

    fn dispatch(&mut self, signal: Signal<H::Handle>) {
        let (mut cx, controllers) = context!(self);
        match signal {
            Signal::Attributes { watcher, targets } => {
                trace!("attribute batch for {watcher:?} ({} record(s))", targets.len());
                if let Some(controller) = controllers
                    .iter_mut()
                    .find(|controller| controller.is_enablement_watcher(watcher))
                {
                    controller.on_attributes(&mut cx);
                }
            }
            Signal::Resized { watcher, entries } => {
                if let Some(controller) = controllers
                    .iter_mut()
                    .find(|controller| controller.is_resize_watcher(watcher))
                {
                    controller.on_resize(&mut cx, &entries);
                }
            }
            Signal::TransitionEnd { transition, .. } => {
                cx.removals.finish(transition, cx.host);
            }
        }
    }
}

/// Decoration engine over a host document.
pub struct Engine<H: HostDocument> {
    inner: Rc<RefCell<Inner<H>>>,
}

impl<H: HostDocument> fmt::Debug for Engine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Engine");
        if let Ok(inner) = self.inner.try_borrow() {
            debug
                .field("mode", &inner.mode)
                .field("attached", &inner.controllers.len())
                .field("fading", &inner.removals.len());
        }
        debug.finish_non_exhaustive()
    }
}

impl<H: HostDocument + 'static> Engine<H> {
    /// Create an engine. Anchor positioning support is probed here, once.
    pub fn new(host: H, config: EngineConfig) -> Self {
        let mode = PositionMode::from_probe(host.probe_anchor_positioning(), config.force_float);
        info!("skeleton engine using {mode:?} positioning");
        let rules = config.tables.participation();
        Self {
            inner: Rc::new(RefCell::new(Inner {
                host,
                config,
                rules,
                mode,
                next_attachment: 0,
                controllers: Vec::new(),
                removals: PendingRemovals::default(),
            })),
        }
    }

    /// Start managing `root`. Attaching a root twice replaces the earlier
    /// attachment, whose disposer then does nothing.
    pub fn attach(&self, root: H::Handle) -> Disposer {
        let attachment = self.inner.borrow_mut().attach(root);
        let engine = Rc::downgrade(&self.inner);
        Disposer::new(move || dispose_attachment(&engine, root, attachment))
    }

    /// Dispose whatever is attached to `root`.
    pub fn detach(&self, root: H::Handle) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(index) = inner.position(root) else {
            return false;
        };
        let attachment = inner.controllers[index].attachment();
        inner.dispose(root, attachment)
    }

    /// Deliver every batch the host has queued. Returns the number of batches handled.
    pub fn pump(&self) -> usize {
        let Ok(mut inner) = self.inner.try_borrow_mut() else {
            warn!("pump called while the engine is busy");
            return 0;
        };
        let _span = info_span!("skeleton.pump").entered();
        let signals = inner.host.drain_signals();
        let count = signals.len();
        for signal in signals {
            inner.dispatch(signal);
        }
        count
    }

    /// Pump until the host has nothing left to deliver.
    pub fn flush(&self) {
        for _ in 0..MAX_FLUSH_ROUNDS {
            if self.pump() == 0 {
                return;
            }
        }
        debug!("still delivering after {MAX_FLUSH_ROUNDS} rounds");
    }

    /// Run `action` against the host document, e.g. to change layout or attributes.
    pub fn with_host<R>(&self, action: impl FnOnce(&mut H) -> R) -> R {
        action(&mut self.inner.borrow_mut().host)
    }

    /// Materialized decoration nodes of `root`, in creation order.
    pub fn decorations(&self, root: H::Handle) -> Vec<H::Handle> {
        let inner = self.inner.borrow();
        inner
            .position(root)
            .map(|index| inner.controllers[index].decoration_nodes())
            .unwrap_or_default()
    }

    /// Lifecycle state of `root`; `None` when it is not attached.
    pub fn state(&self, root: H::Handle) -> Option<State> {
        let inner = self.inner.borrow();
        inner.position(root).map(|index| inner.controllers[index].state())
    }

    pub fn mode(&self) -> PositionMode {
        self.inner.borrow().mode
    }

    /// Overlays still fading out.
    pub fn pending_removals(&self) -> usize {
        self.inner.borrow().removals.len()
    }
}

fn dispose_attachment<H: HostDocument>(engine: &Weak<RefCell<Inner<H>>>, root: H::Handle, attachment: u64) -> bool {
    let Some(inner) = engine.upgrade() else {
        return true;
    };
    let Ok(mut inner) = inner.try_borrow_mut() else {
        warn!("dispose called while the engine is busy, try again later");
        return false;
    };
    inner.dispose(root, attachment);
    true
}

/// Handle returned by [`Engine::attach`].
pub struct Disposer {
    action: Box<dyn Fn() -> bool>,
    disposed: Cell<bool>,
}

impl Disposer {
    fn new(action: impl Fn() -> bool + 'static) -> Self {
        Self {
            action: Box::new(action),
            disposed: Cell::new(false),
        }
    }

    /// Tear the attachment down: disconnect both watchers, remove decorations
    /// and restore the root. Calling it again does nothing.
    pub fn dispose(&self) {
        if !self.disposed.get() && (self.action)() {
            self.disposed.set(true);
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.disposed.get())
            .finish_non_exhaustive()
    }
}
