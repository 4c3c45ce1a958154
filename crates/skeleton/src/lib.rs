//! Skeleton and overlay loading decorations.
//!
//! While a root carries its enable attribute, the engine selects the elements
//! below it that should be masked, measures them, and draws placeholder
//! decorations over them: one box for generic content, one bar per wrapped
//! line for text, or a fading overlay. Decorations follow the content as it
//! resizes and are removed, with every touched value restored, when the
//! attribute goes away or the attachment is disposed.
//!
//! The engine talks to its document through the traits in [`adapter`];
//! [`dom::Document`] is the in-memory implementation.

pub mod adapter;
pub mod config;
pub mod engine;
pub mod factory;
pub mod geometry;
pub mod lifecycle;
pub mod options;
pub mod participation;
pub mod positioning;

pub use adapter::{HostDocument, LayoutAdapter, Signal, TransitionId, TreeAdapter, WatcherId};
pub use config::{EngineConfig, RuleTables, is_enabled};
pub use engine::{Disposer, Engine};
pub use factory::{DecorationFactory, DecorationTemplate, Factories, Role};
pub use geometry::{Geometry, PlaceholderRect, Shape, compute_geometry, compute_rects};
pub use lifecycle::State;
pub use options::{DECORATION_ATTR, KIND_ATTR, Kind, OptionResolver, Options, Precision};
pub use participation::{Participation, ParticipationRules};
pub use positioning::{Mode, Placement, PositionMode, place};
