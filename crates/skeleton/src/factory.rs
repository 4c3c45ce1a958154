//! Pluggable decoration nodes.
//!
//! A factory only describes an unstyled node: its tag and static attributes
//! such as the class that selects a shimmer or a spinner. Positioning, sizing
//! and the fade animation are added by the engine.

use crate::adapter::HostDocument;
use crate::options::DECORATION_ATTR;
use anyhow::Result;
use core::fmt;
use smallvec::SmallVec;
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecorationTemplate {
    pub tag: String,
    pub attrs: SmallVec<[(String, String); 2]>,
}

impl DecorationTemplate {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_owned(),
            attrs: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_owned(), value.to_owned()));
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// One node per placeholder rectangle.
    Skeleton,
    /// One node covering a whole candidate.
    Overlay,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skeleton => "skeleton",
            Self::Overlay => "overlay",
        }
    }
}

/// Zero-argument constructor for fresh decoration templates.
pub type DecorationFactory = Rc<dyn Fn() -> DecorationTemplate>;

#[derive(Clone)]
pub struct Factories {
    pub skeleton: DecorationFactory,
    pub overlay: DecorationFactory,
}

impl Default for Factories {
    fn default() -> Self {
        Self {
            skeleton: Rc::new(|| DecorationTemplate::new("div").with_attr("class", "sk-bone")),
            overlay: Rc::new(|| DecorationTemplate::new("div").with_attr("class", "sk-overlay")),
        }
    }
}

impl fmt::Debug for Factories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factories")
            .field("skeleton", &(self.skeleton)())
            .field("overlay", &(self.overlay)())
            .finish()
    }
}

impl Factories {
    pub fn for_role(&self, role: Role) -> &DecorationFactory {
        match role {
            Role::Skeleton => &self.skeleton,
            Role::Overlay => &self.overlay,
        }
    }
}

/// Create a detached node from the role's factory, tagged as a decoration.
///
/// # Errors
/// Fails when the host rejects one of the template's attributes. The node is
/// destroyed again in that case.
pub fn materialize<H: HostDocument>(host: &mut H, factories: &Factories, role: Role) -> Result<H::Handle> {
    let template = (factories.for_role(role))();
    let node = host.create_node(&template.tag);
    let marked = template
        .attrs
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .chain([(DECORATION_ATTR, role.as_str())])
        .try_for_each(|(name, value)| host.set_attr(node, name, value));
    if let Err(err) = marked {
        host.remove_node(node);
        return Err(err);
    }
    Ok(node)
}
