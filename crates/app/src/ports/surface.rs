//! Surface port — capability interface over the external application.
//!
//! The external surface exposes no API, only a mutable, asynchronously
//! updating element tree. This port narrows it to the primitives the engines
//! need: locate by selector, click, write-and-commit, and state probes.
//! Queries return only presence/absence and text content — never typed data.
//!
//! Mutations are eventually consistent: activating an affordance returns
//! before the tree reflects the change, so callers pair every mutation with
//! a [`crate::wait::wait_until`] probe.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stable identifier for one surface element.
///
/// Identity survives transient duplicate entries: two listings of the same
/// logical element report the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(uuid::Uuid);

impl Default for ElementId {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl ElementId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Access the inner UUID.
    #[must_use]
    pub fn as_uuid(self) -> uuid::Uuid {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ElementId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// Non-click signals an element understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Reveal hidden affordances (edit toggles) on a field.
    Hover,
    /// Commit a pending value.
    Submit,
    /// Second, redundant commit — submit alone is unreliable on revealed
    /// fields.
    Finalize,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hover => f.write_str("hover"),
            Self::Submit => f.write_str("submit"),
            Self::Finalize => f.write_str("finalize"),
        }
    }
}

/// Failures at the port boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// The element is no longer attached to the surface tree.
    #[error("element {id} is no longer attached to the surface")]
    Detached { id: ElementId },
    /// A value was written to an element not currently editable.
    #[error("element {id} is not editable")]
    NotEditable { id: ElementId },
}

/// The external surface, as seen by the engines.
///
/// Every operation is asynchronous; implementations decide how selectors map
/// onto their element tree. `selector` values come from the data-driven
/// tables in [`crate::selectors`].
pub trait Surface: Send + Sync {
    /// First descendant of `scope` (the whole tree when `None`) matching
    /// `selector`, in tree order.
    fn locate(
        &self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> impl Future<Output = Option<ElementId>> + Send;

    /// Every descendant of `scope` matching `selector`, in tree order.
    /// May contain transient duplicate entries for the same id.
    fn locate_all(
        &self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> impl Future<Output = Vec<ElementId>> + Send;

    /// First descendant matching `selector` whose rendered text equals
    /// `text` exactly.
    fn locate_by_text(
        &self,
        scope: Option<ElementId>,
        selector: &str,
        text: &str,
    ) -> impl Future<Output = Option<ElementId>> + Send;

    /// Whether `element` itself carries `selector`'s marker.
    fn matches(&self, element: ElementId, selector: &str) -> impl Future<Output = bool> + Send;

    /// Whether an element matching `selector` sits strictly between
    /// `element` and `boundary` in the ancestor chain.
    fn has_ancestor(
        &self,
        element: ElementId,
        selector: &str,
        boundary: ElementId,
    ) -> impl Future<Output = bool> + Send;

    /// Activate a click affordance.
    fn click(&self, element: ElementId) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    /// Write a raw value into an editable element.
    fn set_value(
        &self,
        element: ElementId,
        value: &str,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    /// Dispatch a non-click [`Signal`].
    fn signal(
        &self,
        element: ElementId,
        signal: Signal,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send;

    /// Rendered text content, if any.
    fn text(&self, element: ElementId) -> impl Future<Output = Option<String>> + Send;

    /// Raw input value, if any.
    fn value(&self, element: ElementId) -> impl Future<Output = Option<String>> + Send;

    /// Whether the element currently accepts [`Surface::set_value`].
    fn is_editable(&self, element: ElementId) -> impl Future<Output = bool> + Send;
}

impl<T: Surface + Send + Sync> Surface for std::sync::Arc<T> {
    fn locate(
        &self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> impl Future<Output = Option<ElementId>> + Send {
        (**self).locate(scope, selector)
    }

    fn locate_all(
        &self,
        scope: Option<ElementId>,
        selector: &str,
    ) -> impl Future<Output = Vec<ElementId>> + Send {
        (**self).locate_all(scope, selector)
    }

    fn locate_by_text(
        &self,
        scope: Option<ElementId>,
        selector: &str,
        text: &str,
    ) -> impl Future<Output = Option<ElementId>> + Send {
        (**self).locate_by_text(scope, selector, text)
    }

    fn matches(&self, element: ElementId, selector: &str) -> impl Future<Output = bool> + Send {
        (**self).matches(element, selector)
    }

    fn has_ancestor(
        &self,
        element: ElementId,
        selector: &str,
        boundary: ElementId,
    ) -> impl Future<Output = bool> + Send {
        (**self).has_ancestor(element, selector, boundary)
    }

    fn click(&self, element: ElementId) -> impl Future<Output = Result<(), SurfaceError>> + Send {
        (**self).click(element)
    }

    fn set_value(
        &self,
        element: ElementId,
        value: &str,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send {
        (**self).set_value(element, value)
    }

    fn signal(
        &self,
        element: ElementId,
        signal: Signal,
    ) -> impl Future<Output = Result<(), SurfaceError>> + Send {
        (**self).signal(element, signal)
    }

    fn text(&self, element: ElementId) -> impl Future<Output = Option<String>> + Send {
        (**self).text(element)
    }

    fn value(&self, element: ElementId) -> impl Future<Output = Option<String>> + Send {
        (**self).value(element)
    }

    fn is_editable(&self, element: ElementId) -> impl Future<Output = bool> + Send {
        (**self).is_editable(element)
    }
}
