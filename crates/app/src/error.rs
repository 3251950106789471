//! Synchronization error taxonomy.
//!
//! Every variant here is recoverable at some boundary: values, then actions,
//! then triggers. None propagate past the trigger boundary; a top-level
//! error is reserved for conditions that prevent a pass from even starting.

use crate::ports::{ElementId, SurfaceError};
use crate::wait::WaitTimeout;

/// A failure inside one synchronization step.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A required element never reached the expected state within the bound.
    /// Recoverable: only the current action or value is skipped.
    #[error(transparent)]
    AffordanceTimeout(#[from] WaitTimeout),

    /// An expected container or field is absent from the surface.
    /// Recoverable per action.
    #[error("expected {what} was not found under {scope}")]
    StructuralMismatch { what: &'static str, scope: String },

    /// The trigger container itself could not be created; aborts only that
    /// trigger's action loop.
    #[error("could not create trigger for event `{event}`: {source}")]
    TriggerCreation {
        event: String,
        #[source]
        source: Box<SyncError>,
    },

    /// The port itself refused an operation.
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

impl SyncError {
    /// Shorthand for a missing element under a known scope.
    #[must_use]
    pub fn structural(what: &'static str, scope: ElementId) -> Self {
        Self::StructuralMismatch {
            what,
            scope: scope.to_string(),
        }
    }

    /// Wrap a creation failure for `event`.
    #[must_use]
    pub fn trigger_creation(event: impl Into<String>, source: Self) -> Self {
        Self::TriggerCreation {
            event: event.into(),
            source: Box::new(source),
        }
    }
}
