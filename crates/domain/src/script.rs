//! Script — the trigger/action tree shared by every representation.
//!
//! A [`Script`] is the intermediate representation (IR) between the authored
//! DSL text, the JSON wire shape, and the state of the external surface.
//! Each [`TriggerBlock`] reacts to one named event and carries an ordered
//! list of [`Action`]s; conditionals nest further actions to unbounded depth.
//!
//! Trees are built fresh by the parser or the extractor on each conversion
//! pass and treated as read-only snapshots by the serializer and the applier.

mod action;
mod condition;

pub use action::Action;
pub use condition::{Condition, Operator};

use serde::{Deserialize, Serialize};

/// A full script: every trigger block the author wrote, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub triggers: Vec<TriggerBlock>,
}

impl Script {
    /// Wrap a list of trigger blocks.
    #[must_use]
    pub fn new(triggers: Vec<TriggerBlock>) -> Self {
        Self { triggers }
    }

    /// Total number of progress units an apply pass over this script emits.
    #[must_use]
    pub fn progress_units(&self) -> usize {
        self.triggers.iter().map(TriggerBlock::progress_units).sum()
    }
}

/// One trigger and the actions it executes, in display/execution order.
///
/// `event` is matched against a vocabulary owned by the external surface;
/// unknown names are tolerated here and only fail at apply time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerBlock {
    pub event: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl TriggerBlock {
    /// Create a builder for constructing a [`TriggerBlock`].
    #[must_use]
    pub fn builder() -> TriggerBlockBuilder {
        TriggerBlockBuilder::default()
    }

    /// Progress units for this trigger: one for the trigger itself plus the
    /// recursively computed units of every action.
    #[must_use]
    pub fn progress_units(&self) -> usize {
        1 + self.actions.iter().map(Action::progress_units).sum::<usize>()
    }
}

impl std::fmt::Display for TriggerBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "trigger({}, {} actions)", self.event, self.actions.len())
    }
}

/// Step-by-step builder for [`TriggerBlock`].
#[derive(Debug, Default)]
pub struct TriggerBlockBuilder {
    event: Option<String>,
    actions: Vec<Action>,
}

impl TriggerBlockBuilder {
    #[must_use]
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    #[must_use]
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Consume the builder and return a [`TriggerBlock`].
    #[must_use]
    pub fn build(self) -> TriggerBlock {
        TriggerBlock {
            event: self.event.unwrap_or_default(),
            actions: self.actions,
        }
    }
}
