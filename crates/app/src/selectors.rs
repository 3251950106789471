//! Locator tables for the external surface's tree shape.
//!
//! The surface's markup is not guaranteed stable across its own versions, so
//! every lookup goes through an ordered chain of candidate selectors, first
//! match wins. Adapting to a changed surface is a data change in this file,
//! not a code change in the engines.
//!
//! Command rows inside a timer card are value rows of that timer, not
//! standalone actions, and do not carry the `action-item` marker.

use crate::ports::{ElementId, Surface};

/// An ordered list of candidate selectors for one logical element.
#[derive(Debug, Clone, Copy)]
pub struct LocatorChain {
    /// Human name used in error and log messages.
    pub what: &'static str,
    /// Candidates, most current markup first.
    pub selectors: &'static [&'static str],
}

/// Root container of the whole trigger editor.
pub const PANEL: LocatorChain = chain("trigger panel", &["trigger-panel"]);

/// Affordance that opens the trigger creation dialog.
pub const CREATE_TRIGGER: LocatorChain = chain("create-trigger affordance", &["create-trigger"]);

/// The creation dialog itself.
pub const EVENT_DIALOG: LocatorChain = chain("event dialog", &["event-dialog"]);

/// One selectable event inside the dialog.
pub const EVENT_OPTION: LocatorChain = chain("event option", &["event-option"]);

/// Dialog confirmation affordance.
pub const CONFIRM_CREATE: LocatorChain = chain("confirm-create affordance", &["confirm-create"]);

/// One trigger's container.
pub const TRIGGER_CARD: LocatorChain = chain("trigger container", &["trigger-card"]);

/// The trigger's event name field — current markup first, then the legacy
/// header location.
pub const TRIGGER_EVENT: LocatorChain =
    chain("trigger event field", &["trigger-event", "trigger-header"]);

/// Per-container "add value" affordance.
pub const ADD_COMMAND: LocatorChain = chain("add-command affordance", &["add-command"]);

/// One editable command value row.
pub const COMMAND_ROW: LocatorChain = chain("command row", &["command-row"]);

pub const ADD_TIMER: LocatorChain = chain("add-timer affordance", &["add-timer"]);
pub const TIMER_CARD: LocatorChain = chain("timer container", &["timer-card"]);

/// Timer name field; not directly editable (reveal-then-edit).
pub const TIMER_NAME: LocatorChain = chain("timer name field", &["timer-name"]);
pub const TIMER_DURATION: LocatorChain = chain("timer duration field", &["timer-duration"]);
pub const TIMER_TICK: LocatorChain = chain("timer tick field", &["timer-tick"]);

pub const ADD_CONDITION: LocatorChain = chain("add-condition affordance", &["add-condition"]);
pub const CONDITION_CARD: LocatorChain = chain("condition container", &["condition-card"]);

/// Condition operands; not directly editable (reveal-then-edit).
pub const CONDITION_LEFT: LocatorChain = chain("condition left operand", &["condition-left"]);
pub const CONDITION_RIGHT: LocatorChain = chain("condition right operand", &["condition-right"]);

/// Operator control; directly selectable.
pub const CONDITION_OPERATOR: LocatorChain = chain("condition operator", &["condition-operator"]);

/// Branch containers, with the pre-redesign markup as fallback.
pub const THEN_BRANCH: LocatorChain = chain("then branch", &["branch-then", "then-list"]);
pub const ELSE_BRANCH: LocatorChain = chain("else branch", &["branch-else", "else-list"]);

/// Every marker that denotes a branch container, for ancestry tests.
pub const BRANCH_MARKERS: &[&str] = &["branch-then", "branch-else", "then-list", "else-list"];

/// Edit affordance revealed by hovering a non-editable field.
pub const EDIT_TOGGLE: LocatorChain = chain("edit affordance", &["edit-toggle"]);

/// Marker carried by every standalone action element.
pub const ACTION_ITEM: LocatorChain = chain("action element", &["action-item"]);

/// Optional explicit type label on an action element.
pub const TYPE_LABEL: LocatorChain = chain("action type label", &["action-type"]);

const fn chain(what: &'static str, selectors: &'static [&'static str]) -> LocatorChain {
    LocatorChain { what, selectors }
}

/// Try each candidate in order; first element found wins.
pub async fn locate_first<S: Surface>(
    surface: &S,
    scope: Option<ElementId>,
    chain: &LocatorChain,
) -> Option<ElementId> {
    for selector in chain.selectors {
        if let Some(element) = surface.locate(scope, selector).await {
            return Some(element);
        }
    }
    None
}

/// Try each candidate in order; first non-empty listing wins.
pub async fn locate_all_first<S: Surface>(
    surface: &S,
    scope: Option<ElementId>,
    chain: &LocatorChain,
) -> Vec<ElementId> {
    for selector in chain.selectors {
        let found = surface.locate_all(scope, selector).await;
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Whether the element itself matches any candidate in the chain.
pub async fn matches_chain<S: Surface>(
    surface: &S,
    element: ElementId,
    chain: &LocatorChain,
) -> bool {
    for selector in chain.selectors {
        if surface.matches(element, selector).await {
            return true;
        }
    }
    false
}

/// Read one element: rendered text preferred, raw input value as fallback.
pub async fn read_element<S: Surface>(surface: &S, element: ElementId) -> Option<String> {
    match surface.text(element).await {
        Some(text) if !text.is_empty() => Some(text),
        _ => surface.value(element).await,
    }
}

/// Locate a field through `chain` under `scope` and read it.
pub async fn read_field<S: Surface>(
    surface: &S,
    scope: ElementId,
    chain: &LocatorChain,
) -> Option<String> {
    let field = locate_first(surface, Some(scope), chain).await?;
    read_element(surface, field).await
}
