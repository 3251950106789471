//! Extractor — rebuilds a script IR by reading the external surface.
//!
//! The tree is rebuilt depth-first, one layer at a time: per container, all
//! descendant action elements are collected and then narrowed to direct
//! children by an ancestry test (no branch container may sit between the
//! element and the container). The same test, reapplied relative to each
//! conditional's own branch containers, isolates that conditional's direct
//! children from deeper nesting — descendants are never flattened.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use trigsync_domain::script::{Action, Condition, Operator, TriggerBlock};

use crate::error::SyncError;
use crate::ports::{ElementId, Surface};
use crate::selectors::{
    self, locate_all_first, locate_first, matches_chain, read_element, read_field,
};
use crate::wait::{Timing, wait_until};

enum ActionKind {
    Command,
    Timer,
    Conditional,
    Unknown,
}

/// The surface → IR engine.
pub struct Extractor<S> {
    surface: S,
    timing: Timing,
}

impl<S: Surface> Extractor<S> {
    /// Create a new extractor over the given surface.
    pub fn new(surface: S, timing: Timing) -> Self {
        Self { surface, timing }
    }

    /// Walk every trigger container on the surface and rebuild its block.
    ///
    /// Unreadable triggers are skipped with a log line; the rest of the
    /// surface is still extracted.
    ///
    /// # Errors
    ///
    /// Returns an error only when the surface's root container never
    /// appears.
    #[tracing::instrument(skip_all)]
    pub async fn extract(&self) -> Result<Vec<TriggerBlock>, SyncError> {
        let surface = &self.surface;
        let panel = wait_until(self.timing, selectors::PANEL.what, move || async move {
            locate_first(surface, None, &selectors::PANEL).await
        })
        .await?;

        let cards = locate_all_first(surface, Some(panel), &selectors::TRIGGER_CARD).await;
        let mut walked = HashSet::new();
        let mut triggers = Vec::new();
        for card in cards {
            if !walked.insert(card) {
                // Transient duplicate listing of a container already walked.
                continue;
            }
            match self.extract_trigger(card).await {
                Ok(trigger) => triggers.push(trigger),
                Err(error) => {
                    tracing::warn!(%card, %error, "trigger skipped during extraction");
                }
            }
        }
        tracing::info!(triggers = triggers.len(), "extract pass finished");
        Ok(triggers)
    }

    async fn extract_trigger(&self, card: ElementId) -> Result<TriggerBlock, SyncError> {
        let event = read_field(&self.surface, card, &selectors::TRIGGER_EVENT)
            .await
            .ok_or_else(|| SyncError::structural(selectors::TRIGGER_EVENT.what, card))?;

        // The dedup set lives for exactly one trigger so it cannot suppress
        // legitimate repeats in a sibling trigger.
        let mut seen = HashSet::new();
        let actions = self.extract_actions(card, &mut seen, 0).await;
        Ok(TriggerBlock { event, actions })
    }

    /// Collect the direct child actions of `boundary` and read each one.
    ///
    /// Consecutive command rows group into a single command action, matching
    /// how the parser groups consecutive command lines.
    fn extract_actions<'a>(
        &'a self,
        boundary: ElementId,
        seen: &'a mut HashSet<ElementId>,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Vec<Action>> + Send + 'a>> {
        Box::pin(async move {
            let surface = &self.surface;

            let mut direct = Vec::new();
            for element in locate_all_first(surface, Some(boundary), &selectors::ACTION_ITEM).await
            {
                if seen.contains(&element) {
                    // Transient duplicate entry for an already-read element.
                    continue;
                }
                if nested_in_branch(surface, element, boundary).await {
                    continue;
                }
                seen.insert(element);
                direct.push(element);
            }

            let mut actions = Vec::new();
            let mut values: Vec<String> = Vec::new();
            for element in direct {
                match self.classify(element).await {
                    ActionKind::Command => {
                        if let Some(value) = read_element(surface, element).await {
                            values.push(value);
                        }
                    }
                    ActionKind::Timer => {
                        flush_values(&mut actions, &mut values);
                        actions.push(self.read_timer(element, seen).await);
                    }
                    ActionKind::Conditional => {
                        flush_values(&mut actions, &mut values);
                        actions.push(self.read_conditional(element, seen, depth).await);
                    }
                    ActionKind::Unknown => {
                        tracing::debug!(%element, depth, "unclassifiable action element skipped");
                    }
                }
            }
            flush_values(&mut actions, &mut values);
            actions
        })
    }

    /// Decide an element's action type, first match wins: explicit type
    /// label, then structural class marker, then a type-specific required
    /// sub-element.
    async fn classify(&self, element: ElementId) -> ActionKind {
        let surface = &self.surface;

        if let Some(label) = locate_first(surface, Some(element), &selectors::TYPE_LABEL).await {
            if let Some(text) = surface.text(label).await {
                match text.as_str() {
                    "command" => return ActionKind::Command,
                    "timer" => return ActionKind::Timer,
                    "ifthenelse" => return ActionKind::Conditional,
                    _ => {}
                }
            }
        }

        if matches_chain(surface, element, &selectors::TIMER_CARD).await {
            return ActionKind::Timer;
        }
        if matches_chain(surface, element, &selectors::CONDITION_CARD).await {
            return ActionKind::Conditional;
        }
        if matches_chain(surface, element, &selectors::COMMAND_ROW).await {
            return ActionKind::Command;
        }

        if locate_first(surface, Some(element), &selectors::TIMER_NAME)
            .await
            .is_some()
        {
            return ActionKind::Timer;
        }
        if locate_first(surface, Some(element), &selectors::CONDITION_OPERATOR)
            .await
            .is_some()
        {
            return ActionKind::Conditional;
        }
        if read_element(surface, element).await.is_some() {
            return ActionKind::Command;
        }
        ActionKind::Unknown
    }

    async fn read_timer(&self, card: ElementId, seen: &mut HashSet<ElementId>) -> Action {
        let surface = &self.surface;
        let name = read_field(surface, card, &selectors::TIMER_NAME)
            .await
            .unwrap_or_else(|| "Timer".to_string());
        let duration = read_field(surface, card, &selectors::TIMER_DURATION)
            .await
            .and_then(|value| value.parse().ok())
            .unwrap_or(0);
        let tick = read_field(surface, card, &selectors::TIMER_TICK)
            .await
            .and_then(|value| value.parse().ok())
            .unwrap_or(1);

        let mut commands = Vec::new();
        for row in locate_all_first(surface, Some(card), &selectors::COMMAND_ROW).await {
            if !seen.insert(row) {
                continue;
            }
            if let Some(value) = read_element(surface, row).await {
                commands.push(value);
            }
        }

        Action::Timer {
            name,
            duration,
            tick,
            commands,
        }
    }

    async fn read_conditional(
        &self,
        card: ElementId,
        seen: &mut HashSet<ElementId>,
        depth: usize,
    ) -> Action {
        let surface = &self.surface;
        let left = read_field(surface, card, &selectors::CONDITION_LEFT)
            .await
            .unwrap_or_default();
        let right = read_field(surface, card, &selectors::CONDITION_RIGHT)
            .await
            .unwrap_or_default();
        let operator = match read_field(surface, card, &selectors::CONDITION_OPERATOR).await {
            Some(symbol) => symbol.parse().unwrap_or_else(|_| {
                tracing::debug!(%card, %symbol, "unknown operator symbol, defaulting to ==");
                Operator::Eq
            }),
            None => {
                tracing::debug!(%card, "operator control missing, defaulting to ==");
                Operator::Eq
            }
        };
        let condition = Condition { left, operator, right };

        let then = match locate_first(surface, Some(card), &selectors::THEN_BRANCH).await {
            Some(branch) => self.extract_actions(branch, seen, depth + 1).await,
            None => Vec::new(),
        };
        let otherwise = match locate_first(surface, Some(card), &selectors::ELSE_BRANCH).await {
            Some(branch) => self.extract_actions(branch, seen, depth + 1).await,
            None => Vec::new(),
        };

        Action::IfThenElse {
            condition,
            then,
            otherwise,
        }
    }
}

/// The ancestry test: the element belongs to `boundary` only if no branch
/// container lies strictly between the two.
async fn nested_in_branch<S: Surface>(
    surface: &S,
    element: ElementId,
    boundary: ElementId,
) -> bool {
    for marker in selectors::BRANCH_MARKERS {
        if surface.has_ancestor(element, marker, boundary).await {
            return true;
        }
    }
    false
}

fn flush_values(actions: &mut Vec<Action>, values: &mut Vec<String>) {
    if !values.is_empty() {
        actions.push(Action::Command {
            values: std::mem::take(values),
        });
    }
}
