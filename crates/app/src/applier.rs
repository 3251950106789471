//! Applier — projects a script IR onto the external surface.
//!
//! Triggers and actions are applied strictly in array order: the surface is
//! a single shared mutable resource, so each creation step blocks until its
//! precondition (new container, new row, state transition) is observed.
//! Failures are caught at the smallest enclosing boundary — value, then
//! action, then trigger — and collected into the report instead of aborting
//! the pass.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use trigsync_domain::script::{Action, Script, TriggerBlock};

use crate::error::SyncError;
use crate::ports::{ElementId, Progress, ProgressSink, Signal, Surface};
use crate::selectors::{self, LocatorChain, locate_all_first, locate_first};
use crate::wait::{Timing, wait_until};

/// Outcome of one apply pass: a best-effort summary, never a hard stop once
/// the pass has begun.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// Triggers attempted, whether or not their actions all succeeded.
    pub triggers_processed: usize,
    /// Every recoverable failure, in occurrence order.
    pub errors: Vec<ApplyFailure>,
}

/// One recoverable failure with enough context to diagnose it.
#[derive(Debug)]
pub struct ApplyFailure {
    /// Event name of the trigger being applied.
    pub trigger: String,
    /// What was being created when the failure happened.
    pub context: String,
    pub error: SyncError,
}

impl std::fmt::Display for ApplyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.trigger, self.context, self.error)
    }
}

impl Serialize for ApplyFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Mutable state threaded through one apply pass.
struct RunState {
    completed: usize,
    total: usize,
    errors: Vec<ApplyFailure>,
}

/// The IR → surface engine.
pub struct Applier<S, P> {
    surface: S,
    progress: P,
    timing: Timing,
}

impl<S: Surface, P: ProgressSink> Applier<S, P> {
    /// Create a new applier over the given surface.
    pub fn new(surface: S, progress: P, timing: Timing) -> Self {
        Self {
            surface,
            progress,
            timing,
        }
    }

    /// Apply every trigger in `script`, in order.
    ///
    /// # Errors
    ///
    /// Returns an error only when the pass cannot begin at all — the
    /// surface's root container never appears. Everything after that point
    /// degrades into [`ApplyReport::errors`].
    #[tracing::instrument(skip_all, fields(triggers = script.triggers.len()))]
    pub async fn apply(&self, script: &Script) -> Result<ApplyReport, SyncError> {
        let surface = &self.surface;
        let panel = wait_until(self.timing, selectors::PANEL.what, move || async move {
            locate_first(surface, None, &selectors::PANEL).await
        })
        .await?;

        let mut run = RunState {
            completed: 0,
            total: script.progress_units(),
            errors: Vec::new(),
        };
        let mut processed = 0;

        for trigger in &script.triggers {
            if let Err(error) = self.apply_trigger(panel, trigger, &mut run).await {
                tracing::warn!(trigger = %trigger.event, %error, "trigger aborted");
                run.errors.push(ApplyFailure {
                    trigger: trigger.event.clone(),
                    context: "creating trigger".to_string(),
                    error,
                });
            }
            processed += 1;
        }

        tracing::info!(
            processed,
            errors = run.errors.len(),
            "apply pass finished"
        );
        Ok(ApplyReport {
            triggers_processed: processed,
            errors: run.errors,
        })
    }

    async fn apply_trigger(
        &self,
        panel: ElementId,
        trigger: &TriggerBlock,
        run: &mut RunState,
    ) -> Result<(), SyncError> {
        let card = self
            .create_trigger(panel, &trigger.event)
            .await
            .map_err(|source| SyncError::trigger_creation(&trigger.event, source))?;
        self.unit(run).await;
        self.apply_actions(card, &trigger.actions, &trigger.event, 0, run)
            .await;
        Ok(())
    }

    /// Create one trigger container: open the dialog, select the event by
    /// exact text match, confirm, then find the created container.
    async fn create_trigger(&self, panel: ElementId, event: &str) -> Result<ElementId, SyncError> {
        let surface = &self.surface;

        let create = locate_first(surface, Some(panel), &selectors::CREATE_TRIGGER)
            .await
            .ok_or_else(|| SyncError::structural(selectors::CREATE_TRIGGER.what, panel))?;
        surface.click(create).await?;

        let dialog = wait_until(self.timing, selectors::EVENT_DIALOG.what, move || async move {
            locate_first(surface, Some(panel), &selectors::EVENT_DIALOG).await
        })
        .await?;

        let option = wait_until(self.timing, selectors::EVENT_OPTION.what, move || async move {
            for selector in selectors::EVENT_OPTION.selectors {
                if let Some(option) = surface.locate_by_text(Some(dialog), selector, event).await {
                    return Some(option);
                }
            }
            None
        })
        .await?;
        surface.click(option).await?;

        let confirm = locate_first(surface, Some(dialog), &selectors::CONFIRM_CREATE)
            .await
            .ok_or_else(|| SyncError::structural(selectors::CONFIRM_CREATE.what, dialog))?;
        let before: HashSet<ElementId> =
            locate_all_first(surface, Some(panel), &selectors::TRIGGER_CARD)
                .await
                .into_iter()
                .collect();
        surface.click(confirm).await?;

        // The surface offers no stable handle at creation time, so the
        // most-recently-created container with a matching event wins.
        let before = &before;
        let card = wait_until(self.timing, "new trigger container", move || async move {
            let cards = locate_all_first(surface, Some(panel), &selectors::TRIGGER_CARD).await;
            let mut newest = None;
            for card in cards {
                if before.contains(&card) {
                    continue;
                }
                if trigger_event_matches(surface, card, event).await {
                    newest = Some(card);
                }
            }
            newest
        })
        .await?;
        Ok(card)
    }

    /// Apply a sibling list; each action failure is caught here so the
    /// remaining siblings still run.
    fn apply_actions<'a>(
        &'a self,
        container: ElementId,
        actions: &'a [Action],
        trigger: &'a str,
        depth: usize,
        run: &'a mut RunState,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            for action in actions {
                if let Err(error) = self.apply_action(container, action, trigger, depth, run).await
                {
                    tracing::warn!(
                        trigger,
                        %container,
                        depth,
                        target = %action,
                        %error,
                        "action failed, continuing with next sibling"
                    );
                    run.errors.push(ApplyFailure {
                        trigger: trigger.to_string(),
                        context: action.to_string(),
                        error,
                    });
                }
            }
        })
    }

    async fn apply_action(
        &self,
        container: ElementId,
        action: &Action,
        trigger: &str,
        depth: usize,
        run: &mut RunState,
    ) -> Result<(), SyncError> {
        let surface = &self.surface;
        match action {
            Action::Command { values } => {
                self.unit(run).await;
                self.write_command_values(container, values, trigger, run, true)
                    .await
            }
            Action::Timer {
                name,
                duration,
                tick,
                commands,
            } => {
                let card = self
                    .create_child(container, &selectors::ADD_TIMER, &selectors::TIMER_CARD)
                    .await?;
                self.unit(run).await;

                self.write_revealed_field(card, &selectors::TIMER_NAME, name)
                    .await?;
                self.unit(run).await;
                self.write_plain_field(card, &selectors::TIMER_DURATION, &duration.to_string())
                    .await?;
                self.unit(run).await;
                self.write_plain_field(card, &selectors::TIMER_TICK, &tick.to_string())
                    .await?;
                self.unit(run).await;

                self.write_command_values(card, commands, trigger, run, false)
                    .await
            }
            Action::IfThenElse {
                condition,
                then,
                otherwise,
            } => {
                let card = self
                    .create_child(
                        container,
                        &selectors::ADD_CONDITION,
                        &selectors::CONDITION_CARD,
                    )
                    .await?;
                self.unit(run).await;

                self.write_revealed_field(card, &selectors::CONDITION_LEFT, &condition.left)
                    .await?;
                self.unit(run).await;

                // The operator control is directly selectable.
                let operator = locate_first(surface, Some(card), &selectors::CONDITION_OPERATOR)
                    .await
                    .ok_or_else(|| {
                        SyncError::structural(selectors::CONDITION_OPERATOR.what, card)
                    })?;
                surface
                    .set_value(operator, condition.operator.symbol())
                    .await?;
                surface.signal(operator, Signal::Submit).await?;
                self.unit(run).await;

                self.write_revealed_field(card, &selectors::CONDITION_RIGHT, &condition.right)
                    .await?;
                self.unit(run).await;

                if !then.is_empty() {
                    let branch = locate_first(surface, Some(card), &selectors::THEN_BRANCH)
                        .await
                        .ok_or_else(|| SyncError::structural(selectors::THEN_BRANCH.what, card))?;
                    self.apply_actions(branch, then, trigger, depth + 1, run).await;
                }
                if !otherwise.is_empty() {
                    let branch = locate_first(surface, Some(card), &selectors::ELSE_BRANCH)
                        .await
                        .ok_or_else(|| SyncError::structural(selectors::ELSE_BRANCH.what, card))?;
                    self.apply_actions(branch, otherwise, trigger, depth + 1, run)
                        .await;
                }
                Ok(())
            }
        }
    }

    /// Write command values into `container`, one add-click per value.
    ///
    /// A value that times out is skipped and recorded; the remaining values
    /// still run. Any other failure aborts the enclosing action.
    async fn write_command_values(
        &self,
        container: ElementId,
        values: &[String],
        trigger: &str,
        run: &mut RunState,
        counted: bool,
    ) -> Result<(), SyncError> {
        for value in values {
            match self.add_command_value(container, value).await {
                Ok(()) => {}
                Err(error @ SyncError::AffordanceTimeout(_)) => {
                    tracing::warn!(trigger, %container, %value, %error, "command value skipped");
                    run.errors.push(ApplyFailure {
                        trigger: trigger.to_string(),
                        context: format!("writing command value `{value}`"),
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
            if counted {
                self.unit(run).await;
            }
        }
        Ok(())
    }

    /// One add-value click yields exactly one new editable row; write and
    /// commit it, then wait for the row to settle before the next value.
    async fn add_command_value(&self, container: ElementId, value: &str) -> Result<(), SyncError> {
        let surface = &self.surface;

        let add = locate_first(surface, Some(container), &selectors::ADD_COMMAND)
            .await
            .ok_or_else(|| SyncError::structural(selectors::ADD_COMMAND.what, container))?;
        let before: HashSet<ElementId> =
            locate_all_first(surface, Some(container), &selectors::COMMAND_ROW)
                .await
                .into_iter()
                .collect();
        surface.click(add).await?;

        let before = &before;
        let row = wait_until(self.timing, "new command row", move || async move {
            locate_all_first(surface, Some(container), &selectors::COMMAND_ROW)
                .await
                .into_iter()
                .find(|row| !before.contains(row))
        })
        .await?;
        wait_until(self.timing, "command row editable", move || async move {
            surface.is_editable(row).await.then_some(())
        })
        .await?;

        surface.set_value(row, value).await?;
        surface.signal(row, Signal::Submit).await?;

        // Activation returns before the surface reflects the mutation.
        wait_until(self.timing, "command row committed", move || async move {
            (!surface.is_editable(row).await).then_some(())
        })
        .await?;
        Ok(())
    }

    /// Click an add affordance and wait for the container it creates.
    async fn create_child(
        &self,
        container: ElementId,
        add: &LocatorChain,
        card: &LocatorChain,
    ) -> Result<ElementId, SyncError> {
        let surface = &self.surface;
        let button = locate_first(surface, Some(container), add)
            .await
            .ok_or_else(|| SyncError::structural(add.what, container))?;
        let before: HashSet<ElementId> = locate_all_first(surface, Some(container), card)
            .await
            .into_iter()
            .collect();
        surface.click(button).await?;

        let before = &before;
        let created = wait_until(self.timing, card.what, move || async move {
            locate_all_first(surface, Some(container), card)
                .await
                .into_iter()
                .find(|id| !before.contains(id))
        })
        .await?;
        Ok(created)
    }

    /// Write into an always-editable field.
    async fn write_plain_field(
        &self,
        card: ElementId,
        chain: &LocatorChain,
        value: &str,
    ) -> Result<(), SyncError> {
        let surface = &self.surface;
        let field = locate_first(surface, Some(card), chain)
            .await
            .ok_or_else(|| SyncError::structural(chain.what, card))?;
        surface.set_value(field, value).await?;
        surface.signal(field, Signal::Submit).await?;
        Ok(())
    }

    /// Write into a field that must first be revealed: hover, click the edit
    /// affordance, wait for the editable state, then double-commit.
    async fn write_revealed_field(
        &self,
        card: ElementId,
        chain: &LocatorChain,
        value: &str,
    ) -> Result<(), SyncError> {
        let surface = &self.surface;
        let field = locate_first(surface, Some(card), chain)
            .await
            .ok_or_else(|| SyncError::structural(chain.what, card))?;

        surface.signal(field, Signal::Hover).await?;
        let toggle = wait_until(self.timing, selectors::EDIT_TOGGLE.what, move || async move {
            locate_first(surface, Some(field), &selectors::EDIT_TOGGLE).await
        })
        .await?;
        surface.click(toggle).await?;
        wait_until(self.timing, "field editable", move || async move {
            surface.is_editable(field).await.then_some(())
        })
        .await?;

        surface.set_value(field, value).await?;
        // Submit alone was observed unreliable on revealed fields.
        surface.signal(field, Signal::Submit).await?;
        surface.signal(field, Signal::Finalize).await?;
        Ok(())
    }

    async fn unit(&self, run: &mut RunState) {
        run.completed += 1;
        self.progress
            .report(Progress {
                completed: run.completed,
                total: run.total,
            })
            .await;
    }
}

async fn trigger_event_matches<S: Surface>(surface: &S, card: ElementId, event: &str) -> bool {
    selectors::read_field(surface, card, &selectors::TRIGGER_EVENT)
        .await
        .is_some_and(|text| text == event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NullProgressSink;
    use crate::wait::WaitTimeout;

    /// A surface where nothing exists and nothing works.
    struct AbsentSurface;

    impl Surface for AbsentSurface {
        fn locate(
            &self,
            _scope: Option<ElementId>,
            _selector: &str,
        ) -> impl Future<Output = Option<ElementId>> + Send {
            async { None }
        }
        fn locate_all(
            &self,
            _scope: Option<ElementId>,
            _selector: &str,
        ) -> impl Future<Output = Vec<ElementId>> + Send {
            async { Vec::new() }
        }
        fn locate_by_text(
            &self,
            _scope: Option<ElementId>,
            _selector: &str,
            _text: &str,
        ) -> impl Future<Output = Option<ElementId>> + Send {
            async { None }
        }
        fn matches(
            &self,
            _element: ElementId,
            _selector: &str,
        ) -> impl Future<Output = bool> + Send {
            async { false }
        }
        fn has_ancestor(
            &self,
            _element: ElementId,
            _selector: &str,
            _boundary: ElementId,
        ) -> impl Future<Output = bool> + Send {
            async { false }
        }
        fn click(
            &self,
            element: ElementId,
        ) -> impl Future<Output = Result<(), crate::ports::SurfaceError>> + Send {
            async move { Err(crate::ports::SurfaceError::Detached { id: element }) }
        }
        fn set_value(
            &self,
            element: ElementId,
            _value: &str,
        ) -> impl Future<Output = Result<(), crate::ports::SurfaceError>> + Send {
            async move { Err(crate::ports::SurfaceError::Detached { id: element }) }
        }
        fn signal(
            &self,
            element: ElementId,
            _signal: Signal,
        ) -> impl Future<Output = Result<(), crate::ports::SurfaceError>> + Send {
            async move { Err(crate::ports::SurfaceError::Detached { id: element }) }
        }
        fn text(&self, _element: ElementId) -> impl Future<Output = Option<String>> + Send {
            async { None }
        }
        fn value(&self, _element: ElementId) -> impl Future<Output = Option<String>> + Send {
            async { None }
        }
        fn is_editable(&self, _element: ElementId) -> impl Future<Output = bool> + Send {
            async { false }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_fail_at_top_level_when_root_container_never_appears() {
        let applier = Applier::new(AbsentSurface, NullProgressSink, Timing::from_millis(10, 50));
        let script = Script::new(vec![
            trigsync_domain::script::TriggerBlock::builder()
                .event("PlayerJoined")
                .build(),
        ]);

        let result = applier.apply(&script).await;
        match result {
            Err(SyncError::AffordanceTimeout(WaitTimeout { what, .. })) => {
                assert_eq!(what, "trigger panel");
            }
            other => panic!("expected a top-level timeout, got {other:?}"),
        }
    }

    #[test]
    fn should_serialize_report_with_camel_case_keys() {
        let report = ApplyReport {
            triggers_processed: 2,
            errors: vec![ApplyFailure {
                trigger: "PlayerJoined".to_string(),
                context: "timer(T, 100)".to_string(),
                error: SyncError::AffordanceTimeout(WaitTimeout {
                    what: "timer container",
                    waited_ms: 3_000,
                }),
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["triggersProcessed"], 2);
        let error = json["errors"][0].as_str().unwrap();
        assert!(error.contains("PlayerJoined"));
        assert!(error.contains("timer container"));
    }

    #[test]
    fn should_format_failures_with_trigger_and_context() {
        let failure = ApplyFailure {
            trigger: "E".to_string(),
            context: "command(1 values)".to_string(),
            error: SyncError::structural("add-command affordance", ElementId::new()),
        };
        let text = failure.to_string();
        assert!(text.starts_with("E: command(1 values):"));
    }
}
