//! # trigsync-adapter-surface-memory
//!
//! In-memory surface adapter that simulates the external application's
//! trigger editor for testing and demonstration purposes.
//!
//! ## Simulated behaviour
//!
//! | Affordance | Effect |
//! |------------|--------|
//! | `create-trigger` | opens an `event-dialog` with one `event-option` per vocabulary entry |
//! | `confirm-create` | closes the dialog and appends a `trigger-card` for the selected event |
//! | `add-command` | appends a `command-row` that becomes editable one latency step later |
//! | `add-timer` / `add-condition` | append a fully-formed child card |
//! | `edit-toggle` | makes its revealed field editable |
//!
//! Every mutation becomes visible one `latency` after the triggering call —
//! the eventual consistency the engines are built around. Revealed fields
//! (timer name, condition operands) commit only on the finalize signal;
//! plain fields and command rows commit on submit.
//!
//! Fault injection: [`MemorySurface::empty`] (no root container),
//! [`MemorySurface::disable_affordance`] (buttons never rendered on new
//! cards), [`MemorySurface::freeze_new_rows`] (rows never reach the editable
//! state), and [`MemorySurface::set_duplicate_entries`] (listings report
//! every element twice).
//!
//! ## Dependency rule
//!
//! Depends on `trigsync-app` (port traits) only.

mod tree;

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use trigsync_app::ports::{ElementId, Signal, Surface, SurfaceError};

use tree::{Pending, SubtreeBuilder, Tree};

/// Fields that require the reveal-then-edit protocol.
const REVEALABLE: &[&str] = &["timer-name", "condition-left", "condition-right"];

/// Handles returned by [`MemorySurface::seed_conditional`].
#[derive(Debug, Clone, Copy)]
pub struct SeededConditional {
    pub card: ElementId,
    pub then_branch: ElementId,
    pub else_branch: ElementId,
}

struct Inner {
    tree: Tree,
    panel: Option<ElementId>,
    vocabulary: Vec<String>,
    disabled: HashSet<String>,
    duplicate_entries: bool,
    freeze_rows: bool,
}

/// In-memory stand-in for the external application's surface.
pub struct MemorySurface {
    inner: Mutex<Inner>,
    latency: Duration,
}

impl MemorySurface {
    /// Create a surface whose trigger panel is already present and whose
    /// creation dialog offers `vocabulary` as selectable events.
    #[must_use]
    pub fn new(latency: Duration, vocabulary: Vec<String>) -> Self {
        let mut tree = Tree::default();
        let panel = attach_panel(&mut tree);
        Self {
            inner: Mutex::new(Inner {
                tree,
                panel: Some(panel),
                vocabulary,
                disabled: HashSet::new(),
                duplicate_entries: false,
                freeze_rows: false,
            }),
            latency,
        }
    }

    /// A surface whose root container never appears.
    #[must_use]
    pub fn empty(latency: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tree: Tree::default(),
                panel: None,
                vocabulary: Vec::new(),
                disabled: HashSet::new(),
                duplicate_entries: false,
                freeze_rows: false,
            }),
            latency,
        }
    }

    /// Stop rendering `marker` affordances on cards created from now on.
    pub async fn disable_affordance(&self, marker: &str) {
        self.inner.lock().await.disabled.insert(marker.to_string());
    }

    /// Make listings report every element twice, simulating transient
    /// duplicate entries.
    pub async fn set_duplicate_entries(&self, enabled: bool) {
        self.inner.lock().await.duplicate_entries = enabled;
    }

    /// Newly added command rows appear but never reach the editable state.
    pub async fn freeze_new_rows(&self, frozen: bool) {
        self.inner.lock().await.freeze_rows = frozen;
    }

    /// The root container, when present.
    pub async fn panel(&self) -> Option<ElementId> {
        self.inner.lock().await.panel
    }

    // ── Seeding (immediate, for extraction tests) ──────────────────

    /// Attach a committed trigger card directly, bypassing the dialog.
    pub async fn seed_trigger(&self, event: &str) -> ElementId {
        let mut inner = self.inner.lock().await;
        let panel = match inner.panel {
            Some(panel) => panel,
            None => {
                let panel = attach_panel(&mut inner.tree);
                inner.panel = Some(panel);
                panel
            }
        };
        let sub = trigger_card_subtree(panel, event, &inner.disabled);
        attach_now(&mut inner.tree, Some(panel), sub);
        last_child(&inner.tree, panel)
    }

    /// Attach a committed command row under `container`.
    pub async fn seed_command_row(&self, container: ElementId, value: &str) -> ElementId {
        let mut inner = self.inner.lock().await;
        let markers = row_markers(&inner.tree, container);
        let mut sub = SubtreeBuilder::new(&markers, Some(container));
        if let Some(node) = sub.node_mut(sub.root) {
            node.text = Some(value.to_string());
        }
        attach_now(&mut inner.tree, Some(container), sub);
        last_child(&inner.tree, container)
    }

    /// Attach a committed timer card under `container`.
    pub async fn seed_timer(
        &self,
        container: ElementId,
        name: &str,
        duration: u64,
        tick: u64,
    ) -> ElementId {
        let mut inner = self.inner.lock().await;
        let sub = timer_card_subtree(
            container,
            name,
            Some(duration),
            Some(tick),
            &inner.disabled,
        );
        attach_now(&mut inner.tree, Some(container), sub);
        last_child(&inner.tree, container)
    }

    /// Attach a committed condition card under `container`.
    pub async fn seed_conditional(
        &self,
        container: ElementId,
        left: &str,
        operator: &str,
        right: &str,
    ) -> SeededConditional {
        let mut inner = self.inner.lock().await;
        let sub = condition_card_subtree(
            container,
            Some((left, operator, right)),
            &inner.disabled,
        );
        attach_now(&mut inner.tree, Some(container), sub);
        let card = last_child(&inner.tree, container);
        let then_branch = inner
            .tree
            .find_first(Some(card), "branch-then")
            .unwrap_or(card);
        let else_branch = inner
            .tree
            .find_first(Some(card), "branch-else")
            .unwrap_or(card);
        SeededConditional {
            card,
            then_branch,
            else_branch,
        }
    }

    /// Attach an arbitrary element — the escape hatch for legacy-markup
    /// tests.
    pub async fn seed_element(
        &self,
        parent: Option<ElementId>,
        markers: &[&str],
        text: Option<&str>,
    ) -> ElementId {
        let mut inner = self.inner.lock().await;
        let mut sub = SubtreeBuilder::new(markers, parent);
        if let Some(node) = sub.node_mut(sub.root) {
            node.text = text.map(ToString::to_string);
        }
        let root = sub.root;
        attach_now(&mut inner.tree, parent, sub);
        root
    }

    // ── Click semantics ────────────────────────────────────────────

    fn handle_click(&self, inner: &mut Inner, element: ElementId) -> Result<(), SurfaceError> {
        let now = Instant::now();
        let Some(node) = inner.tree.node(element) else {
            return Err(SurfaceError::Detached { id: element });
        };
        let parent = node.parent;

        if node.has_marker("create-trigger") {
            let Some(panel) = inner.panel else {
                return Ok(());
            };
            let sub = dialog_subtree(panel, &inner.vocabulary);
            inner.tree.schedule(
                now + self.latency,
                Pending::Attach {
                    parent: Some(panel),
                    nodes: sub.nodes,
                    root: sub.root,
                },
            );
            return Ok(());
        }

        if node.has_marker("event-option") {
            let selected = node.text.clone();
            if let Some(dialog) = parent.and_then(|p| inner.tree.node_mut(p)) {
                dialog.value = selected;
            }
            return Ok(());
        }

        if node.has_marker("confirm-create") {
            let Some(dialog) = parent else {
                return Ok(());
            };
            let selected = inner.tree.node(dialog).and_then(|d| d.value.clone());
            inner
                .tree
                .schedule(now + self.latency, Pending::Detach { id: dialog });
            if let (Some(panel), Some(event)) = (inner.panel, selected) {
                let sub = trigger_card_subtree(panel, &event, &inner.disabled);
                inner.tree.schedule(
                    now + self.latency,
                    Pending::Attach {
                        parent: Some(panel),
                        nodes: sub.nodes,
                        root: sub.root,
                    },
                );
            }
            return Ok(());
        }

        if node.has_marker("add-command") {
            let Some(container) = parent else {
                return Ok(());
            };
            let markers = row_markers(&inner.tree, container);
            let sub = SubtreeBuilder::new(&markers, Some(container));
            let row = sub.root;
            inner.tree.schedule(
                now + self.latency,
                Pending::Attach {
                    parent: Some(container),
                    nodes: sub.nodes,
                    root: row,
                },
            );
            if !inner.freeze_rows {
                inner.tree.schedule(
                    now + self.latency * 2,
                    Pending::SetEditable {
                        id: row,
                        editable: true,
                    },
                );
            }
            return Ok(());
        }

        if node.has_marker("add-timer") {
            let Some(container) = parent else {
                return Ok(());
            };
            let sub = timer_card_subtree(container, "Timer", None, None, &inner.disabled);
            inner.tree.schedule(
                now + self.latency,
                Pending::Attach {
                    parent: Some(container),
                    nodes: sub.nodes,
                    root: sub.root,
                },
            );
            return Ok(());
        }

        if node.has_marker("add-condition") {
            let Some(container) = parent else {
                return Ok(());
            };
            let sub = condition_card_subtree(container, None, &inner.disabled);
            inner.tree.schedule(
                now + self.latency,
                Pending::Attach {
                    parent: Some(container),
                    nodes: sub.nodes,
                    root: sub.root,
                },
            );
            return Ok(());
        }

        if node.has_marker("edit-toggle") {
            if let Some(field) = parent {
                inner.tree.schedule(
                    now + self.latency,
                    Pending::SetEditable {
                        id: field,
                        editable: true,
                    },
                );
            }
            return Ok(());
        }

        // Clicks elsewhere do nothing.
        Ok(())
    }

    fn handle_signal(
        &self,
        inner: &mut Inner,
        element: ElementId,
        signal: Signal,
    ) -> Result<(), SurfaceError> {
        let now = Instant::now();
        let Some(node) = inner.tree.node(element) else {
            return Err(SurfaceError::Detached { id: element });
        };
        let revealable = REVEALABLE.iter().any(|marker| node.has_marker(marker));
        let is_row = node.has_marker("command-row");
        let editable = node.editable;
        let revealed = node.revealed;

        match signal {
            Signal::Hover => {
                if revealable && !revealed {
                    if let Some(node) = inner.tree.node_mut(element) {
                        node.revealed = true;
                    }
                    let sub = SubtreeBuilder::new(&["edit-toggle"], Some(element));
                    inner.tree.schedule(
                        now + self.latency,
                        Pending::Attach {
                            parent: Some(element),
                            nodes: sub.nodes,
                            root: sub.root,
                        },
                    );
                }
            }
            Signal::Submit => {
                // Submit alone does not land on revealed fields — the
                // unreliability that forced the redundant finalize.
                if editable && !revealable {
                    inner
                        .tree
                        .schedule(now + self.latency, Pending::Commit { id: element });
                    if is_row {
                        inner.tree.schedule(
                            now + self.latency,
                            Pending::SetEditable {
                                id: element,
                                editable: false,
                            },
                        );
                    }
                }
            }
            Signal::Finalize => {
                if editable && revealable {
                    inner
                        .tree
                        .schedule(now + self.latency, Pending::Commit { id: element });
                    inner.tree.schedule(
                        now + self.latency,
                        Pending::SetEditable {
                            id: element,
                            editable: false,
                        },
                    );
                }
            }
        }
        Ok(())
    }
}

impl Surface for MemorySurface {
    async fn locate(&self, scope: Option<ElementId>, selector: &str) -> Option<ElementId> {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        inner.tree.find_first(scope, selector)
    }

    async fn locate_all(&self, scope: Option<ElementId>, selector: &str) -> Vec<ElementId> {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        let found = inner.tree.find_all(scope, selector);
        if inner.duplicate_entries {
            found.into_iter().flat_map(|id| [id, id]).collect()
        } else {
            found
        }
    }

    async fn locate_by_text(
        &self,
        scope: Option<ElementId>,
        selector: &str,
        text: &str,
    ) -> Option<ElementId> {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        inner
            .tree
            .find_all(scope, selector)
            .into_iter()
            .find(|id| {
                inner
                    .tree
                    .node(*id)
                    .is_some_and(|node| node.text.as_deref() == Some(text))
            })
    }

    async fn matches(&self, element: ElementId, selector: &str) -> bool {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        inner
            .tree
            .node(element)
            .is_some_and(|node| node.has_marker(selector))
    }

    async fn has_ancestor(
        &self,
        element: ElementId,
        selector: &str,
        boundary: ElementId,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        inner.tree.has_ancestor(element, selector, boundary)
    }

    async fn click(&self, element: ElementId) -> Result<(), SurfaceError> {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        self.handle_click(&mut inner, element)
    }

    async fn set_value(&self, element: ElementId, value: &str) -> Result<(), SurfaceError> {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        let Some(node) = inner.tree.node_mut(element) else {
            return Err(SurfaceError::Detached { id: element });
        };
        if !node.editable {
            return Err(SurfaceError::NotEditable { id: element });
        }
        node.value = Some(value.to_string());
        Ok(())
    }

    async fn signal(&self, element: ElementId, signal: Signal) -> Result<(), SurfaceError> {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        self.handle_signal(&mut inner, element, signal)
    }

    async fn text(&self, element: ElementId) -> Option<String> {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        inner.tree.node(element).and_then(|node| node.text.clone())
    }

    async fn value(&self, element: ElementId) -> Option<String> {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        inner.tree.node(element).and_then(|node| node.value.clone())
    }

    async fn is_editable(&self, element: ElementId) -> bool {
        let mut inner = self.inner.lock().await;
        inner.tree.apply_due(Instant::now());
        inner
            .tree
            .node(element)
            .is_some_and(|node| node.editable)
    }
}

// ── Subtree construction ───────────────────────────────────────────

fn attach_panel(tree: &mut Tree) -> ElementId {
    let mut sub = SubtreeBuilder::new(&["trigger-panel"], None);
    sub.child(sub.root, &["create-trigger"]);
    let panel = sub.root;
    tree.attach(None, sub.nodes, panel);
    panel
}

fn dialog_subtree(panel: ElementId, vocabulary: &[String]) -> SubtreeBuilder {
    let mut sub = SubtreeBuilder::new(&["event-dialog"], Some(panel));
    for event in vocabulary {
        let option = sub.child(sub.root, &["event-option"]);
        if let Some(node) = sub.node_mut(option) {
            node.text = Some(event.clone());
        }
    }
    sub.child(sub.root, &["confirm-create"]);
    sub
}

fn trigger_card_subtree(
    panel: ElementId,
    event: &str,
    disabled: &HashSet<String>,
) -> SubtreeBuilder {
    let mut sub = SubtreeBuilder::new(&["trigger-card"], Some(panel));
    let field = sub.child(sub.root, &["trigger-event"]);
    if let Some(node) = sub.node_mut(field) {
        node.text = Some(event.to_string());
    }
    let root = sub.root;
    add_affordances(&mut sub, root, disabled);
    sub
}

fn timer_card_subtree(
    container: ElementId,
    name: &str,
    duration: Option<u64>,
    tick: Option<u64>,
    disabled: &HashSet<String>,
) -> SubtreeBuilder {
    let mut sub = SubtreeBuilder::new(&["timer-card", "action-item"], Some(container));
    let label = sub.child(sub.root, &["action-type"]);
    if let Some(node) = sub.node_mut(label) {
        node.text = Some("timer".to_string());
    }
    let field = sub.child(sub.root, &["timer-name"]);
    if let Some(node) = sub.node_mut(field) {
        node.text = Some(name.to_string());
    }
    let field = sub.child(sub.root, &["timer-duration"]);
    if let Some(node) = sub.node_mut(field) {
        node.editable = true;
        node.text = duration.map(|d| d.to_string());
    }
    let field = sub.child(sub.root, &["timer-tick"]);
    if let Some(node) = sub.node_mut(field) {
        node.editable = true;
        node.text = tick.map(|t| t.to_string());
    }
    if !disabled.contains("add-command") {
        sub.child(sub.root, &["add-command"]);
    }
    sub
}

fn condition_card_subtree(
    container: ElementId,
    committed: Option<(&str, &str, &str)>,
    disabled: &HashSet<String>,
) -> SubtreeBuilder {
    let mut sub = SubtreeBuilder::new(&["condition-card", "action-item"], Some(container));
    let label = sub.child(sub.root, &["action-type"]);
    if let Some(node) = sub.node_mut(label) {
        node.text = Some("ifthenelse".to_string());
    }
    let left = sub.child(sub.root, &["condition-left"]);
    let operator = sub.child(sub.root, &["condition-operator"]);
    let right = sub.child(sub.root, &["condition-right"]);
    if let Some(node) = sub.node_mut(operator) {
        node.editable = true;
    }
    if let Some((l, op, r)) = committed {
        if let Some(node) = sub.node_mut(left) {
            node.text = Some(l.to_string());
        }
        if let Some(node) = sub.node_mut(operator) {
            node.text = Some(op.to_string());
        }
        if let Some(node) = sub.node_mut(right) {
            node.text = Some(r.to_string());
        }
    }
    let then_branch = sub.child(sub.root, &["branch-then"]);
    add_affordances(&mut sub, then_branch, disabled);
    let else_branch = sub.child(sub.root, &["branch-else"]);
    add_affordances(&mut sub, else_branch, disabled);
    sub
}

fn add_affordances(sub: &mut SubtreeBuilder, parent: ElementId, disabled: &HashSet<String>) {
    for marker in ["add-command", "add-timer", "add-condition"] {
        if !disabled.contains(marker) {
            sub.child(parent, &[marker]);
        }
    }
}

/// Rows inside a timer card are that timer's values, not standalone
/// actions, so they carry no `action-item` marker.
fn row_markers(tree: &Tree, container: ElementId) -> Vec<&'static str> {
    let in_timer = tree
        .node(container)
        .is_some_and(|node| node.has_marker("timer-card"));
    if in_timer {
        vec!["command-row"]
    } else {
        vec!["command-row", "action-item"]
    }
}

fn attach_now(tree: &mut Tree, parent: Option<ElementId>, sub: SubtreeBuilder) {
    let root = sub.root;
    tree.attach(parent, sub.nodes, root);
}

fn last_child(tree: &Tree, parent: ElementId) -> ElementId {
    tree.node(parent)
        .and_then(|node| node.children.last().copied())
        .unwrap_or(parent)
}
