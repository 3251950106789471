//! Element tree with deferred mutations.
//!
//! Mutations are queued with a due time and folded into the tree lazily on
//! the next query, which models the external surface's eventual consistency
//! without background tasks: under a paused tokio clock every transition is
//! deterministic.
//!
//! Listings are breadth-first, so a container's own fields and branches are
//! always found before anything nested deeper.

use std::collections::{HashMap, VecDeque};

use tokio::time::Instant;

use trigsync_app::ports::ElementId;

pub(crate) struct Node {
    pub id: ElementId,
    pub markers: Vec<String>,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub text: Option<String>,
    pub value: Option<String>,
    pub editable: bool,
    pub revealed: bool,
}

impl Node {
    pub fn new(markers: &[&str], parent: Option<ElementId>) -> Self {
        Self {
            id: ElementId::new(),
            markers: markers.iter().map(ToString::to_string).collect(),
            parent,
            children: Vec::new(),
            text: None,
            value: None,
            editable: false,
            revealed: false,
        }
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }
}

/// Builds a subtree of linked nodes before it is attached to the tree.
pub(crate) struct SubtreeBuilder {
    pub root: ElementId,
    pub nodes: Vec<Node>,
}

impl SubtreeBuilder {
    pub fn new(markers: &[&str], parent: Option<ElementId>) -> Self {
        let root = Node::new(markers, parent);
        let id = root.id;
        Self {
            root: id,
            nodes: vec![root],
        }
    }

    /// Add a child under `parent` (which must already be in this subtree).
    pub fn child(&mut self, parent: ElementId, markers: &[&str]) -> ElementId {
        let node = Node::new(markers, Some(parent));
        let id = node.id;
        if let Some(parent) = self.nodes.iter_mut().find(|n| n.id == parent) {
            parent.children.push(id);
        }
        self.nodes.push(node);
        id
    }

    pub fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }
}

pub(crate) enum Pending {
    Attach {
        parent: Option<ElementId>,
        nodes: Vec<Node>,
        root: ElementId,
    },
    Detach {
        id: ElementId,
    },
    SetEditable {
        id: ElementId,
        editable: bool,
    },
    /// Fold the raw input value into the rendered text.
    Commit {
        id: ElementId,
    },
}

#[derive(Default)]
pub(crate) struct Tree {
    nodes: HashMap<ElementId, Node>,
    roots: Vec<ElementId>,
    pending: Vec<(Instant, Pending)>,
}

impl Tree {
    pub fn schedule(&mut self, at: Instant, mutation: Pending) {
        self.pending.push((at, mutation));
    }

    /// Fold every due mutation into the tree, in insertion order.
    pub fn apply_due(&mut self, now: Instant) {
        let pending = std::mem::take(&mut self.pending);
        for (at, mutation) in pending {
            if at <= now {
                self.apply(mutation);
            } else {
                self.pending.push((at, mutation));
            }
        }
    }

    fn apply(&mut self, mutation: Pending) {
        match mutation {
            Pending::Attach {
                parent,
                nodes,
                root,
            } => self.attach(parent, nodes, root),
            Pending::Detach { id } => self.detach(id),
            Pending::SetEditable { id, editable } => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.editable = editable;
                }
            }
            Pending::Commit { id } => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.text = node.value.clone();
                }
            }
        }
    }

    /// Insert a pre-built subtree. Dropped silently when the parent has been
    /// detached in the meantime.
    pub fn attach(&mut self, parent: Option<ElementId>, nodes: Vec<Node>, root: ElementId) {
        match parent {
            Some(parent) => {
                let Some(parent) = self.nodes.get_mut(&parent) else {
                    return;
                };
                parent.children.push(root);
            }
            None => self.roots.push(root),
        }
        for node in nodes {
            self.nodes.insert(node.id, node);
        }
    }

    pub fn detach(&mut self, id: ElementId) {
        if let Some(node) = self.nodes.remove(&id) {
            if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
                parent.children.retain(|c| *c != id);
            } else {
                self.roots.retain(|r| *r != id);
            }
            for child in node.children {
                self.detach_subtree(child);
            }
        }
    }

    fn detach_subtree(&mut self, id: ElementId) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.detach_subtree(child);
            }
        }
    }

    pub fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Every descendant of `scope` (the whole tree when `None`), breadth
    /// first, siblings in insertion order.
    pub fn descendants(&self, scope: Option<ElementId>) -> Vec<ElementId> {
        let mut queue: VecDeque<ElementId> = match scope {
            Some(id) => self
                .nodes
                .get(&id)
                .map(|n| n.children.clone())
                .unwrap_or_default()
                .into(),
            None => self.roots.clone().into(),
        };
        let mut out = Vec::new();
        while let Some(id) = queue.pop_front() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                queue.extend(node.children.iter().copied());
            }
        }
        out
    }

    pub fn find_all(&self, scope: Option<ElementId>, selector: &str) -> Vec<ElementId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|node| node.has_marker(selector))
            })
            .collect()
    }

    pub fn find_first(&self, scope: Option<ElementId>, selector: &str) -> Option<ElementId> {
        self.find_all(scope, selector).into_iter().next()
    }

    /// Whether a `selector`-matching node sits strictly between `element`
    /// and `boundary` in the ancestor chain.
    pub fn has_ancestor(&self, element: ElementId, selector: &str, boundary: ElementId) -> bool {
        let mut current = self.nodes.get(&element).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == boundary {
                return false;
            }
            let Some(node) = self.nodes.get(&id) else {
                return false;
            };
            if node.has_marker(selector) {
                return true;
            }
            current = node.parent;
        }
        false
    }
}
