//! Synthetic document nodes.
//!
//! Nodes are shared handles (`Arc`) into a mutable tree: parents hold strong
//! references to children, children hold weak references to parents, so
//! dropping a detached subtree reclaims it. The `Document` owns the root and
//! is the only node factory.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::warn;

/// Shared handle to a node. Holding one never creates or destroys document
/// structure.
pub type NodeRef = Arc<DomNode>;

/// Weak counterpart of [`NodeRef`]; upgrading fails once the document has
/// dropped the node.
pub type WeakNodeRef = Weak<DomNode>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root sentinel, one per document.
    Root,
    Element { tag: String },
    Text,
}

#[derive(Default)]
struct NodeState {
    parent: WeakNodeRef,
    children: Vec<NodeRef>,
    attrs: Vec<(String, String)>,
    text: String,
}

pub struct DomNode {
    id: u64,
    kind: NodeKind,
    // Weak handle to the Arc this node lives in, so &self methods can hand
    // out parent pointers.
    self_weak: WeakNodeRef,
    state: RwLock<NodeState>,
}

impl std::fmt::Debug for DomNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl DomNode {
    pub(crate) fn new(id: u64, kind: NodeKind) -> NodeRef {
        Arc::new_cyclic(|weak| DomNode {
            id,
            kind,
            self_weak: weak.clone(),
            state: RwLock::new(NodeState::default()),
        })
    }

    // A poisoned lock still holds a structurally valid tree; recover the guard.
    fn state(&self) -> RwLockReadGuard<'_, NodeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, NodeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Node identity, unique within the owning document.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text)
    }

    /// Lowercase tag name; `None` for text and root nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Attribute value by (case-insensitive) name.
    pub fn attr(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.state()
            .attrs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.clone())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.state().attrs.iter().any(|(k, _)| *k == name)
    }

    /// Whether the `class` attribute contains the given class token.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|v| v.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let mut state = self.state_mut();
        if let Some(entry) = state.attrs.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value.to_string();
        } else {
            state.attrs.push((name, value.to_string()));
        }
    }

    pub fn remove_attr(&self, name: &str) {
        let name = name.to_ascii_lowercase();
        self.state_mut().attrs.retain(|(k, _)| *k != name);
    }

    /// Own text of a text node; empty for elements.
    pub fn own_text(&self) -> String {
        self.state().text.clone()
    }

    pub fn set_text(&self, text: &str) {
        self.state_mut().text = text.to_string();
    }

    /// Concatenated descendant text, whitespace-normalized.
    pub fn text_content(&self) -> String {
        let mut chunks = Vec::new();
        self.collect_text(&mut chunks);
        let joined = chunks.join(" ");
        joined.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text(&self, out: &mut Vec<String>) {
        if self.is_text() {
            let text = self.own_text();
            if !text.trim().is_empty() {
                out.push(text);
            }
            return;
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.state().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.state().children.len()
    }

    pub fn element_children(&self) -> Vec<NodeRef> {
        self.state()
            .children
            .iter()
            .filter(|c| c.is_element())
            .cloned()
            .collect()
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.state().parent.upgrade()
    }

    /// Pointer identity: two handles to the same node.
    pub fn same_node(&self, other: &NodeRef) -> bool {
        std::ptr::eq(self, Arc::as_ptr(other))
    }

    /// Append `child`, moving it out of its previous parent if attached
    /// elsewhere. Appending a node to itself or to one of its descendants is
    /// refused.
    pub fn append_child(&self, child: &NodeRef) {
        if child.is_root() {
            warn!("refusing to append a document root as a child");
            return;
        }
        let mut ancestor = self.self_weak.upgrade();
        while let Some(node) = ancestor {
            if node.same_node(child) {
                warn!(node = child.id, "refusing to append a node under itself");
                return;
            }
            ancestor = node.parent();
        }

        child.detach();
        child.state_mut().parent = self.self_weak.clone();
        self.state_mut().children.push(child.clone());
    }

    /// Remove this node from its parent, leaving the subtree intact but
    /// detached.
    pub fn detach(&self) {
        let parent = self.state().parent.upgrade();
        if let Some(parent) = parent {
            parent
                .state_mut()
                .children
                .retain(|c| !std::ptr::eq(Arc::as_ptr(c), self));
        }
        self.state_mut().parent = WeakNodeRef::new();
    }
}
