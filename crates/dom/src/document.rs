//! Document: root owner, node factory, page metadata.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use domlens_core::{PageInfo, Viewport};

use crate::node::{DomNode, NodeKind, NodeRef};

#[derive(Debug)]
pub struct Document {
    root: NodeRef,
    page: RwLock<PageInfo>,
    next_id: AtomicU64,
}

impl Document {
    pub fn new() -> Self {
        Document {
            root: DomNode::new(0, NodeKind::Root),
            page: RwLock::new(PageInfo::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// The root sentinel. It carries no tag and never appears in snapshot
    /// output; top-level elements hang directly under it.
    pub fn root(&self) -> NodeRef {
        self.root.clone()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a detached element. Tag names are stored lowercase.
    pub fn create_element(&self, tag: &str) -> NodeRef {
        DomNode::new(
            self.next_id(),
            NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
            },
        )
    }

    /// Create a detached text node.
    pub fn create_text(&self, text: &str) -> NodeRef {
        let node = DomNode::new(self.next_id(), NodeKind::Text);
        node.set_text(text);
        node
    }

    /// Whether the node is still reachable from this document's root.
    pub fn is_attached(&self, node: &NodeRef) -> bool {
        let mut current = node.clone();
        loop {
            if current.same_node(&self.root) {
                return true;
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub fn page_info(&self) -> PageInfo {
        self.page
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_page_info(&self, info: PageInfo) {
        *self.page.write().unwrap_or_else(PoisonError::into_inner) = info;
    }

    pub fn set_title(&self, title: &str) {
        self.page
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .title = Some(title.to_string());
    }

    pub fn set_url(&self, url: &str) {
        self.page
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .url = Some(url.to_string());
    }

    pub fn set_viewport(&self, width: u32, height: u32) {
        self.page
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .viewport = Some(Viewport { width, height });
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_attached_follows_parent_chain() {
        let doc = Document::new();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        div.append_child(&span);

        assert!(!doc.is_attached(&span));
        doc.root().append_child(&div);
        assert!(doc.is_attached(&span));

        div.detach();
        assert!(!doc.is_attached(&span));
        assert!(doc.is_attached(&doc.root()));
    }

    #[test]
    fn test_node_ids_are_unique() {
        let doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let t = doc.create_text("x");
        assert_ne!(a.id(), b.id());
        assert_ne!(b.id(), t.id());
    }

    #[test]
    fn test_page_info_setters() {
        let doc = Document::new();
        assert!(doc.page_info().is_empty());

        doc.set_title("Checkout");
        doc.set_url("https://shop.example/cart");
        doc.set_viewport(1280, 720);

        let info = doc.page_info();
        assert_eq!(info.title.as_deref(), Some("Checkout"));
        assert_eq!(info.url.as_deref(), Some("https://shop.example/cart"));
        assert_eq!(info.viewport.map(|v| (v.width, v.height)), Some((1280, 720)));
    }
}
