//! HTML ingestion.
//!
//! Parsing goes through `scraper` (html5ever underneath), then the parsed
//! tree is mirrored into a [`Document`] so the rest of the engine works on
//! one node type regardless of where the tree came from. Comments, doctypes
//! and whitespace-only text are dropped during the mirror.

use std::path::Path;

use domlens_core::Result;
use scraper::Html;
use tracing::debug;

use crate::document::Document;
use crate::node::NodeRef;
use crate::query;

/// Parse a full HTML document. The `<title>` element, when present and
/// non-empty, is captured into the document's page info.
pub fn parse_document(html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let doc = Document::new();
    mirror_children(&doc, &doc.root(), parsed.tree.root());

    if let Some(title) = query::select_first(&doc.root(), "title") {
        let text = title.text_content();
        if !text.is_empty() {
            doc.set_title(&text);
        }
    }
    debug!(
        bytes = html.len(),
        title = doc.page_info().title.as_deref().unwrap_or(""),
        "parsed HTML document"
    );
    doc
}

/// Parse an HTML fragment. The `<html>` wrapper the parser introduces is
/// unwrapped so fragment children hang directly under the root.
pub fn parse_fragment(html: &str) -> Document {
    let parsed = Html::parse_fragment(html);
    let doc = Document::new();
    let root = doc.root();
    mirror_children(&doc, &root, parsed.tree.root());

    let children = root.children();
    if children.len() == 1 && children[0].tag() == Some("html") {
        let wrapper = &children[0];
        for child in wrapper.children() {
            root.append_child(&child);
        }
        wrapper.detach();
    }
    doc
}

/// Read and parse an HTML file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Document> {
    let html = std::fs::read_to_string(path.as_ref())?;
    Ok(parse_document(&html))
}

// `ego_tree` is the tree crate underneath `scraper`; the versions must
// stay in step so the node types unify.
fn mirror_children(
    doc: &Document,
    parent: &NodeRef,
    src: ego_tree::NodeRef<'_, scraper::Node>,
) {
    for child in src.children() {
        match child.value() {
            scraper::Node::Element(el) => {
                let node = doc.create_element(el.name());
                for (name, value) in el.attrs() {
                    node.set_attr(name, value);
                }
                parent.append_child(&node);
                mirror_children(doc, &node, child);
            }
            scraper::Node::Text(text) => {
                if !text.trim().is_empty() {
                    parent.append_child(&doc.create_text(text));
                }
            }
            _ => {}
        }
    }
}
