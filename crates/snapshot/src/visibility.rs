//! Visibility classification.
//!
//! The tree builder consults a [`VisibilityProbe`] on every element, live,
//! during traversal; nothing is cached. Hosts with a layout engine override
//! `bounding_box`; the default probe works from markup alone.

use domlens_core::BoundingBox;
use domlens_dom::NodeRef;

/// Tags that never render content.
const NON_RENDERING_TAGS: &[&str] = &[
    "head", "script", "style", "meta", "link", "title", "template", "noscript",
];

/// Style/visibility lookup injected into the tree builder.
pub trait VisibilityProbe {
    fn is_visible(&self, node: &NodeRef) -> bool;

    /// Layout rectangle for an element, when the host knows one.
    fn bounding_box(&self, _node: &NodeRef) -> Option<BoundingBox> {
        None
    }
}

impl<F> VisibilityProbe for F
where
    F: Fn(&NodeRef) -> bool,
{
    fn is_visible(&self, node: &NodeRef) -> bool {
        self(node)
    }
}

/// Markup-only visibility: inline style, the `hidden` attribute, and
/// non-rendering tags. No layout knowledge.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleVisibility;

impl VisibilityProbe for StyleVisibility {
    fn is_visible(&self, node: &NodeRef) -> bool {
        let tag = match node.tag() {
            Some(tag) => tag,
            None => return true,
        };
        if NON_RENDERING_TAGS.contains(&tag) {
            return false;
        }
        if node.has_attr("hidden") {
            return false;
        }
        if tag == "input"
            && node
                .attr("type")
                .map(|t| t.trim().eq_ignore_ascii_case("hidden"))
                .unwrap_or(false)
        {
            return false;
        }
        if let Some(style) = node.attr("style") {
            if style_declares_hidden(&style) {
                return false;
            }
        }
        true
    }
}

fn style_declares_hidden(style: &str) -> bool {
    let compact: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.contains("display:none") || compact.contains("visibility:hidden")
}

/// Concatenated text of the subtree, skipping any descendant element the
/// probe reports hidden. The starting node itself is not probed.
/// Whitespace-normalized like `text_content`.
pub fn visible_text(node: &NodeRef, probe: &dyn VisibilityProbe) -> String {
    let mut chunks = Vec::new();
    if node.is_text() {
        let text = node.own_text();
        if !text.trim().is_empty() {
            chunks.push(text);
        }
    } else {
        for child in node.children() {
            collect_visible_text(&child, probe, &mut chunks);
        }
    }
    let joined = chunks.join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_visible_text(node: &NodeRef, probe: &dyn VisibilityProbe, out: &mut Vec<String>) {
    if node.is_text() {
        let text = node.own_text();
        if !text.trim().is_empty() {
            out.push(text);
        }
        return;
    }
    if node.is_element() && !probe.is_visible(node) {
        return;
    }
    for child in node.children() {
        collect_visible_text(&child, probe, out);
    }
}
