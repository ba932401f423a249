//! Ref-or-structural selector resolution.
//!
//! One entry point for everything a command layer passes as a "selector":
//! ref strings go to the registry, anything else runs as a structural
//! query. Failures are plain not-found; composing richer diagnostics from
//! the ref-metadata set is the caller's job.

use domlens_core::is_ref_string;
use domlens_dom::{query, Document, NodeRef};

use crate::registry::RefRegistry;

/// Resolve a selector to an element, or `None`.
///
/// `scope` restricts structural queries to a subtree; ref lookups ignore it
/// (a ref names one element wherever it sits).
pub fn resolve(
    doc: &Document,
    registry: &mut RefRegistry,
    selector: &str,
    scope: Option<&NodeRef>,
) -> Option<NodeRef> {
    let trimmed = selector.trim();
    if is_ref_string(trimmed) {
        return registry.get(doc, trimmed);
    }
    match scope {
        Some(scope) => query::select_first(scope, trimmed),
        None => query::select_first(&doc.root(), trimmed),
    }
}
