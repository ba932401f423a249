//! Synthetic DOM for DomLens.
//!
//! A thread-safe element tree that can be built by hand or ingested from
//! HTML, plus the structural query layer the snapshot engine resolves
//! selectors against.

pub mod document;
pub mod html;
pub mod node;
pub mod query;

pub use document::Document;
pub use html::{load_file, parse_document, parse_fragment};
pub use node::{DomNode, NodeKind, NodeRef, WeakNodeRef};
pub use query::{css_path, select_all, select_first};
