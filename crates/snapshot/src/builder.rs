//! Snapshot tree builder.
//!
//! Depth-first pre-order traversal of the document into a compact text
//! tree plus a ref-metadata map. Output is bounded three ways: a depth
//! budget, a global line budget, and a per-subtree children cap. Every cut
//! is observable, either as a marker line in the tree or as flags and
//! warnings in the metadata; the builder never fails because a page is too
//! big or too empty.

use chrono::Utc;
use domlens_core::{
    Error, PageInfo, RefInfo, Result, SnapshotConfig, SnapshotMetadata, SnapshotMode,
    SnapshotQuality, SnapshotResult, EMPTY_SNAPSHOT_MARKER,
};
use domlens_dom::{css_path, Document, NodeRef};
use indexmap::IndexMap;
use tracing::debug;

use crate::registry::RefRegistry;
use crate::roles;
use crate::visibility::VisibilityProbe;

/// Snapshot the whole document.
pub fn build_snapshot(
    doc: &Document,
    registry: &mut RefRegistry,
    probe: &dyn VisibilityProbe,
    config: &SnapshotConfig,
) -> Result<SnapshotResult> {
    let root = doc.root();
    build_snapshot_from(doc, registry, probe, config, &root)
}

/// Snapshot the subtree under `scope` (the document root or any attached
/// element). A detached or non-element scope is a caller error.
pub fn build_snapshot_from(
    doc: &Document,
    registry: &mut RefRegistry,
    probe: &dyn VisibilityProbe,
    config: &SnapshotConfig,
    scope: &NodeRef,
) -> Result<SnapshotResult> {
    config.validate()?;
    if !scope.is_root() && !scope.is_element() {
        return Err(Error::NoRoot("snapshot scope is not an element".to_string()));
    }
    if !doc.is_attached(scope) {
        return Err(Error::NoRoot(
            "snapshot scope is detached from the document".to_string(),
        ));
    }

    let depth_budget = config.effective_depth();
    let mut walker = Walker {
        doc,
        registry,
        probe,
        config,
        depth_budget,
        lines: Vec::new(),
        refs: IndexMap::new(),
        element_count: 0,
        depth_seen: 0,
        truncated: false,
        depth_limited: false,
        stopped: false,
        warnings: Vec::new(),
    };

    if scope.is_root() {
        walker.walk_children(scope, 0, 0, false);
    } else {
        walker.walk(scope, 0, 0, false);
    }

    let Walker {
        lines,
        refs,
        element_count,
        depth_seen,
        truncated,
        depth_limited,
        warnings,
        ..
    } = walker;

    let quality = if element_count == 0 {
        SnapshotQuality::Empty
    } else if truncated || depth_limited {
        SnapshotQuality::Truncated
    } else {
        SnapshotQuality::Complete
    };

    let tree = if element_count == 0 {
        EMPTY_SNAPSHOT_MARKER.to_string()
    } else {
        let mut out: Vec<String> = Vec::new();
        if config.page_header {
            let page = doc.page_info();
            if !page.is_empty() {
                out.push(page_line(&page));
            }
            out.push(format!(
                "SNAPSHOT: elements={} depth={}/{} mode={}",
                element_count,
                depth_seen,
                depth_budget,
                config.mode.as_str()
            ));
        }
        out.extend(lines);
        out.join("\n")
    };

    debug!(
        elements = element_count,
        refs = refs.len(),
        quality = ?quality,
        "built snapshot"
    );

    Ok(SnapshotResult {
        tree,
        metadata: SnapshotMetadata {
            element_count,
            ref_count: refs.len(),
            depth_seen,
            depth_limit: depth_budget,
            mode: config.mode,
            quality,
            depth_limited,
            truncated,
            warnings,
            taken_at: Utc::now(),
        },
        refs,
    })
}

fn page_line(page: &PageInfo) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(title) = &page.title {
        parts.push(title.clone());
    }
    if let Some(url) = &page.url {
        parts.push(url.clone());
    }
    if let Some(viewport) = page.viewport {
        parts.push(format!("viewport={}x{}", viewport.width, viewport.height));
    }
    format!("PAGE: {}", parts.join(" | "))
}

struct Walker<'a> {
    doc: &'a Document,
    registry: &'a mut RefRegistry,
    probe: &'a dyn VisibilityProbe,
    config: &'a SnapshotConfig,
    depth_budget: usize,
    lines: Vec<String>,
    refs: IndexMap<String, RefInfo>,
    element_count: usize,
    depth_seen: usize,
    truncated: bool,
    depth_limited: bool,
    stopped: bool,
    warnings: Vec<String>,
}

impl Walker<'_> {
    /// Visit one node. `depth` is the structural depth used for the budget;
    /// `indent` is the nesting of emitted lines, which only grows when a
    /// node actually produced output.
    fn walk(&mut self, node: &NodeRef, depth: usize, indent: usize, suppress_text: bool) {
        if self.stopped {
            return;
        }
        if node.is_text() {
            if self.config.mode == SnapshotMode::Full && !suppress_text {
                let text = node.text_content();
                if !text.is_empty() {
                    if self.at_line_budget() {
                        self.note_line_budget();
                        return;
                    }
                    self.emit_line(indent, None, "text", Some(&text), &[]);
                }
            }
            return;
        }
        if !node.is_element() {
            return;
        }

        if depth > self.depth_seen {
            self.depth_seen = depth;
        }
        if !self.config.include_hidden && !self.probe.is_visible(node) {
            return;
        }

        let mut child_indent = indent;
        let mut child_suppress = suppress_text;

        if let Some(resolved) = roles::resolve_role(node) {
            let role = resolved.role;
            if roles::is_interactive(role) {
                if self.at_line_budget() {
                    self.note_line_budget();
                    return;
                }
                let name = roles::resolve_name(&self.doc.root(), node, role, self.probe);
                let mut flags: Vec<String> = Vec::new();
                if roles::checkable(role) && roles::is_checked(node) {
                    flags.push("checked".to_string());
                }
                if roles::is_disabled(node) {
                    flags.push("disabled".to_string());
                }
                let ref_str = self.registry.generate_ref(self.doc, node);
                let info = self.build_ref_info(node, role, name.clone());
                self.refs.insert(ref_str.clone(), info);
                self.emit_line(indent, Some(&ref_str), role, name.as_deref(), &flags);
                child_indent = indent + 1;
                if name.is_some() && roles::names_from_text(role) {
                    child_suppress = true;
                }
            } else if self.config.mode == SnapshotMode::Full {
                if self.at_line_budget() {
                    self.note_line_budget();
                    return;
                }
                let name = roles::resolve_name(&self.doc.root(), node, role, self.probe);
                let mut flags: Vec<String> = Vec::new();
                if let Some(level) = resolved.level {
                    flags.push(format!("level={level}"));
                }
                self.emit_line(indent, None, role, name.as_deref(), &flags);
                child_indent = indent + 1;
                if name.is_some() && roles::names_from_text(role) {
                    child_suppress = true;
                }
            }
        }

        self.walk_children(node, depth + 1, child_indent, child_suppress);
    }

    /// Visit the children of `node`, which sit at `child_depth`. Applies the
    /// depth budget and the per-subtree children cap.
    fn walk_children(
        &mut self,
        node: &NodeRef,
        child_depth: usize,
        indent: usize,
        suppress_text: bool,
    ) {
        if self.stopped {
            return;
        }
        if child_depth > self.depth_budget {
            if self.has_deeper_content(node) {
                self.note_depth_limited();
            }
            return;
        }
        let children = node.children();
        let shown = children.len().min(self.config.max_children);
        for child in children.iter().take(shown) {
            self.walk(child, child_depth, indent, suppress_text);
            if self.stopped {
                return;
            }
        }
        if children.len() > shown {
            self.truncated = true;
            if self.at_line_budget() {
                self.note_line_budget();
                return;
            }
            self.lines.push(format!(
                "{}{} children: {} shown, rest hidden by budget",
                "  ".repeat(indent),
                children.len(),
                shown
            ));
        }
    }

    fn emit_line(
        &mut self,
        indent: usize,
        ref_str: Option<&str>,
        role: &str,
        name: Option<&str>,
        flags: &[String],
    ) {
        let mut line = "  ".repeat(indent);
        if let Some(r) = ref_str {
            line.push_str(r);
            line.push(' ');
        }
        line.push_str(role);
        if let Some(name) = name {
            line.push_str(&format!(" \"{}\"", roles::display_name(name)));
        }
        if !flags.is_empty() {
            line.push_str(&format!(" ({})", flags.join(", ")));
        }
        self.lines.push(line);
        self.element_count += 1;
    }

    fn build_ref_info(&self, node: &NodeRef, role: &str, name: Option<String>) -> RefInfo {
        let bounding_box = self.probe.bounding_box(node);
        let in_viewport = match (bounding_box, self.doc.page_info().viewport) {
            (Some(bb), Some(viewport)) => Some(bb.intersects_viewport(viewport)),
            _ => None,
        };
        RefInfo {
            selector: css_path(node),
            role: role.to_string(),
            name,
            bounding_box,
            in_viewport,
            importance: roles::importance(node, role),
            context: roles::landmark_context(node),
        }
    }

    /// Whether anything below the depth cut would have produced output:
    /// any element child, or in full mode any non-blank text child.
    fn has_deeper_content(&self, node: &NodeRef) -> bool {
        node.children().iter().any(|child| {
            child.is_element()
                || (self.config.mode == SnapshotMode::Full
                    && child.is_text()
                    && !child.own_text().trim().is_empty())
        })
    }

    fn at_line_budget(&self) -> bool {
        self.lines.len() >= self.config.max_lines
    }

    fn note_line_budget(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.truncated = true;
            self.warnings.push(format!(
                "line budget of {} reached, output truncated",
                self.config.max_lines
            ));
        }
    }

    fn note_depth_limited(&mut self) {
        if !self.depth_limited {
            self.depth_limited = true;
            self.warnings.push(format!(
                "depth limit {} reached with deeper content present",
                self.depth_budget
            ));
        }
    }
}
