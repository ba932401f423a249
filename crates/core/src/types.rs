use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SnapshotMode;

/// Prefix of every ref string handed out by the registry (`@ref:<n>`).
pub const REF_PREFIX: &str = "@ref:";

/// Literal tree text returned when a snapshot emits no nodes at all,
/// so callers can tell "ran but found nothing" apart from "did not run".
pub const EMPTY_SNAPSHOT_MARKER: &str = "<empty page>";

/// Check whether a selector string uses the ref syntax.
pub fn is_ref_string(selector: &str) -> bool {
    selector.trim_start().starts_with(REF_PREFIX)
}

/// Format a counter value as a ref string.
pub fn format_ref(n: u32) -> String {
    format!("{}{}", REF_PREFIX, n)
}

/// Element bounding box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Whether any part of the box lies inside a viewport anchored at the
    /// page origin.
    pub fn intersects_viewport(&self, viewport: Viewport) -> bool {
        self.x < viewport.width as f64
            && self.y < viewport.height as f64
            && self.x + self.width > 0.0
            && self.y + self.height > 0.0
    }
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Page-level metadata carried by a document and echoed in the snapshot
/// header lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

impl PageInfo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.viewport.is_none()
    }
}

/// Metadata attached to one issued ref.
///
/// `name` holds the full untruncated accessible name; the rendered tree line
/// may show a shortened one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefInfo {
    /// Best-effort structural selector re-resolvable after the ref expires.
    pub selector: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_viewport: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    /// Innermost enclosing landmark, e.g. `form "Login"` or `navigation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Overall quality tier of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotQuality {
    /// Every qualifying node was emitted.
    Complete,
    /// A depth, line, or children budget cut the output short.
    Truncated,
    /// No node qualified at all.
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// Nodes emitted into the tree text (markers excluded).
    pub element_count: usize,
    /// Refs allocated or re-used during this snapshot.
    pub ref_count: usize,
    /// Deepest depth actually visited, relative to the snapshot root.
    pub depth_seen: usize,
    /// Configured depth budget in effect.
    pub depth_limit: usize,
    pub mode: SnapshotMode,
    pub quality: SnapshotQuality,
    /// True when descent stopped at the depth budget with children left.
    pub depth_limited: bool,
    /// True when a line/children budget truncated the output.
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub taken_at: DateTime<Utc>,
}

/// Tree text plus per-ref metadata plus quality metadata.
///
/// `refs` preserves traversal order: iterating it yields elements in the
/// order their lines appear in `tree`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResult {
    pub tree: String,
    pub refs: IndexMap<String, RefInfo>,
    pub metadata: SnapshotMetadata,
}

impl SnapshotResult {
    /// Whether the snapshot ran but found nothing.
    pub fn is_empty(&self) -> bool {
        self.metadata.quality == SnapshotQuality::Empty
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize snapshot result, returning null");
            serde_json::Value::Null
        })
    }
}
