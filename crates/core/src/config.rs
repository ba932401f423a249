use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default depth budget for an interactive-only snapshot.
pub const DEFAULT_INTERACTIVE_DEPTH: usize = 10;

/// Default depth budget for a comprehensive (all-content) snapshot.
pub const DEFAULT_FULL_DEPTH: usize = 50;

/// Which nodes a snapshot emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    /// Only nodes with an interactive role; each gets a ref.
    Interactive,
    /// Interactive nodes plus structural and textual context
    /// (headings, images, text blocks, landmarks), without refs.
    Full,
}

impl SnapshotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotMode::Interactive => "interactive",
            SnapshotMode::Full => "full",
        }
    }
}

impl Default for SnapshotMode {
    fn default() -> Self {
        SnapshotMode::Interactive
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotConfig {
    #[serde(default)]
    pub mode: SnapshotMode,
    /// Depth budget; `None` uses the per-mode default (10 interactive,
    /// 50 full).
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Global budget on emitted lines across the whole traversal.
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    /// Per-subtree cap; beyond it a summarizing marker line is emitted.
    #[serde(default = "default_max_children")]
    pub max_children: usize,
    /// Include nodes the visibility probe reports as hidden.
    #[serde(default)]
    pub include_hidden: bool,
    /// Emit the leading `PAGE:`/`SNAPSHOT:` metadata lines.
    #[serde(default = "default_page_header")]
    pub page_header: bool,
}

fn default_max_lines() -> usize {
    500
}

fn default_max_children() -> usize {
    50
}

fn default_page_header() -> bool {
    true
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            mode: SnapshotMode::default(),
            max_depth: None,
            max_lines: default_max_lines(),
            max_children: default_max_children(),
            include_hidden: false,
            page_header: default_page_header(),
        }
    }
}

impl SnapshotConfig {
    pub fn interactive() -> Self {
        Self::default()
    }

    pub fn full() -> Self {
        Self {
            mode: SnapshotMode::Full,
            ..Self::default()
        }
    }

    /// Depth budget in effect for this configuration.
    pub fn effective_depth(&self) -> usize {
        self.max_depth.unwrap_or(match self.mode {
            SnapshotMode::Interactive => DEFAULT_INTERACTIVE_DEPTH,
            SnapshotMode::Full => DEFAULT_FULL_DEPTH,
        })
    }

    /// Reject budgets that can never produce output. A zero budget is a
    /// caller mistake, not an empty page.
    pub fn validate(&self) -> Result<()> {
        if self.max_lines == 0 {
            return Err(Error::Config("maxLines must be > 0".to_string()));
        }
        if self.max_children == 0 {
            return Err(Error::Config("maxChildren must be > 0".to_string()));
        }
        if self.max_depth == Some(0) {
            return Err(Error::Config("maxDepth must be > 0 when set".to_string()));
        }
        Ok(())
    }
}

/// How the registry holds on to element handles.
///
/// Both variants look identical to callers; they differ only in whether the
/// registry keeps otherwise-dropped elements alive in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retention {
    /// Weak handles: entries do not keep elements reachable.
    Weak,
    /// Strong handles: entries pin elements until cleared or evicted.
    Strong,
}

impl Default for Retention {
    fn default() -> Self {
        Retention::Weak
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    #[serde(default)]
    pub retention: Retention,
    /// Entry cap; when exceeded, stale entries are pruned first and then
    /// the oldest live entries are evicted.
    #[serde(default)]
    pub capacity: Option<usize>,
}
