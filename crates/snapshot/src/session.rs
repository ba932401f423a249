//! Session facade.
//!
//! Bundles the registry, visibility probe and configuration one automation
//! session carries between commands, so callers drive snapshots without
//! wiring the pieces themselves. Refs live exactly as long as the session's
//! registry.

use domlens_core::{RegistryConfig, Result, SnapshotConfig, SnapshotResult};
use domlens_dom::{Document, NodeRef};
use tracing::info;

use crate::builder;
use crate::registry::RefRegistry;
use crate::resolver;
use crate::visibility::{StyleVisibility, VisibilityProbe};
use crate::wait::{self, WaitConfig, WaitOutcome};

pub struct SnapshotSession {
    registry: RefRegistry,
    probe: Box<dyn VisibilityProbe + Send + Sync>,
    config: SnapshotConfig,
    wait: WaitConfig,
}

impl SnapshotSession {
    /// A session with markup-only visibility and a default registry.
    pub fn new(config: SnapshotConfig) -> Self {
        SnapshotSession {
            registry: RefRegistry::default(),
            probe: Box::new(StyleVisibility),
            config,
            wait: WaitConfig::default(),
        }
    }

    pub fn with_probe(mut self, probe: impl VisibilityProbe + Send + Sync + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn with_registry(mut self, config: RegistryConfig) -> Self {
        self.registry = RefRegistry::new(config);
        self
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn registry(&self) -> &RefRegistry {
        &self.registry
    }

    /// Snapshot without clearing: unchanged elements keep their refs across
    /// back-to-back calls.
    pub fn snapshot(&mut self, doc: &Document) -> Result<SnapshotResult> {
        builder::build_snapshot(doc, &mut self.registry, self.probe.as_ref(), &self.config)
    }

    /// Snapshot a subtree only.
    pub fn snapshot_from(&mut self, doc: &Document, scope: &NodeRef) -> Result<SnapshotResult> {
        builder::build_snapshot_from(
            doc,
            &mut self.registry,
            self.probe.as_ref(),
            &self.config,
            scope,
        )
    }

    /// Start a fresh generation, then snapshot: every ref handed out before
    /// this call becomes permanently invalid.
    pub fn refresh(&mut self, doc: &Document) -> Result<SnapshotResult> {
        self.registry.clear();
        let result = self.snapshot(doc)?;
        info!(
            elements = result.metadata.element_count,
            refs = result.metadata.ref_count,
            generation = self.registry.generation(),
            "refreshed snapshot"
        );
        Ok(result)
    }

    pub fn resolve(&mut self, doc: &Document, selector: &str) -> Option<NodeRef> {
        resolver::resolve(doc, &mut self.registry, selector, None)
    }

    pub async fn wait_for(&mut self, doc: &Document, selector: &str) -> WaitOutcome {
        let config = self.wait.clone();
        wait::wait_for(doc, &mut self.registry, selector, &config).await
    }
}

impl Default for SnapshotSession {
    fn default() -> Self {
        Self::new(SnapshotConfig::default())
    }
}
