//! Bounded wait for an element to appear.
//!
//! The one suspension point in the system. The core engine never blocks;
//! waiting is a poll loop over [`resolve`](crate::resolver::resolve) with
//! an explicit timeout, and timing out is an outcome, not an error.

use std::time::Duration;

use domlens_dom::{Document, NodeRef};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::registry::RefRegistry;
use crate::resolver;

#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        WaitConfig {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

#[derive(Debug)]
pub enum WaitOutcome {
    Found(NodeRef),
    TimedOut { waited: Duration },
}

impl WaitOutcome {
    pub fn found(&self) -> bool {
        matches!(self, WaitOutcome::Found(_))
    }

    pub fn node(self) -> Option<NodeRef> {
        match self {
            WaitOutcome::Found(node) => Some(node),
            WaitOutcome::TimedOut { .. } => None,
        }
    }
}

/// Repeatedly resolve `selector` until it matches or `timeout` elapses.
/// The first attempt happens immediately; misses sleep `poll_interval`.
pub async fn wait_for(
    doc: &Document,
    registry: &mut RefRegistry,
    selector: &str,
    config: &WaitConfig,
) -> WaitOutcome {
    let start = Instant::now();
    loop {
        if let Some(node) = resolver::resolve(doc, registry, selector, None) {
            return WaitOutcome::Found(node);
        }
        let waited = start.elapsed();
        if waited >= config.timeout {
            debug!(
                selector,
                waited_ms = waited.as_millis() as u64,
                "wait timed out"
            );
            return WaitOutcome::TimedOut { waited };
        }
        sleep(config.poll_interval).await;
    }
}
