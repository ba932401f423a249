//! Stable element refs.
//!
//! A `RefRegistry` hands out opaque `@ref:<n>` strings for elements and
//! resolves them back later, refusing to resolve anything that has gone
//! stale (detached, reclaimed, or issued before the last `clear`). One
//! registry serves one automation session; concurrent sessions use
//! independent instances.

use std::sync::Arc;

use domlens_core::{format_ref, RegistryConfig, Retention, REF_PREFIX};
use domlens_dom::{Document, NodeRef, WeakNodeRef};
use indexmap::IndexMap;
use tracing::{debug, warn};

enum Handle {
    Strong(NodeRef),
    Weak(WeakNodeRef),
}

impl Handle {
    fn node(&self) -> Option<NodeRef> {
        match self {
            Handle::Strong(node) => Some(node.clone()),
            Handle::Weak(weak) => weak.upgrade(),
        }
    }
}

pub struct RefRegistry {
    config: RegistryConfig,
    entries: IndexMap<String, Handle>,
    counter: u32,
    // Bumped on every clear; only used to make log lines attributable.
    generation: u64,
}

impl RefRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        RefRegistry {
            config,
            entries: IndexMap::new(),
            counter: 0,
            generation: 0,
        }
    }

    pub fn with_retention(retention: Retention) -> Self {
        Self::new(RegistryConfig {
            retention,
            ..RegistryConfig::default()
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn handle(&self, node: &NodeRef) -> Handle {
        match self.config.retention {
            Retention::Strong => Handle::Strong(node.clone()),
            Retention::Weak => Handle::Weak(Arc::downgrade(node)),
        }
    }

    /// Resolve a ref to its element.
    ///
    /// `None` when the ref was never issued (or predates the last `clear`),
    /// when the element has been detached, or when a weakly held element got
    /// reclaimed. Stale entries are removed on the way out.
    pub fn get(&mut self, doc: &Document, ref_str: &str) -> Option<NodeRef> {
        let key = ref_str.trim();
        let live = match self.entries.get(key) {
            Some(handle) => handle.node().filter(|node| doc.is_attached(node)),
            None => return None,
        };
        match live {
            Some(node) => Some(node),
            None => {
                self.entries.shift_remove(key);
                debug!(ref_id = key, "dropped stale ref");
                None
            }
        }
    }

    /// Associate an externally chosen ref with an element.
    ///
    /// When the ref follows the `@ref:<n>` shape, the counter jumps past
    /// `n` so later allocations cannot collide with it.
    pub fn set(&mut self, ref_str: &str, node: &NodeRef) {
        let key = ref_str.trim().to_string();
        if let Some(n) = key
            .strip_prefix(REF_PREFIX)
            .and_then(|suffix| suffix.parse::<u32>().ok())
        {
            if n >= self.counter {
                self.counter = n.saturating_add(1);
            }
        }
        self.entries.insert(key, self.handle(node));
        self.enforce_capacity(None);
    }

    /// Allocate a ref for an element, or return the one it already has.
    ///
    /// Idempotent within a generation: the live entries are scanned for the
    /// same element before a new counter value is spent.
    pub fn generate_ref(&mut self, doc: &Document, node: &NodeRef) -> String {
        let mut stale: Vec<String> = Vec::new();
        let mut found: Option<String> = None;
        for (key, handle) in &self.entries {
            match handle.node().filter(|n| doc.is_attached(n)) {
                Some(existing) => {
                    if existing.same_node(node) {
                        found = Some(key.clone());
                        break;
                    }
                }
                None => stale.push(key.clone()),
            }
        }
        for key in &stale {
            self.entries.shift_remove(key);
        }
        if let Some(key) = found {
            return key;
        }

        let ref_str = format_ref(self.counter);
        self.counter = self.counter.saturating_add(1);
        self.entries.insert(ref_str.clone(), self.handle(node));
        self.enforce_capacity(Some(doc));
        debug!(ref_id = %ref_str, generation = self.generation, "issued ref");
        ref_str
    }

    /// Drop every association and reset the counter.
    ///
    /// Starts a new generation: refs issued before this call never resolve
    /// again, even for elements that are still attached, and the next
    /// allocation is `@ref:0` again.
    pub fn clear(&mut self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.counter = 0;
        self.generation += 1;
        debug!(dropped, generation = self.generation, "cleared ref registry");
    }

    fn enforce_capacity(&mut self, doc: Option<&Document>) {
        let capacity = match self.config.capacity {
            Some(capacity) => capacity,
            None => return,
        };
        if self.entries.len() <= capacity {
            return;
        }
        // Stale entries go first; order of the survivors is preserved, so
        // index 0 is always the oldest live association.
        self.entries.retain(|_, handle| match handle.node() {
            Some(node) => doc.map_or(true, |d| d.is_attached(&node)),
            None => false,
        });
        while self.entries.len() > capacity {
            match self.entries.shift_remove_index(0) {
                Some((evicted, _)) => {
                    warn!(ref_id = %evicted, "ref capacity exceeded, evicting oldest entry");
                }
                None => break,
            }
        }
    }
}

impl Default for RefRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domlens_dom::Document;

    fn doc_with_buttons(n: usize) -> (Document, Vec<NodeRef>) {
        let doc = Document::new();
        let root = doc.root();
        let nodes: Vec<NodeRef> = (0..n)
            .map(|i| {
                let button = doc.create_element("button");
                button.set_attr("id", &format!("b{i}"));
                root.append_child(&button);
                button
            })
            .collect();
        (doc, nodes)
    }

    #[test]
    fn test_generate_ref_is_idempotent_and_sequential() {
        let (doc, nodes) = doc_with_buttons(2);
        let mut registry = RefRegistry::default();

        let first = registry.generate_ref(&doc, &nodes[0]);
        assert_eq!(first, "@ref:0");
        assert_eq!(registry.generate_ref(&doc, &nodes[0]), first);
        assert_eq!(registry.generate_ref(&doc, &nodes[1]), "@ref:1");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_resolves_and_trims() {
        let (doc, nodes) = doc_with_buttons(1);
        let mut registry = RefRegistry::default();
        let r = registry.generate_ref(&doc, &nodes[0]);

        let resolved = registry.get(&doc, &r).unwrap();
        assert!(resolved.same_node(&nodes[0]));
        assert!(registry.get(&doc, &format!("  {r} ")).is_some());
        assert!(registry.get(&doc, "@ref:99").is_none());
    }

    #[test]
    fn test_clear_invalidates_and_resets_counter() {
        let (doc, nodes) = doc_with_buttons(2);
        let mut registry = RefRegistry::default();
        let r = registry.generate_ref(&doc, &nodes[0]);
        assert_eq!(registry.generation(), 0);

        registry.clear();
        assert_eq!(registry.generation(), 1);
        // Still attached, but the ref predates the clear.
        assert!(registry.get(&doc, &r).is_none());
        assert_eq!(registry.generate_ref(&doc, &nodes[1]), "@ref:0");
    }

    #[test]
    fn test_detached_element_goes_stale() {
        let (doc, nodes) = doc_with_buttons(1);
        let mut registry = RefRegistry::default();
        let r = registry.generate_ref(&doc, &nodes[0]);

        nodes[0].detach();
        assert!(registry.get(&doc, &r).is_none());
        // Removed lazily on that read.
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_weak_retention_reclaims_detached_elements() {
        let doc = Document::new();
        let root = doc.root();
        let mut registry = RefRegistry::with_retention(Retention::Weak);

        let probe = {
            let button = doc.create_element("button");
            root.append_child(&button);
            registry.generate_ref(&doc, &button);
            button.detach();
            Arc::downgrade(&button)
        };
        // No strong handle left anywhere: the registry did not pin it, and
        // reclamation reads the same as detachment.
        assert!(probe.upgrade().is_none());
        assert!(registry.get(&doc, "@ref:0").is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_strong_retention_pins_until_clear() {
        let doc = Document::new();
        let root = doc.root();
        let mut registry = RefRegistry::with_retention(Retention::Strong);

        let probe = {
            let button = doc.create_element("button");
            root.append_child(&button);
            registry.generate_ref(&doc, &button);
            button.detach();
            Arc::downgrade(&button)
        };
        assert!(probe.upgrade().is_some());

        registry.clear();
        assert!(probe.upgrade().is_none());
    }

    #[test]
    fn test_set_rehydrates_and_bumps_counter() {
        let (doc, nodes) = doc_with_buttons(2);
        let mut registry = RefRegistry::default();

        registry.set("@ref:7", &nodes[0]);
        let resolved = registry.get(&doc, "@ref:7").unwrap();
        assert!(resolved.same_node(&nodes[0]));
        // Next allocation starts past the re-hydrated suffix.
        assert_eq!(registry.generate_ref(&doc, &nodes[1]), "@ref:8");
    }

    #[test]
    fn test_set_at_max_suffix_saturates_counter() {
        let (doc, nodes) = doc_with_buttons(2);
        let mut registry = RefRegistry::default();

        registry.set("@ref:4294967295", &nodes[0]);
        // The counter pegs at the largest suffix instead of wrapping; the
        // exhausted slot is reused last-writer-wins.
        let r = registry.generate_ref(&doc, &nodes[1]);
        assert_eq!(r, "@ref:4294967295");
        assert!(registry.get(&doc, &r).unwrap().same_node(&nodes[1]));
    }

    #[test]
    fn test_capacity_prunes_stale_before_evicting_live() {
        let (doc, nodes) = doc_with_buttons(4);
        let mut registry = RefRegistry::new(RegistryConfig {
            retention: Retention::Strong,
            capacity: Some(3),
        });
        let refs: Vec<String> = nodes
            .iter()
            .take(3)
            .map(|n| registry.generate_ref(&doc, n))
            .collect();

        // One entry goes stale; inserting a fourth prunes it instead of
        // evicting a live one.
        nodes[1].detach();
        registry.generate_ref(&doc, &nodes[3]);
        assert_eq!(registry.len(), 3);
        assert!(registry.get(&doc, &refs[0]).is_some());
        assert!(registry.get(&doc, &refs[2]).is_some());

        // All live now: the oldest live entry is evicted.
        let (doc2, nodes2) = doc_with_buttons(5);
        let mut full = RefRegistry::new(RegistryConfig {
            retention: Retention::Strong,
            capacity: Some(4),
        });
        let refs2: Vec<String> = nodes2
            .iter()
            .map(|n| full.generate_ref(&doc2, n))
            .collect();
        assert_eq!(full.len(), 4);
        assert!(full.get(&doc2, &refs2[0]).is_none());
        assert!(full.get(&doc2, &refs2[4]).is_some());
    }
}
