use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Composite key shared by the template caches and the pending buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateKey {
    pub observation_domain_id: u32,
    pub template_id: u16,
    pub source: String,
}

impl TemplateKey {
    pub fn new(observation_domain_id: u32, template_id: u16, source: impl Into<String>) -> Self {
        Self {
            observation_domain_id,
            template_id,
            source: source.into(),
        }
    }
}

/// Thread-safe template store. Clones share the same map.
///
/// Entries are published fully built behind an `Arc`, so readers never
/// see a partially constructed template. Redefinitions overwrite.
#[derive(Debug)]
pub struct TemplateCache<T> {
    entries: Arc<RwLock<FxHashMap<TemplateKey, Arc<T>>>>,
}

impl<T> Clone for TemplateCache<T> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<T> Default for TemplateCache<T> {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(FxHashMap::default())),
        }
    }
}

impl<T> TemplateCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `template`, returning the one it replaced.
    pub fn put(&self, key: TemplateKey, template: T) -> Option<Arc<T>> {
        self.entries.write().insert(key, Arc::new(template))
    }

    pub fn get(&self, key: &TemplateKey) -> Option<Arc<T>> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &TemplateKey) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
