//! The session-scoped store of compiled scripts.
//!
//! One [`ScriptCache`] lives for the whole process and is shared by `Arc`.
//! Entries are write-once and only ever leave all together, when the
//! session ends. Every [`ScriptCache::clear`] starts a new epoch; a compile
//! that began in an older epoch is not allowed to publish.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::error::CacheError;
use crate::host::EntryHandle;
use crate::script::CompiledScript;

/// Scripts exposing the session entry points, in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPointTable {
    main: IndexMap<String, EntryHandle>,
    init: IndexMap<String, EntryHandle>,
}

impl EntryPointTable {
    pub fn main(&self) -> impl Iterator<Item = (&str, EntryHandle)> {
        self.main.iter().map(|(name, handle)| (name.as_str(), *handle))
    }

    pub fn init(&self) -> impl Iterator<Item = (&str, EntryHandle)> {
        self.init.iter().map(|(name, handle)| (name.as_str(), *handle))
    }

    pub fn main_handle(&self, script: &str) -> Option<EntryHandle> {
        self.main.get(script).copied()
    }

    pub fn init_handle(&self, script: &str) -> Option<EntryHandle> {
        self.init.get(script).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.init.is_empty()
    }

    fn clear(&mut self) {
        self.main.clear();
        self.init.clear();
    }
}

/// Outcome of [`ScriptCache::publish`].
#[derive(Debug)]
pub enum Publish {
    /// The script is now the cached entry.
    Inserted(Arc<CompiledScript>),
    /// Another compile got there first; this is its entry.
    Existing(Arc<CompiledScript>),
    /// The cache was cleared while compiling. Nothing was stored.
    Stale(Arc<CompiledScript>),
}

impl Publish {
    pub fn into_script(self) -> Arc<CompiledScript> {
        match self {
            Publish::Inserted(script) | Publish::Existing(script) | Publish::Stale(script) => script,
        }
    }
}

#[derive(Debug, Default)]
struct CacheState {
    scripts: FxHashMap<String, Arc<CompiledScript>>,
    entry_points: EntryPointTable,
    epoch: u64,
    allocated_bytes: usize,
}

impl CacheState {
    fn store(&mut self, script: CompiledScript) -> Arc<CompiledScript> {
        self.allocated_bytes += script.allocated_bytes();
        let script = Arc::new(script);
        self.scripts.insert(script.name().to_string(), Arc::clone(&script));
        script
    }
}

/// Name-keyed store of [`CompiledScript`]s.
#[derive(Debug, Default)]
pub struct ScriptCache {
    state: Mutex<CacheState>,
}

impl ScriptCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached script `name`. Repeated calls within one epoch return the
    /// same object.
    pub fn get(&self, name: &str) -> Option<Arc<CompiledScript>> {
        self.state.lock().scripts.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().scripts.contains_key(name)
    }

    /// Insert a script that must not be cached yet.
    ///
    /// A second insert under the same name means the caller lost track of
    /// the cache. Debug builds assert, release builds reject it.
    pub fn insert(&self, script: CompiledScript) -> Result<Arc<CompiledScript>, CacheError> {
        let mut state = self.state.lock();
        let duplicate = state.scripts.contains_key(script.name());
        debug_assert!(!duplicate, "script '{}' inserted twice", script.name());
        if duplicate {
            return Err(CacheError::Corruption {
                name: script.name().to_string(),
            });
        }
        Ok(state.store(script))
    }

    /// Publish a script compiled during `epoch`.
    ///
    /// Racing compiles of one name are expected here: the first to publish
    /// wins and everyone gets its entry.
    pub fn publish(&self, script: CompiledScript, epoch: u64) -> Publish {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            debug!(script = script.name(), epoch, current = state.epoch, "discarding stale compile");
            return Publish::Stale(Arc::new(script));
        }
        if let Some(existing) = state.scripts.get(script.name()) {
            return Publish::Existing(Arc::clone(existing));
        }
        Publish::Inserted(state.store(script))
    }

    /// Drop every script and entry point and start a new epoch.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let released = state.scripts.len();
        let bytes = state.allocated_bytes;
        state.scripts.clear();
        state.entry_points.clear();
        state.allocated_bytes = 0;
        state.epoch += 1;
        info!(released, bytes, epoch = state.epoch, "script cache cleared");
    }

    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    pub fn len(&self) -> usize {
        self.state.lock().scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().scripts.is_empty()
    }

    /// Buffer bytes held by the cached scripts.
    pub fn allocated_bytes(&self) -> usize {
        self.state.lock().allocated_bytes
    }

    /// Snapshot of the entry points recorded this session.
    pub fn entry_points(&self) -> EntryPointTable {
        self.state.lock().entry_points.clone()
    }

    pub(crate) fn record_main(&self, script: &str, handle: EntryHandle) {
        self.state.lock().entry_points.main.insert(script.to_string(), handle);
    }

    pub(crate) fn record_init(&self, script: &str, handle: EntryHandle) {
        self.state.lock().entry_points.init.insert(script.to_string(), handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(name: &str) -> CompiledScript {
        CompiledScript::new(name, vec![0, 1, 2], vec![9; 5], 16)
    }

    #[test]
    fn get_returns_the_same_object() {
        let cache = ScriptCache::new();
        let inserted = cache.insert(script("scripts/foo")).unwrap();
        let a = cache.get("scripts/foo").unwrap();
        let b = cache.get("scripts/foo").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &inserted));
        assert!(cache.get("scripts/bar").is_none());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "inserted twice")]
    fn double_insert_asserts_in_debug() {
        let cache = ScriptCache::new();
        cache.insert(script("scripts/foo")).unwrap();
        let _ = cache.insert(script("scripts/foo"));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn double_insert_is_rejected_in_release() {
        let cache = ScriptCache::new();
        let first = cache.insert(script("scripts/foo")).unwrap();
        assert_eq!(
            cache.insert(script("scripts/foo")).unwrap_err(),
            CacheError::Corruption {
                name: "scripts/foo".into()
            }
        );
        assert!(Arc::ptr_eq(&first, &cache.get("scripts/foo").unwrap()));
    }

    #[test]
    fn publish_first_wins() {
        let cache = ScriptCache::new();
        let epoch = cache.epoch();
        let first = match cache.publish(script("scripts/foo"), epoch) {
            Publish::Inserted(s) => s,
            other => panic!("unexpected {other:?}"),
        };
        let second = match cache.publish(script("scripts/foo"), epoch) {
            Publish::Existing(s) => s,
            other => panic!("unexpected {other:?}"),
        };
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn stale_compiles_are_not_published() {
        let cache = ScriptCache::new();
        let epoch = cache.epoch();
        cache.clear();
        assert!(matches!(cache.publish(script("scripts/foo"), epoch), Publish::Stale(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_is_total() {
        let cache = ScriptCache::new();
        cache.insert(script("a")).unwrap();
        cache.insert(script("b")).unwrap();
        cache.record_main("a", EntryHandle(1));
        cache.record_init("b", EntryHandle(2));
        assert_eq!(cache.allocated_bytes(), 2 * (1 + 3 + 5));

        cache.clear();
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
        assert!(cache.entry_points().is_empty());
        assert_eq!(cache.allocated_bytes(), 0);
        assert_eq!(cache.epoch(), 1);

        cache.insert(script("a")).unwrap();
        assert!(cache.contains("a"));
    }

    #[test]
    fn entry_points_keep_insertion_order() {
        let cache = ScriptCache::new();
        for (i, name) in ["z", "a", "m"].into_iter().enumerate() {
            cache.record_main(name, EntryHandle(i as u32));
        }
        let order: Vec<_> = cache.entry_points().main().map(|(n, _)| n.to_string()).collect();
        assert_eq!(order, vec!["z", "a", "m"]);
        assert_eq!(cache.entry_points().main_handle("a"), Some(EntryHandle(1)));
        assert_eq!(cache.entry_points().init_handle("a"), None);
    }
}
