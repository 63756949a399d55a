use bytes::Bytes;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The Store holds the key-value pairs shared by every session. It is cloned cheaply into each
/// connection task through reference counting; all access goes through [`InnerStore::lock`], so
/// a command sees and mutates the mapping atomically.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<InnerStore>,
}

impl Store {
    pub fn new() -> Store {
        Self::default()
    }
}

#[derive(Default)]
pub struct InnerStore {
    state: Mutex<State>,
}

pub struct InnerStoreLocked<'a> {
    state: MutexGuard<'a, State>,
}

impl<'a> InnerStoreLocked<'a> {
    pub fn set(&mut self, key: String, data: Bytes) {
        self.state.keys.insert(key, data);
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.state.keys.get(key).cloned()
    }

    pub fn remove(&mut self, key: &str) -> Option<Bytes> {
        self.state.keys.remove(key)
    }

    pub fn exists(&self, key: &str) -> bool {
        self.state.keys.contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.state.keys.len()
    }

    /// Removes every key, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.state.keys.len();
        self.state.keys.clear();
        count
    }
}

impl Deref for Store {
    type Target = InnerStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl InnerStore {
    pub fn lock(&self) -> InnerStoreLocked<'_> {
        // A panic while holding the lock cannot leave the map half-updated: every mutation is a
        // single HashMap call.
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        InnerStoreLocked { state }
    }
}

type Key = String;

#[derive(Default)]
pub struct State {
    keys: HashMap<Key, Bytes>,
}
