//! Local key/value storage for values this node has agreed to host.
//!
//! A node stores at most one value per key: the last `Store` it was asked
//! to hold.

use std::collections::HashMap;
use std::sync::Mutex;

use kdht_core::Id;

pub struct LocalStorage {
    entries: Mutex<HashMap<Id, Vec<u8>>>,
}

impl LocalStorage {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self, key: Id, value: Vec<u8>) {
        self.entries.lock().unwrap().insert(key, value);
    }

    pub fn get(&self, key: &Id) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kdht_core::id::KEY_BYTES;

    #[test]
    fn store_then_get() {
        let storage = LocalStorage::new();
        let key = [1u8; KEY_BYTES];
        storage.store(key, b"hello".to_vec());
        assert_eq!(storage.get(&key), Some(b"hello".to_vec()));
    }

    #[test]
    fn missing_key_is_none() {
        let storage = LocalStorage::new();
        assert_eq!(storage.get(&[0u8; KEY_BYTES]), None);
    }

    #[test]
    fn restoring_a_key_overwrites_previous_value() {
        let storage = LocalStorage::new();
        let key = [2u8; KEY_BYTES];
        storage.store(key, b"first".to_vec());
        storage.store(key, b"second".to_vec());
        assert_eq!(storage.get(&key), Some(b"second".to_vec()));
    }
}
