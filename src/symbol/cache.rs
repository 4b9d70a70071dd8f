// Mon Oct 19 2026 - Alex

use crate::memory::Address;
use parking_lot::RwLock;
use std::collections::HashMap;

pub struct SymbolCache {
    cache: RwLock<HashMap<String, Address>>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<Address> {
        self.cache.read().get(name).copied()
    }

    pub fn insert(&self, name: &str, address: Address) {
        self.cache.write().insert(name.to_string(), address);
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn size(&self) -> usize {
        self.cache.read().len()
    }
}

impl Default for SymbolCache {
    fn default() -> Self {
        Self::new()
    }
}
