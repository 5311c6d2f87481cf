use std::collections::HashMap;
use std::collections::hash_map::Entry;
use log::trace;
use parking_lot::RwLock;
use crate::capture::Addr;
use super::Identity;

/// Host to identity map. Entries are written once and live as long as the
/// process; the key space is bounded by the number of miners.
pub struct Identities {
    map: RwLock<HashMap<Addr, Identity>>,
}

impl Identities {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, host: &Addr) -> Option<Identity> {
        self.map.read().get(host).cloned()
    }

    pub fn contains(&self, host: &Addr) -> bool {
        self.map.read().contains_key(host)
    }

    /// Stores `identity` unless `host` already has one. Returns whether the
    /// entry was created.
    pub fn insert(&self, host: Addr, identity: Identity) -> bool {
        if identity.is_empty() {
            return false;
        }

        match self.map.write().entry(host) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e)   => {
                trace!("{} is '{}' mining '{}'", host, identity.worker_group, identity.coin);
                e.insert(identity);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Identities {
    fn default() -> Self {
        Self::new()
    }
}
