use std::collections::HashMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use crate::capture::Addr;

/// Client endpoint and the sequence number the client will confirm.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Key(pub Addr, pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pending {
    pub timestamp: DateTime<Utc>,
}

/// Server responses waiting for the client's acknowledgment.
pub struct Table {
    map: Mutex<HashMap<Key, Pending>>,
}

impl Table {
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Records a response; a retransmission overwrites the earlier entry.
    pub fn insert(&self, key: Key, timestamp: DateTime<Utc>) {
        self.map.lock().insert(key, Pending { timestamp });
    }

    pub fn take(&self, key: &Key) -> Option<Pending> {
        self.map.lock().remove(key)
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.map.lock().contains_key(key)
    }

    /// Drops entries recorded before `cutoff`, returning how many went.
    pub fn compact(&self, cutoff: DateTime<Utc>) -> usize {
        let mut map = self.map.lock();
        let before  = map.len();
        map.retain(|_, pending| pending.timestamp >= cutoff);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}
