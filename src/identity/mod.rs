#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Identity {
    pub worker_group: String,
    pub coin:         String,
}

impl Identity {
    pub fn is_empty(&self) -> bool {
        self.worker_group.is_empty()
    }
}

pub use cache::Identities;
pub use extract::{extract, scan, Scan, PREFIX};

mod cache;
mod extract;
