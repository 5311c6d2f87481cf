use std::collections::{BTreeMap, HashMap};
use std::mem;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use crate::capture::Addr;

pub type Bucket = DateTime<Utc>;

pub const BUCKET_SECS: i64 = 300;

/// Samples for one bucket, grouped by host.
#[derive(Debug, Default)]
pub struct Drained {
    pub bucket: Bucket,
    pub hosts:  HashMap<Addr, Vec<f64>>,
}

pub struct Buffer {
    margin:  Duration,
    buckets: Mutex<BTreeMap<Bucket, HashMap<Addr, Vec<f64>>>>,
}

impl Buffer {
    pub fn new(margin: Duration) -> Self {
        Self {
            margin:  margin,
            buckets: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn push(&self, bucket: Bucket, host: Addr, latency: f64) {
        let mut buckets = self.buckets.lock();
        let hosts = buckets.entry(bucket).or_insert_with(HashMap::new);
        hosts.entry(host).or_insert_with(Vec::new).push(latency);
    }

    /// Removes the oldest bucket once it is older than `now - margin`.
    pub fn drain(&self, now: DateTime<Utc>) -> Option<Drained> {
        let cutoff = now - self.margin;
        let mut buckets = self.buckets.lock();

        let bucket = *buckets.keys().next().filter(|&&bucket| bucket < cutoff)?;
        let hosts  = buckets.remove(&bucket)?;

        Some(Drained { bucket, hosts })
    }

    /// Removes every bucket, oldest first, regardless of age.
    pub fn drain_all(&self) -> Vec<Drained> {
        let buckets = mem::take(&mut *self.buckets.lock());
        buckets.into_iter().map(|(bucket, hosts)| {
            Drained { bucket, hosts }
        }).collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn floor(ts: DateTime<Utc>) -> Bucket {
    let secs = ts.timestamp();
    let secs = secs - secs.rem_euclid(BUCKET_SECS);
    Utc.timestamp_opt(secs, 0).single().unwrap_or(ts)
}
