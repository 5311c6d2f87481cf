use std::collections::BTreeMap;
use log::{debug, warn};
use serde::Serialize;
use crate::buffer::Drained;
use crate::identity::Identities;
use super::{Sink, Stats};

pub const INTERVAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Report {
    pub observe_interval: String,
    pub worker_group:     String,
    pub mining_coin:      String,
    pub total_requests:   usize,
    pub avg_latency:      f64,
    #[serde(rename = "95_percentile")]
    pub p95_latency:      f64,
    #[serde(rename = "99_percentile")]
    pub p99_latency:      f64,
    pub median_latency:   f64,
    pub max_latency:      f64,
    pub min_latency:      f64,
}

pub struct Reporter {
    sink: Box<dyn Sink>,
}

#[derive(Default)]
struct Group {
    coin:    String,
    samples: Vec<f64>,
}

impl Reporter {
    pub fn new<S: Sink + 'static>(sink: S) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Pools a drained bucket per worker group and emits one report for
    /// each. Returns the number of reports emitted.
    pub fn report(&self, drained: Drained, identities: &Identities) -> usize {
        let interval = drained.bucket.format(INTERVAL_FORMAT).to_string();

        let mut hosts = drained.hosts.into_iter().collect::<Vec<_>>();
        hosts.sort_by_key(|(host, _)| *host);

        let mut groups  = BTreeMap::<String, Group>::new();
        let mut unknown = 0;

        for (host, samples) in hosts {
            let identity = match identities.get(&host) {
                Some(identity) => identity,
                None           => {
                    unknown += 1;
                    continue;
                }
            };

            let group = groups.entry(identity.worker_group).or_default();
            if group.coin.is_empty() {
                group.coin = identity.coin;
            }
            group.samples.extend(samples);
        }

        if unknown > 0 {
            debug!("{}: dropped {} unidentified hosts", interval, unknown);
        }

        let mut emitted = 0;

        for (name, group) in groups {
            let stats = match Stats::compute(&group.samples) {
                Ok(stats) => stats,
                Err(e)    => {
                    warn!("{} {}: {}", interval, name, e);
                    continue;
                }
            };

            self.sink.emit(Report {
                observe_interval: interval.clone(),
                worker_group:     name,
                mining_coin:      group.coin,
                total_requests:   stats.count,
                avg_latency:      stats.mean,
                p95_latency:      stats.p95,
                p99_latency:      stats.p99,
                median_latency:   stats.median,
                max_latency:      stats.max,
                min_latency:      stats.min,
            });

            emitted += 1;
        }

        emitted
    }
}
