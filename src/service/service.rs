use std::fs;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use crate::capture::{Error, Parser};
use crate::config::Config;
use crate::correlate::{Correlator, Summary};
use crate::report::Reporter;
use super::ready;

#[derive(Clone)]
pub struct Service {
    cfg:        Arc<Config>,
    correlator: Arc<Correlator>,
    reporter:   Arc<Reporter>,
    token:      CancellationToken,
}

impl Service {
    pub fn new(cfg: Config, reporter: Reporter) -> Result<Self> {
        let correlator = Correlator::new(cfg.port, cfg.retention, cfg.margin)?;
        Ok(Self {
            cfg:        Arc::new(cfg),
            correlator: Arc::new(correlator),
            reporter:   Arc::new(reporter),
            token:      CancellationToken::new(),
        })
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Starts the dump and clean tasks, plus file polling when a capture
    /// directory is configured.
    pub fn spawn(&self, handle: &Handle) -> Vec<JoinHandle<()>> {
        let mut tasks = Vec::new();

        let this = self.clone();
        tasks.push(handle.spawn(async move {
            let period = this.cfg.dump;
            this.every(period, "dump", |this| {
                this.dump(Utc::now());
            }).await
        }));

        let this = self.clone();
        tasks.push(handle.spawn(async move {
            let period = this.cfg.clean;
            this.every(period, "clean", |this| {
                let evicted = this.correlator.evict(Utc::now());
                debug!("evicted {} pending, {} remain", evicted, this.correlator.pending().len());
            }).await
        }));

        if self.cfg.dir.is_some() {
            let this = self.clone();
            tasks.push(handle.spawn(async move {
                this.poll().await
            }));
        }

        tasks
    }

    /// Correlates one capture file.
    pub fn ingest(&self, path: &Path) -> Result<Summary> {
        let data    = fs::read(path)?;
        let summary = self.correlator.ingest(&self.cfg.decoder, &data)?;
        debug!("{}: {:?}", path.display(), summary);
        Ok(summary)
    }

    /// Correlates `tcpdump -tttt` summary lines until the reader is
    /// exhausted or the service is cancelled.
    pub fn stream<R: BufRead>(&self, reader: R) -> Result<Summary> {
        let parser = Parser::new()?;
        let mut summary = Summary::default();

        for line in reader.lines() {
            if self.token.is_cancelled() {
                break;
            }

            let line = line?;
            summary.frames += 1;
            match parser.parse(&line) {
                Some(line) => summary.add(self.correlator.observe(&line)),
                None       => summary.skipped += 1,
            }
        }

        debug!("stream finished: {:?}", summary);

        Ok(summary)
    }

    /// Ingests and then removes a capture file. A file with a broken
    /// container is still removed so polling moves past it.
    pub fn process(&self, path: &Path) -> Result<Option<Summary>> {
        let summary = match self.ingest(path) {
            Ok(summary) => Some(summary),
            Err(e) if e.is::<Error>() => {
                error!("{}: invalid capture: {}", path.display(), e);
                None
            }
            Err(e) => return Err(e),
        };

        fs::remove_file(path)?;

        Ok(summary)
    }

    /// Reports the oldest bucket that has aged past the drain margin.
    pub fn dump(&self, now: DateTime<Utc>) -> usize {
        match self.correlator.drain(now) {
            Some(drained) => {
                let bucket  = drained.bucket;
                let reports = self.reporter.report(drained, self.correlator.identities());
                info!("bucket {} reported for {} groups", bucket, reports);
                reports
            }
            None => {
                debug!("no data to dump");
                0
            }
        }
    }

    /// Reports every remaining bucket regardless of age.
    pub fn flush(&self) -> usize {
        let identities = self.correlator.identities();
        self.correlator.drain_all().into_iter().map(|drained| {
            self.reporter.report(drained, identities)
        }).sum()
    }

    /// Processes the oldest ready file in `dir`, if any.
    pub fn next(&self, dir: &Path) -> Result<Option<Summary>> {
        match ready(dir, &self.cfg.pattern)?.into_iter().next() {
            Some(path) => self.process(&path),
            None       => Ok(None),
        }
    }

    async fn every<F: Fn(&Self)>(&self, period: Duration, name: &str, work: F) {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = timer.tick()           => work(self),
            }
        }

        debug!("{} finished", name);
    }

    async fn poll(&self) {
        let dir = match &self.cfg.dir {
            Some(dir) => dir.clone(),
            None      => return,
        };

        let period = self.cfg.poll;
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = timer.tick()           => (),
            }

            let this = self.clone();
            let path = dir.clone();
            let next = tokio::task::spawn_blocking(move || this.next(&path));

            match next.await {
                Ok(Ok(_))  => (),
                Ok(Err(e)) => warn!("poll {} failed: {}", dir.display(), e),
                Err(e)     => error!("poll task failed: {:?}", e),
            }
        }

        debug!("poll finished");
    }
}
