use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use crate::buffer::{self, Buffer, Drained};
use crate::capture::{Addr, Capture, Decoder, Direction, Error, Exchange, Flags, Line, Record};
use crate::identity::{scan, Identities, Scan};
use super::{Key, Table};

pub struct Correlator {
    port:         u16,
    retention:    chrono::Duration,
    pending:      Table,
    identities:   Identities,
    buffer:       Buffer,
    unidentified: AtomicU64,
    orphans:      AtomicU64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Registration {
    Known,
    Identified,
    Control,
    Unknown,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Registration(Registration),
    Response,
    Confirmation(Option<i64>),
    Ignored,
}

/// Per-file counts reported after ingesting a capture.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    pub frames:       u64,
    pub skipped:      u64,
    pub identified:   u64,
    pub unidentified: u64,
    pub controls:     u64,
    pub responses:    u64,
    pub samples:      u64,
    pub orphans:      u64,
    pub ignored:      u64,
}

impl Correlator {
    pub fn new(port: u16, retention: Duration, margin: Duration) -> Result<Self> {
        Ok(Self {
            port:         port,
            retention:    chrono::Duration::from_std(retention)?,
            pending:      Table::new(),
            identities:   Identities::new(),
            buffer:       Buffer::new(chrono::Duration::from_std(margin)?),
            unidentified: AtomicU64::new(0),
            orphans:      AtomicU64::new(0),
        })
    }

    /// Handles a client data segment. Only the first identity seen for a host
    /// is kept and the in-flight table is never touched.
    pub fn register(&self, host: Addr, payload: &[u8]) -> Registration {
        if self.identities.contains(&host) {
            return Registration::Known;
        }

        match scan(payload) {
            Scan::Identity(identity) => {
                self.identities.insert(host, identity);
                Registration::Identified
            }
            Scan::Control => Registration::Control,
            Scan::Unknown => {
                self.unidentified.fetch_add(1, Ordering::Relaxed);
                let head = &payload[..payload.len().min(64)];
                debug!("{} unidentified: {}", host, String::from_utf8_lossy(head));
                Registration::Unknown
            }
        }
    }

    pub fn respond(&self, host: Addr, ack: u32, timestamp: DateTime<Utc>) {
        trace!("{} response awaiting seq {}", host, ack);
        self.pending.insert(Key(host, ack), timestamp);
    }

    /// Completes a triplet, returning the latency in whole milliseconds.
    pub fn confirm(&self, host: Addr, seq: u32, timestamp: DateTime<Utc>) -> Option<i64> {
        let pending = match self.pending.take(&Key(host, seq)) {
            Some(pending) => pending,
            None          => {
                self.orphans.fetch_add(1, Ordering::Relaxed);
                trace!("{} orphan confirmation seq {}", host, seq);
                return None;
            }
        };

        let latency = (timestamp - pending.timestamp).num_milliseconds();
        trace!("{} latency {}ms", host, latency);
        self.buffer.push(buffer::floor(timestamp), host, latency as f64);

        Some(latency)
    }

    pub fn process(&self, record: &Record<'_>) -> Role {
        let flags = record.flags;
        let data  = flags.contains(Flags::ACK | Flags::PSH);
        let ack   = flags.contains(Flags::ACK);

        match record.direction(self.port) {
            Direction::In if data && !record.payload.is_empty() => {
                Role::Registration(self.register(record.src, record.payload))
            }
            Direction::Out if data => {
                self.respond(record.dst, record.ack, record.timestamp);
                Role::Response
            }
            Direction::In if ack && !data => {
                Role::Confirmation(self.confirm(record.src, record.seq, record.timestamp))
            }
            _ => Role::Ignored,
        }
    }

    /// Correlates every record of one capture file. Records processed before
    /// a header-level error keep their effect.
    pub fn ingest<D: Decoder>(&self, decoder: &D, data: &[u8]) -> Result<Summary, Error> {
        let capture = match Capture::open(data)? {
            Some(capture) => capture,
            None          => return Ok(Summary::default()),
        };

        let link = capture.header().link;
        let mut summary = Summary::default();

        for frame in capture.frames() {
            let frame = frame?;
            summary.frames += 1;
            match decoder.decode(link, &frame) {
                Some(record) => summary.add(self.process(&record)),
                None         => summary.skipped += 1,
            }
        }

        Ok(summary)
    }

    /// Applies one text summary line. Text output carries no payload, so
    /// lines only ever respond or confirm.
    pub fn observe(&self, line: &Line) -> Role {
        match line.exchange() {
            Some(Exchange::Response(host, number)) => {
                self.respond(host, number, line.timestamp);
                Role::Response
            }
            Some(Exchange::Confirmation(host, number)) => {
                Role::Confirmation(self.confirm(host, number, line.timestamp))
            }
            None => Role::Ignored,
        }
    }

    pub fn drain(&self, now: DateTime<Utc>) -> Option<Drained> {
        self.buffer.drain(now)
    }

    pub fn drain_all(&self) -> Vec<Drained> {
        self.buffer.drain_all()
    }

    /// Removes responses older than the retention window.
    pub fn evict(&self, now: DateTime<Utc>) -> usize {
        self.pending.compact(now - self.retention)
    }

    pub fn identities(&self) -> &Identities {
        &self.identities
    }

    pub fn pending(&self) -> &Table {
        &self.pending
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn unidentified(&self) -> u64 {
        self.unidentified.load(Ordering::Relaxed)
    }

    pub fn orphans(&self) -> u64 {
        self.orphans.load(Ordering::Relaxed)
    }
}

impl Summary {
    pub fn add(&mut self, role: Role) {
        match role {
            Role::Registration(Registration::Identified) => self.identified   += 1,
            Role::Registration(Registration::Unknown)    => self.unidentified += 1,
            Role::Registration(Registration::Control)    => self.controls     += 1,
            Role::Registration(Registration::Known)      => (),
            Role::Response                               => self.responses    += 1,
            Role::Confirmation(Some(_))                  => self.samples      += 1,
            Role::Confirmation(None)                     => self.orphans      += 1,
            Role::Ignored                                => self.ignored      += 1,
        }
    }
}
