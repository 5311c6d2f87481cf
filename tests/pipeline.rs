use std::fs;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;
use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use stratum_latency::capture::{Addr, Flags, Kind, Link, Record, Writer};
use stratum_latency::config::{Config, DEFAULT_PATTERN};
use stratum_latency::report::{Report, Reporter, Sink};
use stratum_latency::service::Service;

#[derive(Default)]
struct Collect(Mutex<Vec<Report>>);

impl Sink for Collect {
    fn emit(&self, report: Report) {
        self.0.lock().push(report);
    }
}

const STRATUM: &str = "172.29.54.141:3333";

struct Miner {
    addr:    Addr,
    payload: Vec<u8>,
}

impl Miner {
    fn new(last: u8, group: &str, coin: &str) -> Self {
        let payload = format!(r#"{{"params": ["{}", "{}-846861-8"], "id": 1, "method": "mining.submit"}}"#, group, coin);
        Self {
            addr:    Addr::new(Ipv4Addr::new(8, 46, 207, last), 23_914),
            payload: payload.into_bytes(),
        }
    }

    /// Appends a full exchange whose acknowledgment trails the response by
    /// `latency` milliseconds.
    fn exchange(&self, w: &mut Writer, ts: DateTime<Utc>, seq: u32, latency: i64) {
        let stratum = STRATUM.parse::<SocketAddrV4>().map(Addr::from).unwrap();
        let len     = self.payload.len() as u32;

        w.record(&Record {
            timestamp: ts,
            src:       self.addr,
            dst:       stratum,
            seq:       seq,
            ack:       77,
            flags:     Flags::ACK | Flags::PSH,
            payload:   &self.payload,
        });
        w.record(&Record {
            timestamp: ts + Duration::microseconds(90),
            src:       stratum,
            dst:       self.addr,
            seq:       77,
            ack:       seq + len,
            flags:     Flags::ACK | Flags::PSH,
            payload:   br#"{"id":1,"result":true,"error":null}"#,
        });
        w.record(&Record {
            timestamp: ts + Duration::microseconds(90) + Duration::milliseconds(latency),
            src:       self.addr,
            dst:       stratum,
            seq:       seq + len,
            ack:       112,
            flags:     Flags::ACK,
            payload:   &[],
        });
    }
}

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 31, h, m, s).unwrap()
}

#[test]
fn directory_to_reports() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let a1 = Miner::new(1, "lp-wg4-s19jpro.cos-pb12-r7b1-96", "BSV");
    let a2 = Miner::new(2, "lp-wg4-s19jpro.cos-pb12-r7b1-96", "BSV");
    let b1 = Miner::new(3, "sfm-wg3-m30s++.CA051700FE4F", "BCH");

    let mut w = Writer::new(Link::Ethernet);
    a1.exchange(&mut w, at(13, 41, 0), 1_000, 40);
    a2.exchange(&mut w, at(13, 41, 5), 5_000, 60);
    b1.exchange(&mut w, at(13, 42, 0), 9_000, 15);
    a1.exchange(&mut w, at(13, 46, 0), 2_000, 20);
    fs::write(dir.path().join("caapture-20240531-1340.pcap"), w.into_bytes())?;
    fs::write(dir.path().join("caapture-20240531-1345.pcap"), b"")?;

    let mut cfg = Config::new(DEFAULT_PATTERN)?;
    cfg.dir     = Some(dir.path().to_path_buf());
    cfg.decoder = Kind::Pnet;

    let sink    = Arc::new(Collect::default());
    let service = Service::new(cfg, Reporter::new(sink.clone()))?;

    let summary = service.next(dir.path())?.expect("capture processed");
    assert_eq!(12, summary.frames);
    assert_eq!(3, summary.identified);
    assert_eq!(4, summary.samples);
    assert_eq!(0, summary.orphans);

    assert!(service.next(dir.path())?.is_none());
    assert_eq!(1, fs::read_dir(dir.path())?.count());

    assert!(service.correlator().pending().is_empty());

    assert_eq!(0, service.dump(at(13, 46, 0)));
    assert_eq!(2, service.dump(at(13, 46, 1)));
    assert_eq!(0, service.dump(at(13, 46, 1)));
    assert_eq!(1, service.flush());

    let reports = sink.0.lock();
    let groups  = reports.iter().map(|r| {
        (r.observe_interval.as_str(), r.worker_group.as_str(), r.mining_coin.as_str(), r.total_requests)
    }).collect::<Vec<_>>();

    assert_eq!(vec![
        ("2024-05-31 13:40:00", "lp-wg4-s19jpro.cos-pb12-r7b1-96", "BSV", 2),
        ("2024-05-31 13:40:00", "sfm-wg3-m30s++.CA051700FE4F",     "BCH", 1),
        ("2024-05-31 13:45:00", "lp-wg4-s19jpro.cos-pb12-r7b1-96", "BSV", 1),
    ], groups);

    assert_eq!(50.0, reports[0].avg_latency);
    assert_eq!(60.0, reports[0].max_latency);
    assert_eq!(40.0, reports[0].min_latency);
    assert_eq!(20.0, reports[2].median_latency);

    let line = serde_json::to_string(&reports[1])?;
    assert!(line.contains(r#""95_percentile":15.0"#), "{}", line);
    Ok(())
}

#[test]
fn offline_ingest_with_raw_decoder() -> Result<()> {
    let dir  = tempfile::tempdir()?;
    let path = dir.path().join("single.pcap");

    let miner = Miner::new(9, "solo.rig", "BSV");
    let mut w = Writer::new(Link::LinuxSll);
    miner.exchange(&mut w, at(9, 0, 0), 10, 42);
    fs::write(&path, w.into_bytes())?;

    let sink    = Arc::new(Collect::default());
    let service = Service::new(Config::new(DEFAULT_PATTERN)?, Reporter::new(sink.clone()))?;

    let summary = service.ingest(&path)?;
    assert_eq!(1, summary.samples);
    assert!(path.exists());

    assert_eq!(1, service.flush());
    assert_eq!(42.0, sink.0.lock()[0].p99_latency);
    Ok(())
}
