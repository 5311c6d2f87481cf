use std::fs;
use std::io::Cursor;
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use regex::Regex;
use tokio::runtime::Handle;
use crate::capture::{Addr, Flags, Link, Record, Writer};
use crate::config::{Config, DEFAULT_PATTERN};
use crate::report::{Report, Reporter, Sink};
use super::{ready, Service};

#[derive(Default)]
struct Collect(Mutex<Vec<Report>>);

impl Sink for Collect {
    fn emit(&self, report: Report) {
        self.0.lock().push(report);
    }
}

fn addr(s: &str) -> Addr {
    s.parse::<SocketAddrV4>().map(Addr::from).unwrap_or_else(|e| panic!("{}: {}", s, e))
}

fn at(millis: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 31, 15, 43, 44).unwrap() + chrono::Duration::milliseconds(millis)
}

fn triplet() -> Vec<u8> {
    let miner   = addr("8.46.207.95:23914");
    let stratum = addr("172.29.54.141:3333");
    let submit  = br#"{"params": ["sfm-wg2-m30s++.CA051700EC1B", "BCH-846861-89d48"], "id": 9}"#;

    let request = Record {
        timestamp: at(0),
        src:       miner,
        dst:       stratum,
        seq:       2_396_494_688,
        ack:       3_568_706_784,
        flags:     Flags::ACK | Flags::PSH,
        payload:   submit,
    };
    let response = Record {
        timestamp: at(1),
        src:       stratum,
        dst:       miner,
        seq:       3_568_706_784,
        ack:       2_396_494_875,
        payload:   br#"{"id":9,"result":true}"#,
        ..request.clone()
    };
    let confirm = Record {
        timestamp: at(38),
        seq:       2_396_494_875,
        ack:       3_568_706_825,
        flags:     Flags::ACK,
        payload:   &[],
        ..request.clone()
    };

    let mut w = Writer::new(Link::LinuxSll2);
    w.record(&request).record(&response).record(&confirm);
    w.into_bytes()
}

fn config(dir: &std::path::Path) -> Result<Config> {
    let mut cfg = Config::new(DEFAULT_PATTERN)?;
    cfg.dir  = Some(dir.to_path_buf());
    cfg.poll = Duration::from_millis(10);
    Ok(cfg)
}

#[test]
fn ready_skips_newest_and_foreign_files() -> Result<()> {
    let dir     = tempfile::tempdir()?;
    let pattern = Regex::new(DEFAULT_PATTERN)?;

    for name in &["caapture-0002.pcap", "caapture-0001.pcap", "caapture-0003.pcap", "other.pcap", "caapture-0004.pcap.tmp"] {
        fs::write(dir.path().join(name), b"")?;
    }
    fs::create_dir(dir.path().join("caapture-dir.pcap"))?;

    let names = ready(dir.path(), &pattern)?.into_iter().filter_map(|path| {
        Some(path.file_name()?.to_str()?.to_owned())
    }).collect::<Vec<_>>();

    assert_eq!(vec!["caapture-0001.pcap", "caapture-0002.pcap"], names);
    Ok(())
}

#[test]
fn process_removes_broken_capture() -> Result<()> {
    let dir  = tempfile::tempdir()?;
    let path = dir.path().join("caapture-0001.pcap");
    fs::write(&path, b"not a capture file at all")?;

    let service = Service::new(config(dir.path())?, Reporter::new(Collect::default()))?;
    assert_eq!(None, service.process(&path)?);
    assert!(!path.exists());
    Ok(())
}

#[tokio::test]
async fn poll_then_cancel_and_flush() -> Result<()> {
    let dir   = tempfile::tempdir()?;
    let first = dir.path().join("caapture-0001.pcap");
    let last  = dir.path().join("caapture-0002.pcap");
    fs::write(&first, triplet())?;
    fs::write(&last, triplet())?;

    let sink    = Arc::new(Collect::default());
    let service = Service::new(config(dir.path())?, Reporter::new(sink.clone()))?;
    let tasks   = service.spawn(&Handle::current());
    assert_eq!(3, tasks.len());

    for _ in 0..500 {
        if !first.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(!first.exists());
    assert!(last.exists());

    service.cancel();
    for task in tasks {
        task.await?;
    }
    assert!(service.token().is_cancelled());

    assert_eq!(1, service.flush());
    assert_eq!(0, service.flush());

    let reports = sink.0.lock();
    assert_eq!("sfm-wg2-m30s++.CA051700EC1B", reports[0].worker_group);
    assert_eq!("BCH", reports[0].mining_coin);
    assert_eq!("2024-05-31 15:40:00", reports[0].observe_interval);
    assert_eq!(37.0, reports[0].avg_latency);
    Ok(())
}

#[tokio::test]
async fn timers_evict_and_dump() -> Result<()> {
    let mut cfg = Config::new(DEFAULT_PATTERN)?;
    cfg.dump  = Duration::from_millis(10);
    cfg.clean = Duration::from_millis(10);

    let sink    = Arc::new(Collect::default());
    let service = Service::new(cfg, Reporter::new(sink.clone()))?;

    let miner  = addr("8.46.207.95:23914");
    let submit = br#"{"params": ["lp-wg5-s19jpro.cos-pb13-r2g4-92", "BSV-846861-8"]}"#;
    let c      = service.correlator();
    c.register(miner, submit);
    c.respond(miner, 1, at(0));
    c.respond(miner, 2, at(0));
    assert_eq!(Some(25), c.confirm(miner, 2, at(25)));

    let tasks = service.spawn(&Handle::current());
    assert_eq!(2, tasks.len());

    for _ in 0..500 {
        if c.pending().is_empty() && !sink.0.lock().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(c.pending().is_empty());
    assert!(c.buffer().is_empty());

    service.cancel();
    for task in tasks {
        task.await?;
    }

    let reports = sink.0.lock();
    assert_eq!(1, reports.len());
    assert_eq!("lp-wg5-s19jpro.cos-pb13-r2g4-92", reports[0].worker_group);
    assert_eq!(25.0, reports[0].max_latency);
    Ok(())
}

#[test]
fn stream_text_lines() -> Result<()> {
    let lines = "\
tcpdump: data link type LINUX_SLL2
2024-05-31 15:43:44.967947 any   Out IP 172.29.54.141.3333 > 8.46.207.95.23914: Flags [P.], seq 3568706784:3568706825, ack 2396494875, win 501, length 41
2024-05-31 15:43:45.005626 any   In  IP 8.46.207.95.23914 > 172.29.54.141.3333: Flags [.], ack 3568706825, win 2048, length 0
2024-05-31 15:43:46.000000 any   In  IP 8.46.207.95.23914 > 172.29.54.141.3333: Flags [.], ack 1, win 2048, length 0
";

    let sink    = Arc::new(Collect::default());
    let service = Service::new(Config::new(DEFAULT_PATTERN)?, Reporter::new(sink.clone()))?;

    let miner  = addr("8.46.207.95:23914");
    let submit = br#"{"params": ["sfm-wg3-m30s++.CA051700FE4F", "BSV-846861-89d48"]}"#;
    service.correlator().register(miner, submit);

    let summary = service.stream(Cursor::new(lines))?;
    assert_eq!(4, summary.frames);
    assert_eq!(1, summary.skipped);
    assert_eq!(1, summary.responses);
    assert_eq!(1, summary.samples);
    assert_eq!(1, summary.orphans);

    assert_eq!(1, service.flush());
    let reports = sink.0.lock();
    assert_eq!("2024-05-31 15:40:00", reports[0].observe_interval);
    assert_eq!(37.0, reports[0].avg_latency);
    Ok(())
}

#[test]
fn stream_stops_when_cancelled() -> Result<()> {
    let line    = "2024-05-31 15:43:45.005626 any In IP 8.46.207.95.23914 > 172.29.54.141.3333: Flags [.], ack 1, win 2048, length 0\n";
    let service = Service::new(Config::new(DEFAULT_PATTERN)?, Reporter::new(Collect::default()))?;

    service.cancel();
    let summary = service.stream(Cursor::new(line.repeat(3)))?;
    assert_eq!(0, summary.frames);
    Ok(())
}
