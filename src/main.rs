use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use anyhow::Result;
use clap::{App, Arg, value_t};
use env_logger::Builder;
use jemallocator::Jemalloc;
use log::{error, info, warn};
use log::LevelFilter::*;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tokio::runtime::Runtime;
use stratum_latency::args::{opt, secs};
use stratum_latency::config::{Config, DEFAULT_PATTERN};
use stratum_latency::report::{LogSink, Reporter};
use stratum_latency::service::Service;

#[global_allocator]
static ALLOC: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    let ver  = env!("CARGO_PKG_VERSION");
    let args = App::new("stratum-latency")
        .version(ver)
        .about("Passive miner to stratum latency measurement")
        .arg(Arg::with_name("port").long("port").short("p").takes_value(true)
             .help("Stratum server port"))
        .arg(Arg::with_name("interface").long("interface").short("i").takes_value(true)
             .help("Interface of the external capture tool, logged at startup"))
        .arg(Arg::with_name("dir").long("dir").short("d").takes_value(true)
             .help("Directory polled for capture files"))
        .arg(Arg::with_name("pattern").long("pattern").takes_value(true)
             .default_value(DEFAULT_PATTERN)
             .help("Capture file name regex"))
        .arg(Arg::with_name("decoder").long("decoder").takes_value(true)
             .possible_values(&["raw", "pnet"])
             .help("Frame decoder"))
        .arg(Arg::with_name("dump-interval").long("dump-interval").takes_value(true)
             .help("Seconds between bucket reports"))
        .arg(Arg::with_name("poll-interval").long("poll-interval").takes_value(true)
             .help("Seconds between directory polls"))
        .arg(Arg::with_name("clean-interval").long("clean-interval").takes_value(true)
             .help("Seconds between pending response sweeps"))
        .arg(Arg::with_name("retention").long("retention").takes_value(true)
             .help("Seconds a response waits for its acknowledgment"))
        .arg(Arg::with_name("margin").long("margin").takes_value(true)
             .help("Seconds a bucket ages before it is reported"))
        .arg(Arg::with_name("stdin").long("stdin")
             .help("Read tcpdump -tttt summary lines from stdin"))
        .arg(Arg::with_name("once").long("once")
             .help("Report the given files and exit"))
        .arg(Arg::with_name("verbose").long("verbose").short("v").multiple(true)
             .help("Verbose output"))
        .arg(Arg::with_name("file").multiple(true)
             .help("Capture files ingested at startup"))
        .get_matches();

    let (module, level) = match args.occurrences_of("verbose") {
        0 => (Some(module_path!()), Info),
        1 => (Some(module_path!()), Debug),
        2 => (Some(module_path!()), Trace),
        _ => (None,                 Trace),
    };
    Builder::from_default_env().filter(module, level).init();

    let pattern = value_t!(args, "pattern", String)?;
    let mut cfg = Config::new(&pattern)?;

    cfg.port      = opt(args.value_of("port"))?.unwrap_or(cfg.port);
    cfg.interface = args.value_of("interface").map(String::from).unwrap_or(cfg.interface);
    cfg.dir       = args.value_of("dir").map(PathBuf::from);
    cfg.decoder   = opt(args.value_of("decoder"))?.unwrap_or(cfg.decoder);
    cfg.dump      = secs(args.value_of("dump-interval"))?.unwrap_or(cfg.dump);
    cfg.poll      = secs(args.value_of("poll-interval"))?.unwrap_or(cfg.poll);
    cfg.clean     = secs(args.value_of("clean-interval"))?.unwrap_or(cfg.clean);
    cfg.retention = secs(args.value_of("retention"))?.unwrap_or(cfg.retention);
    cfg.margin    = secs(args.value_of("margin"))?.unwrap_or(cfg.margin);

    info!("initializing stratum-latency {}", ver);
    info!("observing port {} on {} with {:?} decoder", cfg.port, cfg.interface, cfg.decoder);

    let service = Service::new(cfg, Reporter::new(LogSink))?;

    for file in args.values_of("file").into_iter().flatten() {
        match service.ingest(Path::new(file)) {
            Ok(summary) => info!("{}: {} samples", file, summary.samples),
            Err(e)      => error!("{}: {}", file, e),
        }
    }

    if args.is_present("once") {
        if args.is_present("stdin") {
            let stdin   = io::stdin();
            let summary = service.stream(stdin.lock())?;
            info!("stdin: {} samples", summary.samples);
        }
        let reports = service.flush();
        info!("reported {} groups", reports);
        return Ok(());
    }

    let rt    = Runtime::new()?;
    let tasks = service.spawn(rt.handle());

    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;

    if args.is_present("stdin") {
        let service = service.clone();
        let handle  = signals.handle();
        thread::spawn(move || {
            let stdin = io::stdin();
            match service.stream(stdin.lock()) {
                Ok(summary) => info!("stdin closed after {} samples", summary.samples),
                Err(e)      => error!("stdin failed: {}", e),
            }
            handle.close();
        });
    }

    if let Some(signal) = signals.forever().next() {
        info!("received signal {}, shutting down", signal);
    }

    service.cancel();

    rt.block_on(async {
        for task in tasks {
            if let Err(e) = task.await {
                warn!("task failed: {:?}", e);
            }
        }
    });

    let reports = service.flush();
    info!("flushed {} reports", reports);

    Ok(())
}
