use std::path::PathBuf;
use std::time::Duration;
use anyhow::Result;
use regex::Regex;
use crate::capture::Kind;

pub const DEFAULT_PATTERN: &str = r"^caapture.*\.pcap$";

#[derive(Clone, Debug)]
pub struct Config {
    pub port:      u16,
    /// Interface handed to the external capture tool writing into `dir`.
    /// Only reported at startup here.
    pub interface: String,
    pub dir:       Option<PathBuf>,
    pub pattern:   Regex,
    pub decoder:   Kind,
    pub dump:      Duration,
    pub poll:      Duration,
    pub clean:     Duration,
    pub retention: Duration,
    pub margin:    Duration,
}

impl Config {
    /// Stock intervals watching `pattern` files for a stratum on port 3333.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            port:      3333,
            interface: "any".to_owned(),
            dir:       None,
            pattern:   Regex::new(pattern)?,
            decoder:   Kind::Raw,
            dump:      Duration::from_secs(300),
            poll:      Duration::from_secs(5),
            clean:     Duration::from_secs(60),
            retention: Duration::from_secs(3600),
            margin:    Duration::from_secs(360),
        })
    }
}
