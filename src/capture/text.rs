use std::net::Ipv4Addr;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::{Captures, Regex};
use super::flow::{Addr, Flags};

const LINE: &str = r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{6}) .*?IP (\S+) > (\S+?):? Flags \[([^\]]*)\](?:, seq (\d+)(?::(\d+))?)?(?:, ack (\d+))?";

const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One `tcpdump -tttt` summary line. Endpoints are kept as printed,
/// `host.port`, since tcpdump resolves names unless told not to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Line {
    pub timestamp: DateTime<Utc>,
    pub src:       String,
    pub dst:       String,
    pub flags:     Flags,
    pub seq:       Option<u32>,
    pub end:       Option<u32>,
    pub ack:       Option<u32>,
}

/// Half of a triplet as seen in text output. A segment carrying a sequence
/// range is a server response awaiting `number`; a bare acknowledgment is
/// the client confirming `number`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Exchange {
    Response(Addr, u32),
    Confirmation(Addr, u32),
}

pub struct Parser {
    regex: Regex,
}

impl Parser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(LINE)?,
        })
    }

    /// Parses a line, returning nothing for anything that is not a TCP
    /// summary with a valid timestamp.
    pub fn parse(&self, line: &str) -> Option<Line> {
        let caps = self.regex.captures(line)?;

        let timestamp = NaiveDateTime::parse_from_str(&caps[1], TIMESTAMP).ok()?;

        Some(Line {
            timestamp: Utc.from_utc_datetime(&timestamp),
            src:       caps[2].to_owned(),
            dst:       caps[3].to_owned(),
            flags:     flags(&caps[4]),
            seq:       number(&caps, 5),
            end:       number(&caps, 6),
            ack:       number(&caps, 7),
        })
    }
}

impl Line {
    pub fn exchange(&self) -> Option<Exchange> {
        match (self.seq, self.end, self.ack) {
            (Some(_), Some(end), _) => Some(Exchange::Response(endpoint(&self.dst)?, end)),
            (Some(_), None, _)      => None,
            (None, _, Some(ack))    => Some(Exchange::Confirmation(endpoint(&self.src)?, ack)),
            (None, _, None)         => None,
        }
    }
}

/// Parses `a.b.c.d.port`, accepting `localhost` for the loopback address.
pub fn endpoint(s: &str) -> Option<Addr> {
    let (host, port) = s.rsplit_once('.')?;
    let addr = match host {
        "localhost" => Ipv4Addr::LOCALHOST,
        host        => host.parse().ok()?,
    };
    Some(Addr::new(addr, port.parse().ok()?))
}

fn flags(s: &str) -> Flags {
    s.chars().fold(Flags::default(), |flags, c| match c {
        'F' => flags | Flags::FIN,
        'S' => flags | Flags::SYN,
        'R' => flags | Flags::RST,
        'P' => flags | Flags::PSH,
        '.' => flags | Flags::ACK,
        'U' => flags | Flags::URG,
        'E' => flags | Flags::ECE,
        'W' => flags | Flags::CWR,
        _   => flags,
    })
}

fn number(caps: &Captures<'_>, n: usize) -> Option<u32> {
    caps.get(n)?.as_str().parse().ok()
}
