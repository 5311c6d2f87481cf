use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::ops::BitOr;
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq)]
pub struct Record<'a> {
    pub timestamp: DateTime<Utc>,
    pub src:       Addr,
    pub dst:       Addr,
    pub seq:       u32,
    pub ack:       u32,
    pub flags:     Flags,
    pub payload:   &'a [u8],
}

#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct Addr {
    pub addr: Ipv4Addr,
    pub port: u16,
}

#[derive(Copy, Clone, Default, Eq, Hash, PartialEq)]
pub struct Flags(u8);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    In, Out, Unknown
}

impl Record<'_> {
    /// Direction relative to the stratum server listening on `port`.
    pub fn direction(&self, port: u16) -> Direction {
        match (self.src.port, self.dst.port) {
            (_, dst) if dst == port => Direction::In,
            (src, _) if src == port => Direction::Out,
            _                       => Direction::Unknown,
        }
    }
}

impl Addr {
    pub fn new(addr: Ipv4Addr, port: u16) -> Self {
        Self { addr, port }
    }
}

impl Flags {
    pub const FIN: Flags = Flags(0x01);
    pub const SYN: Flags = Flags(0x02);
    pub const RST: Flags = Flags(0x04);
    pub const PSH: Flags = Flags(0x08);
    pub const ACK: Flags = Flags(0x10);
    pub const URG: Flags = Flags(0x20);
    pub const ECE: Flags = Flags(0x40);
    pub const CWR: Flags = Flags(0x80);

    pub fn from_bits(bits: u8) -> Self {
        Flags(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        const NAMES: [(Flags, char); 8] = [
            (Flags::CWR, 'W'),
            (Flags::ECE, 'E'),
            (Flags::URG, 'U'),
            (Flags::ACK, '.'),
            (Flags::PSH, 'P'),
            (Flags::RST, 'R'),
            (Flags::SYN, 'S'),
            (Flags::FIN, 'F'),
        ];

        let set = NAMES.iter().filter(|(flag, _)| self.contains(*flag));
        write!(f, "[{}]", set.map(|(_, c)| *c).collect::<String>())
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

impl From<SocketAddrV4> for Addr {
    fn from(sa: SocketAddrV4) -> Self {
        Self {
            addr: *sa.ip(),
            port: sa.port(),
        }
    }
}
