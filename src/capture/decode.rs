use std::net::Ipv4Addr;
use super::file::{u16be, u32be, Frame, Link};
use super::flow::{Addr, Flags, Record};

/// Frames shorter than this are truncated captures and never decoded.
pub const MIN_RECORD: usize = 48;

pub const TCP_HEADER: usize = 20;

const IPV4_NO_OPTIONS: u8 = 0x45;
const PROTO_TCP:       u8 = 6;

pub trait Decoder {
    fn decode<'a>(&self, link: Link, frame: &Frame<'a>) -> Option<Record<'a>>;
}

/// Fixed-offset IPv4/TCP decoder. Assumes no IP options; the TCP data
/// offset is consulted only to find where the payload begins.
#[derive(Copy, Clone, Debug, Default)]
pub struct Raw;

impl Decoder for Raw {
    fn decode<'a>(&self, link: Link, frame: &Frame<'a>) -> Option<Record<'a>> {
        let data = frame.data;
        let base = link.base();
        let ip   = base - 12;
        let tcp  = base + 8;

        if data.len() < MIN_RECORD || data.len() < tcp + TCP_HEADER {
            return None;
        }

        if data[ip] != IPV4_NO_OPTIONS || data[ip + 9] != PROTO_TCP {
            return None;
        }

        let end = match u16be(data, ip + 2) as usize {
            n if n >= 40 && ip + n <= data.len() => ip + n,
            _                                    => data.len(),
        };

        let src = Ipv4Addr::from(u32be(data, base));
        let dst = Ipv4Addr::from(u32be(data, base + 4));

        let len = match (data[tcp + 12] >> 4) as usize * 4 {
            n if n >= TCP_HEADER && tcp + n <= end => n,
            _                                      => TCP_HEADER,
        };

        Some(Record {
            timestamp: frame.timestamp,
            src:       Addr::new(src, u16be(data, tcp)),
            dst:       Addr::new(dst, u16be(data, tcp + 2)),
            seq:       u32be(data, tcp + 4),
            ack:       u32be(data, tcp + 8),
            flags:     Flags::from_bits(data[tcp + 13]),
            payload:   &data[tcp + len..end],
        })
    }
}
