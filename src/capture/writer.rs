use std::convert::TryFrom;
use chrono::{DateTime, Utc};
use super::decode::TCP_HEADER;
use super::file::Link;
use super::flow::Record;

const ETHERTYPE_IPV4: [u8; 2] = [0x08, 0x00];

/// Builds little-endian, microsecond pcap containers. Used to synthesise
/// captures in tests; not part of the decoding path.
pub struct Writer {
    link: Link,
    buf:  Vec<u8>,
}

impl Writer {
    pub fn new(link: Link) -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
        buf.extend_from_slice(&2u16.to_le_bytes());
        buf.extend_from_slice(&4u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&262_144u32.to_le_bytes());
        buf.extend_from_slice(&link.linktype().to_le_bytes());
        Self { link, buf }
    }

    /// Appends an arbitrary frame, no matter what it contains.
    pub fn frame(&mut self, timestamp: DateTime<Utc>, data: &[u8]) -> &mut Self {
        let secs   = timestamp.timestamp() as u32;
        let micros = timestamp.timestamp_subsec_micros();
        let len    = data.len() as u32;

        self.buf.extend_from_slice(&secs.to_le_bytes());
        self.buf.extend_from_slice(&micros.to_le_bytes());
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(data);
        self
    }

    /// Appends `rec` encoded as a link header, an option-less IPv4 header
    /// and a 20-byte TCP header followed by the payload.
    pub fn record(&mut self, rec: &Record<'_>) -> &mut Self {
        let frame = encode(self.link, rec);
        self.frame(rec.timestamp, &frame)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

fn encode(link: Link, rec: &Record<'_>) -> Vec<u8> {
    let mut frame = vec![0u8; link.header_len()];
    match link {
        Link::Ethernet  => frame[12..14].copy_from_slice(&ETHERTYPE_IPV4),
        Link::LinuxSll  => frame[14..16].copy_from_slice(&ETHERTYPE_IPV4),
        Link::Other(_)  => frame[14..16].copy_from_slice(&ETHERTYPE_IPV4),
        Link::LinuxSll2 => frame[0..2].copy_from_slice(&ETHERTYPE_IPV4),
    }

    let total = u16::try_from(20 + TCP_HEADER + rec.payload.len()).unwrap_or(u16::MAX);

    frame.extend_from_slice(&[0x45, 0x00]);
    frame.extend_from_slice(&total.to_be_bytes());
    frame.extend_from_slice(&[0x00, 0x00, 0x40, 0x00, 0x40, 0x06, 0x00, 0x00]);
    frame.extend_from_slice(&rec.src.addr.octets());
    frame.extend_from_slice(&rec.dst.addr.octets());

    frame.extend_from_slice(&rec.src.port.to_be_bytes());
    frame.extend_from_slice(&rec.dst.port.to_be_bytes());
    frame.extend_from_slice(&rec.seq.to_be_bytes());
    frame.extend_from_slice(&rec.ack.to_be_bytes());
    frame.push(0x50);
    frame.push(rec.flags.bits());
    frame.extend_from_slice(&[0xff, 0xff, 0x00, 0x00, 0x00, 0x00]);

    frame.extend_from_slice(rec.payload);
    frame
}
