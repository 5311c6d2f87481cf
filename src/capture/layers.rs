use pnet::packet::ethernet::{EthernetPacket, EtherTypes};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::tcp::TcpPacket;
use super::decode::{Decoder, MIN_RECORD, TCP_HEADER};
use super::file::{Frame, Link};
use super::flow::{Addr, Flags, Record};

/// Decoder backed by pnet packet views. Unlike `Raw` it honours the IPv4
/// header length, so frames carrying IP options still decode.
#[derive(Copy, Clone, Debug, Default)]
pub struct Pnet;

impl Decoder for Pnet {
    fn decode<'a>(&self, link: Link, frame: &Frame<'a>) -> Option<Record<'a>> {
        let data = frame.data;

        if data.len() < MIN_RECORD {
            return None;
        }

        if link == Link::Ethernet {
            let eth = EthernetPacket::new(data)?;
            if eth.get_ethertype() != EtherTypes::Ipv4 {
                return None;
            }
        }

        let start = link.header_len();
        let ip    = Ipv4Packet::new(data.get(start..)?)?;

        let ihl = ip.get_header_length() as usize * 4;

        if ip.get_version() != 4 || ihl < 20 || ip.get_next_level_protocol() != IpNextHeaderProtocols::Tcp {
            return None;
        }

        let end = match ip.get_total_length() as usize {
            n if n >= 40 && start + n <= data.len() => start + n,
            _                                       => data.len(),
        };

        let offset = start + ihl;
        let tcp    = TcpPacket::new(data.get(offset..end)?)?;

        let len = match tcp.get_data_offset() as usize * 4 {
            n if n >= TCP_HEADER && offset + n <= end => n,
            _                                         => TCP_HEADER,
        };

        Some(Record {
            timestamp: frame.timestamp,
            src:       Addr::new(ip.get_source(), tcp.get_source()),
            dst:       Addr::new(ip.get_destination(), tcp.get_destination()),
            seq:       tcp.get_sequence(),
            ack:       tcp.get_acknowledgement(),
            flags:     Flags::from_bits(tcp.get_flags() as u8),
            payload:   data.get(offset + len..end)?,
        })
    }
}
