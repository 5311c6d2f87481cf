use chrono::{DateTime, TimeZone, Utc};
use super::Error;

pub const GLOBAL_HEADER: usize = 24;
pub const RECORD_HEADER: usize = 16;

const MAGIC_MICROS: u32 = 0xa1b2_c3d4;
const MAGIC_NANOS:  u32 = 0xa1b2_3c4d;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Link {
    Ethernet,
    LinuxSll,
    LinuxSll2,
    Other(u32),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Header {
    pub big:     bool,
    pub nanos:   bool,
    pub snaplen: u32,
    pub link:    Link,
}

#[derive(Clone, Debug)]
pub struct Capture<'a> {
    header: Header,
    data:   &'a [u8],
}

#[derive(Clone, Debug)]
pub struct Frame<'a> {
    pub timestamp: DateTime<Utc>,
    pub length:    u32,
    pub data:      &'a [u8],
}

pub struct Frames<'a> {
    header: Header,
    data:   &'a [u8],
    offset: usize,
    done:   bool,
}

impl Link {
    /// Unrecognised link types are read with the cooked v1 layout, which is
    /// what `tcpdump -i any` writes on older kernels.
    pub fn from_type(linktype: u32) -> Self {
        match linktype & 0xffff {
            1     => Link::Ethernet,
            113   => Link::LinuxSll,
            276   => Link::LinuxSll2,
            other => Link::Other(other),
        }
    }

    pub fn linktype(self) -> u32 {
        match self {
            Link::Ethernet  => 1,
            Link::LinuxSll  => 113,
            Link::LinuxSll2 => 276,
            Link::Other(t)  => t,
        }
    }

    /// Length of the link-layer header preceding the IPv4 header.
    pub fn header_len(self) -> usize {
        match self {
            Link::Ethernet  => 14,
            Link::LinuxSll  => 16,
            Link::LinuxSll2 => 20,
            Link::Other(_)  => 16,
        }
    }

    /// Offset of the IPv4 source address within a frame.
    pub fn base(self) -> usize {
        self.header_len() + 12
    }
}

impl<'a> Capture<'a> {
    /// Parses the global header. An empty file is not an error, it simply
    /// has nothing to decode.
    pub fn open(data: &'a [u8]) -> Result<Option<Self>, Error> {
        if data.is_empty() {
            return Ok(None);
        }

        if data.len() < GLOBAL_HEADER {
            return Err(Error::Header(data.len()));
        }

        let magic = u32::from_le_bytes(word(data, 0));
        let (big, nanos) = match (magic, magic.swap_bytes()) {
            (MAGIC_MICROS, _) => (false, false),
            (MAGIC_NANOS,  _) => (false, true),
            (_, MAGIC_MICROS) => (true,  false),
            (_, MAGIC_NANOS)  => (true,  true),
            _                 => return Err(Error::Magic(magic)),
        };

        let snaplen = u32at(data, 16, big);
        let link    = Link::from_type(u32at(data, 20, big));

        Ok(Some(Self {
            header: Header { big, nanos, snaplen, link },
            data:   data,
        }))
    }

    pub fn header(&self) -> Header {
        self.header
    }

    pub fn frames(&self) -> Frames<'a> {
        Frames {
            header: self.header,
            data:   self.data,
            offset: GLOBAL_HEADER,
            done:   false,
        }
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<Frame<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.offset < self.data.len() {
            match self.frame() {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None)        => continue,
                Err(e)          => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl<'a> Frames<'a> {
    fn frame(&mut self) -> Result<Option<Frame<'a>>, Error> {
        let data   = self.data;
        let offset = self.offset;
        let big    = self.header.big;

        if data.len() - offset < RECORD_HEADER {
            return Err(Error::Record(offset));
        }

        let secs   = u32at(data, offset,      big);
        let frac   = u32at(data, offset + 4,  big);
        let caplen = u32at(data, offset + 8,  big);
        let length = u32at(data, offset + 12, big);

        let start = offset + RECORD_HEADER;
        let end   = start.checked_add(caplen as usize).filter(|&end| end <= data.len());
        let end   = end.ok_or(Error::Data(offset, caplen))?;

        self.offset = end;

        let nanos = match self.header.nanos {
            true  => frac,
            false => frac.saturating_mul(1_000),
        };

        Ok(Utc.timestamp_opt(secs as i64, nanos).single().map(|timestamp| Frame {
            timestamp: timestamp,
            length:    length,
            data:      &data[start..end],
        }))
    }
}

fn word(data: &[u8], offset: usize) -> [u8; 4] {
    let mut word = [0u8; 4];
    word.copy_from_slice(&data[offset..offset + 4]);
    word
}

fn u32at(data: &[u8], offset: usize, big: bool) -> u32 {
    match big {
        true  => u32::from_be_bytes(word(data, offset)),
        false => u32::from_le_bytes(word(data, offset)),
    }
}

pub(super) fn u16be(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

pub(super) fn u32be(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(word(data, offset))
}
