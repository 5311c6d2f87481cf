use std::fmt;

/// Container-level failures. Any of these abandons the rest of the file;
/// problems inside a single record are never reported here.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    Header(usize),
    Magic(u32),
    Record(usize),
    Data(usize, u32),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::Header(n)      => write!(f, "truncated global header ({} bytes)", n),
            Error::Magic(m)       => write!(f, "unknown magic {:#010x}", m),
            Error::Record(off)    => write!(f, "truncated record header at offset {}", off),
            Error::Data(off, len) => write!(f, "record at offset {} overruns file ({} bytes)", off, len),
        }
    }
}
