pub mod decode;
pub mod file;
pub mod flow;
pub mod text;

pub use decode::{Decoder, Raw};
pub use error::Error;
pub use file::{Capture, Frame, Header, Link};
pub use flow::{Addr, Direction, Flags, Record};
pub use kind::Kind;
pub use layers::Pnet;
pub use text::{Exchange, Line, Parser};

#[doc(hidden)]
pub use writer::Writer;

mod error;
mod kind;
mod layers;
mod writer;
