use std::str::FromStr;
use super::decode::{Decoder, Raw};
use super::file::{Frame, Link};
use super::flow::Record;
use super::layers::Pnet;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Kind {
    Raw,
    Pnet,
}

impl Decoder for Kind {
    fn decode<'a>(&self, link: Link, frame: &Frame<'a>) -> Option<Record<'a>> {
        match self {
            Kind::Raw  => Raw.decode(link, frame),
            Kind::Pnet => Pnet.decode(link, frame),
        }
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw"  => Ok(Kind::Raw),
            "pnet" => Ok(Kind::Pnet),
            other  => Err(format!("invalid decoder: {}", other)),
        }
    }
}
