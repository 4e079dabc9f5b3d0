//! MQTT 3.1.1 wire format: fixed header, remaining-length varint, encoder
//! and incremental parser. `spec.md` §4.2-§4.3, §6 "Wire format".

pub mod encode;
pub mod parse;
pub mod qos;
pub mod varint;

pub use qos::QoS;

/// MQTT control packet types (high nibble of the fixed header's first byte).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    PubRec = 5,
    PubRel = 6,
    PubComp = 7,
    Subscribe = 8,
    SubAck = 9,
    Unsubscribe = 10,
    UnsubAck = 11,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl PacketType {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        Some(match nibble {
            1 => Self::Connect,
            2 => Self::ConnAck,
            3 => Self::Publish,
            4 => Self::PubAck,
            5 => Self::PubRec,
            6 => Self::PubRel,
            7 => Self::PubComp,
            8 => Self::Subscribe,
            9 => Self::SubAck,
            10 => Self::Unsubscribe,
            11 => Self::UnsubAck,
            12 => Self::PingReq,
            13 => Self::PingResp,
            14 => Self::Disconnect,
            _ => return None,
        })
    }
}

/// A parse error that distinguishes "need more bytes" from an actual
/// protocol violation, so incremental parsers can retry instead of failing.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseError<T> {
    NotEnoughData,
    Error(T),
}

impl<T> ParseError<T> {
    pub fn map<F, S>(self, f: F) -> ParseError<S>
    where
        F: FnOnce(T) -> S,
    {
        match self {
            Self::NotEnoughData => ParseError::NotEnoughData,
            Self::Error(err) => ParseError::Error(f(err)),
        }
    }
}

impl<T> From<T> for ParseError<T> {
    fn from(value: T) -> Self {
        Self::Error(value)
    }
}

pub type ParseResult<T, E> = Result<T, ParseError<E>>;

/// Errors produced while decoding the body of an already-dispatched packet.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketError {
    /// A length- or offset-prefixed field ran past the end of the body.
    Truncated,
    /// A string field was not valid UTF-8.
    InvalidUtf8,
    /// A field held a value the protocol does not define (e.g. an unknown
    /// CONNACK return code).
    ProtocolError,
}

/// A forward-only cursor over a packet body, mirroring the field layout
/// MQTT 3.1.1 uses throughout: big-endian u16s, 16-bit length-prefixed
/// strings, and raw trailing payload.
pub struct Cursor<'a> {
    buf: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.position..]
    }

    pub fn read_u8(&mut self) -> Result<u8, PacketError> {
        let b = *self.remaining().first().ok_or(PacketError::Truncated)?;
        self.position += 1;
        Ok(b)
    }

    pub fn read_u16(&mut self) -> Result<u16, PacketError> {
        let bytes = self
            .remaining()
            .get(..2)
            .ok_or(PacketError::Truncated)?;
        self.position += 2;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], PacketError> {
        let s = self.remaining().get(..len).ok_or(PacketError::Truncated)?;
        self.position += len;
        Ok(s)
    }

    /// Reads a 16-bit length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<&'a str, PacketError> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_slice(len)?;
        core::str::from_utf8(bytes).map_err(|_| PacketError::InvalidUtf8)
    }

    /// Consumes and returns everything left in the body.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = self.remaining();
        self.position = self.buf.len();
        rest
    }
}
