// https://redis.io/docs/reference/protocol-spec

use std::fmt;
use std::io::{self, Cursor, Write};

use bytes::{Buf, BufMut, Bytes};
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

/// Maximum nesting of arrays inside a single frame.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("not enough data is available to read a {declared} byte payload, got {available}")]
    IncompletePayload { declared: usize, available: usize },
    #[error("invalid frame data type: {0:#04x}")]
    UnknownType(u8),
    #[error("protocol error; invalid integer {0:?}")]
    MalformedInteger(String),
    #[error("protocol error; invalid length {0}")]
    InvalidLength(i64),
    #[error("protocol error; bulk payload is not terminated by CRLF")]
    MissingTerminator,
    #[error("protocol error; invalid UTF-8 string")]
    InvalidUtf8,
    #[error("protocol error; arrays nested deeper than {0} levels")]
    DepthExceeded(usize),
    #[error("stream ended in the middle of a frame")]
    UnexpectedEof,
    #[error("stream ended after {available} bytes of a {declared} byte payload")]
    TruncatedPayload { declared: usize, available: usize },
    #[error("frame size {size} exceeds limit of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Whether more bytes could turn this failure into a complete frame.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::Incomplete | Error::IncompletePayload { .. })
    }
}

/// A single value of the wire protocol.
///
/// Null bulk strings and null arrays are kept apart from each other and from their empty
/// counterparts, so `$-1`, `$0`, `*-1` and `*0` all decode to different frames.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    NullBulkString,
    Array(Vec<Frame>),
    NullArray,
}

impl Frame {
    pub fn simple(s: impl Into<String>) -> Frame {
        Frame::Simple(s.into())
    }

    pub fn error(s: impl Into<String>) -> Frame {
        Frame::Error(s.into())
    }

    pub fn bulk(data: impl Into<Bytes>) -> Frame {
        Frame::Bulk(data.into())
    }

    /// Parses exactly one frame from `src`, leaving the cursor on the first byte after it.
    ///
    /// When the buffer ends before the frame does, `Error::Incomplete` or
    /// `Error::IncompletePayload` is returned and the cursor position is unspecified; callers
    /// retry from the original position once more data has arrived.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Frame, Error> {
        parse_at_depth(src, 0)
    }

    /// Appends the wire representation of the frame to `dst`.
    pub fn encode_into<B: BufMut>(&self, dst: &mut B) {
        match self {
            Frame::Simple(s) => put_text(dst, DataType::SimpleString, s),
            Frame::Error(s) => put_text(dst, DataType::SimpleError, s),
            Frame::Integer(i) => put_line(dst, DataType::Integer, i.to_string().as_bytes()),
            Frame::Bulk(bytes) => {
                put_line(dst, DataType::BulkString, bytes.len().to_string().as_bytes());
                dst.put_slice(bytes);
                dst.put_slice(CRLF);
            }
            Frame::NullBulkString => put_line(dst, DataType::BulkString, b"-1"),
            Frame::Array(frames) => {
                put_line(dst, DataType::Array, frames.len().to_string().as_bytes());
                for frame in frames {
                    frame.encode_into(dst);
                }
            }
            Frame::NullArray => put_line(dst, DataType::Array, b"-1"),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.encode_into(&mut bytes);
        bytes
    }

    /// Blocking counterpart of `encode_into` for `std::io::Write` sinks, producing the same
    /// bytes. Writing stops at the first failed write; bytes already handed to the writer stay
    /// written.
    pub fn write_to<W: Write>(&self, dst: &mut W) -> io::Result<()> {
        match self {
            Frame::Array(frames) => {
                let mut header = Vec::new();
                put_line(&mut header, DataType::Array, frames.len().to_string().as_bytes());
                dst.write_all(&header)?;
                for frame in frames {
                    frame.write_to(dst)?;
                }
                Ok(())
            }
            frame => dst.write_all(&frame.serialize()),
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::NullBulkString => write!(f, "$-1"),
            Frame::Array(arr) => {
                write!(f, "[")?;
                for (i, frame) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", frame)?;
                }
                write!(f, "]")
            }
            Frame::NullArray => write!(f, "*-1"),
        }
    }
}

fn parse_at_depth(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Frame, Error> {
    if depth > MAX_DEPTH {
        return Err(Error::DepthExceeded(MAX_DEPTH));
    }

    // The first byte in an RESP-serialized payload always identifies its type.
    // Subsequent bytes constitute the type's contents.
    let first_byte = get_byte(src)?;

    match DataType::try_from(first_byte)? {
        DataType::SimpleString => get_string(src).map(Frame::Simple),
        DataType::SimpleError => get_string(src).map(Frame::Error),
        DataType::Integer => get_integer(src).map(Frame::Integer),
        // $<length>\r\n<data>\r\n
        DataType::BulkString => match get_length(src)? {
            None => Ok(Frame::NullBulkString),
            Some(length) => get_payload(src, length).map(Frame::Bulk),
        },
        // *<number-of-elements>\r\n<element-1>...<element-n>
        DataType::Array => {
            let length = match get_length(src)? {
                None => return Ok(Frame::NullArray),
                Some(length) => length,
            };

            // The declared length is untrusted, only preallocate for what is buffered.
            let mut frames = Vec::with_capacity(length.min(src.remaining()));
            for _ in 0..length {
                frames.push(parse_at_depth(src, depth + 1)?);
            }

            Ok(Frame::Array(frames))
        }
    }
}

fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let end = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_string(src: &mut Cursor<&[u8]>) -> Result<String, Error> {
    let line = get_line(src)?;
    String::from_utf8(line.to_vec()).map_err(|_| Error::InvalidUtf8)
}

fn get_integer(src: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let line = get_line(src)?;
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| Error::MalformedInteger(String::from_utf8_lossy(line).into_owned()))
}

/// Reads a length header, `None` standing for the `-1` null marker.
fn get_length(src: &mut Cursor<&[u8]>) -> Result<Option<usize>, Error> {
    match get_integer(src)? {
        -1 => Ok(None),
        length if length < 0 => Err(Error::InvalidLength(length)),
        length => usize::try_from(length)
            .map(Some)
            .map_err(|_| Error::InvalidLength(length)),
    }
}

fn get_payload(src: &mut Cursor<&[u8]>, length: usize) -> Result<Bytes, Error> {
    let start = src.position() as usize;
    let buf = src.get_ref();
    let available = buf.len() - start;

    if available < length.saturating_add(CRLF.len()) {
        return Err(Error::IncompletePayload {
            declared: length,
            available,
        });
    }

    let end = start + length;
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(Error::MissingTerminator);
    }

    let data = Bytes::copy_from_slice(&buf[start..end]);
    src.set_position((end + CRLF.len()) as u64);

    Ok(data)
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

/// Simple strings and errors are line-delimited, so CR and LF in the text are sent as spaces.
fn put_text<B: BufMut>(dst: &mut B, data_type: DataType, text: &str) {
    dst.put_u8(u8::from(data_type));
    for &byte in text.as_bytes() {
        dst.put_u8(match byte {
            b'\r' | b'\n' => b' ',
            byte => byte,
        });
    }
    dst.put_slice(CRLF);
}

fn put_line<B: BufMut>(dst: &mut B, data_type: DataType, line: &[u8]) {
    dst.put_u8(u8::from(data_type));
    dst.put_slice(line);
    dst.put_slice(CRLF);
}

#[derive(Debug, Clone, Copy)]
enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::UnknownType(byte)),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}
