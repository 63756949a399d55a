use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use itertools::Itertools;
use std::io::Cursor;
use std::string::FromUtf8Error;
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

/// Nesting limit used by [`Frame::parse`].
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("invalid frame data type: {0:?}")]
    InvalidDataType(char),
    #[error("invalid length or count: {0:?}")]
    InvalidLength(String),
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),
    #[error("invalid UTF-8 in frame")]
    InvalidUtf8,
    #[error("bulk string payload is not followed by CRLF")]
    MissingTerminator,
    #[error("frame nesting exceeds {0} levels")]
    NestingTooDeep(usize),
    #[error("frame exceeds {0} bytes")]
    FrameTooLarge(usize),
    #[error("stream ended in the middle of a frame")]
    UnexpectedEof,
}

/// A single protocol value. Requests and responses share the same representation.
///
/// `Null` is the absent bulk string (`$-1\r\n`). `Map` keeps pairs in wire order; a key that
/// appears twice keeps its first position and takes the last value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
    Map(Vec<(Frame, Frame)>),
}

impl Frame {
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Self::parse_with_depth(src, DEFAULT_MAX_DEPTH)
    }

    /// Parses one frame, allowing at most `max_depth` levels of nested arrays and maps.
    ///
    /// Returns `Error::Incomplete` when `src` ends before the frame does; the caller is expected
    /// to retry once more data has arrived. Any other error means the bytes can never form a
    /// valid frame.
    pub fn parse_with_depth(src: &mut Cursor<&[u8]>, max_depth: usize) -> Result<Self, Error> {
        parse_frame(src, 0, max_depth)
    }

    /// Appends the wire representation of the frame to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(s) => {
                dst.put_u8(u8::from(DataType::SimpleString));
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            Frame::Error(s) => {
                dst.put_u8(u8::from(DataType::SimpleError));
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            Frame::Integer(i) => {
                dst.put_u8(u8::from(DataType::Integer));
                dst.extend_from_slice(i.to_string().as_bytes());
                dst.extend_from_slice(CRLF);
            }
            Frame::Bulk(bytes) => {
                write_header(dst, DataType::BulkString, bytes.len());
                dst.reserve(bytes.len() + CRLF.len());
                dst.extend_from_slice(bytes);
                dst.extend_from_slice(CRLF);
            }
            Frame::Null => {
                dst.put_u8(u8::from(DataType::BulkString));
                dst.extend_from_slice(b"-1");
                dst.extend_from_slice(CRLF);
            }
            Frame::Array(arr) => {
                write_header(dst, DataType::Array, arr.len());
                for frame in arr {
                    frame.write_to(dst);
                }
            }
            Frame::Map(pairs) => {
                write_header(dst, DataType::Map, pairs.len());
                for (key, value) in pairs {
                    key.write_to(dst);
                    value.write_to(dst);
                }
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = BytesMut::new();
        self.write_to(&mut bytes);
        bytes.to_vec()
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

// Used for logging, the bytes on the wire are produced by `write_to`.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Integer(i) => write!(f, ":{}", i),
            Frame::Bulk(bytes) => write!(f, "${}", String::from_utf8_lossy(bytes)),
            Frame::Null => write!(f, "$-1"),
            Frame::Array(arr) => {
                write!(f, "*{}", arr.len())?;
                for frame in arr {
                    write!(f, " {}", frame)?;
                }
                Ok(())
            }
            Frame::Map(pairs) => {
                write!(f, "%{}", pairs.len())?;
                for (key, value) in pairs {
                    write!(f, " {} => {}", key, value)?;
                }
                Ok(())
            }
        }
    }
}

fn parse_frame(src: &mut Cursor<&[u8]>, depth: usize, max_depth: usize) -> Result<Frame, Error> {
    // The first byte of every frame identifies its type, the rest is the type's content.
    let first_byte = get_byte(src)?;
    let data_type = DataType::try_from(first_byte)?;

    match data_type {
        DataType::SimpleString => {
            let line = get_line(src)?.to_vec();
            Ok(Frame::Simple(String::from_utf8(line)?))
        }
        DataType::SimpleError => {
            let line = get_line(src)?.to_vec();
            Ok(Frame::Error(String::from_utf8(line)?))
        }
        DataType::Integer => {
            let line = get_line(src)?;
            let integer = std::str::from_utf8(line)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| Error::InvalidInteger(String::from_utf8_lossy(line).into_owned()))?;

            Ok(Frame::Integer(integer))
        }
        // $<length>\r\n<data>\r\n
        DataType::BulkString => {
            let line = get_line(src)?;
            if line == b"-1" {
                return Ok(Frame::Null);
            }

            let length = parse_length(line)?;
            let data = get_exact(src, length)?;

            Ok(Frame::Bulk(Bytes::copy_from_slice(data)))
        }
        // *<number-of-elements>\r\n<element-1>...<element-n>
        DataType::Array => {
            let length = parse_length(get_line(src)?)?;
            check_depth(depth, max_depth)?;

            // The count comes from the peer, so the vector only grows as elements arrive.
            let mut frames = Vec::new();
            for _ in 0..length {
                frames.push(parse_frame(src, depth + 1, max_depth)?);
            }

            Ok(Frame::Array(frames))
        }
        // %<number-of-pairs>\r\n<key-1><value-1>...<key-n><value-n>
        DataType::Map => {
            let length = parse_length(get_line(src)?)?;
            check_depth(depth, max_depth)?;

            let count = length
                .checked_mul(2)
                .ok_or_else(|| Error::InvalidLength(length.to_string()))?;
            let mut frames = Vec::new();
            for _ in 0..count {
                frames.push(parse_frame(src, depth + 1, max_depth)?);
            }

            Ok(Frame::Map(dedup_pairs(frames)))
        }
    }
}

/// Pairs up `frames` as key, value, key, value... A repeated key keeps the position of its first
/// occurrence and the value of its last.
fn dedup_pairs(frames: Vec<Frame>) -> Vec<(Frame, Frame)> {
    let mut pairs: Vec<(Frame, Frame)> = Vec::with_capacity(frames.len() / 2);
    let mut positions: HashMap<Frame, usize> = HashMap::with_capacity(frames.len() / 2);

    for (key, value) in frames.into_iter().tuples() {
        match positions.entry(key) {
            Entry::Occupied(entry) => pairs[*entry.get()].1 = value,
            Entry::Vacant(entry) => {
                pairs.push((entry.key().clone(), value));
                entry.insert(pairs.len() - 1);
            }
        }
    }

    pairs
}

fn write_header(dst: &mut BytesMut, data_type: DataType, length: usize) {
    dst.put_u8(u8::from(data_type));
    dst.extend_from_slice(length.to_string().as_bytes());
    dst.extend_from_slice(CRLF);
}

fn check_depth(depth: usize, max_depth: usize) -> Result<(), Error> {
    if depth >= max_depth {
        return Err(Error::NestingTooDeep(max_depth));
    }
    Ok(())
}

/// Parses a non-negative decimal length or count.
fn parse_length(line: &[u8]) -> Result<usize, Error> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| Error::InvalidLength(String::from_utf8_lossy(line).into_owned()))
}

/// Returns the bytes up to the next CRLF and moves the cursor past it.
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

/// Returns exactly `length` bytes and consumes the CRLF that must follow them.
fn get_exact<'a>(src: &mut Cursor<&'a [u8]>, length: usize) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let end = start.checked_add(length).ok_or(Error::Incomplete)?;
    if buf.len() < end + CRLF.len() {
        return Err(Error::Incomplete);
    }
    if &buf[end..end + CRLF.len()] != CRLF {
        return Err(Error::MissingTerminator);
    }

    src.set_position((end + CRLF.len()) as u64);

    Ok(&buf[start..end])
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug, Clone, Copy)]
enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
    Map,          // '%'
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
            b'%' => Ok(Self::Map),
            _ => Err(Error::InvalidDataType(byte as char)),
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
            DataType::Map => b'%',
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_src: FromUtf8Error) -> Error {
        Error::InvalidUtf8
    }
}
