use bytes::Bytes;
use thiserror::Error as ThisError;

use crate::frame::Frame;

/// The values a command may hand back to the session.
///
/// Text is sent as a bulk string, the same as raw bytes, so a client reading it back always gets
/// bytes. `Status` is the only shape that goes out as a simple string.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Status(String),
    Text(String),
    Bytes(Bytes),
    Integer(i64),
    Error(String),
    Array(Vec<Reply>),
    Map(Vec<(Reply, Reply)>),
    Nil,
}

#[derive(Debug, ThisError, PartialEq)]
#[error("cannot encode {kind} containing a line terminator: {text:?}")]
pub struct UnencodableError {
    kind: &'static str,
    text: String,
}

impl TryFrom<Reply> for Frame {
    type Error = UnencodableError;

    fn try_from(reply: Reply) -> Result<Self, UnencodableError> {
        match reply {
            Reply::Status(text) => single_line("status", text).map(Frame::Simple),
            Reply::Error(text) => single_line("error", text).map(Frame::Error),
            Reply::Text(text) => Ok(Frame::Bulk(Bytes::from(text))),
            Reply::Bytes(bytes) => Ok(Frame::Bulk(bytes)),
            Reply::Integer(i) => Ok(Frame::Integer(i)),
            Reply::Nil => Ok(Frame::Null),
            Reply::Array(items) => items
                .into_iter()
                .map(Frame::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Frame::Array),
            Reply::Map(pairs) => pairs
                .into_iter()
                .map(|(key, value)| -> Result<_, UnencodableError> {
                    Ok((Frame::try_from(key)?, Frame::try_from(value)?))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Frame::Map),
        }
    }
}

fn single_line(kind: &'static str, text: String) -> Result<String, UnencodableError> {
    if text.contains(&['\r', '\n'][..]) {
        return Err(UnencodableError { kind, text });
    }
    Ok(text)
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<Bytes> for Reply {
    fn from(bytes: Bytes) -> Self {
        Reply::Bytes(bytes)
    }
}

impl From<i64> for Reply {
    fn from(i: i64) -> Self {
        Reply::Integer(i)
    }
}

impl From<usize> for Reply {
    fn from(n: usize) -> Self {
        Reply::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Reply::Nil, Into::into)
    }
}

impl<T: Into<Reply>> From<Vec<T>> for Reply {
    fn from(items: Vec<T>) -> Self {
        Reply::Array(items.into_iter().map(Into::into).collect())
    }
}
