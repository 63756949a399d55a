pub mod delete;
pub mod executable;
pub mod flush;
pub mod get;
pub mod mget;
pub mod mset;
pub mod set;

use bytes::Bytes;
use std::collections::HashMap;
use std::{str, vec};
use strum_macros::EnumString;
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::reply::{Reply, UnencodableError};
use crate::store::Store;

use delete::Delete;
use flush::Flush;
use get::Get;
use mget::Mget;
use mset::Mset;
use set::Set;

#[derive(Debug, PartialEq)]
pub enum Command {
    Delete(Delete),
    Flush(Flush),
    Get(Get),
    Mget(Mget),
    Mset(Mset),
    Set(Set),
}

impl Executable for Command {
    fn exec(self, store: Store) -> Result<Reply, CommandError> {
        match self {
            Command::Delete(cmd) => cmd.exec(store),
            Command::Flush(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::Mget(cmd) => cmd.exec(store),
            Command::Mset(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
        }
    }
}

/// Command names, matched without regard to case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum CommandName {
    Delete,
    Flush,
    Get,
    Mget,
    Mset,
    Set,
}

/// Builds a command from the arguments that follow its name.
pub type Handler = fn(&mut CommandParser) -> Result<Command, CommandError>;

/// Maps command names to their handlers. Built once and shared by every session.
pub struct Registry {
    handlers: HashMap<CommandName, Handler>,
}

impl Registry {
    pub fn new() -> Registry {
        let handlers: [(CommandName, Handler); 6] = [
            (CommandName::Delete, |parser| {
                Delete::try_from(parser).map(Command::Delete)
            }),
            (CommandName::Flush, |parser| {
                Flush::try_from(parser).map(Command::Flush)
            }),
            (CommandName::Get, |parser| Get::try_from(parser).map(Command::Get)),
            (CommandName::Mget, |parser| {
                Mget::try_from(parser).map(Command::Mget)
            }),
            (CommandName::Mset, |parser| {
                Mset::try_from(parser).map(Command::Mset)
            }),
            (CommandName::Set, |parser| Set::try_from(parser).map(Command::Set)),
        ];

        Registry {
            handlers: HashMap::from(handlers),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Handler> {
        let name = name.parse::<CommandName>().ok()?;
        self.handlers.get(&name).copied()
    }

    /// Turns a request frame into a command ready to run.
    ///
    /// Arrays are taken element by element; a lone simple or bulk string is split on
    /// whitespace. The first token names the command and the rest are its arguments, all of
    /// which the command must consume.
    pub fn parse(&self, request: Frame) -> Result<Command, CommandError> {
        let parser = &mut CommandParser::try_from(request)?;

        let command_name = parser.parse_command_name()?;
        let handler = self
            .lookup(&command_name)
            .ok_or(CommandError::UnknownCommand {
                command: command_name,
            })?;

        let command = handler(parser)?;
        parser.finish()?;

        Ok(command)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CommandParser {
    command: String,
    parts: vec::IntoIter<Frame>,
}

impl TryFrom<Frame> for CommandParser {
    type Error = CommandError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let parts = match frame {
            Frame::Array(array) => array,
            Frame::Simple(s) => split_words(&s),
            Frame::Bulk(bytes) => split_words(str::from_utf8(&bytes[..])?),
            frame => {
                return Err(CommandError::InvalidFrame {
                    expected: "array or string".to_string(),
                    actual: frame,
                })
            }
        };

        Ok(CommandParser {
            command: String::new(),
            parts: parts.into_iter(),
        })
    }
}

fn split_words(line: &str) -> Vec<Frame> {
    line.split_whitespace()
        .map(|word| Frame::Bulk(Bytes::copy_from_slice(word.as_bytes())))
        .collect()
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandError> {
        let command_name = match self.parts.next() {
            Some(frame) => frame,
            None => return Err(CommandError::EmptyRequest),
        };

        let command_name = match command_name {
            Frame::Simple(s) => s.to_uppercase(),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])?.to_uppercase(),
            frame => {
                return Err(CommandError::InvalidFrame {
                    expected: "simple or bulk string".to_string(),
                    actual: frame,
                })
            }
        };

        self.command.clone_from(&command_name);
        Ok(command_name)
    }

    /// Number of arguments not consumed yet.
    pub fn remaining(&self) -> usize {
        self.parts.len()
    }

    pub fn next_string(&mut self) -> Result<String, CommandError> {
        let frame = self.next_frame()?;

        match frame {
            // Both `Simple` and `Bulk` representation may be strings. Strings are parsed to UTF-8.
            // While errors are stored as strings, they are considered separate types.
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_string())
                .map_err(CommandError::InvalidUTF8String),
            frame => Err(CommandError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    pub fn next_bytes(&mut self) -> Result<Bytes, CommandError> {
        let frame = self.next_frame()?;

        match frame {
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    /// Fails unless every argument has been consumed.
    pub fn finish(&mut self) -> Result<(), CommandError> {
        if self.remaining() > 0 {
            return Err(self.wrong_arity());
        }
        Ok(())
    }

    pub fn wrong_arity(&self) -> CommandError {
        CommandError::WrongArity {
            command: self.command.clone(),
        }
    }

    fn next_frame(&mut self) -> Result<Frame, CommandError> {
        self.parts.next().ok_or_else(|| self.wrong_arity())
    }
}

/// Failures a session reports back to the client without closing the connection.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandError {
    #[error("missing command")]
    EmptyRequest,
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("wrong number of arguments for '{command}' command")]
    WrongArity { command: String },
    #[error("invalid frame, expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
    #[error("internal error; {0}")]
    Unencodable(#[from] UnencodableError),
}
