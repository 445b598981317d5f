pub mod del;
pub mod echo;
pub mod executable;
pub mod exists;
pub mod get;
pub mod ping;
pub mod set;

use bytes::Bytes;
use std::{str, vec};
use strum_macros::IntoStaticStr;
use thiserror::Error as ThisError;
use tracing::debug;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;

use del::Del;
use echo::Echo;
use exists::Exists;
use get::Get;
use ping::Ping;
use set::Set;

#[derive(Debug, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Command {
    Del(Del),
    Echo(Echo),
    Exists(Exists),
    Get(Get),
    Ping(Ping),
    Set(Set),
}

impl Command {
    /// Builds a command from its name and arguments. Names are matched case-insensitively.
    pub fn parse(name: &str, args: Vec<Frame>) -> Result<Command, CommandParserError> {
        let command = name.to_uppercase();
        let mut parser = CommandParser {
            command: command.clone(),
            parts: args.into_iter(),
        };

        let result = match &command[..] {
            "DEL" => Del::try_from(&mut parser).map(Command::Del),
            "ECHO" => Echo::try_from(&mut parser).map(Command::Echo),
            "EXISTS" => Exists::try_from(&mut parser).map(Command::Exists),
            "GET" => Get::try_from(&mut parser).map(Command::Get),
            "PING" => Ping::try_from(&mut parser).map(Command::Ping),
            "SET" => Set::try_from(&mut parser).map(Command::Set),
            _ => {
                return Err(CommandParserError::UnknownCommand {
                    command: command.clone(),
                })
            }
        };

        result
            .and_then(|cmd| parser.finish().map(|_| cmd))
            .map_err(|err| match err {
                // Running out of arguments while a command still expects one.
                CommandParserError::EndOfStream => CommandParserError::WrongArity { command },
                err => err,
            })
    }

    pub fn name(&self) -> &'static str {
        self.into()
    }
}

impl Executable for Command {
    fn exec(self, store: Store) -> Frame {
        match self {
            Command::Del(cmd) => cmd.exec(store),
            Command::Echo(cmd) => cmd.exec(store),
            Command::Exists(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::Ping(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = CommandParserError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the Redis server as RESP arrays.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(CommandParserError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                })
            }
        };

        let mut parts = frames.into_iter();
        let name = match parts.next() {
            Some(Frame::Simple(s)) => s,
            Some(Frame::Bulk(bytes)) => str::from_utf8(&bytes[..])
                .map(|s| s.to_string())
                .map_err(CommandParserError::InvalidUTF8String)?,
            Some(frame) => {
                return Err(CommandParserError::InvalidFrame {
                    expected: "simple or bulk string".to_string(),
                    actual: frame,
                })
            }
            None => return Err(CommandParserError::EmptyRequest),
        };

        Command::parse(&name, parts.collect())
    }
}

/// Executes the command `name` with `args` against `store`.
///
/// Every outcome is a reply: unknown commands and invalid arguments become error frames, so the
/// caller always has something to send back.
pub fn dispatch(name: &str, args: Vec<Frame>, store: &Store) -> Frame {
    reply(Command::parse(name, args), store)
}

/// Interprets a decoded request frame and executes it against `store`.
pub fn execute(frame: Frame, store: &Store) -> Frame {
    reply(Command::try_from(frame), store)
}

fn reply(cmd: Result<Command, CommandParserError>, store: &Store) -> Frame {
    match cmd {
        Ok(cmd) => {
            debug!(command = cmd.name(), "executing command");
            cmd.exec(store.clone())
        }
        Err(err) => {
            debug!(error = %err, "rejected command");
            // Error text may echo client input, which must not break the reply onto new lines.
            Frame::Error(err.to_string().replace(['\r', '\n'], " "))
        }
    }
}

pub struct CommandParser {
    command: String,
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    fn next_frame(&mut self) -> Result<Frame, CommandParserError> {
        self.parts.next().ok_or(CommandParserError::EndOfStream)
    }

    fn next_string(&mut self) -> Result<String, CommandParserError> {
        match self.next_frame()? {
            // Both `Simple` and `Bulk` representation may be strings. Strings are parsed to UTF-8.
            // While errors are stored as strings, they are considered separate types.
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_string())
                .map_err(CommandParserError::InvalidUTF8String),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    fn next_integer(&mut self) -> Result<i64, CommandParserError> {
        match self.next_frame()? {
            Frame::Integer(i) => Ok(i),
            Frame::Simple(string) => string
                .parse::<i64>()
                .map_err(|_| CommandParserError::NotAnInteger),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(CommandParserError::NotAnInteger),
            _ => Err(CommandParserError::NotAnInteger),
        }
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        match self.next_frame()? {
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    fn has_remaining(&self) -> bool {
        self.parts.len() > 0
    }

    /// Fails when arguments are left over after the command took what it accepts.
    fn finish(&mut self) -> Result<(), CommandParserError> {
        if self.has_remaining() {
            return Err(CommandParserError::WrongArity {
                command: self.command.clone(),
            });
        }
        Ok(())
    }
}

/// Command-level failures. Their `Display` output is the text of the error reply sent to the
/// client.
#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("ERR Protocol error: expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("ERR Protocol error: empty request")]
    EmptyRequest,
    #[error("ERR unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongArity { command: String },
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
    #[error("ERR syntax error")]
    Syntax,
    #[error("ERR invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
    #[error("ERR attempting to extract a value failed due to the frame being fully consumed")]
    EndOfStream,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(parts: &[&'static str]) -> Frame {
        Frame::Array(parts.iter().map(|part| Frame::bulk(*part)).collect())
    }

    #[test]
    fn parse_get_command_with_simple_string() {
        let get_frame = Frame::Array(vec![
            Frame::Simple(String::from("GET")),
            Frame::Simple(String::from("foo")),
        ]);

        let get_command = Command::try_from(get_frame).unwrap();

        assert_eq!(
            get_command,
            Command::Get(Get {
                key: String::from("foo")
            })
        );
    }

    #[test]
    fn parse_get_command_with_bulk_string() {
        let get_frame = Frame::Array(vec![
            Frame::Simple(String::from("GET")),
            Frame::bulk("foo-from-bytes"),
        ]);

        let get_command = Command::try_from(get_frame).unwrap();

        assert_eq!(
            get_command,
            Command::Get(Get {
                key: String::from("foo-from-bytes")
            })
        );
    }

    #[test]
    fn command_names_are_case_insensitive() {
        for name in ["set", "SET", "SeT"] {
            let cmd = Command::try_from(request(&[name, "foo", "bar"])).unwrap();

            assert_eq!(
                cmd,
                Command::Set(Set {
                    key: String::from("foo"),
                    value: Bytes::from("bar"),
                    ttl: None,
                })
            );
        }
    }

    #[test]
    fn unknown_command() {
        let store = Store::new();

        let res = dispatch("foo", vec![], &store);

        assert_eq!(res, Frame::error("ERR unknown command 'FOO'"));
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_command_with_line_breaks_is_a_single_reply() {
        let store = Store::new();

        let res = dispatch("foo\r\n+OK", vec![], &store);
        assert_eq!(res, Frame::error("ERR unknown command 'FOO  +OK'"));

        let bytes = res.serialize();
        let mut cursor = std::io::Cursor::new(&bytes[..]);
        assert_eq!(Frame::parse(&mut cursor).unwrap(), res);
        assert_eq!(cursor.position(), bytes.len() as u64);
    }

    #[test]
    fn unknown_command_leaves_store_untouched() {
        let store = Store::new();
        store.set("key".to_string(), Frame::bulk("value"));

        let res = dispatch("FOO", vec![Frame::bulk("key")], &store);

        assert_eq!(res, Frame::error("ERR unknown command 'FOO'"));
        assert_eq!(store.get("key"), Some(Frame::bulk("value")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn non_array_request_is_rejected() {
        let store = Store::new();

        let res = execute(Frame::simple("PING"), &store);

        assert_eq!(
            res,
            Frame::error("ERR Protocol error: expected array, got +PING")
        );
    }

    #[test]
    fn empty_request_is_rejected() {
        let store = Store::new();

        let res = execute(Frame::Array(vec![]), &store);

        assert_eq!(res, Frame::error("ERR Protocol error: empty request"));
    }

    #[test]
    fn command_name_must_be_a_string() {
        let res = Command::try_from(Frame::Array(vec![Frame::Integer(1)]));

        assert_eq!(
            res,
            Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: Frame::Integer(1),
            })
        );
    }

    #[test]
    fn execute_round_trip() {
        let store = Store::new();

        assert_eq!(
            execute(request(&["SET", "key", "value"]), &store),
            Frame::simple("OK")
        );
        assert_eq!(
            execute(request(&["get", "key"]), &store),
            Frame::bulk("value")
        );
    }

    #[test]
    fn command_name() {
        let cmd = Command::parse("echo", vec![Frame::bulk("hi")]).unwrap();

        assert_eq!(cmd.name(), "ECHO");
    }
}
