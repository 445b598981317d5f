use bytes::Bytes;
use strum_macros::EnumString;
use tokio::time::Duration;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Set `key` to hold the string `value`. If `key` already holds a value, it is overwritten, and
/// any previous time to live associated with the key is discarded.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
    pub ttl: Option<Ttl>,
}

#[derive(Debug, PartialEq)]
pub enum Ttl {
    Ex(u64),
    Px(u64),
}

impl Ttl {
    pub fn duration(&self) -> Duration {
        match self {
            Ttl::Ex(seconds) => Duration::from_secs(*seconds),
            Ttl::Px(millis) => Duration::from_millis(*millis),
        }
    }
}

#[derive(Debug, Clone, Copy, EnumString)]
#[strum(ascii_case_insensitive)]
enum SetOption {
    Ex,
    Px,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Frame {
        let value = Frame::Bulk(self.value);

        match self.ttl {
            Some(ttl) => store.set_with_ttl(self.key, value, ttl.duration()),
            None => store.set(self.key, value),
        }

        Frame::Simple("OK".to_string())
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        let mut ttl = None;

        while parser.has_remaining() {
            let option = parser
                .next_string()
                .ok()
                .and_then(|option| option.parse::<SetOption>().ok())
                .ok_or(CommandParserError::Syntax)?;

            let amount = match parser.next_integer() {
                Ok(amount) => amount,
                Err(CommandParserError::EndOfStream) => return Err(CommandParserError::Syntax),
                Err(err) => return Err(err),
            };

            // The first expiry option wins, later ones are only validated. A non-positive
            // amount stores the value already expired.
            let amount = amount.max(0);
            ttl.get_or_insert(match option {
                SetOption::Ex => Ttl::Ex(amount as u64),
                SetOption::Px => Ttl::Px(amount as u64),
            });
        }

        Ok(Self { key, value, ttl })
    }
}
