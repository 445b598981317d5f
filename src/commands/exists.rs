use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::Store;

/// Returns how many of the given keys exist. A key mentioned several times is counted each time.
///
/// Ref: <https://redis.io/docs/latest/commands/exists/>
#[derive(Debug, PartialEq)]
pub struct Exists {
    pub keys: Vec<String>,
}

impl Executable for Exists {
    fn exec(self, store: Store) -> Frame {
        let count = self.keys.iter().filter(|key| store.exists(key)).count();

        Frame::Integer(count as i64)
    }
}

impl TryFrom<&mut CommandParser> for Exists {
    type Error = CommandParserError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let mut keys = vec![parser.next_string()?];

        while parser.has_remaining() {
            keys.push(parser.next_string()?);
        }

        Ok(Self { keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::dispatch;

    #[test]
    fn counts_existing_keys() {
        let store = Store::new();
        store.set(String::from("key1"), Frame::bulk("1"));

        let res = dispatch(
            "EXISTS",
            vec![
                Frame::bulk("key1"),
                Frame::bulk("key1"),
                Frame::bulk("missing"),
            ],
            &store,
        );

        assert_eq!(res, Frame::Integer(2));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_keys_do_not_exist() {
        let store = Store::new();
        store.set_with_ttl(
            String::from("key1"),
            Frame::bulk("1"),
            tokio::time::Duration::from_millis(10),
        );

        tokio::time::advance(tokio::time::Duration::from_millis(10)).await;

        assert_eq!(
            dispatch("EXISTS", vec![Frame::bulk("key1")], &store),
            Frame::Integer(0)
        );
        assert!(store.is_empty());
    }
}
