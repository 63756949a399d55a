use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::reply::Reply;
use crate::store::Store;

/// Sets the given keys to their respective values, replacing existing values. Replies with the
/// number of pairs written.
///
/// The arguments are checked before the store is touched, so a request with a dangling key
/// changes nothing.
#[derive(Debug, PartialEq)]
pub struct Mset {
    pub pairs: Vec<(String, Bytes)>,
}

impl Executable for Mset {
    fn exec(self, store: Store) -> Result<Reply, CommandError> {
        let count = self.pairs.len();
        let mut store = store.lock();

        for (key, value) in self.pairs {
            store.set(key, value);
        }

        Ok(Reply::from(count))
    }
}

impl TryFrom<&mut CommandParser> for Mset {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let remaining = parser.remaining();
        if remaining == 0 || remaining % 2 != 0 {
            return Err(parser.wrong_arity());
        }

        let mut pairs = Vec::with_capacity(remaining / 2);
        while parser.remaining() > 0 {
            let key = parser.next_string()?;
            let value = parser.next_bytes()?;
            pairs.push((key, value));
        }

        Ok(Self { pairs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, Registry};
    use crate::frame::Frame;

    #[test]
    fn insert_many() {
        let store = Store::new();

        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("MSET")),
            Frame::Bulk(Bytes::from("key1")),
            Frame::Bulk(Bytes::from("value1")),
            Frame::Bulk(Bytes::from("key2")),
            Frame::Bulk(Bytes::from("value2")),
            Frame::Bulk(Bytes::from("key3")),
            Frame::Bulk(Bytes::from("value3")),
        ]);
        let cmd = Registry::new().parse(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Mset(Mset {
                pairs: vec![
                    (String::from("key1"), Bytes::from("value1")),
                    (String::from("key2"), Bytes::from("value2")),
                    (String::from("key3"), Bytes::from("value3"))
                ]
            })
        );

        let res = cmd.exec(store.clone()).unwrap();

        assert_eq!(res, Reply::Integer(3));
        assert_eq!(store.lock().get("key1"), Some(Bytes::from("value1")));
        assert_eq!(store.lock().get("key2"), Some(Bytes::from("value2")));
        assert_eq!(store.lock().get("key3"), Some(Bytes::from("value3")));
    }

    #[test]
    fn overide_existing() {
        let store = Store::new();
        store.lock().set(String::from("key1"), Bytes::from("1"));

        let frame = Frame::Simple(String::from("MSET key1 value1"));
        let cmd = Registry::new().parse(frame).unwrap();

        assert_eq!(cmd.exec(store.clone()).unwrap(), Reply::Integer(1));
        assert_eq!(store.lock().get("key1"), Some(Bytes::from("value1")));
    }

    #[test]
    fn odd_number_of_arguments() {
        let frame = Frame::Simple(String::from("MSET a 1 b"));

        let err = Registry::new().parse(frame).unwrap_err();

        assert_eq!(
            err,
            CommandError::WrongArity {
                command: String::from("MSET")
            }
        );
    }

    #[test]
    fn no_keys() {
        let frame = Frame::Array(vec![Frame::Bulk(Bytes::from("MSET"))]);

        let err = Registry::new().parse(frame).unwrap_err();

        assert_eq!(
            err,
            CommandError::WrongArity {
                command: String::from("MSET")
            }
        );
    }
}
