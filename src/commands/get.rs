use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::reply::Reply;
use crate::store::Store;

/// Get the value of `key`. If the key does not exist the null bulk string is returned.
#[derive(Debug, PartialEq)]
pub struct Get {
    pub key: String,
}

impl Executable for Get {
    fn exec(self, store: Store) -> Result<Reply, CommandError> {
        let store = store.lock();
        Ok(Reply::from(store.get(&self.key)))
    }
}

impl TryFrom<&mut CommandParser> for Get {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}
