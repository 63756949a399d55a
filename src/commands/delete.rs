use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::reply::Reply;
use crate::store::Store;

/// Removes `key`. Replies `1` if the key existed, `0` otherwise.
#[derive(Debug, PartialEq)]
pub struct Delete {
    pub key: String,
}

impl Executable for Delete {
    fn exec(self, store: Store) -> Result<Reply, CommandError> {
        let removed = store.lock().remove(&self.key).is_some();
        Ok(Reply::Integer(removed.into()))
    }
}

impl TryFrom<&mut CommandParser> for Delete {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}
