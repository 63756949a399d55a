use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::reply::Reply;
use crate::store::Store;

/// Removes every key. Replies with the number of keys removed.
#[derive(Debug, PartialEq)]
pub struct Flush;

impl Executable for Flush {
    fn exec(self, store: Store) -> Result<Reply, CommandError> {
        let removed = store.lock().clear();
        Ok(Reply::from(removed))
    }
}

impl TryFrom<&mut CommandParser> for Flush {
    type Error = CommandError;

    fn try_from(_parser: &mut CommandParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}
