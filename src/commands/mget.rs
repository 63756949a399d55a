use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::reply::Reply;
use crate::store::Store;

/// Returns the values of all specified keys, null for the ones that do not exist.
#[derive(Debug, PartialEq)]
pub struct Mget {
    pub keys: Vec<String>,
}

impl Executable for Mget {
    fn exec(self, store: Store) -> Result<Reply, CommandError> {
        let store = store.lock();
        let values = self
            .keys
            .iter()
            .map(|key| store.get(key))
            .collect::<Vec<_>>();

        Ok(Reply::from(values))
    }
}

impl TryFrom<&mut CommandParser> for Mget {
    type Error = CommandError;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        if parser.remaining() == 0 {
            return Err(parser.wrong_arity());
        }

        let mut keys = Vec::with_capacity(parser.remaining());
        while parser.remaining() > 0 {
            keys.push(parser.next_string()?);
        }

        Ok(Self { keys })
    }
}
