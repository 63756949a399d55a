use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::commands::executable::Executable;
use crate::commands::{CommandError, Registry};
use crate::connection::{Connection, ConnectionError};
use crate::frame::Frame;
use crate::reply::Reply;
use crate::store::Store;

/// Where a session is in its request/response cycle.
#[derive(Debug)]
enum State {
    AwaitRequest,
    HaveRequest(Frame),
    Dispatched(Frame),
    Closed,
}

/// Serves one connection until the peer disconnects.
///
/// Requests are handled strictly one at a time: the next frame is not read until the response to
/// the previous one has been written. A command that fails is answered with an error frame and
/// the session carries on; a frame that cannot be decoded ends the session.
pub struct Session {
    connection: Connection,
    registry: Arc<Registry>,
    store: Store,
}

impl Session {
    pub fn new(connection: Connection, registry: Arc<Registry>, store: Store) -> Session {
        Session {
            connection,
            registry,
            store,
        }
    }

    pub async fn run(mut self) -> Result<(), ConnectionError> {
        let mut state = State::AwaitRequest;

        loop {
            state = match state {
                State::AwaitRequest => match self.connection.read_frame().await {
                    Ok(Some(frame)) => State::HaveRequest(frame),
                    Ok(None) => State::Closed,
                    Err(ConnectionError::Malformed(err)) => {
                        warn!("Malformed frame, closing connection: {}", err);
                        self.reject(&err.to_string()).await;
                        return Err(ConnectionError::Malformed(err));
                    }
                    Err(err) => return Err(err),
                },
                State::HaveRequest(request) => {
                    debug!("Received frame from client: {}", request);
                    State::Dispatched(respond(&self.registry, &self.store, request))
                }
                State::Dispatched(response) => {
                    debug!("Sending response to client: {}", response);
                    self.connection.write_frame(response).await?;
                    State::AwaitRequest
                }
                State::Closed => {
                    info!("Connection closed");
                    return Ok(());
                }
            };
        }
    }

    /// Best-effort notice to the peer before the connection is dropped.
    async fn reject(&mut self, reason: &str) {
        let frame = error_frame(&format!("protocol error; {}", reason));
        if let Err(err) = self.connection.write_frame(frame).await {
            debug!("Could not report protocol error to client: {}", err);
        }
    }
}

/// Runs a request and turns the outcome, success or failure, into the frame to send back.
pub fn respond(registry: &Registry, store: &Store, request: Frame) -> Frame {
    into_response(dispatch(registry, store, request))
}

fn dispatch(registry: &Registry, store: &Store, request: Frame) -> Result<Reply, CommandError> {
    let command = registry.parse(request)?;
    command.exec(store.clone())
}

fn into_response(outcome: Result<Reply, CommandError>) -> Frame {
    let encoded = outcome.and_then(|reply| Frame::try_from(reply).map_err(CommandError::from));
    match encoded {
        Ok(frame) => frame,
        Err(err) => {
            warn!("Command failed: {}", err);
            error_frame(&err.to_string())
        }
    }
}

// Messages may echo client input, which must not break the error line.
fn error_frame(message: &str) -> Frame {
    Frame::Error(format!("ERR {}", message.replace(&['\r', '\n'][..], " ")))
}
