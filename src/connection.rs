use futures::{SinkExt, StreamExt};
use std::io;
use std::time::Duration;
use thiserror::Error as ThisError;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::{CodecError, FrameCodec};
use crate::frame::{self, Frame};

#[derive(Debug, ThisError)]
pub enum ConnectionError {
    #[error("protocol error; {0}")]
    Malformed(frame::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("connection idle for more than {0:?}")]
    Timeout(Duration),
}

impl From<CodecError> for ConnectionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed(err) => ConnectionError::Malformed(err),
            CodecError::Io(err) => ConnectionError::Io(err),
        }
    }
}

/// One client connection: frames in, frames out.
///
/// Partially received frames stay buffered inside the codec until the rest arrives.
pub struct Connection {
    pub id: Uuid,
    framed: Framed<TcpStream, FrameCodec>,
    timeout: Option<Duration>,
}

impl Connection {
    pub fn new(stream: TcpStream, codec: FrameCodec) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            framed: Framed::new(stream, codec),
            timeout: None,
        }
    }

    /// Bounds every read and write. Hitting the bound is reported as `ConnectionError::Timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Connection {
        self.timeout = timeout;
        self
    }

    /// Reads the next frame. `Ok(None)` means the peer closed the connection cleanly, between
    /// two frames.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let next = match self.timeout {
            Some(duration) => timeout(duration, self.framed.next())
                .await
                .map_err(|_| ConnectionError::Timeout(duration))?,
            None => self.framed.next().await,
        };

        Ok(next.transpose()?)
    }

    /// Writes a frame and flushes it to the socket.
    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), ConnectionError> {
        match self.timeout {
            Some(duration) => timeout(duration, self.framed.send(frame))
                .await
                .map_err(|_| ConnectionError::Timeout(duration))??,
            None => self.framed.send(frame).await?,
        }

        Ok(())
    }
}
