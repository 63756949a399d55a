use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{self, Frame};

/// Default upper bound for a single buffered frame: 512 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("protocol error; {0}")]
    Malformed(#[from] frame::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Splits a byte stream into frames and writes frames back as bytes.
///
/// A clean end of stream is only recognised between frames. If the peer goes away while a frame
/// is half received, decoding fails with `UnexpectedEof`.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
    max_depth: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize, max_depth: usize) -> FrameCodec {
        FrameCodec {
            max_frame_size,
            max_depth,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE, frame::DEFAULT_MAX_DEPTH)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut cursor = Cursor::new(&src[..]);
        let frame = match Frame::parse_with_depth(&mut cursor, self.max_depth) {
            Ok(frame) => frame,
            Err(frame::Error::Incomplete) => {
                // Refuse to keep buffering a frame that will never fit.
                if src.len() > self.max_frame_size {
                    return Err(frame::Error::FrameTooLarge(self.max_frame_size).into());
                }
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let position = cursor.position() as usize;

        // Remove the parsed frame from the buffer.
        src.advance(position);

        Ok(Some(frame))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(frame::Error::UnexpectedEof.into()),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        frame.write_to(dst);
        Ok(())
    }
}
