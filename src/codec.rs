use bytes::{Buf, BytesMut};
use std::io::Cursor;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{Error, Frame};

/// Default limit on the number of buffered bytes a single frame may occupy.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> FrameCodec {
        FrameCodec { max_frame_size }
    }

    fn parse(&self, src: &mut BytesMut) -> Result<Frame, Error> {
        // Buffered bytes are bounded regardless of what the frame header declares.
        if src.len() > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size: src.len(),
                max: self.max_frame_size,
            });
        }

        let mut cursor = Cursor::new(&src[..]);
        let frame = Frame::parse(&mut cursor)?;
        let position = cursor.position() as usize;

        // Remove the parsed frame from the buffer.
        src.advance(position);

        Ok(frame)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.parse(src) {
            Ok(frame) => Ok(Some(frame)),
            // Not enough data to parse a frame yet.
            Err(err) if err.is_incomplete() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // The peer is gone, so whatever is still missing will never arrive.
        match self.parse(src) {
            Ok(frame) => Ok(Some(frame)),
            Err(Error::IncompletePayload {
                declared,
                available,
            }) => Err(Error::TruncatedPayload {
                declared,
                available,
            }),
            Err(Error::Incomplete) => Err(Error::UnexpectedEof),
            Err(err) => Err(err),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        frame.encode_into(dst);
        Ok(())
    }
}
