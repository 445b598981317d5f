use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::FrameCodec;
use crate::frame::{Error, Frame};

/// One peer of the server. Frames are decoded from, and encoded to, the underlying stream
/// through a `FrameCodec`; bytes of a partially received frame stay buffered until the rest
/// arrives.
pub struct Connection<T = TcpStream> {
    pub id: Uuid,
    pub client_address: SocketAddr,
    frames: Framed<T, FrameCodec>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: T, client_address: SocketAddr) -> Connection<T> {
        Connection::with_codec(stream, client_address, FrameCodec::default())
    }

    pub fn with_codec(stream: T, client_address: SocketAddr, codec: FrameCodec) -> Connection<T> {
        Connection {
            id: Uuid::new_v4(),
            client_address,
            frames: Framed::new(stream, codec),
        }
    }

    /// Reads the next frame. `None` means the peer closed the connection between frames; a close
    /// in the middle of a frame is an error.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        self.frames.next().await.transpose()
    }

    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), Error> {
        self.frames.send(frame).await
    }
}
