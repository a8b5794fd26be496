//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! In-memory transport implementation.
//!
//! Pairs of connected in-memory transports let the handshake and object
//! streams be exercised without sockets.

use crate::transport::{Transport, TransportMetadata};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;

/// Default buffer size (in chunks) for memory transport channels.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// In-memory transport implementation.
///
/// Data written to one half of a pair can be read from the other. Shutting
/// down the write side delivers end-of-stream to the peer, the same as a
/// closed socket.
///
/// # Examples
///
/// ```rust
/// use tether::transport::MemoryTransport;
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (mut a, mut b) = MemoryTransport::pair(16);
/// a.write_all(b"Hello!").await?;
///
/// let mut buffer = vec![0u8; 6];
/// b.read_exact(&mut buffer).await?;
/// assert_eq!(&buffer, b"Hello!");
/// # Ok(())
/// # }
/// ```
pub struct MemoryTransport {
    metadata: TransportMetadata,
    rx: mpsc::Receiver<Vec<u8>>,
    current_chunk: Option<Vec<u8>>,
    chunk_offset: usize,
    tx: Option<mpsc::Sender<Vec<u8>>>,
}

impl MemoryTransport {
    /// Creates a pair of connected memory transports.
    ///
    /// `buffer_size` is the number of written chunks each direction can hold
    /// before writes wait for the reader.
    pub fn pair(buffer_size: usize) -> (Self, Self) {
        let (tx1, rx1) = mpsc::channel(buffer_size);
        let (tx2, rx2) = mpsc::channel(buffer_size);

        let transport1 = Self {
            metadata: TransportMetadata::new("memory"),
            rx: rx2,
            current_chunk: None,
            chunk_offset: 0,
            tx: Some(tx1),
        };

        let transport2 = Self {
            metadata: TransportMetadata::new("memory"),
            rx: rx1,
            current_chunk: None,
            chunk_offset: 0,
            tx: Some(tx2),
        };

        (transport1, transport2)
    }

    /// Creates a pair of connected memory transports with the default buffer size.
    pub fn pair_default() -> (Self, Self) {
        Self::pair(DEFAULT_BUFFER_SIZE)
    }
}

impl Transport for MemoryTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }
}

impl AsyncRead for MemoryTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;

        if let Some(chunk) = &this.current_chunk {
            let remaining = chunk.len() - this.chunk_offset;
            let to_read = remaining.min(buf.remaining());
            if to_read > 0 {
                let start = this.chunk_offset;
                buf.put_slice(&chunk[start..start + to_read]);
                this.chunk_offset += to_read;
                if this.chunk_offset >= chunk.len() {
                    this.current_chunk = None;
                    this.chunk_offset = 0;
                }
                return Poll::Ready(Ok(()));
            }
        }

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => {
                let to_read = chunk.len().min(buf.remaining());
                buf.put_slice(&chunk[..to_read]);
                if to_read < chunk.len() {
                    this.current_chunk = Some(chunk);
                    this.chunk_offset = to_read;
                }
                Poll::Ready(Ok(()))
            }
            // All senders gone: end of stream
            Poll::Ready(None) => Poll::Ready(Ok(())),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl AsyncWrite for MemoryTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let Some(tx) = &this.tx else {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "memory transport shut down",
            )));
        };

        match tx.try_send(buf.to_vec()) {
            Ok(()) => Poll::Ready(Ok(buf.len())),
            Err(mpsc::error::TrySendError::Full(_)) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "memory transport closed",
            ))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // Dropping the sender delivers EOF to the peer
        self.get_mut().tx = None;
        Poll::Ready(Ok(()))
    }
}
