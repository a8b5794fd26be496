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

//! TCP transport.
//!
//! Servers bind a listener and accept [`TcpTransport`]s from it; clients
//! connect with a deadline. Everything past connection setup happens on the
//! object streams.

use crate::transport::{Transport, TransportError, TransportMetadata};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, instrument};

/// A connected TCP socket and its metadata.
///
/// # Examples
///
/// ```rust,no_run
/// use tether::transport::{TcpTransport, Transport};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let listener = TcpTransport::bind("127.0.0.1:0").await?;
/// let addr = listener.local_addr()?;
///
/// let client = TcpTransport::connect_timeout(&addr.to_string(), Duration::from_secs(1)).await?;
/// let server_side = TcpTransport::accept(&listener).await?;
/// assert_eq!(server_side.metadata().peer_addr, client.metadata().local_addr);
/// # Ok(())
/// # }
/// ```
pub struct TcpTransport {
    stream: TcpStream,
    metadata: TransportMetadata,
}

impl TcpTransport {
    fn from_stream(stream: TcpStream) -> io::Result<Self> {
        let metadata =
            TransportMetadata::new("tcp").with_addrs(stream.local_addr()?, stream.peer_addr()?);
        Ok(Self { stream, metadata })
    }

    /// Binds a listener for [`accept`](Self::accept).
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the address cannot be bound.
    #[instrument(skip_all, fields(address = %address))]
    pub async fn bind(address: &str) -> Result<TcpListener, TransportError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| TransportError::BindFailed {
                address: address.to_string(),
                source,
            })?;
        debug!("TCP listener bound");
        Ok(listener)
    }

    /// Waits for the next incoming connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] if accepting fails. The listener stays
    /// usable.
    pub async fn accept(listener: &TcpListener) -> Result<Self, TransportError> {
        let (stream, _) = listener.accept().await?;
        let transport = Self::from_stream(stream)?;
        debug!(
            transport_id = %transport.metadata.id,
            peer_addr = ?transport.metadata.peer_addr,
            "accepted TCP connection"
        );
        Ok(transport)
    }

    /// Connects to `address`, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Timeout`] if the deadline expires and
    /// [`TransportError::ConnectionFailed`] if the peer refuses.
    #[instrument(skip_all, fields(address = %address))]
    pub async fn connect_timeout(address: &str, timeout: Duration) -> Result<Self, TransportError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| TransportError::Timeout { duration: timeout })?
            .map_err(|source| TransportError::ConnectionFailed {
                address: address.to_string(),
                source,
            })?;
        let transport = Self::from_stream(stream)?;
        debug!(transport_id = %transport.metadata.id, "TCP connection established");
        Ok(transport)
    }

    /// Sets `TCP_NODELAY` on the socket.
    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        self.stream.set_nodelay(nodelay)
    }
}

impl Transport for TcpTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }
}

impl AsyncRead for TcpTransport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpTransport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    const DEADLINE: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_tcp_round_trip_and_metadata() {
        let listener = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let echo = tokio::spawn(async move {
            let mut transport = TcpTransport::accept(&listener).await.unwrap();
            let mut buffer = [0u8; 5];
            transport.read_exact(&mut buffer).await.unwrap();
            transport.write_all(&buffer).await.unwrap();
            transport.metadata().clone()
        });

        let mut client = TcpTransport::connect_timeout(&addr.to_string(), DEADLINE)
            .await
            .unwrap();
        client.set_nodelay(true).unwrap();
        client.write_all(b"hello").await.unwrap();
        let mut buffer = [0u8; 5];
        client.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"hello");

        let accepted = echo.await.unwrap();
        assert_eq!(client.metadata().transport_type, "tcp");
        assert_eq!(client.metadata().peer_addr, Some(addr));
        assert_eq!(accepted.peer_addr, client.metadata().local_addr);
        assert_ne!(accepted.id, client.metadata().id);
    }

    #[tokio::test]
    async fn test_tcp_connection_refused() {
        // Bind then drop to find a port nobody is listening on
        let listener = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        match TcpTransport::connect_timeout(&addr, DEADLINE).await {
            Err(TransportError::ConnectionFailed { address, .. }) => assert_eq!(address, addr),
            Err(other) => panic!("expected ConnectionFailed, got {}", other),
            Ok(_) => panic!("expected ConnectionFailed"),
        }
    }

    #[tokio::test]
    async fn test_tcp_bind_in_use() {
        let listener = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let result = TcpTransport::bind(&addr).await;
        assert!(matches!(result, Err(TransportError::BindFailed { .. })));
    }
}
