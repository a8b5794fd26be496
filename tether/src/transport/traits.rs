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

use crate::transport::TransportMetadata;
use tokio::io::{AsyncRead, AsyncWrite};

/// Core transport abstraction for duplex byte streams.
///
/// The `Transport` trait combines Tokio's `AsyncRead` and `AsyncWrite` with
/// connection metadata. Servers and clients only ever see transports through
/// [`BoxedTransport`], which lets the stream-wrapping hooks layer encryption
/// or compression over a raw socket before the handshake begins.
///
/// Closing is done through `AsyncWriteExt::shutdown` on the write half; the
/// peer observes end-of-stream on its next read.
///
/// # Examples
///
/// ## Implementing a custom transport
///
/// ```rust
/// use tether::transport::{Transport, TransportMetadata};
/// use tokio::io::{AsyncRead, AsyncWrite};
/// use std::pin::Pin;
/// use std::task::{Context, Poll};
///
/// struct CustomTransport {
///     metadata: TransportMetadata,
/// }
///
/// impl Transport for CustomTransport {
///     fn metadata(&self) -> &TransportMetadata {
///         &self.metadata
///     }
/// }
///
/// impl AsyncRead for CustomTransport {
///     fn poll_read(
///         self: Pin<&mut Self>,
///         _cx: &mut Context<'_>,
///         _buf: &mut tokio::io::ReadBuf<'_>,
///     ) -> Poll<std::io::Result<()>> {
///         Poll::Ready(Ok(()))
///     }
/// }
///
/// impl AsyncWrite for CustomTransport {
///     fn poll_write(
///         self: Pin<&mut Self>,
///         _cx: &mut Context<'_>,
///         buf: &[u8],
///     ) -> Poll<std::io::Result<usize>> {
///         Poll::Ready(Ok(buf.len()))
///     }
///
///     fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
///         Poll::Ready(Ok(()))
///     }
///
///     fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
///         Poll::Ready(Ok(()))
///     }
/// }
/// ```
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Returns metadata about this transport.
    ///
    /// Wrapping transports should forward the metadata of the stream they
    /// wrap.
    fn metadata(&self) -> &TransportMetadata;
}

/// A type-erased transport.
pub type BoxedTransport = Box<dyn Transport>;

impl Transport for BoxedTransport {
    fn metadata(&self) -> &TransportMetadata {
        (**self).metadata()
    }
}
