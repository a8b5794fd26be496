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

//! Length-prefixed framing.
//!
//! Each packet travels as one frame: a 4-byte big-endian length followed by
//! that many payload bytes.
//!
//! ```text
//! +------------------+-------------------+
//! | Length (4 bytes) | Payload (N bytes) |
//! +------------------+-------------------+
//! ```
//!
//! # Examples
//!
//! ```rust
//! use tether::serialization::framing::{read_frame, write_frame, MAX_FRAME_SIZE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut buffer = Vec::new();
//! write_frame(&mut buffer, b"Hello", MAX_FRAME_SIZE).await?;
//! assert_eq!(&buffer[..4], &5u32.to_be_bytes());
//!
//! let mut reader = &buffer[..];
//! let frame = read_frame(&mut reader, MAX_FRAME_SIZE).await?;
//! assert_eq!(frame, b"Hello");
//! # Ok(())
//! # }
//! ```

use crate::serialization::StreamError;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default maximum frame size (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Size of the frame length header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Writes one length-prefixed frame.
///
/// The writer is not flushed; callers batch a flush per packet.
///
/// # Errors
///
/// Returns [`StreamError::FrameTooLarge`] if `payload` exceeds `max_frame_size`,
/// or [`StreamError::Io`] if the write fails.
pub async fn write_frame<W>(
    writer: &mut W,
    payload: &[u8],
    max_frame_size: u32,
) -> Result<(), StreamError>
where
    W: AsyncWrite + Unpin,
{
    let len = payload.len();
    if len > max_frame_size as usize {
        return Err(StreamError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }

    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(payload).await?;
    Ok(())
}

/// Reads one length-prefixed frame.
///
/// # Errors
///
/// - [`StreamError::Closed`] if the stream ends before the first header byte
/// - [`StreamError::FrameTooLarge`] if the header exceeds `max_frame_size`
/// - [`StreamError::Io`] if the stream fails or ends mid-frame
pub async fn read_frame<R>(reader: &mut R, max_frame_size: u32) -> Result<Vec<u8>, StreamError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];

    // A clean close can only happen on a frame boundary
    let first = reader.read(&mut header).await?;
    if first == 0 {
        return Err(StreamError::Closed);
    }
    if first < FRAME_HEADER_SIZE {
        reader.read_exact(&mut header[first..]).await?;
    }

    let len = u32::from_be_bytes(header);
    if len > max_frame_size {
        return Err(StreamError::FrameTooLarge {
            size: len as usize,
            max: max_frame_size,
        });
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            StreamError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream ended inside a {} byte frame", len),
            ))
        } else {
            StreamError::Io(e)
        }
    })?;

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_layout() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"Hello, world!", MAX_FRAME_SIZE)
            .await
            .unwrap();

        assert_eq!(&buffer[0..4], &13u32.to_be_bytes());
        assert_eq!(&buffer[4..], b"Hello, world!");
    }

    #[tokio::test]
    async fn test_consecutive_frames() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"one", MAX_FRAME_SIZE).await.unwrap();
        write_frame(&mut buffer, b"", MAX_FRAME_SIZE).await.unwrap();
        write_frame(&mut buffer, b"three", MAX_FRAME_SIZE).await.unwrap();

        let mut reader = &buffer[..];
        assert_eq!(read_frame(&mut reader, MAX_FRAME_SIZE).await.unwrap(), b"one");
        assert!(read_frame(&mut reader, MAX_FRAME_SIZE).await.unwrap().is_empty());
        assert_eq!(read_frame(&mut reader, MAX_FRAME_SIZE).await.unwrap(), b"three");
        assert!(matches!(
            read_frame(&mut reader, MAX_FRAME_SIZE).await,
            Err(StreamError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_write_rejects_oversized_frame() {
        let mut buffer = Vec::new();
        let result = write_frame(&mut buffer, &[0u8; 9], 8).await;
        assert!(matches!(
            result,
            Err(StreamError::FrameTooLarge { size: 9, max: 8 })
        ));
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_header() {
        let data = 1024u32.to_be_bytes();
        let mut reader = &data[..];
        let result = read_frame(&mut reader, 16).await;
        assert!(matches!(result, Err(StreamError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_truncated_frame_is_not_a_clean_close() {
        let mut data = Vec::new();
        data.extend_from_slice(&10u32.to_be_bytes());
        data.extend_from_slice(b"abc");

        let mut reader = &data[..];
        let error = read_frame(&mut reader, MAX_FRAME_SIZE).await.unwrap_err();
        assert!(matches!(error, StreamError::Io(_)));
        assert!(error.is_disconnect());
    }
}
