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

//! Object streams: one [`Packet`] per frame.
//!
//! An [`ObjectWriter`] and an [`ObjectReader`] wrap the two halves of a
//! transport. Writes are buffered until [`ObjectWriter::force`], which
//! flushes the transport and resets the serializer's reference cache.

use crate::protocol::{ClientId, Command, Packet};
use crate::serialization::framing::{read_frame, write_frame};
use crate::serialization::{Serializer, StreamError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Decodes packets from the read half of a transport.
pub struct ObjectReader<S, R> {
    serializer: Arc<S>,
    inner: R,
    max_frame_size: u32,
}

impl<S, R> ObjectReader<S, R>
where
    S: Serializer,
    R: AsyncRead + Unpin,
{
    /// Wraps `inner`, decoding with `serializer`.
    pub fn new(serializer: Arc<S>, inner: R, max_frame_size: u32) -> Self {
        Self {
            serializer,
            inner,
            max_frame_size,
        }
    }

    /// Reads and decodes the next packet.
    ///
    /// # Errors
    ///
    /// [`StreamError::Closed`] on a clean end of stream, [`StreamError::Decode`]
    /// if the frame holds something other than a `Packet<M>`, or an I/O error.
    pub async fn read_packet<M>(&mut self) -> Result<Packet<M>, StreamError>
    where
        M: DeserializeOwned,
    {
        let frame = read_frame(&mut self.inner, self.max_frame_size).await?;
        Ok(self.serializer.deserialize(&frame)?)
    }

    /// Consumes the reader, returning the wrapped stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Encodes packets onto the write half of a transport.
pub struct ObjectWriter<S, W> {
    serializer: Arc<S>,
    inner: W,
    max_frame_size: u32,
}

impl<S, W> ObjectWriter<S, W>
where
    S: Serializer,
    W: AsyncWrite + Unpin,
{
    /// Wraps `inner`, encoding with `serializer`.
    pub fn new(serializer: Arc<S>, inner: W, max_frame_size: u32) -> Self {
        Self {
            serializer,
            inner,
            max_frame_size,
        }
    }

    /// Encodes one packet. Nothing is guaranteed to reach the peer until
    /// [`force`](Self::force).
    pub async fn write_packet<M>(&mut self, packet: &Packet<M>) -> Result<(), StreamError>
    where
        M: Serialize,
    {
        let bytes = self.serializer.serialize(packet)?;
        write_frame(&mut self.inner, &bytes, self.max_frame_size).await
    }

    /// Encodes a control token.
    pub async fn write_command(&mut self, command: impl Into<Command>) -> Result<(), StreamError> {
        self.write_packet(&Packet::<()>::Command(command.into()))
            .await
    }

    /// Encodes a client identifier.
    pub async fn write_client_id(&mut self, id: ClientId) -> Result<(), StreamError> {
        self.write_packet(&Packet::<()>::ClientId(id)).await
    }

    /// Flushes buffered bytes and resets the serializer's reference cache.
    pub async fn force(&mut self) -> Result<(), StreamError> {
        self.inner.flush().await?;
        self.serializer.reset();
        Ok(())
    }

    /// Writes a packet and forces it out.
    pub async fn send_packet<M>(&mut self, packet: &Packet<M>) -> Result<(), StreamError>
    where
        M: Serialize,
    {
        self.write_packet(packet).await?;
        self.force().await
    }

    /// Writes a control token and forces it out.
    pub async fn send_command(&mut self, command: impl Into<Command>) -> Result<(), StreamError> {
        self.write_command(command).await?;
        self.force().await
    }

    /// Shuts down the write half. The peer sees end of stream.
    pub async fn close(&mut self) -> Result<(), StreamError> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientCommand, ServerCommand};
    use crate::serialization::{DeserializationError, PostcardSerializer, SerializationError};
    use crate::transport::MemoryTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pair() -> (
        ObjectWriter<PostcardSerializer, MemoryTransport>,
        ObjectReader<PostcardSerializer, MemoryTransport>,
    ) {
        let serializer = Arc::new(PostcardSerializer::default());
        let (a, b) = MemoryTransport::pair_default();
        (
            ObjectWriter::new(serializer.clone(), a, 1024),
            ObjectReader::new(serializer, b, 1024),
        )
    }

    #[tokio::test]
    async fn test_packets_arrive_in_order() {
        let (mut writer, mut reader) = pair();

        writer.write_command(ServerCommand::Handshake).await.unwrap();
        writer.write_client_id(ClientId::from(7)).await.unwrap();
        writer
            .write_packet(&Packet::Message("payload".to_string()))
            .await
            .unwrap();
        writer.force().await.unwrap();

        assert_eq!(
            reader.read_packet::<String>().await.unwrap(),
            Packet::Command(ServerCommand::Handshake.into())
        );
        assert_eq!(
            reader.read_packet::<String>().await.unwrap(),
            Packet::ClientId(ClientId::from(7))
        );
        assert_eq!(
            reader.read_packet::<String>().await.unwrap(),
            Packet::Message("payload".to_string())
        );
    }

    #[tokio::test]
    async fn test_close_is_seen_as_clean_end() {
        let (mut writer, mut reader) = pair();
        writer.send_command(ClientCommand::Disconnect).await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(
            reader.read_packet::<String>().await.unwrap(),
            Packet::Command(ClientCommand::Disconnect.into())
        );
        assert!(matches!(
            reader.read_packet::<String>().await,
            Err(StreamError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_wrong_payload_type_is_decode_error() {
        let (mut writer, mut reader) = pair();
        writer
            .write_packet(&Packet::Message(vec![9u64; 4]))
            .await
            .unwrap();
        writer.force().await.unwrap();

        let result = reader.read_packet::<bool>().await;
        assert!(matches!(result, Err(StreamError::Decode(_))));
    }

    struct CountingSerializer {
        inner: PostcardSerializer,
        resets: AtomicUsize,
    }

    impl Serializer for CountingSerializer {
        fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
        where
            T: serde::Serialize + ?Sized,
        {
            self.inner.serialize(value)
        }

        fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
        where
            T: serde::de::DeserializeOwned,
        {
            self.inner.deserialize(bytes)
        }

        fn name(&self) -> &'static str {
            "counting"
        }

        fn reset(&self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_force_resets_serializer() {
        let serializer = Arc::new(CountingSerializer {
            inner: PostcardSerializer::default(),
            resets: AtomicUsize::new(0),
        });
        let (a, _b) = MemoryTransport::pair_default();
        let mut writer = ObjectWriter::new(serializer.clone(), a, 1024);

        writer.write_command(ServerCommand::Connected).await.unwrap();
        assert_eq!(serializer.resets.load(Ordering::SeqCst), 0);

        writer.force().await.unwrap();
        writer.send_command(ServerCommand::Disconnected).await.unwrap();
        assert_eq!(serializer.resets.load(Ordering::SeqCst), 2);
    }
}
