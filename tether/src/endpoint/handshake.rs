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

//! Handshake sequences.
//!
//! ```text
//!   server                               client
//!   ------ Server(HANDSHAKE) ---------->
//!   <----- Client(HANDSHAKE) -----------
//!          (reserve random id)
//!   ------ ClientId(id) --------------->
//!          (connection_init hooks, optional negotiation traffic)
//!   ------ Server(CONNECTED) ---------->   or REJECT_CONNECTION / ERROR_CONNECTION
//! ```
//!
//! The server's final `CONNECTED` is written by the server itself, after the
//! connection has been registered, so that no other task can write to the
//! client before it.

use crate::endpoint::{
    BoxError, ClientHooks, ClientRegistry, HandshakeError, IdAllocator, Negotiation, Registered,
    Reservation, ServerHooks,
};
use crate::error::panic_message;
use crate::protocol::{ClientCommand, ClientId, Command, Packet, Payload, ServerCommand};
use crate::serialization::{ObjectReader, ObjectWriter, Serializer};
use crate::transport::BoxedTransport;
use futures_util::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::io::{ReadHalf, WriteHalf};
use tracing::{debug, instrument};

/// Packet reader over the read half of a transport.
pub type TransportReader<S> = ObjectReader<S, ReadHalf<BoxedTransport>>;

/// Packet writer over the write half of a transport.
pub type TransportWriter<S> = ObjectWriter<S, WriteHalf<BoxedTransport>>;

/// Splits a transport into a packet reader and writer.
pub fn open_streams<S: Serializer>(
    serializer: &Arc<S>,
    transport: BoxedTransport,
    max_frame_size: u32,
) -> (TransportReader<S>, TransportWriter<S>) {
    let (read_half, write_half) = tokio::io::split(transport);
    (
        ObjectReader::new(serializer.clone(), read_half, max_frame_size),
        ObjectWriter::new(serializer.clone(), write_half, max_frame_size),
    )
}

/// Access to the raw streams during `connection_init`.
///
/// Values exchanged here travel as ordinary message packets of whatever
/// type the two hooks agree on.
pub struct Negotiator<'a, S: Serializer> {
    reader: &'a mut TransportReader<S>,
    writer: &'a mut TransportWriter<S>,
}

impl<'a, S: Serializer> Negotiator<'a, S> {
    pub(crate) fn new(reader: &'a mut TransportReader<S>, writer: &'a mut TransportWriter<S>) -> Self {
        Self { reader, writer }
    }

    /// Sends one value to the peer and flushes it.
    pub async fn send<T>(&mut self, value: &T) -> Result<(), HandshakeError>
    where
        T: Serialize + Sync,
    {
        self.writer.write_packet(&Packet::Message(value)).await?;
        self.writer.force().await?;
        Ok(())
    }

    /// Receives one value from the peer.
    ///
    /// # Errors
    ///
    /// A `REJECT_CONNECTION` or `ERROR_CONNECTION` from the server arrives as
    /// [`HandshakeError::Rejected`] or [`HandshakeError::ServerError`].
    pub async fn recv<T>(&mut self) -> Result<T, HandshakeError>
    where
        T: DeserializeOwned,
    {
        match self.reader.read_packet::<T>().await? {
            Packet::Message(value) => Ok(value),
            Packet::Command(cmd) => Err(verdict(cmd, "negotiation message")),
            other => Err(HandshakeError::UnexpectedPacket {
                expected: "negotiation message".to_string(),
                found: describe(&other),
            }),
        }
    }
}

/// Short description of a packet for error messages.
pub(crate) fn describe<M>(packet: &Packet<M>) -> String {
    match packet {
        Packet::Command(cmd) => cmd.to_string(),
        Packet::ClientId(id) => id.to_string(),
        Packet::Message(_) => "application message".to_string(),
    }
}

fn verdict(cmd: Command, expected: &str) -> HandshakeError {
    match cmd {
        Command::Server(ServerCommand::RejectConnection) => HandshakeError::Rejected,
        Command::Server(ServerCommand::ErrorConnection) => HandshakeError::ServerError,
        other => HandshakeError::UnexpectedPacket {
            expected: expected.to_string(),
            found: other.to_string(),
        },
    }
}

async fn negotiate<F>(hook: F) -> Result<(), HandshakeError>
where
    F: Future<Output = Result<Negotiation, BoxError>>,
{
    match AssertUnwindSafe(hook).catch_unwind().await {
        Ok(Ok(Negotiation::Accept)) => Ok(()),
        Ok(Ok(Negotiation::Reject)) => Err(HandshakeError::Rejected),
        Ok(Err(error)) => match error.downcast::<HandshakeError>() {
            Ok(handshake) => Err(*handshake),
            Err(other) => Err(HandshakeError::Hook(other)),
        },
        Err(payload) => Err(HandshakeError::HookPanicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Runs the server side up to, not including, `CONNECTED`.
///
/// On success the assigned ID comes back as a [`Reservation`] in `registry`
/// for the caller to activate. On failure, or if the future is dropped,
/// nothing stays reserved; the caller should answer with
/// [`HandshakeError::reply`] before closing.
#[instrument(skip_all)]
pub async fn server_handshake<'r, S, M, C>(
    reader: &mut TransportReader<S>,
    writer: &mut TransportWriter<S>,
    allocator: &IdAllocator,
    registry: &'r ClientRegistry<C>,
    hooks: &dyn ServerHooks<S, M>,
) -> Result<Reservation<'r, C>, HandshakeError>
where
    S: Serializer,
    M: Payload,
    C: Registered,
{
    writer.send_command(ServerCommand::Handshake).await?;

    match reader.read_packet::<M>().await? {
        Packet::Command(cmd) if cmd.is_client(ClientCommand::Handshake) => {}
        other => {
            return Err(HandshakeError::expected(
                ClientCommand::Handshake,
                describe(&other),
            ));
        }
    }

    let reservation = Reservation::new(registry, allocator.allocate(registry)?);
    assign(reservation.id(), reader, writer, hooks).await?;

    debug!(client_id = %reservation.id(), "server handshake negotiated");
    Ok(reservation)
}

async fn assign<S, M>(
    id: ClientId,
    reader: &mut TransportReader<S>,
    writer: &mut TransportWriter<S>,
    hooks: &dyn ServerHooks<S, M>,
) -> Result<(), HandshakeError>
where
    S: Serializer,
    M: Payload,
{
    writer.write_client_id(id).await?;
    writer.force().await?;

    let mut negotiator = Negotiator::new(reader, writer);
    negotiate(hooks.connection_init(id, &mut negotiator)).await
}

/// Runs the whole client side, ending with the server's verdict.
#[instrument(skip_all)]
pub async fn client_handshake<S, M>(
    reader: &mut TransportReader<S>,
    writer: &mut TransportWriter<S>,
    hooks: &dyn ClientHooks<S, M>,
) -> Result<ClientId, HandshakeError>
where
    S: Serializer,
    M: Payload,
{
    match reader.read_packet::<M>().await {
        Ok(Packet::Command(cmd)) if cmd.is_server(ServerCommand::Handshake) => {}
        Ok(other) => {
            return Err(HandshakeError::UnknownServer {
                found: describe(&other),
            });
        }
        Err(error) if error.is_disconnect() => return Err(error.into()),
        Err(error) => {
            return Err(HandshakeError::UnknownServer {
                found: error.to_string(),
            });
        }
    }

    writer.send_command(ClientCommand::Handshake).await?;

    let id = match reader.read_packet::<M>().await? {
        Packet::ClientId(id) if id.is_assigned() => id,
        Packet::Command(cmd) => return Err(verdict(cmd, "client id")),
        other => {
            return Err(HandshakeError::UnexpectedPacket {
                expected: "client id".to_string(),
                found: describe(&other),
            });
        }
    };
    debug!(client_id = %id, "assigned by server");

    {
        let mut negotiator = Negotiator::new(reader, writer);
        negotiate(hooks.connection_init(id, &mut negotiator)).await?;
    }

    match reader.read_packet::<M>().await? {
        Packet::Command(cmd) if cmd.is_server(ServerCommand::Connected) => Ok(id),
        Packet::Command(cmd) => Err(verdict(cmd, &ServerCommand::Connected.to_string())),
        other => Err(HandshakeError::expected(
            ServerCommand::Connected,
            describe(&other),
        )),
    }
}
