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

//! Server-side view of one connected client.

use crate::endpoint::handshake::{TransportReader, TransportWriter};
use crate::endpoint::{Lifecycle, Registered, guarded};
use crate::protocol::{ClientId, Command, Item, Packet, Payload, ServerCommand};
use crate::serialization::Serializer;
use crate::server::ServerInner;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, trace, warn};

/// One accepted, handshaken connection.
///
/// Handles are created by the server once the handshake succeeds and live in
/// its registry until the connection shuts down. Each handle has its own
/// lifecycle, independent of the server's: shutting a handle down with
/// [`ClientHandle::local_shut_down`] leaves every other client connected.
pub struct ClientHandle<S: Serializer, M: Payload> {
    id: ClientId,
    peer_addr: Option<SocketAddr>,
    lifecycle: Lifecycle,
    writer: Mutex<TransportWriter<S>>,
    server: Weak<ServerInner<S, M>>,
}

impl<S: Serializer, M: Payload> ClientHandle<S, M> {
    pub(crate) fn new(
        id: ClientId,
        peer_addr: Option<SocketAddr>,
        writer: TransportWriter<S>,
        server: Weak<ServerInner<S, M>>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            lifecycle: Lifecycle::new(),
            writer: Mutex::new(writer),
            server,
        }
    }

    /// The ID assigned to this client during the handshake.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Remote address of the connection, if known.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Returns `true` while the connection is up.
    pub fn local_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub(crate) fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub(crate) fn writer(&self) -> &Mutex<TransportWriter<S>> {
        &self.writer
    }

    /// Sends one message to this client.
    ///
    /// Returns `false` without side effects if the connection is not running
    /// or the outbound filter vetoes the message, and `false` if the write
    /// fails. A failed write does not shut the connection down; the read
    /// side notices a dead peer on its own.
    pub async fn send(&self, message: M) -> bool {
        self.transmit(Item::Message(message)).await
    }

    /// Sends a control command to this client.
    pub async fn send_command(&self, command: impl Into<Command>) -> bool {
        self.transmit(Item::Command(command.into())).await
    }

    async fn transmit(&self, item: Item<M>) -> bool {
        if !self.lifecycle.is_running() {
            return false;
        }
        let Some(server) = self.server.upgrade() else {
            return false;
        };

        let item = match guarded("send_init", || server.hooks.send_init(self.id, item)) {
            Ok(Some(item)) => item,
            Ok(None) => {
                trace!(client_id = %self.id, "outbound item dropped by filter");
                return false;
            }
            Err(error) => {
                server.raise(error);
                return false;
            }
        };

        {
            let mut writer = self.writer.lock().await;
            if !self.lifecycle.is_running() {
                return false;
            }
            if let Err(error) = writer.send_packet(&item.as_packet()).await {
                debug!(client_id = %self.id, %error, "send failed");
                return false;
            }
        }

        let notified = match &item {
            Item::Command(command) => server
                .listeners
                .notify("command_sent", |l| l.command_sent(self.id, command)),
            Item::Message(message) => server
                .listeners
                .notify("message_sent", |l| l.message_sent(self.id, message)),
        };
        if let Err(error) = notified {
            server.raise(error);
        }
        true
    }

    /// Disconnects this client only.
    ///
    /// The first call sends `DISCONNECTED`, closes the stream, removes the
    /// client from the registry and, if the connection was running, runs the
    /// disconnection hook and `client_disconnected` listeners. Later and
    /// concurrent calls return immediately.
    pub async fn local_shut_down(&self) {
        let Some(was_running) = self.lifecycle.begin_shutdown() else {
            return;
        };

        {
            let mut writer = self.writer.lock().await;
            if was_running {
                let _ = writer.send_command(ServerCommand::Disconnected).await;
            }
            let _ = writer.close().await;
        }

        if let Some(server) = self.server.upgrade() {
            server.registry.remove(self.id, self);
            if was_running {
                server.client_gone(self.id).await;
            }
        }

        self.lifecycle.finish_shutdown();
    }
}

impl<S: Serializer, M: Payload> Registered for ClientHandle<S, M> {
    fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }
}

impl<S: Serializer, M: Payload> fmt::Debug for ClientHandle<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("running", &self.lifecycle.is_running())
            .finish()
    }
}

/// Decodes packets from one client onto the server's inbound queue.
///
/// Ends when the connection is shut down, the peer goes away, or a packet
/// cannot be decoded; in every case the handle is shut down afterwards.
pub(crate) async fn read_loop<S, M>(
    handle: Arc<ClientHandle<S, M>>,
    mut reader: TransportReader<S>,
    inbound: mpsc::UnboundedSender<(ClientId, Packet<M>)>,
) where
    S: Serializer,
    M: Payload,
{
    let id = handle.id();
    loop {
        let packet = tokio::select! {
            _ = handle.lifecycle.stopped() => break,
            packet = reader.read_packet::<M>() => packet,
        };

        match packet {
            Ok(packet) => {
                if inbound.send((id, packet)).is_err() {
                    break;
                }
            }
            Err(error) if error.is_disconnect() => {
                debug!(client_id = %id, %error, "client stream closed");
                break;
            }
            Err(error) => {
                warn!(client_id = %id, %error, "failed to read from client");
                if handle.lifecycle.is_running() {
                    let mut writer = handle.writer.lock().await;
                    let _ = writer.send_command(ServerCommand::ErrorConnection).await;
                }
                break;
            }
        }
    }

    handle.local_shut_down().await;
}
