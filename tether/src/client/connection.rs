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

//! Read and dispatch loops for the client's single connection.

use crate::client::ClientInner;
use crate::endpoint::guarded;
use crate::endpoint::handshake::TransportReader;
use crate::error::TetherError;
use crate::protocol::{Item, Packet, Payload, ServerCommand};
use crate::serialization::Serializer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Decodes packets from the server onto the inbound queue.
///
/// Any read failure ends the loop and shuts the client down.
pub(super) async fn read_loop<S, M>(
    client: Arc<ClientInner<S, M>>,
    mut reader: TransportReader<S>,
    inbound: mpsc::UnboundedSender<Packet<M>>,
) where
    S: Serializer,
    M: Payload,
{
    loop {
        let packet = tokio::select! {
            _ = client.lifecycle.stopped() => break,
            packet = reader.read_packet::<M>() => packet,
        };

        match packet {
            Ok(packet) => {
                if inbound.send(packet).is_err() {
                    break;
                }
            }
            Err(error) if error.is_disconnect() => {
                debug!(%error, "server stream closed");
                break;
            }
            Err(error) => {
                warn!(%error, "failed to read from server");
                break;
            }
        }
    }

    client.shut_down().await;
}

pub(super) async fn dispatch_loop<S, M>(
    client: Arc<ClientInner<S, M>>,
    mut receiver: mpsc::UnboundedReceiver<Packet<M>>,
) where
    S: Serializer,
    M: Payload,
{
    loop {
        let packet = tokio::select! {
            biased;
            _ = client.lifecycle.stopped() => break,
            next = receiver.recv() => match next {
                Some(packet) => packet,
                None => break,
            },
        };

        if let Err(error) = dispatch(&client, packet).await {
            client.raise(error);
            break;
        }
    }
    debug!("client dispatch loop stopped");
}

async fn dispatch<S, M>(inner: &ClientInner<S, M>, packet: Packet<M>) -> Result<(), TetherError>
where
    S: Serializer,
    M: Payload,
{
    let item = match Item::try_from(packet) {
        Ok(item) => item,
        Err(stray) => {
            warn!(%stray, "ignoring client id sent after the handshake");
            return Ok(());
        }
    };

    match item {
        Item::Command(command) => {
            let disconnected = command.is_server(ServerCommand::Disconnected);
            let filtered = guarded("command_received_init", || {
                inner.hooks.command_received_init(command)
            })?;
            match filtered {
                Some(command) => inner
                    .listeners
                    .notify("command_received", |l| l.command_received(&command))?,
                None => trace!("inbound command dropped by filter"),
            }
            if disconnected {
                debug!("server closed the connection");
                inner.shut_down().await;
            }
        }
        Item::Message(message) => {
            let filtered = guarded("message_received_init", || {
                inner.hooks.message_received_init(message)
            })?;
            match filtered {
                Some(message) => inner
                    .listeners
                    .notify("message_received", |l| l.message_received(&message))?,
                None => trace!("inbound message dropped by filter"),
            }
        }
    }
    Ok(())
}
