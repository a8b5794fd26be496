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

//! Wire units and their classification.

use crate::protocol::{ClientId, Command};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bound satisfied by every application message type.
///
/// Blanket-implemented for anything serde can round-trip that can also be
/// shared across tasks.
pub trait Payload: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// One logical unit on the wire.
///
/// Every frame carries exactly one packet. `ClientId` only ever appears once,
/// during the handshake, between the client's greeting and the server's
/// verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet<M> {
    /// A control token.
    Command(Command),
    /// The identifier assigned by the server.
    ClientId(ClientId),
    /// An application message.
    Message(M),
}

/// A classified unit of application traffic: either a [`Command`] or an
/// opaque message.
///
/// Items are what the dispatch loop hands to filters and listeners and what
/// the send path accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Item<M> {
    /// A control-plane payload.
    Command(Command),
    /// An application payload.
    Message(M),
}

impl<M> Item<M> {
    /// Returns `true` for commands.
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    /// Borrows this item as a wire packet without cloning the payload.
    pub fn as_packet(&self) -> Packet<&M> {
        match self {
            Self::Command(cmd) => Packet::Command(cmd.clone()),
            Self::Message(msg) => Packet::Message(msg),
        }
    }
}

impl<M> From<Command> for Item<M> {
    fn from(cmd: Command) -> Self {
        Self::Command(cmd)
    }
}

impl<M> TryFrom<Packet<M>> for Item<M> {
    type Error = ClientId;

    /// Classifies a decoded packet; a stray `ClientId` is returned as the error.
    fn try_from(packet: Packet<M>) -> Result<Self, Self::Error> {
        match packet {
            Packet::Command(cmd) => Ok(Self::Command(cmd)),
            Packet::Message(msg) => Ok(Self::Message(msg)),
            Packet::ClientId(id) => Err(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerCommand;

    #[test]
    fn test_classification() {
        let cmd: Item<String> = Packet::Command(ServerCommand::Connected.into())
            .try_into()
            .unwrap();
        assert!(cmd.is_command());

        let msg: Item<String> = Packet::Message("hi".to_string()).try_into().unwrap();
        assert_eq!(msg, Item::Message("hi".to_string()));

        let stray: Result<Item<String>, _> = Packet::ClientId(ClientId::from(5)).try_into();
        assert_eq!(stray, Err(ClientId::from(5)));
    }

    #[test]
    fn test_as_packet_borrows_message() {
        let item = Item::Message(vec![1u8, 2, 3]);
        match item.as_packet() {
            Packet::Message(bytes) => assert_eq!(bytes, &vec![1u8, 2, 3]),
            other => panic!("unexpected packet: {:?}", other),
        }
    }
}
