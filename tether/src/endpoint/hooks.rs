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

//! Override points for servers and clients.
//!
//! Hooks are strategy objects supplied at construction. Every method has an
//! identity or no-op default, so [`DefaultHooks`] is just an empty impl.

use crate::endpoint::{BoxError, Negotiator};
use crate::protocol::{ClientId, Command, Item, Payload};
use crate::serialization::Serializer;
use crate::transport::BoxedTransport;
use async_trait::async_trait;

/// Outcome of a negotiation hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiation {
    /// Promote the connection to running.
    Accept,
    /// Refuse the connection; the server answers with `REJECT_CONNECTION`.
    Reject,
}

/// Server-side override points.
///
/// # Examples
///
/// A hook that requires every client to present a shared secret after
/// receiving its ID:
///
/// ```rust
/// use async_trait::async_trait;
/// use tether::endpoint::{BoxError, Negotiation, Negotiator, ServerHooks};
/// use tether::serialization::Serializer;
/// use tether::ClientId;
///
/// struct SharedSecret(String);
///
/// #[async_trait]
/// impl<S: Serializer> ServerHooks<S, String> for SharedSecret {
///     async fn connection_init(
///         &self,
///         _id: ClientId,
///         negotiator: &mut Negotiator<'_, S>,
///     ) -> Result<Negotiation, BoxError> {
///         let offered: String = negotiator.recv().await?;
///         Ok(if offered == self.0 {
///             Negotiation::Accept
///         } else {
///             Negotiation::Reject
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait ServerHooks<S: Serializer, M: Payload>: Send + Sync + 'static {
    /// Wraps a freshly accepted socket before the first handshake byte.
    fn wrap_transport(&self, transport: BoxedTransport) -> BoxedTransport {
        transport
    }

    /// Runs after the client has been sent its ID and before `CONNECTED`.
    ///
    /// The negotiator may exchange further values with the client. An error
    /// answers the client with `ERROR_CONNECTION`.
    async fn connection_init(
        &self,
        _id: ClientId,
        _negotiator: &mut Negotiator<'_, S>,
    ) -> Result<Negotiation, BoxError> {
        Ok(Negotiation::Accept)
    }

    /// Inbound message filter. `None` drops the message silently.
    fn message_received_init(&self, _id: ClientId, message: M) -> Option<M> {
        Some(message)
    }

    /// Inbound command filter. `None` drops the command silently.
    fn command_received_init(&self, _id: ClientId, command: Command) -> Option<Command> {
        Some(command)
    }

    /// Outbound filter. `None` aborts the send, which then reports `false`.
    fn send_init(&self, _id: ClientId, item: Item<M>) -> Option<Item<M>> {
        Some(item)
    }

    /// Runs once when a running client is torn down, before listeners hear
    /// about it.
    async fn disconnection_init(&self, _id: ClientId) {}
}

/// Client-side override points. Same contract as [`ServerHooks`].
#[async_trait]
pub trait ClientHooks<S: Serializer, M: Payload>: Send + Sync + 'static {
    /// Wraps the connected socket before the first handshake byte.
    fn wrap_transport(&self, transport: BoxedTransport) -> BoxedTransport {
        transport
    }

    /// Runs after the ID arrived and before waiting for `CONNECTED`.
    ///
    /// Rejecting or failing aborts the start.
    async fn connection_init(
        &self,
        _id: ClientId,
        _negotiator: &mut Negotiator<'_, S>,
    ) -> Result<Negotiation, BoxError> {
        Ok(Negotiation::Accept)
    }

    /// Inbound message filter. `None` drops the message silently.
    fn message_received_init(&self, message: M) -> Option<M> {
        Some(message)
    }

    /// Inbound command filter. `None` drops the command silently.
    fn command_received_init(&self, command: Command) -> Option<Command> {
        Some(command)
    }

    /// Outbound filter. `None` aborts the send, which then reports `false`.
    fn send_init(&self, item: Item<M>) -> Option<Item<M>> {
        Some(item)
    }

    /// Runs once when a running client shuts down, before listeners hear
    /// about it.
    async fn disconnection_init(&self) {}
}

/// Hooks with every default left in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl<S: Serializer, M: Payload> ServerHooks<S, M> for DefaultHooks {}

impl<S: Serializer, M: Payload> ClientHooks<S, M> for DefaultHooks {}
