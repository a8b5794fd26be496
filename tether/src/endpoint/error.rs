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

//! Handshake error types.

use crate::protocol::{Command, ServerCommand};
use crate::serialization::StreamError;
use crate::transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by negotiation hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reasons a single connection attempt failed before being promoted.
///
/// A handshake failure only ever affects the one socket it happened on. The
/// exception is [`HandshakeError::HookPanicked`], which indicates a broken
/// hook implementation and brings down the whole server or client.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// The first packet from the server was not its greeting.
    #[error("unknown server: expected handshake, got {found}")]
    UnknownServer {
        /// Description of what arrived instead
        found: String,
    },

    /// The peer sent something out of sequence.
    #[error("unexpected packet: expected {expected}, got {found}")]
    UnexpectedPacket {
        /// The token or packet kind that was required
        expected: String,
        /// Description of what arrived instead
        found: String,
    },

    /// The connection was refused by a negotiation hook on either side.
    #[error("connection rejected")]
    Rejected,

    /// The server reported a fault while handling the handshake.
    #[error("server reported a connection error")]
    ServerError,

    /// No free identifier was found within the retry budget.
    #[error("no free client id after {attempts} attempts")]
    IdsExhausted {
        /// Number of random draws that collided
        attempts: usize,
    },

    /// A negotiation hook returned an error.
    #[error("negotiation failed: {0}")]
    Hook(#[source] BoxError),

    /// A negotiation hook panicked.
    #[error("negotiation hook panicked: {message}")]
    HookPanicked {
        /// Panic payload, if it was a string
        message: String,
    },

    /// The server or client stopped while the handshake was in flight.
    #[error("endpoint is shutting down")]
    ShuttingDown,

    /// The handshake did not finish in time.
    #[error("handshake timed out after {duration:?}")]
    Timeout {
        /// The configured handshake timeout
        duration: Duration,
    },

    /// Reading or writing a packet failed.
    #[error(transparent)]
    Stream(#[from] StreamError),

    /// The socket could not be established.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl HandshakeError {
    /// Builds an [`HandshakeError::UnexpectedPacket`] for a missing token.
    pub fn expected(command: impl Into<Command>, found: impl Into<String>) -> Self {
        Self::UnexpectedPacket {
            expected: command.into().to_string(),
            found: found.into(),
        }
    }

    /// Returns `true` if the failure must shut down the whole endpoint.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::HookPanicked { .. })
    }

    /// Returns the token a server sends before closing a failed attempt.
    ///
    /// Protocol violations and rejections get `REJECT_CONNECTION`; faults get
    /// `ERROR_CONNECTION`. Nothing is sent if the server itself is stopping.
    pub fn reply(&self) -> Option<ServerCommand> {
        match self {
            Self::UnknownServer { .. } | Self::UnexpectedPacket { .. } | Self::Rejected => {
                Some(ServerCommand::RejectConnection)
            }
            Self::ShuttingDown => None,
            _ => Some(ServerCommand::ErrorConnection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ClientCommand;
    use std::io;

    #[test]
    fn test_expected_display() {
        let error = HandshakeError::expected(ClientCommand::Handshake, "Client(4)");
        assert_eq!(
            error.to_string(),
            "unexpected packet: expected client:HANDSHAKE, got Client(4)"
        );
    }

    #[test]
    fn test_reply_tokens() {
        assert_eq!(
            HandshakeError::Rejected.reply(),
            Some(ServerCommand::RejectConnection)
        );
        assert_eq!(
            HandshakeError::expected(ClientCommand::Handshake, "garbage").reply(),
            Some(ServerCommand::RejectConnection)
        );
        assert_eq!(
            HandshakeError::IdsExhausted { attempts: 3 }.reply(),
            Some(ServerCommand::ErrorConnection)
        );
        assert_eq!(
            HandshakeError::Stream(StreamError::Io(io::Error::other("boom"))).reply(),
            Some(ServerCommand::ErrorConnection)
        );
        assert_eq!(HandshakeError::ShuttingDown.reply(), None);
    }

    #[test]
    fn test_only_panics_are_fatal() {
        assert!(
            HandshakeError::HookPanicked {
                message: "bug".to_string()
            }
            .is_fatal()
        );
        assert!(!HandshakeError::Hook("nope".into()).is_fatal());
        assert!(!HandshakeError::Rejected.is_fatal());
    }
}
