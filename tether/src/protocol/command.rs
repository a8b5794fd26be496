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

//! Control vocabulary exchanged between servers and clients.
//!
//! Commands travel over the same connection as application messages but are
//! classified separately by the dispatch loop. The fixed tokens below drive
//! the handshake and teardown; [`Command::Custom`] is left to applications.
//!
//! # Handshake Order
//!
//! ```text
//! Server                           Client
//!   | --- Server(Handshake) ------->  |
//!   | <-- Client(Handshake) --------  |
//!   | --- ClientId(n) ------------->  |
//!   |     (negotiation hooks)         |
//!   | --- Server(Connected) ------->  |   or RejectConnection / ErrorConnection
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Control tokens sent by a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerCommand {
    /// Greeting; the server expects the client's handshake in reply.
    Handshake,
    /// Handshake and negotiation succeeded.
    Connected,
    /// The negotiation hook rejected the client.
    RejectConnection,
    /// A protocol or I/O fault occurred during the handshake or a read.
    ErrorConnection,
    /// The server is tearing down this connection.
    Disconnected,
}

/// Control tokens sent by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientCommand {
    /// Acknowledgement of the server's greeting.
    Handshake,
    /// The client requests its own disconnection.
    Disconnect,
}

/// A control-plane payload.
///
/// # Examples
///
/// ```rust
/// use tether::{ClientCommand, Command, ServerCommand};
///
/// let cmd: Command = ServerCommand::Connected.into();
/// assert!(cmd.is_server(ServerCommand::Connected));
/// assert!(!cmd.is_client(ClientCommand::Handshake));
///
/// let custom = Command::custom("refresh-roster");
/// assert!(custom.is_custom());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// A token from the server vocabulary.
    Server(ServerCommand),
    /// A token from the client vocabulary.
    Client(ClientCommand),
    /// An application-defined control signal. The framework never acts on
    /// these; they are only routed to command listeners.
    Custom(String),
}

impl Command {
    /// Creates an application-defined command.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Returns `true` if this is exactly the given server token.
    #[must_use]
    pub fn is_server(&self, token: ServerCommand) -> bool {
        matches!(self, Self::Server(t) if *t == token)
    }

    /// Returns `true` if this is exactly the given client token.
    #[must_use]
    pub fn is_client(&self, token: ClientCommand) -> bool {
        matches!(self, Self::Client(t) if *t == token)
    }

    /// Returns `true` for application-defined commands.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl From<ServerCommand> for Command {
    fn from(token: ServerCommand) -> Self {
        Self::Server(token)
    }
}

impl From<ClientCommand> for Command {
    fn from(token: ClientCommand) -> Self {
        Self::Client(token)
    }
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Handshake => "HANDSHAKE",
            Self::Connected => "CONNECTED",
            Self::RejectConnection => "REJECT_CONNECTION",
            Self::ErrorConnection => "ERROR_CONNECTION",
            Self::Disconnected => "DISCONNECTED",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Handshake => "HANDSHAKE",
            Self::Disconnect => "DISCONNECT",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(token) => write!(f, "server:{}", token),
            Self::Client(token) => write!(f, "client:{}", token),
            Self::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_and_client_handshake_are_distinct() {
        let server: Command = ServerCommand::Handshake.into();
        let client: Command = ClientCommand::Handshake.into();
        assert_ne!(server, client);
        assert!(server.is_server(ServerCommand::Handshake));
        assert!(!server.is_client(ClientCommand::Handshake));
        assert!(client.is_client(ClientCommand::Handshake));
    }

    #[test]
    fn test_display_uses_wire_names() {
        assert_eq!(
            Command::from(ServerCommand::RejectConnection).to_string(),
            "server:REJECT_CONNECTION"
        );
        assert_eq!(
            Command::from(ClientCommand::Disconnect).to_string(),
            "client:DISCONNECT"
        );
        assert_eq!(Command::custom("ping").to_string(), "custom:ping");
    }
}
