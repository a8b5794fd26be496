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

//! Logging support.
//!
//! [`LoggingListener`] implements both listener traits and turns every
//! callback into a `tracing` event, so connection activity shows up in
//! whatever subscriber the application installs.
//!
//! # Examples
//!
//! ```rust
//! use tether::endpoint::{ServerConfig, ServerListener};
//! use tether::observability::LoggingListener;
//! use tether::serialization::PostcardSerializer;
//! use tether::Server;
//! use std::sync::Arc;
//!
//! let server = Server::<_, String>::new(
//!     PostcardSerializer::default(),
//!     ServerConfig::new("127.0.0.1:0"),
//! );
//! server.add_listener(Arc::new(LoggingListener::new("chat")));
//! ```
//!
//! Connection events are logged at `INFO`, traffic at `DEBUG`.

use crate::endpoint::{ClientListener, ServerListener};
use crate::protocol::{ClientId, Command};
use std::fmt::Debug;
use tracing::{debug, info};

/// A listener that logs every event through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingListener {
    name: String,
}

impl LoggingListener {
    /// Creates a logging listener; `name` is attached to every event.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The name attached to every event.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new("tether")
    }
}

impl<M: Debug> ServerListener<M> for LoggingListener {
    fn client_connected(&self, id: ClientId) {
        info!(listener = %self.name, client_id = %id, "client connected");
    }

    fn client_disconnected(&self, id: ClientId) {
        info!(listener = %self.name, client_id = %id, "client disconnected");
    }

    fn message_received(&self, id: ClientId, message: &M) {
        debug!(listener = %self.name, client_id = %id, ?message, "message received");
    }

    fn command_received(&self, id: ClientId, command: &Command) {
        debug!(listener = %self.name, client_id = %id, %command, "command received");
    }

    fn message_sent(&self, id: ClientId, message: &M) {
        debug!(listener = %self.name, client_id = %id, ?message, "message sent");
    }

    fn command_sent(&self, id: ClientId, command: &Command) {
        debug!(listener = %self.name, client_id = %id, %command, "command sent");
    }
}

impl<M: Debug> ClientListener<M> for LoggingListener {
    fn connected(&self, id: ClientId) {
        info!(listener = %self.name, client_id = %id, "connected");
    }

    fn disconnected(&self) {
        info!(listener = %self.name, "disconnected");
    }

    fn message_received(&self, message: &M) {
        debug!(listener = %self.name, ?message, "message received");
    }

    fn command_received(&self, command: &Command) {
        debug!(listener = %self.name, %command, "command received");
    }

    fn message_sent(&self, message: &M) {
        debug!(listener = %self.name, ?message, "message sent");
    }

    fn command_sent(&self, command: &Command) {
        debug!(listener = %self.name, %command, "command sent");
    }
}
