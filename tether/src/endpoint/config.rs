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

//! Configuration types for servers and clients.

use crate::error::TetherError;
use crate::serialization::framing::MAX_FRAME_SIZE;
use std::time::Duration;

/// Default handshake timeout (10 seconds).
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of random draws before ID allocation gives up.
pub const DEFAULT_MAX_ID_ATTEMPTS: usize = 1024;

/// Configuration for a [`Server`](crate::server::Server).
///
/// # Examples
///
/// ```rust
/// use tether::endpoint::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::new("127.0.0.1:7000")
///     .with_handshake_timeout(Duration::from_secs(3));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the server listens on. Port 0 picks a free port.
    ///
    /// Default: `0.0.0.0:0`
    pub bind_address: String,

    /// Time a new socket has to complete the handshake. The timer covers the
    /// whole sequence, so a silent peer cannot hold a handshake task forever.
    ///
    /// Default: 10 seconds
    pub handshake_timeout: Duration,

    /// Largest frame accepted or sent, in bytes.
    ///
    /// Default: 16 MB
    pub max_frame_size: u32,

    /// Random draws made before a handshake fails for lack of a free ID.
    ///
    /// Default: 1024
    pub max_id_attempts: usize,

    /// Sets `TCP_NODELAY` on accepted sockets.
    ///
    /// Default: true
    pub nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:0".to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration listening on `bind_address`.
    pub fn new(bind_address: impl Into<String>) -> Self {
        Self {
            bind_address: bind_address.into(),
            ..Self::default()
        }
    }

    /// Sets the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the maximum frame size.
    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets the ID allocation retry budget.
    pub fn with_max_id_attempts(mut self, attempts: usize) -> Self {
        self.max_id_attempts = attempts;
        self
    }

    /// Sets whether accepted sockets use `TCP_NODELAY`.
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TetherError::InvalidConfiguration`] if:
    /// - The bind address is empty
    /// - Max frame size is 0
    /// - Handshake timeout is 0
    /// - Max ID attempts is 0
    pub fn validate(&self) -> Result<(), TetherError> {
        if self.bind_address.is_empty() {
            return Err(invalid("bind_address must not be empty"));
        }
        if self.max_id_attempts == 0 {
            return Err(invalid("max_id_attempts must be greater than 0"));
        }
        validate_common(self.handshake_timeout, self.max_frame_size)
    }
}

/// Configuration for a [`Client`](crate::client::Client).
///
/// # Examples
///
/// ```rust
/// use tether::endpoint::ClientConfig;
///
/// let config = ClientConfig::new("127.0.0.1:7000").with_nodelay(false);
/// assert_eq!(config.server_address, "127.0.0.1:7000");
/// assert!(!config.nodelay);
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the server to connect to.
    pub server_address: String,

    /// Time allowed for connecting plus the whole handshake.
    ///
    /// Default: 10 seconds
    pub handshake_timeout: Duration,

    /// Largest frame accepted or sent, in bytes.
    ///
    /// Default: 16 MB
    pub max_frame_size: u32,

    /// Sets `TCP_NODELAY` on the socket.
    ///
    /// Default: true
    pub nodelay: bool,
}

impl ClientConfig {
    /// Creates a configuration connecting to `server_address`.
    pub fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_frame_size: MAX_FRAME_SIZE,
            nodelay: true,
        }
    }

    /// Sets the handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the maximum frame size.
    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Sets whether the socket uses `TCP_NODELAY`.
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TetherError::InvalidConfiguration`] if the server address is
    /// empty, or the frame size or handshake timeout is 0.
    pub fn validate(&self) -> Result<(), TetherError> {
        if self.server_address.is_empty() {
            return Err(invalid("server_address must not be empty"));
        }
        validate_common(self.handshake_timeout, self.max_frame_size)
    }
}

fn validate_common(handshake_timeout: Duration, max_frame_size: u32) -> Result<(), TetherError> {
    if max_frame_size == 0 {
        return Err(invalid("max_frame_size must be greater than 0"));
    }
    if handshake_timeout.is_zero() {
        return Err(invalid("handshake_timeout must be greater than 0"));
    }
    Ok(())
}

fn invalid(reason: &str) -> TetherError {
    TetherError::InvalidConfiguration {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:0");
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.max_frame_size, 16 * 1024 * 1024);
        assert_eq!(config.max_id_attempts, 1024);
        assert!(config.nodelay);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_builder_pattern() {
        let config = ServerConfig::new("127.0.0.1:9000")
            .with_handshake_timeout(Duration::from_millis(250))
            .with_max_frame_size(4096)
            .with_max_id_attempts(8)
            .with_nodelay(false);

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.handshake_timeout, Duration::from_millis(250));
        assert_eq!(config.max_frame_size, 4096);
        assert_eq!(config.max_id_attempts, 8);
        assert!(!config.nodelay);
    }

    #[test]
    fn test_server_validate_rejects_zeroes() {
        assert!(ServerConfig::default().with_max_id_attempts(0).validate().is_err());
        assert!(ServerConfig::default().with_max_frame_size(0).validate().is_err());
        assert!(
            ServerConfig::default()
                .with_handshake_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(ServerConfig::new("").validate().is_err());
    }

    #[test]
    fn test_client_config() {
        let config = ClientConfig::new("localhost:1234");
        assert_eq!(config.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);
        assert!(config.validate().is_ok());

        let config = ClientConfig::new("");
        let error = config.validate().unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid configuration: server_address must not be empty"
        );
    }
}
