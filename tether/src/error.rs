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

//! Top-level error type.
//!
//! [`TetherError`] composes the layer errors:
//!
//! 1. **Transport**: socket-level failures ([`TransportError`])
//! 2. **Stream**: framing and codec failures ([`StreamError`])
//! 3. **Handshake**: a connection attempt that was not promoted ([`HandshakeError`])
//! 4. **Callback**: a listener, filter or hook that panicked
//!
//! The public lifecycle API reports outcomes as booleans. These errors are
//! what gets logged on the way there, and what embedding code sees when it
//! drives the lower layers directly.
//!
//! # Error Handling Strategy
//!
//! - **Transport, stream and handshake errors** → tear down the affected
//!   connection only
//! - **Callback panics** → shut down the whole server or client
//!
//! # Examples
//!
//! ```rust
//! use tether::TetherError;
//! use tether::transport::TransportError;
//! use std::time::Duration;
//!
//! let error: TetherError = TransportError::Timeout {
//!     duration: Duration::from_secs(10),
//! }
//! .into();
//! assert!(error.is_transport_error());
//! assert!(!error.is_fatal());
//! ```

use crate::endpoint::HandshakeError;
use crate::serialization::StreamError;
use crate::transport::TransportError;
use std::error::Error as StdError;
use std::fmt;

/// Top-level error type.
#[derive(Debug)]
pub enum TetherError {
    /// A transport-layer error occurred.
    Transport(TransportError),

    /// Reading or writing a packet failed.
    Stream(StreamError),

    /// A handshake did not complete.
    Handshake(HandshakeError),

    /// A configuration value was rejected by `validate()`.
    InvalidConfiguration {
        /// Description of the problem
        reason: String,
    },

    /// The server or client was shut down while an operation was in flight.
    ShutDown,

    /// Application callback code panicked.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tether::TetherError;
    ///
    /// let error = TetherError::CallbackPanicked {
    ///     callback: "message_received",
    ///     message: "index out of bounds".to_string(),
    /// };
    /// assert!(error.is_fatal());
    /// ```
    CallbackPanicked {
        /// Which callback panicked
        callback: &'static str,
        /// Panic payload, if it was a string
        message: String,
    },
}

impl TetherError {
    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this is a handshake error.
    #[must_use]
    pub const fn is_handshake_error(&self) -> bool {
        matches!(self, Self::Handshake(_))
    }

    /// Returns `true` if this error must bring down the whole server or
    /// client rather than a single connection.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::CallbackPanicked { .. } => true,
            Self::Handshake(e) => e.is_fatal(),
            _ => false,
        }
    }

    pub(crate) fn panicked(callback: &'static str, payload: &(dyn std::any::Any + Send)) -> Self {
        Self::CallbackPanicked {
            callback,
            message: panic_message(payload),
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl fmt::Display for TetherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Stream(e) => write!(f, "stream error: {}", e),
            Self::Handshake(e) => write!(f, "handshake failed: {}", e),
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {}", reason)
            }
            Self::ShutDown => write!(f, "shut down"),
            Self::CallbackPanicked { callback, message } => {
                write!(f, "{} callback panicked: {}", callback, message)
            }
        }
    }
}

impl StdError for TetherError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Stream(e) => Some(e),
            Self::Handshake(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for TetherError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<StreamError> for TetherError {
    fn from(error: StreamError) -> Self {
        Self::Stream(error)
    }
}

impl From<HandshakeError> for TetherError {
    fn from(error: HandshakeError) -> Self {
        Self::Handshake(error)
    }
}
