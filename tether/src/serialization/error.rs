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

//! Serialization error types.
//!
//! [`SerializationError`] and [`DeserializationError`] come from codecs.
//! [`StreamError`] comes from the object streams and separates a peer that
//! went away from one that sent something undecodable.

use std::fmt;
use std::io;
use thiserror::Error;

/// Error that occurs while encoding a value.
///
/// # Examples
///
/// ```rust
/// use tether::serialization::SerializationError;
///
/// let error = SerializationError::new("unsupported map key");
/// assert_eq!(error.to_string(), "Serialization error: unsupported map key");
/// ```
#[derive(Debug)]
pub struct SerializationError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SerializationError {
    /// Creates a new serialization error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new serialization error with a message and source.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Serialization error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for SerializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error that occurs while decoding bytes into a value.
///
/// # Examples
///
/// ```rust
/// use tether::serialization::{DeserializationError, PostcardSerializer, Serializer};
///
/// let serializer = PostcardSerializer::default();
/// let result: Result<String, DeserializationError> = serializer.deserialize(&[0xFF, 0xFF]);
/// assert!(result.is_err());
/// ```
#[derive(Debug)]
pub struct DeserializationError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DeserializationError {
    /// Creates a new deserialization error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new deserialization error with a message and source.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Deserialization error: {}", self.message)?;
        if let Some(source) = &self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for DeserializationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[cfg(feature = "postcard")]
impl From<postcard::Error> for SerializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source("Postcard serialization failed", err)
    }
}

#[cfg(feature = "postcard")]
impl From<postcard::Error> for DeserializationError {
    fn from(err: postcard::Error) -> Self {
        Self::with_source("Postcard deserialization failed", err)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("JSON serialization failed", err)
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for DeserializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("JSON deserialization failed", err)
    }
}

/// Errors raised by [`ObjectReader`](crate::serialization::ObjectReader) and
/// [`ObjectWriter`](crate::serialization::ObjectWriter).
#[derive(Debug, Error)]
pub enum StreamError {
    /// The peer closed the stream cleanly between two frames.
    #[error("stream closed by peer")]
    Closed,

    /// A frame header announced more bytes than the stream accepts.
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Announced or attempted frame size
        size: usize,
        /// Configured maximum
        max: u32,
    },

    /// The underlying transport failed.
    #[error("stream I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A value could not be encoded.
    #[error(transparent)]
    Encode(#[from] SerializationError),

    /// A frame could not be decoded into a packet.
    #[error(transparent)]
    Decode(#[from] DeserializationError),
}

impl StreamError {
    /// Returns `true` if the peer is gone, as opposed to having sent bad data.
    pub fn is_disconnect(&self) -> bool {
        match self {
            StreamError::Closed => true,
            StreamError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}
