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

//! Postcard serializer implementation.
//!
//! Postcard is a compact, deterministic binary format and the default codec
//! for servers and clients.

use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// Postcard serializer.
///
/// # Examples
///
/// ```rust
/// use tether::serialization::{PostcardSerializer, Serializer};
/// use tether::{Packet, ServerCommand};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let serializer = PostcardSerializer::default();
/// let packet: Packet<String> = Packet::Command(ServerCommand::Handshake.into());
///
/// let bytes = serializer.serialize(&packet)?;
/// let decoded: Packet<String> = serializer.deserialize(&bytes)?;
/// assert_eq!(packet, decoded);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostcardSerializer {
    max_size: Option<usize>,
}

impl PostcardSerializer {
    /// Creates a serializer with no decode size limit beyond frame framing.
    pub fn new() -> Self {
        Self { max_size: None }
    }

    /// Rejects any input longer than `max_size` bytes when decoding.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

impl Default for PostcardSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer for PostcardSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        postcard::to_allocvec(value).map_err(Into::into)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        if let Some(max_size) = self.max_size {
            if bytes.len() > max_size {
                return Err(DeserializationError::new(format!(
                    "Data size {} exceeds maximum allowed size {}",
                    bytes.len(),
                    max_size
                )));
            }
        }

        postcard::from_bytes(bytes).map_err(Into::into)
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}
