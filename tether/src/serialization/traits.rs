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

//! Serialization trait definitions.

use crate::serialization::{DeserializationError, SerializationError};

/// Trait for encoding and decoding wire packets.
///
/// A serializer is shared by every connection of a server or client, so
/// implementations must be `Send + Sync + 'static`.
///
/// # Reference caches
///
/// Object-graph codecs often remember values they already wrote and emit
/// back-references for repeats. [`ObjectWriter::force`] calls
/// [`Serializer::reset`] after every write so that a mutated object is never
/// sent as a stale back-reference. The serde-based codecs in this crate are
/// stateless and keep the default no-op.
///
/// [`ObjectWriter::force`]: crate::serialization::ObjectWriter::force
///
/// # Examples
///
/// ```rust
/// use tether::serialization::{Serializer, SerializationError, DeserializationError};
///
/// struct JsonLines;
///
/// impl Serializer for JsonLines {
///     fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
///     where
///         T: serde::Serialize + ?Sized,
///     {
///         let mut bytes = serde_json::to_vec(value).map_err(SerializationError::from)?;
///         bytes.push(b'\n');
///         Ok(bytes)
///     }
///
///     fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
///     where
///         T: serde::de::DeserializeOwned,
///     {
///         serde_json::from_slice(bytes).map_err(Into::into)
///     }
///
///     fn name(&self) -> &'static str {
///         "json-lines"
///     }
/// }
/// ```
pub trait Serializer: Send + Sync + 'static {
    /// Serializes a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the value cannot be encoded.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized;

    /// Deserializes bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] if the bytes are corrupt, truncated
    /// or describe a different type.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned;

    /// Returns the name of this serializer, used in log output.
    fn name(&self) -> &'static str;

    /// Drops any cached back-references. Called after every flushed write.
    fn reset(&self) {}
}
