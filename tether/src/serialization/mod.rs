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

//! Serialization layer.
//!
//! - [`Serializer`]: pluggable codec trait
//! - [`PostcardSerializer`] (feature `postcard`, default) and
//!   [`JsonSerializer`] (feature `json`)
//! - [`framing`]: 4-byte big-endian length-prefixed frames
//! - [`ObjectReader`] / [`ObjectWriter`]: one [`Packet`](crate::Packet) per frame
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tether::serialization::{ObjectReader, ObjectWriter, PostcardSerializer};
//! use tether::transport::MemoryTransport;
//! use tether::{Packet, ServerCommand};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let serializer = Arc::new(PostcardSerializer::default());
//! let (a, b) = MemoryTransport::pair_default();
//! let mut writer = ObjectWriter::new(serializer.clone(), a, 1 << 20);
//! let mut reader = ObjectReader::new(serializer, b, 1 << 20);
//!
//! writer.send_command(ServerCommand::Handshake).await?;
//! let packet: Packet<String> = reader.read_packet().await?;
//! assert_eq!(packet, Packet::Command(ServerCommand::Handshake.into()));
//! # Ok(())
//! # }
//! ```

mod error;
pub mod framing;
mod stream;
mod traits;

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "postcard")]
mod postcard;

pub use error::{DeserializationError, SerializationError, StreamError};
pub use stream::{ObjectReader, ObjectWriter};
pub use traits::Serializer;

#[cfg(feature = "json")]
pub use self::json::JsonSerializer;
#[cfg(feature = "postcard")]
pub use self::postcard::PostcardSerializer;
