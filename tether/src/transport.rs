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

//! Transport layer abstractions.
//!
//! The [`Transport`] trait describes a duplex byte stream with attached
//! metadata. Two implementations ship with the crate:
//!
//! - [`TcpTransport`]: TCP/IP networking, used by servers and clients
//! - [`MemoryTransport`]: in-memory pairs for tests and in-process use
//!
//! Servers and clients work with [`BoxedTransport`] so that the
//! stream-wrapping hooks can layer another stream over the raw socket.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tether::transport::{Transport, TcpTransport};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut transport =
//!     TcpTransport::connect_timeout("127.0.0.1:8080", Duration::from_secs(5)).await?;
//! println!("{} to {:?}", transport.metadata().id, transport.metadata().peer_addr);
//!
//! transport.write_all(b"Hello, world!").await?;
//! let mut buffer = vec![0u8; 1024];
//! let n = transport.read(&mut buffer).await?;
//! println!("Received {} bytes", n);
//!
//! transport.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod memory;
mod tcp;
mod traits;
mod types;

pub use error::TransportError;
pub use memory::MemoryTransport;
pub use tcp::TcpTransport;
pub use traits::{BoxedTransport, Transport};
pub use types::{TransportId, TransportMetadata};
