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

//! Building blocks shared by [`Server`](crate::Server) and
//! [`Client`](crate::Client).
//!
//! - **Configuration**: [`ServerConfig`] and [`ClientConfig`]
//! - **Lifecycle**: [`Lifecycle`] tracks start-once and shutdown-once state
//!   and backs `sync`/`unsync`
//! - **Handshake**: the greeting, ID assignment and negotiation sequences
//! - **Extension points**: [`ServerHooks`]/[`ClientHooks`] for filtering and
//!   negotiation, [`ServerListener`]/[`ClientListener`] for observation
//! - **Registry**: [`ClientRegistry`] and [`IdAllocator`] for server-side
//!   connection bookkeeping

mod config;
mod error;
pub mod handshake;
mod hooks;
mod lifecycle;
mod listener;
mod registry;

pub use config::{ClientConfig, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_MAX_ID_ATTEMPTS, ServerConfig};
pub use error::{BoxError, HandshakeError};
pub use handshake::Negotiator;
pub use hooks::{ClientHooks, DefaultHooks, Negotiation, ServerHooks};
pub use lifecycle::Lifecycle;
pub use listener::{ClientListener, ListenerRegistry, ServerListener};
pub(crate) use listener::guarded;
pub use registry::{ClientRegistry, IdAllocator, Registered, Reservation};
