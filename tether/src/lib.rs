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

#![doc = include_str!("../../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! `tether` is organized in layers:
//!
//! - **[`transport`]**: duplex byte streams (TCP, in-memory)
//! - **[`serialization`]**: pluggable codecs, length-prefixed framing and the
//!   packet reader/writer built on them
//! - **[`protocol`]**: control commands, client IDs and the wire packet
//! - **[`endpoint`]**: lifecycle, handshake, hooks, listeners and the client
//!   registry shared by both sides
//! - **[`server`]** and **[`client`]**: the two runnable sides
//! - **[`observability`]**: a `tracing`-backed listener
//!
//! ## Handshake
//!
//! Every connection starts with a fixed exchange before any application data:
//!
//! ```text
//!   server                               client
//!   ------ HANDSHAKE ------------------>
//!   <----- HANDSHAKE -------------------
//!   ------ ClientId(n) ---------------->
//!          (connection_init hooks on both sides)
//!   ------ CONNECTED ------------------>   or REJECT_CONNECTION / ERROR_CONNECTION
//! ```
//!
//! A client talking to anything that does not open with the server's
//! `HANDSHAKE` gives up with an "unknown server" error.
//!
//! ## Error Handling
//!
//! Connection-level failures never escape as errors: `start` and `send`
//! return `bool`, and a broken connection is torn down on its own. A panic in
//! application callback code is different; it is logged and shuts the whole
//! server or client down. See [`TetherError`].

pub mod client;
pub mod endpoint;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod serialization;
pub mod server;
pub mod transport;

pub use client::Client;
pub use endpoint::{
    ClientConfig, ClientHooks, ClientListener, DefaultHooks, Negotiation, ServerConfig,
    ServerHooks, ServerListener,
};
pub use error::TetherError;
pub use protocol::{ClientCommand, ClientId, Command, Item, Packet, Payload, ServerCommand};
pub use server::{ClientHandle, Server};
