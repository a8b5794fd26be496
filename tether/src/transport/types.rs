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

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique number attached to every transport for log correlation.
///
/// Unrelated to the [`ClientId`](crate::ClientId) a server assigns during
/// the handshake; a connection has a transport ID before it has a client ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(u64);

impl TransportId {
    /// Allocates the next ID.
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport({})", self.0)
    }
}

/// What is known about a transport when it is opened.
///
/// The server takes a client's peer address from here, and both sides log
/// the transport ID while the handshake runs.
#[derive(Debug, Clone)]
pub struct TransportMetadata {
    /// Unique identifier for this transport
    pub id: TransportId,

    /// Local address of the connection, if any
    pub local_addr: Option<SocketAddr>,

    /// Remote peer address, if any
    pub peer_addr: Option<SocketAddr>,

    /// Short name of the transport kind, `"tcp"` or `"memory"`
    pub transport_type: &'static str,
}

impl TransportMetadata {
    /// Creates metadata with a fresh ID and no addresses.
    pub fn new(transport_type: &'static str) -> Self {
        Self {
            id: TransportId::next(),
            local_addr: None,
            peer_addr: None,
            transport_type,
        }
    }

    /// Sets both socket addresses.
    pub fn with_addrs(mut self, local_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        self.local_addr = Some(local_addr);
        self.peer_addr = Some(peer_addr);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = TransportMetadata::new("memory");
        let b = TransportMetadata::new("memory");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_with_addrs() {
        let local: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let peer: SocketAddr = "127.0.0.1:50123".parse().unwrap();
        let meta = TransportMetadata::new("tcp").with_addrs(local, peer);
        assert_eq!(meta.local_addr, Some(local));
        assert_eq!(meta.peer_addr, Some(peer));
        assert!(meta.id.to_string().starts_with("Transport("));
    }
}
