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

//! Client identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier the server assigns to a client during the handshake.
///
/// Client IDs are random, non-zero 32-bit values. They carry no meaning
/// beyond uniqueness among the clients currently connected to one server; a
/// server may hand out the same value again once the previous holder has
/// disconnected.
///
/// The value `0` is reserved for "no identifier": a client reports it before
/// the handshake completes and again after it has disconnected.
///
/// # Example
///
/// ```rust
/// use tether::ClientId;
///
/// let id = ClientId::from(42);
/// assert!(id.is_assigned());
/// assert!(!ClientId::UNASSIGNED.is_assigned());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(i32);

impl ClientId {
    /// The reserved "no identifier" value.
    pub const UNASSIGNED: ClientId = ClientId(0);

    /// Creates a client ID from a raw value.
    #[must_use]
    pub const fn from_i32(value: i32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Returns `true` unless this is [`ClientId::UNASSIGNED`].
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl From<i32> for ClientId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<ClientId> for i32 {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Client({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unassigned_is_zero() {
        assert_eq!(ClientId::UNASSIGNED.as_i32(), 0);
        assert_eq!(ClientId::default(), ClientId::UNASSIGNED);
        assert!(!ClientId::default().is_assigned());
    }

    #[test]
    fn test_negative_ids_are_assigned() {
        assert!(ClientId::from(-7).is_assigned());
    }

    #[test]
    fn test_display() {
        assert_eq!(ClientId::from(42).to_string(), "Client(42)");
    }
}
