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

//! Client registry and random ID allocation.

use crate::endpoint::HandshakeError;
use crate::protocol::ClientId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Anything the registry can hold. Entries that stop running are purged
/// lazily by the next lookup that touches them.
pub trait Registered: Send + Sync {
    /// Returns `true` while the entry is live.
    fn is_running(&self) -> bool;
}

enum Slot<C> {
    /// Claimed by a handshake in progress.
    Reserved,
    /// Promoted to a running connection.
    Live(Arc<C>),
}

struct Slots<C> {
    map: HashMap<ClientId, Slot<C>>,
    closed: bool,
}

/// Map from client ID to live connection.
///
/// IDs are reserved while a handshake runs so two concurrent handshakes can
/// never be handed the same ID. Once closed (server shutdown) the registry
/// refuses new entries.
pub struct ClientRegistry<C> {
    slots: Mutex<Slots<C>>,
}

impl<C> Default for ClientRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ClientRegistry<C> {
    /// Creates an empty, open registry.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                map: HashMap::new(),
                closed: false,
            }),
        }
    }
}

impl<C: Registered> ClientRegistry<C> {
    fn occupied(slot: &Slot<C>) -> bool {
        match slot {
            Slot::Reserved => true,
            Slot::Live(conn) => conn.is_running(),
        }
    }

    /// Claims `id` for a handshake. Returns `false` if it is held by a
    /// running connection or another handshake, or the registry is closed.
    pub fn reserve(&self, id: ClientId) -> bool {
        let mut slots = self.slots.lock();
        if slots.closed || !id.is_assigned() {
            return false;
        }
        if let Some(slot) = slots.map.get(&id) {
            if Self::occupied(slot) {
                return false;
            }
            trace!(client_id = %id, "purging stale registry entry");
        }
        slots.map.insert(id, Slot::Reserved);
        true
    }

    /// Replaces a reservation with its connection. Returns `false` (and drops
    /// the reservation) if the registry was closed in the meantime.
    pub fn activate(&self, id: ClientId, conn: Arc<C>) -> bool {
        let mut slots = self.slots.lock();
        if slots.closed {
            slots.map.remove(&id);
            return false;
        }
        slots.map.insert(id, Slot::Live(conn));
        true
    }

    /// Drops a reservation that did not turn into a connection.
    pub fn release(&self, id: ClientId) {
        let mut slots = self.slots.lock();
        if matches!(slots.map.get(&id), Some(Slot::Reserved)) {
            slots.map.remove(&id);
        }
    }

    /// Removes `id` if it still maps to `conn`.
    pub fn remove(&self, id: ClientId, conn: &C) -> bool {
        let mut slots = self.slots.lock();
        let same = matches!(
            slots.map.get(&id),
            Some(Slot::Live(live)) if std::ptr::eq(Arc::as_ptr(live), conn)
        );
        if same {
            slots.map.remove(&id);
        }
        same
    }

    /// Looks up a running connection, purging the entry if it has stopped.
    pub fn get(&self, id: ClientId) -> Option<Arc<C>> {
        let mut slots = self.slots.lock();
        let conn = match slots.map.get(&id) {
            Some(Slot::Live(conn)) => conn.clone(),
            _ => return None,
        };
        if conn.is_running() {
            Some(conn)
        } else {
            slots.map.remove(&id);
            None
        }
    }

    /// Returns `true` if `id` maps to a running connection.
    pub fn contains(&self, id: ClientId) -> bool {
        self.get(id).is_some()
    }

    /// Returns every running connection, purging stopped ones.
    pub fn live(&self) -> Vec<Arc<C>> {
        let mut slots = self.slots.lock();
        slots.map.retain(|_, slot| Self::occupied(slot));
        slots
            .map
            .values()
            .filter_map(|slot| match slot {
                Slot::Live(conn) => Some(conn.clone()),
                Slot::Reserved => None,
            })
            .collect()
    }

    /// Number of running connections.
    pub fn len(&self) -> usize {
        self.live().len()
    }

    /// Returns `true` if there are no running connections.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Closes the registry and takes every connection out of it.
    pub fn close(&self) -> Vec<Arc<C>> {
        let mut slots = self.slots.lock();
        slots.closed = true;
        slots
            .map
            .drain()
            .filter_map(|(_, slot)| match slot {
                Slot::Live(conn) => Some(conn),
                Slot::Reserved => None,
            })
            .collect()
    }
}

/// Draws random non-zero IDs until one is free.
///
/// # Examples
///
/// ```rust
/// use tether::endpoint::{ClientRegistry, IdAllocator, Registered};
///
/// struct Conn;
/// impl Registered for Conn {
///     fn is_running(&self) -> bool { true }
/// }
///
/// let registry = ClientRegistry::<Conn>::new();
/// let id = IdAllocator::new(16).allocate(&registry).unwrap();
/// assert!(id.is_assigned());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    max_attempts: usize,
}

impl IdAllocator {
    /// Creates an allocator that gives up after `max_attempts` collisions.
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    /// Reserves a uniformly random, non-zero, currently unused ID.
    ///
    /// # Errors
    ///
    /// Returns [`HandshakeError::IdsExhausted`] if every draw collided, or
    /// [`HandshakeError::ShuttingDown`] if the registry has been closed.
    pub fn allocate<C: Registered>(
        &self,
        registry: &ClientRegistry<C>,
    ) -> Result<ClientId, HandshakeError> {
        self.allocate_with(registry, rand::random::<i32>)
    }

    /// Same as [`allocate`](Self::allocate), drawing from `draw`.
    pub fn allocate_with<C, F>(
        &self,
        registry: &ClientRegistry<C>,
        mut draw: F,
    ) -> Result<ClientId, HandshakeError>
    where
        C: Registered,
        F: FnMut() -> i32,
    {
        for _ in 0..self.max_attempts {
            let id = ClientId::from(draw());
            if !id.is_assigned() {
                continue;
            }
            if registry.reserve(id) {
                return Ok(id);
            }
            if registry.slots.lock().closed {
                return Err(HandshakeError::ShuttingDown);
            }
        }
        Err(HandshakeError::IdsExhausted {
            attempts: self.max_attempts,
        })
    }
}

/// A reserved ID that is released again unless it gets activated.
///
/// Dropping a reservation, including dropping a handshake future part way
/// through, frees the ID for other connections.
pub struct Reservation<'a, C: Registered> {
    registry: &'a ClientRegistry<C>,
    id: ClientId,
    pending: bool,
}

impl<'a, C: Registered> Reservation<'a, C> {
    pub(crate) fn new(registry: &'a ClientRegistry<C>, id: ClientId) -> Self {
        Self {
            registry,
            id,
            pending: true,
        }
    }

    /// The reserved ID.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Publishes `conn` under the reserved ID.
    ///
    /// Returns `false` if the registry was closed in the meantime.
    pub fn activate(mut self, conn: Arc<C>) -> bool {
        self.pending = false;
        self.registry.activate(self.id, conn)
    }
}

impl<C: Registered> Drop for Reservation<'_, C> {
    fn drop(&mut self) {
        if self.pending {
            self.registry.release(self.id);
        }
    }
}

impl<C: Registered> std::fmt::Debug for Reservation<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reservation")
            .field("id", &self.id)
            .field("pending", &self.pending)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Conn(AtomicBool);

    impl Conn {
        fn running() -> Arc<Self> {
            Arc::new(Self(AtomicBool::new(true)))
        }

        fn stop(&self) {
            self.0.store(false, Ordering::SeqCst);
        }
    }

    impl Registered for Conn {
        fn is_running(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_reserve_activate_get() {
        let registry = ClientRegistry::new();
        let id = ClientId::from(5);

        assert!(registry.reserve(id));
        assert!(!registry.reserve(id));
        assert!(registry.get(id).is_none());

        let conn = Conn::running();
        assert!(registry.activate(id, conn.clone()));
        assert!(Arc::ptr_eq(&registry.get(id).unwrap(), &conn));
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_zero_is_never_reserved() {
        let registry = ClientRegistry::<Conn>::new();
        assert!(!registry.reserve(ClientId::UNASSIGNED));
    }

    #[test]
    fn test_stale_entries_are_purged() {
        let registry = ClientRegistry::new();
        let id = ClientId::from(9);
        let conn = Conn::running();
        assert!(registry.reserve(id));
        assert!(registry.activate(id, conn.clone()));

        conn.stop();
        assert!(registry.get(id).is_none());
        assert!(registry.is_empty());
        assert!(registry.reserve(id));
    }

    #[test]
    fn test_remove_checks_identity() {
        let registry = ClientRegistry::new();
        let id = ClientId::from(1);
        let first = Conn::running();
        let second = Conn::running();
        assert!(registry.reserve(id));
        assert!(registry.activate(id, first.clone()));

        assert!(!registry.remove(id, &second));
        assert!(registry.remove(id, &first));
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_release_only_drops_reservations() {
        let registry = ClientRegistry::new();
        let live = ClientId::from(1);
        let pending = ClientId::from(2);
        assert!(registry.reserve(live));
        assert!(registry.activate(live, Conn::running()));
        assert!(registry.reserve(pending));

        registry.release(live);
        registry.release(pending);

        assert!(registry.contains(live));
        assert!(registry.reserve(pending));
    }

    #[test]
    fn test_close_refuses_new_entries() {
        let registry = ClientRegistry::new();
        let id = ClientId::from(3);
        assert!(registry.reserve(id));
        assert!(registry.activate(id, Conn::running()));
        assert!(registry.reserve(ClientId::from(4)));

        let drained = registry.close();
        assert_eq!(drained.len(), 1);
        assert!(registry.is_empty());
        assert!(!registry.reserve(ClientId::from(5)));
        assert!(!registry.activate(ClientId::from(4), Conn::running()));
    }

    #[test]
    fn test_allocator_retries_collisions_and_zero() {
        let registry = ClientRegistry::new();
        assert!(registry.reserve(ClientId::from(7)));
        assert!(registry.activate(ClientId::from(7), Conn::running()));

        let mut draws = vec![7, 0, 7, 11].into_iter();
        let id = IdAllocator::new(10)
            .allocate_with(&registry, || draws.next().unwrap())
            .unwrap();

        assert_eq!(id, ClientId::from(11));
        assert!(!registry.reserve(id));
    }

    #[test]
    fn test_allocator_gives_up() {
        let registry = ClientRegistry::<Conn>::new();
        assert!(registry.reserve(ClientId::from(1)));

        let result = IdAllocator::new(3).allocate_with(&registry, || 1);
        assert!(matches!(
            result,
            Err(HandshakeError::IdsExhausted { attempts: 3 })
        ));
    }

    #[test]
    fn test_allocator_stops_on_closed_registry() {
        let registry = ClientRegistry::<Conn>::new();
        registry.close();
        let result = IdAllocator::new(3).allocate(&registry);
        assert!(matches!(result, Err(HandshakeError::ShuttingDown)));
    }

    #[test]
    fn test_random_ids_are_distinct_while_held() {
        let registry = ClientRegistry::<Conn>::new();
        let allocator = IdAllocator::new(1024);
        let ids: Vec<ClientId> = (0..100)
            .map(|_| allocator.allocate(&registry).unwrap())
            .collect();

        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 100);
        assert!(ids.iter().all(|id| id.is_assigned()));
    }

    #[test]
    fn test_dropped_reservation_is_released() {
        let registry = ClientRegistry::<Conn>::new();
        let id = ClientId::from(12);
        assert!(registry.reserve(id));

        let reservation = Reservation::new(&registry, id);
        assert!(!registry.reserve(id));
        drop(reservation);

        assert!(registry.reserve(id));
    }

    #[test]
    fn test_activated_reservation_stays() {
        let registry = ClientRegistry::new();
        let id = ClientId::from(13);
        assert!(registry.reserve(id));

        let conn = Conn::running();
        assert!(Reservation::new(&registry, id).activate(conn.clone()));
        assert!(Arc::ptr_eq(&registry.get(id).unwrap(), &conn));
    }
}
