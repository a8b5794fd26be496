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

//! Listener traits and the registry that fans events out to them.

use crate::error::TetherError;
use crate::protocol::{ClientId, Command};
use parking_lot::RwLock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Observer of server-side events.
///
/// Every method has an empty default, so implementors override only what
/// they need. Callbacks run synchronously on the dispatch loop (received
/// events) or on the sending task (sent events); a slow callback delays
/// every later event. A panicking callback shuts the server down.
///
/// # Examples
///
/// ```rust
/// use tether::{ClientId, ServerListener};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct Census(AtomicUsize);
///
/// impl ServerListener<String> for Census {
///     fn client_connected(&self, _id: ClientId) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
///
///     fn client_disconnected(&self, _id: ClientId) {
///         self.0.fetch_sub(1, Ordering::SeqCst);
///     }
/// }
/// ```
pub trait ServerListener<M>: Send + Sync {
    /// A client completed the handshake and is now running.
    fn client_connected(&self, _id: ClientId) {}

    /// A running client was torn down. Fires exactly once per connection.
    fn client_disconnected(&self, _id: ClientId) {}

    /// A message from `id` passed the inbound filter.
    fn message_received(&self, _id: ClientId, _message: &M) {}

    /// A command from `id` passed the inbound filter.
    fn command_received(&self, _id: ClientId, _command: &Command) {}

    /// A message was written and flushed to `id`.
    fn message_sent(&self, _id: ClientId, _message: &M) {}

    /// A command was written and flushed to `id`.
    fn command_sent(&self, _id: ClientId, _command: &Command) {}
}

/// Observer of client-side events.
///
/// Same contract as [`ServerListener`], without the originating ID.
pub trait ClientListener<M>: Send + Sync {
    /// The handshake completed; `id` is the identifier the server assigned.
    fn connected(&self, _id: ClientId) {}

    /// The connection was torn down. Fires exactly once.
    fn disconnected(&self) {}

    /// A message passed the inbound filter.
    fn message_received(&self, _message: &M) {}

    /// A command passed the inbound filter.
    fn command_received(&self, _command: &Command) {}

    /// A message was written and flushed.
    fn message_sent(&self, _message: &M) {}

    /// A command was written and flushed.
    fn command_sent(&self, _command: &Command) {}
}

/// Ordered, thread-safe list of listeners.
///
/// Registration order is notification order. The same `Arc` may be added
/// more than once and is then notified once per registration; removal takes
/// out one registration, matched by pointer identity.
pub struct ListenerRegistry<L: ?Sized> {
    listeners: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> Default for ListenerRegistry<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> ListenerRegistry<L> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Appends a listener.
    pub fn add(&self, listener: Arc<L>) {
        self.listeners.write().push(listener);
    }

    /// Removes the first registration of `listener`. Returns `false` if it
    /// was not registered.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut listeners = self.listeners.write();
        let target = Arc::as_ptr(listener) as *const ();
        match listeners
            .iter()
            .position(|l| Arc::as_ptr(l) as *const () == target)
        {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Invokes `event` on a snapshot of the registered listeners, in order.
    ///
    /// Listeners may add or remove listeners from inside a callback; changes
    /// apply from the next event.
    ///
    /// # Errors
    ///
    /// Stops at the first panicking listener and returns
    /// [`TetherError::CallbackPanicked`] naming `callback`.
    pub fn notify<F>(&self, callback: &'static str, event: F) -> Result<(), TetherError>
    where
        F: Fn(&L),
    {
        let snapshot: Vec<Arc<L>> = self.listeners.read().clone();
        for listener in &snapshot {
            guarded(callback, || event(&**listener))?;
        }
        Ok(())
    }
}

/// Runs a synchronous callback, turning a panic into
/// [`TetherError::CallbackPanicked`].
pub(crate) fn guarded<T>(callback: &'static str, f: impl FnOnce() -> T) -> Result<T, TetherError> {
    catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| TetherError::panicked(callback, payload.as_ref()))
}
