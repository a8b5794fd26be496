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

//! The connecting side.
//!
//! A [`Client`] makes one connection attempt when started. A client that
//! fails to connect, or that has been shut down, cannot be started again;
//! create a new one instead.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tether::endpoint::ClientConfig;
//! use tether::serialization::PostcardSerializer;
//! use tether::Client;
//!
//! # async fn example() {
//! let client = Client::<_, String>::new(
//!     PostcardSerializer::default(),
//!     ClientConfig::new("127.0.0.1:7000"),
//! );
//! if client.start().await {
//!     println!("connected as {}", client.client_id());
//!     client.send("hello".to_string()).await;
//!     client.shut_down().await;
//! }
//! # }
//! ```

mod connection;

use crate::endpoint::handshake::{TransportWriter, client_handshake, open_streams};
use crate::endpoint::{
    ClientConfig, ClientHooks, ClientListener, DefaultHooks, HandshakeError, Lifecycle,
    ListenerRegistry, guarded,
};
use crate::error::{TetherError, panic_message};
use crate::protocol::{ClientCommand, ClientId, Command, Item, Payload};
use crate::serialization::Serializer;
use crate::transport::{TcpTransport, Transport, TransportError};
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, Notify, mpsc};
use tracing::{debug, error, info, trace, warn};

/// A client connection to a [`Server`](crate::Server).
///
/// `Client` is a cheap handle; clones share the same connection. Dropping
/// the last handle of a connected client disconnects it.
pub struct Client<S: Serializer, M: Payload> {
    inner: Arc<ClientInner<S, M>>,
    _owner: Arc<Owner<S, M>>,
}

impl<S: Serializer, M: Payload> Clone for Client<S, M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _owner: self._owner.clone(),
        }
    }
}

struct Owner<S: Serializer, M: Payload> {
    inner: Arc<ClientInner<S, M>>,
}

impl<S: Serializer, M: Payload> Drop for Owner<S, M> {
    fn drop(&mut self) {
        if self.inner.lifecycle.is_stopping() {
            return;
        }
        let Some(runtime) = self.inner.runtime.lock().clone() else {
            return;
        };
        debug!("last client handle dropped, disconnecting");
        let inner = self.inner.clone();
        runtime.spawn(async move { inner.shut_down().await });
    }
}

struct ClientInner<S: Serializer, M: Payload> {
    config: ClientConfig,
    serializer: Arc<S>,
    hooks: Arc<dyn ClientHooks<S, M>>,
    lifecycle: Lifecycle,
    listeners: ListenerRegistry<dyn ClientListener<M>>,
    id: AtomicI32,
    writer: Mutex<Option<TransportWriter<S>>>,
    runtime: parking_lot::Mutex<Option<Handle>>,
    fault: Notify,
}

impl<S: Serializer, M: Payload> Client<S, M> {
    /// Creates a client with pass-through hooks.
    pub fn new(serializer: S, config: ClientConfig) -> Self {
        Self::with_hooks(serializer, config, DefaultHooks)
    }

    /// Creates a client with custom hooks.
    pub fn with_hooks<H>(serializer: S, config: ClientConfig, hooks: H) -> Self
    where
        H: ClientHooks<S, M>,
    {
        let inner = Arc::new(ClientInner {
            config,
            serializer: Arc::new(serializer),
            hooks: Arc::new(hooks),
            lifecycle: Lifecycle::new(),
            listeners: ListenerRegistry::new(),
            id: AtomicI32::new(ClientId::UNASSIGNED.as_i32()),
            writer: Mutex::new(None),
            runtime: parking_lot::Mutex::new(None),
            fault: Notify::new(),
        });
        Self {
            _owner: Arc::new(Owner {
                inner: inner.clone(),
            }),
            inner,
        }
    }

    /// Connects and runs the handshake.
    ///
    /// Returns `true` once the server has confirmed the connection. Any
    /// failure, including a peer that does not speak the handshake, returns
    /// `false`, fires no listener, and leaves the client dead. Only one call
    /// per client can ever return `true`.
    pub async fn start(&self) -> bool {
        if !self.inner.lifecycle.try_start() {
            debug!("client start ignored: already started or shut down");
            return false;
        }

        match self.connect().await {
            Ok(id) => {
                info!(client_id = %id, server = %self.server_address(), "connected to server");
                true
            }
            Err(error) => {
                warn!(server = %self.server_address(), %error, "client failed to start");
                self.inner.lifecycle.abort_start();
                false
            }
        }
    }

    async fn connect(&self) -> Result<ClientId, TetherError> {
        let inner = &self.inner;
        inner.config.validate()?;
        let timeout = inner.config.handshake_timeout;

        let transport =
            TcpTransport::connect_timeout(inner.config.server_address.as_str(), timeout).await?;
        transport
            .set_nodelay(inner.config.nodelay)
            .map_err(TransportError::from)?;
        debug!(transport_id = %transport.metadata().id, "starting handshake");
        let transport = guarded("wrap_transport", || {
            inner.hooks.wrap_transport(Box::new(transport))
        })?;

        let (mut reader, mut writer) =
            open_streams(&inner.serializer, transport, inner.config.max_frame_size);
        let handshake = tokio::time::timeout(
            timeout,
            client_handshake(&mut reader, &mut writer, inner.hooks.as_ref()),
        )
        .await
        .unwrap_or(Err(HandshakeError::Timeout { duration: timeout }));

        let id = match handshake {
            Ok(id) => id,
            Err(error) => {
                let _ = writer.close().await;
                return Err(error.into());
            }
        };

        {
            let mut slot = inner.writer.lock().await;
            if !inner.lifecycle.mark_running() {
                let _ = writer.close().await;
                return Err(TetherError::ShutDown);
            }
            inner.id.store(id.as_i32(), Ordering::Release);
            *inner.runtime.lock() = Some(Handle::current());
            *slot = Some(writer);
        }

        let (inbound, receiver) = mpsc::unbounded_channel();
        tokio::spawn(supervise(inner.clone()));
        if let Err(error) = inner.listeners.notify("connected", |l| l.connected(id)) {
            inner.raise(error);
        }
        tokio::spawn(connection::dispatch_loop(inner.clone(), receiver));
        tokio::spawn(connection::read_loop(inner.clone(), reader, inbound));
        Ok(id)
    }

    /// Disconnects from the server.
    ///
    /// The first call sends `DISCONNECT`, closes the connection, runs the
    /// disconnection hook and `disconnected` listeners, then clears the
    /// listeners and resets the client ID to zero. Concurrent calls wait for
    /// that teardown; later calls return immediately.
    pub async fn shut_down(&self) {
        self.inner.shut_down().await;
    }

    /// Sends one message to the server.
    ///
    /// Returns `false` without side effects if the client is not running or
    /// the outbound filter vetoes the message, and `false` if the write
    /// fails. A failed write does not shut the client down.
    pub async fn send(&self, message: M) -> bool {
        self.transmit(Item::Message(message)).await
    }

    /// Sends a control command to the server.
    pub async fn send_command(&self, command: impl Into<Command>) -> bool {
        self.transmit(Item::Command(command.into())).await
    }

    async fn transmit(&self, item: Item<M>) -> bool {
        let inner = &self.inner;
        if !inner.lifecycle.is_running() {
            return false;
        }

        let item = match guarded("send_init", || inner.hooks.send_init(item)) {
            Ok(Some(item)) => item,
            Ok(None) => {
                trace!("outbound item dropped by filter");
                return false;
            }
            Err(error) => {
                inner.raise(error);
                return false;
            }
        };

        {
            let mut slot = inner.writer.lock().await;
            let Some(writer) = slot.as_mut() else {
                return false;
            };
            if let Err(error) = writer.send_packet(&item.as_packet()).await {
                debug!(%error, "send failed");
                return false;
            }
        }

        let notified = match &item {
            Item::Command(command) => inner
                .listeners
                .notify("command_sent", |l| l.command_sent(command)),
            Item::Message(message) => inner
                .listeners
                .notify("message_sent", |l| l.message_sent(message)),
        };
        if let Err(error) = notified {
            inner.raise(error);
        }
        true
    }

    /// The ID the server assigned, or [`ClientId::UNASSIGNED`] when not
    /// connected.
    pub fn client_id(&self) -> ClientId {
        ClientId::from(self.inner.id.load(Ordering::Acquire))
    }

    /// The address this client connects to.
    pub fn server_address(&self) -> &str {
        &self.inner.config.server_address
    }

    /// Returns `true` while connected.
    pub fn running(&self) -> bool {
        self.inner.lifecycle.is_running()
    }

    /// Returns `false` once the client has been shut down or failed to start.
    pub fn is_alive(&self) -> bool {
        self.inner.lifecycle.is_alive()
    }

    /// Waits until the client shuts down or [`Client::unsync`] is called.
    ///
    /// Returns immediately if the client is not running.
    pub async fn sync(&self) {
        self.inner.lifecycle.sync().await;
    }

    /// Like [`Client::sync`], giving up after `timeout`.
    ///
    /// Returns `false` if the timeout elapsed.
    pub async fn sync_timeout(&self, timeout: Duration) -> bool {
        self.inner.lifecycle.sync_timeout(timeout).await
    }

    /// Wakes every task waiting in [`Client::sync`].
    pub fn unsync(&self) {
        self.inner.lifecycle.unsync();
    }

    /// Registers a listener. Listeners are called in registration order.
    pub fn add_listener(&self, listener: Arc<dyn ClientListener<M>>) {
        self.inner.listeners.add(listener);
    }

    /// Unregisters a listener previously passed to [`Client::add_listener`].
    pub fn remove_listener(&self, listener: &Arc<dyn ClientListener<M>>) -> bool {
        self.inner.listeners.remove(listener)
    }

    /// The configuration this client was created with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }
}

impl<S: Serializer, M: Payload> std::fmt::Debug for Client<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("server_address", &self.server_address())
            .field("client_id", &self.client_id())
            .field("running", &self.running())
            .finish()
    }
}

impl<S: Serializer, M: Payload> ClientInner<S, M> {
    async fn shut_down(&self) {
        let Some(was_running) = self.lifecycle.begin_shutdown() else {
            // Another caller is tearing down
            self.lifecycle.sync().await;
            return;
        };
        let id = ClientId::from(self.id.load(Ordering::Acquire));

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if was_running {
                let _ = writer.send_command(ClientCommand::Disconnect).await;
            }
            let _ = writer.close().await;
        }

        if was_running {
            if let Err(payload) = AssertUnwindSafe(self.hooks.disconnection_init())
                .catch_unwind()
                .await
            {
                error!(message = %panic_message(payload.as_ref()), "disconnection_init panicked");
            }
            if let Err(error) = self.listeners.notify("disconnected", |l| l.disconnected()) {
                error!(%error, "listener failed during shutdown");
            }
            info!(client_id = %id, "disconnected from server");
        }

        self.listeners.clear();
        self.id.store(ClientId::UNASSIGNED.as_i32(), Ordering::Release);
        self.lifecycle.finish_shutdown();
    }

    /// Reports a fatal callback fault; the supervisor shuts the client down.
    fn raise(&self, error: TetherError) {
        error!(%error, "fatal callback fault, shutting client down");
        self.fault.notify_one();
    }
}

/// Shuts the client down when a callback fault is raised.
async fn supervise<S: Serializer, M: Payload>(inner: Arc<ClientInner<S, M>>) {
    tokio::select! {
        _ = inner.fault.notified() => inner.shut_down().await,
        _ = inner.lifecycle.stopped() => {}
    }
}
