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

//! The accepting side.
//!
//! A [`Server`] binds a TCP listener and runs three tasks:
//!
//! - an **accept loop** that spawns one handshake task per socket
//! - one **read loop** per connected client, feeding a shared queue
//! - a single **dispatch loop** that drains the queue, applies the inbound
//!   filters and notifies listeners
//!
//! Clients that complete the handshake are published in a registry under a
//! random non-zero [`ClientId`] and are reachable through [`ClientHandle`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use tether::endpoint::{ServerConfig, ServerListener};
//! use tether::serialization::PostcardSerializer;
//! use tether::{ClientId, Server};
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! impl ServerListener<String> for Echo {
//!     fn message_received(&self, id: ClientId, message: &String) {
//!         println!("{} says {}", id, message);
//!     }
//! }
//!
//! # async fn example() {
//! let server = Server::<_, String>::new(
//!     PostcardSerializer::default(),
//!     ServerConfig::new("127.0.0.1:7000"),
//! );
//! server.add_listener(Arc::new(Echo));
//! assert!(server.start().await);
//!
//! server.sync().await;
//! # }
//! ```

mod handle;

pub use handle::ClientHandle;

use handle::read_loop;

use crate::endpoint::handshake::{TransportReader, TransportWriter, open_streams, server_handshake};
use crate::endpoint::{
    ClientRegistry, DefaultHooks, HandshakeError, IdAllocator, Lifecycle, ListenerRegistry,
    Reservation, ServerConfig, ServerHooks, ServerListener, guarded,
};
use crate::error::TetherError;
use crate::protocol::{ClientCommand, ClientId, Item, Packet, Payload, ServerCommand};
use crate::serialization::Serializer;
use crate::transport::{TcpTransport, Transport, TransportError};
use futures_util::FutureExt;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, error, info, instrument, trace, warn};

type Inbound<M> = (ClientId, Packet<M>);

/// Pause after a failed `accept` so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A server accepting handshaken clients.
///
/// `Server` is a cheap handle; clones share the same underlying server.
///
/// - `start` succeeds at most once per server
/// - `shut_down` tears down at most once and disconnects every client
/// - a panic in a listener, filter or hook shuts the whole server down
/// - dropping the last handle of a started server shuts it down
pub struct Server<S: Serializer, M: Payload> {
    inner: Arc<ServerInner<S, M>>,
    _owner: Arc<Owner<S, M>>,
}

impl<S: Serializer, M: Payload> Clone for Server<S, M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _owner: self._owner.clone(),
        }
    }
}

/// Shared by every user-facing [`Server`] handle. Background tasks only
/// hold the inner state, so this drops with the last handle.
struct Owner<S: Serializer, M: Payload> {
    inner: Arc<ServerInner<S, M>>,
}

impl<S: Serializer, M: Payload> Drop for Owner<S, M> {
    fn drop(&mut self) {
        if self.inner.lifecycle.is_stopping() {
            return;
        }
        // Only a launched server has a runtime and anything to release
        let Some(runtime) = self.inner.runtime.lock().clone() else {
            return;
        };
        debug!("last server handle dropped, shutting down");
        let inner = self.inner.clone();
        runtime.spawn(async move { inner.shut_down().await });
    }
}

pub(crate) struct ServerInner<S: Serializer, M: Payload> {
    config: ServerConfig,
    serializer: Arc<S>,
    hooks: Arc<dyn ServerHooks<S, M>>,
    lifecycle: Lifecycle,
    listeners: ListenerRegistry<dyn ServerListener<M>>,
    registry: ClientRegistry<ClientHandle<S, M>>,
    allocator: IdAllocator,
    local_addr: Mutex<Option<SocketAddr>>,
    runtime: Mutex<Option<Handle>>,
    inbound: mpsc::UnboundedSender<Inbound<M>>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Inbound<M>>>>,
    fault: Notify,
}

impl<S: Serializer, M: Payload> Server<S, M> {
    /// Creates a server with pass-through hooks.
    pub fn new(serializer: S, config: ServerConfig) -> Self {
        Self::with_hooks(serializer, config, DefaultHooks)
    }

    /// Creates a server with custom hooks.
    pub fn with_hooks<H>(serializer: S, config: ServerConfig, hooks: H) -> Self
    where
        H: ServerHooks<S, M>,
    {
        let (inbound, receiver) = mpsc::unbounded_channel();
        let allocator = IdAllocator::new(config.max_id_attempts);
        let inner = Arc::new(ServerInner {
            config,
            serializer: Arc::new(serializer),
            hooks: Arc::new(hooks),
            lifecycle: Lifecycle::new(),
            listeners: ListenerRegistry::new(),
            registry: ClientRegistry::new(),
            allocator,
            local_addr: Mutex::new(None),
            runtime: Mutex::new(None),
            inbound,
            receiver: Mutex::new(Some(receiver)),
            fault: Notify::new(),
        });
        Self {
            _owner: Arc::new(Owner {
                inner: inner.clone(),
            }),
            inner,
        }
    }

    /// Binds the listener and starts accepting clients.
    ///
    /// Returns `true` only for the first successful call. Returns `false`
    /// if the server was already started, has been shut down, or failed to
    /// bind; a failed start leaves the server dead.
    pub async fn start(&self) -> bool {
        if !self.inner.lifecycle.try_start() {
            debug!("server start ignored: already started or shut down");
            return false;
        }

        match self.launch().await {
            Ok(local_addr) => {
                info!(%local_addr, "server started");
                true
            }
            Err(error) => {
                error!(%error, "server failed to start");
                self.inner.lifecycle.abort_start();
                false
            }
        }
    }

    async fn launch(&self) -> Result<SocketAddr, TetherError> {
        let inner = &self.inner;
        inner.config.validate()?;

        let listener = TcpTransport::bind(inner.config.bind_address.as_str()).await?;
        let local_addr = listener.local_addr().map_err(TransportError::from)?;
        let receiver = inner.receiver.lock().take().ok_or(TetherError::ShutDown)?;
        *inner.local_addr.lock() = Some(local_addr);
        *inner.runtime.lock() = Some(Handle::current());

        if !inner.lifecycle.mark_running() {
            return Err(TetherError::ShutDown);
        }

        tokio::spawn(supervise(inner.clone()));
        tokio::spawn(dispatch_loop(inner.clone(), receiver));
        tokio::spawn(accept_loop(inner.clone(), listener));
        Ok(local_addr)
    }

    /// Stops accepting and disconnects every client.
    ///
    /// Only the first call tears the server down. Every call returns once
    /// every client has been torn down and its listeners notified.
    pub async fn shut_down(&self) {
        self.inner.shut_down().await;
    }

    /// Returns `true` while the server is accepting clients.
    pub fn running(&self) -> bool {
        self.inner.lifecycle.is_running()
    }

    /// Returns `false` once the server has been shut down or failed to start.
    pub fn is_alive(&self) -> bool {
        self.inner.lifecycle.is_alive()
    }

    /// Waits until the server shuts down or [`Server::unsync`] is called.
    ///
    /// Returns immediately if the server is not running.
    pub async fn sync(&self) {
        self.inner.lifecycle.sync().await;
    }

    /// Like [`Server::sync`], giving up after `timeout`.
    ///
    /// Returns `false` if the timeout elapsed.
    pub async fn sync_timeout(&self, timeout: Duration) -> bool {
        self.inner.lifecycle.sync_timeout(timeout).await
    }

    /// Wakes every task waiting in [`Server::sync`].
    pub fn unsync(&self) {
        self.inner.lifecycle.unsync();
    }

    /// Registers a listener. Listeners are called in registration order.
    pub fn add_listener(&self, listener: Arc<dyn ServerListener<M>>) {
        self.inner.listeners.add(listener);
    }

    /// Unregisters a listener previously passed to [`Server::add_listener`].
    pub fn remove_listener(&self, listener: &Arc<dyn ServerListener<M>>) -> bool {
        self.inner.listeners.remove(listener)
    }

    /// Sends `message` to the client with the given ID.
    ///
    /// Returns `false` if no such client is connected or the send fails.
    pub async fn send(&self, message: M, id: ClientId) -> bool {
        if !self.running() {
            return false;
        }
        match self.inner.registry.get(id) {
            Some(handle) => handle.send(message).await,
            None => false,
        }
    }

    /// Sends `message` to every connected client.
    ///
    /// Each client is tried independently. Returns `true` only if every send
    /// succeeded; a client that disconnects during the broadcast makes the
    /// result `false` without affecting the others.
    pub async fn send_to_all(&self, message: M) -> bool
    where
        M: Clone,
    {
        if !self.running() {
            return false;
        }
        let mut delivered = true;
        for handle in self.inner.registry.live() {
            delivered &= handle.send(message.clone()).await;
        }
        delivered
    }

    /// Returns the connected client with the given ID.
    pub fn get_client(&self, id: ClientId) -> Option<Arc<ClientHandle<S, M>>> {
        self.inner.registry.get(id)
    }

    /// Returns every connected client.
    pub fn clients(&self) -> Vec<Arc<ClientHandle<S, M>>> {
        self.inner.registry.live()
    }

    /// Returns `true` if a client with the given ID is connected.
    pub fn contains_id(&self, id: ClientId) -> bool {
        self.inner.registry.contains(id)
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.inner.local_addr.lock()
    }

    /// Port the listener is bound to, once started.
    pub fn port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }

    /// The configuration this server was created with.
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }
}

impl<S: Serializer, M: Payload> std::fmt::Debug for Server<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr())
            .field("running", &self.running())
            .field("clients", &self.inner.registry.len())
            .finish()
    }
}

impl<S: Serializer, M: Payload> ServerInner<S, M> {
    async fn shut_down(&self) {
        let Some(was_running) = self.lifecycle.begin_shutdown() else {
            // Another caller is tearing down
            self.lifecycle.sync().await;
            return;
        };
        info!(was_running, "server shutting down");

        for handle in self.registry.close() {
            handle.local_shut_down().await;
            handle.lifecycle().sync().await;
        }

        self.lifecycle.finish_shutdown();
        debug!("server shut down");
    }

    /// Reports a fatal callback fault; the supervisor shuts the server down.
    fn raise(&self, error: TetherError) {
        error!(%error, "fatal callback fault, shutting server down");
        self.fault.notify_one();
    }

    async fn client_gone(&self, id: ClientId) {
        if let Err(payload) = AssertUnwindSafe(self.hooks.disconnection_init(id))
            .catch_unwind()
            .await
        {
            self.raise(TetherError::panicked("disconnection_init", payload.as_ref()));
        }
        if let Err(error) = self
            .listeners
            .notify("client_disconnected", |l| l.client_disconnected(id))
        {
            self.raise(error);
        }
        info!(client_id = %id, "client disconnected");
    }

    async fn dispatch(&self, id: ClientId, packet: Packet<M>) -> Result<(), TetherError> {
        let item = match Item::try_from(packet) {
            Ok(item) => item,
            Err(stray) => {
                warn!(client_id = %id, %stray, "ignoring client id sent by a client");
                return Ok(());
            }
        };

        match item {
            Item::Command(command) => {
                let disconnect = command.is_client(ClientCommand::Disconnect);
                let filtered = guarded("command_received_init", || {
                    self.hooks.command_received_init(id, command)
                })?;
                match filtered {
                    Some(command) => self
                        .listeners
                        .notify("command_received", |l| l.command_received(id, &command))?,
                    None => trace!(client_id = %id, "inbound command dropped by filter"),
                }
                if disconnect {
                    debug!(client_id = %id, "client requested disconnect");
                    if let Some(handle) = self.registry.get(id) {
                        handle.local_shut_down().await;
                    }
                }
            }
            Item::Message(message) => {
                let filtered = guarded("message_received_init", || {
                    self.hooks.message_received_init(id, message)
                })?;
                match filtered {
                    Some(message) => self
                        .listeners
                        .notify("message_received", |l| l.message_received(id, &message))?,
                    None => trace!(client_id = %id, "inbound message dropped by filter"),
                }
            }
        }
        Ok(())
    }

    /// Handshakes one accepted socket and, on success, promotes it.
    #[instrument(skip_all, fields(transport_id = %transport.metadata().id))]
    async fn admit(self: Arc<Self>, transport: TcpTransport) {
        let peer_addr = transport.metadata().peer_addr;
        let transport = match guarded("wrap_transport", || {
            self.hooks.wrap_transport(Box::new(transport))
        }) {
            Ok(transport) => transport,
            Err(error) => {
                self.raise(error);
                return;
            }
        };

        let (mut reader, mut writer) =
            open_streams(&self.serializer, transport, self.config.max_frame_size);
        let timeout = self.config.handshake_timeout;

        let handshake = tokio::select! {
            _ = self.lifecycle.stopped() => Err(HandshakeError::ShuttingDown),
            result = tokio::time::timeout(
                timeout,
                server_handshake(
                    &mut reader,
                    &mut writer,
                    &self.allocator,
                    &self.registry,
                    self.hooks.as_ref(),
                ),
            ) => result.unwrap_or(Err(HandshakeError::Timeout { duration: timeout })),
        };

        match handshake {
            Ok(reservation) => self.promote(reservation, reader, writer, peer_addr).await,
            Err(error) => {
                let reply = error.reply();
                if error.is_fatal() {
                    self.raise(TetherError::Handshake(error));
                } else {
                    debug!(?peer_addr, %error, "handshake failed");
                }
                refuse(&mut writer, reply, timeout).await;
            }
        }
    }

    async fn promote(
        self: &Arc<Self>,
        reservation: Reservation<'_, ClientHandle<S, M>>,
        reader: TransportReader<S>,
        writer: TransportWriter<S>,
        peer_addr: Option<SocketAddr>,
    ) {
        let id = reservation.id();
        let handle = Arc::new(ClientHandle::new(
            id,
            peer_addr,
            writer,
            Arc::downgrade(self),
        ));
        if !handle.lifecycle().try_start() || !handle.lifecycle().mark_running() {
            return;
        }

        {
            let mut writer = handle.writer().lock().await;
            if !reservation.activate(handle.clone()) {
                debug!(client_id = %id, "server closed during handshake");
                handle.lifecycle().abort_start();
                let _ = writer.close().await;
                return;
            }
            if let Err(error) = writer.send_command(ServerCommand::Connected).await {
                debug!(client_id = %id, %error, "failed to confirm connection");
            }
        }

        info!(client_id = %id, ?peer_addr, "client connected");
        if let Err(error) = self
            .listeners
            .notify("client_connected", |l| l.client_connected(id))
        {
            self.raise(error);
        }

        tokio::spawn(read_loop(handle, reader, self.inbound.clone()));
    }
}

/// Answers a failed handshake and closes the stream.
async fn refuse<S: Serializer>(
    writer: &mut TransportWriter<S>,
    reply: Option<ServerCommand>,
    timeout: Duration,
) {
    let farewell = async {
        if let Some(reply) = reply {
            let _ = writer.send_command(reply).await;
        }
        let _ = writer.close().await;
    };
    if tokio::time::timeout(timeout, farewell).await.is_err() {
        debug!("peer stopped reading during handshake refusal");
    }
}

/// Shuts the server down when a callback fault is raised.
async fn supervise<S: Serializer, M: Payload>(inner: Arc<ServerInner<S, M>>) {
    tokio::select! {
        _ = inner.fault.notified() => inner.shut_down().await,
        _ = inner.lifecycle.stopped() => {}
    }
}

async fn accept_loop<S: Serializer, M: Payload>(inner: Arc<ServerInner<S, M>>, listener: TcpListener) {
    loop {
        let accepted = tokio::select! {
            _ = inner.lifecycle.stopped() => break,
            accepted = TcpTransport::accept(&listener) => accepted,
        };

        match accepted {
            Ok(transport) => {
                if let Err(error) = transport.set_nodelay(inner.config.nodelay) {
                    debug!(
                        transport_id = %transport.metadata().id,
                        %error,
                        "failed to set TCP_NODELAY"
                    );
                }
                tokio::spawn(inner.clone().admit(transport));
            }
            Err(error) => {
                warn!(%error, "failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
    debug!("accept loop stopped");
}

async fn dispatch_loop<S: Serializer, M: Payload>(
    inner: Arc<ServerInner<S, M>>,
    mut receiver: mpsc::UnboundedReceiver<Inbound<M>>,
) {
    loop {
        let (id, packet) = tokio::select! {
            biased;
            _ = inner.lifecycle.stopped() => break,
            next = receiver.recv() => match next {
                Some(next) => next,
                None => break,
            },
        };

        if let Err(error) = inner.dispatch(id, packet).await {
            inner.raise(error);
            break;
        }
    }
    debug!("dispatch loop stopped");
}
