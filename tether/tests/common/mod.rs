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

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tether::endpoint::{ClientConfig, ServerConfig};
use tether::serialization::PostcardSerializer;
use tether::{Client, ClientId, ClientListener, Command, Server, ServerListener};

pub type TestServer = Server<PostcardSerializer, String>;
pub type TestClient = Client<PostcardSerializer, String>;

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn server_config() -> ServerConfig {
    ServerConfig::new("127.0.0.1:0").with_handshake_timeout(Duration::from_secs(2))
}

pub fn client_config(addr: impl ToString) -> ClientConfig {
    ClientConfig::new(addr.to_string()).with_handshake_timeout(Duration::from_secs(2))
}

pub async fn start_server() -> TestServer {
    init_tracing();
    let server = Server::new(PostcardSerializer::default(), server_config());
    assert!(server.start().await, "server failed to start");
    server
}

pub fn client_for(server: &TestServer) -> TestClient {
    let addr = server.local_addr().expect("server is bound");
    Client::new(PostcardSerializer::default(), client_config(addr))
}

pub async fn connect(server: &TestServer) -> (TestClient, Arc<Recorder>) {
    let client = client_for(server);
    let recorder = Recorder::new();
    client.add_listener(recorder.clone());
    assert!(client.start().await, "client failed to start");
    (client, recorder)
}

/// Polls `condition` until it holds, failing the test after [`WAIT`].
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let polled = tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "condition not met within {:?}", WAIT);
}

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("operation did not finish in time")
}

/// Everything a listener can observe. Client-side events carry
/// [`ClientId::UNASSIGNED`] where the callback has no ID.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connected(ClientId),
    Disconnected(ClientId),
    Message(ClientId, String),
    Command(ClientId, Command),
    MessageSent(ClientId, String),
    CommandSent(ClientId, Command),
}

#[derive(Debug, Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| matches(e)).count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                Event::Message(_, message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn wait_for(&self, event: Event) {
        wait_until(|| self.events.lock().contains(&event)).await;
    }

    fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

impl ServerListener<String> for Recorder {
    fn client_connected(&self, id: ClientId) {
        self.push(Event::Connected(id));
    }

    fn client_disconnected(&self, id: ClientId) {
        self.push(Event::Disconnected(id));
    }

    fn message_received(&self, id: ClientId, message: &String) {
        self.push(Event::Message(id, message.clone()));
    }

    fn command_received(&self, id: ClientId, command: &Command) {
        self.push(Event::Command(id, command.clone()));
    }

    fn message_sent(&self, id: ClientId, message: &String) {
        self.push(Event::MessageSent(id, message.clone()));
    }

    fn command_sent(&self, id: ClientId, command: &Command) {
        self.push(Event::CommandSent(id, command.clone()));
    }
}

impl ClientListener<String> for Recorder {
    fn connected(&self, id: ClientId) {
        self.push(Event::Connected(id));
    }

    fn disconnected(&self) {
        self.push(Event::Disconnected(ClientId::UNASSIGNED));
    }

    fn message_received(&self, message: &String) {
        self.push(Event::Message(ClientId::UNASSIGNED, message.clone()));
    }

    fn command_received(&self, command: &Command) {
        self.push(Event::Command(ClientId::UNASSIGNED, command.clone()));
    }

    fn message_sent(&self, message: &String) {
        self.push(Event::MessageSent(ClientId::UNASSIGNED, message.clone()));
    }

    fn command_sent(&self, command: &Command) {
        self.push(Event::CommandSent(ClientId::UNASSIGNED, command.clone()));
    }
}
