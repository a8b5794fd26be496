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

//! Integration tests for message and command traffic.

mod common;

use common::*;
use parking_lot::Mutex;
use std::sync::mpsc as std_mpsc;
use tether::serialization::PostcardSerializer;
use tether::{Client, ClientHooks, ClientId, Command, Item, Server, ServerHooks};

const NOBODY: ClientId = ClientId::UNASSIGNED;

#[tokio::test]
async fn test_round_trip_both_directions() {
    let server = start_server().await;
    let server_events = Recorder::new();
    server.add_listener(server_events.clone());
    let (client, client_events) = connect(&server).await;
    let id = client.client_id();

    assert!(client.send("ping".to_string()).await);
    server_events
        .wait_for(Event::Message(id, "ping".to_string()))
        .await;
    assert!(client_events.events().contains(&Event::MessageSent(NOBODY, "ping".to_string())));

    assert!(server.send("pong".to_string(), id).await);
    client_events
        .wait_for(Event::Message(NOBODY, "pong".to_string()))
        .await;
    assert!(server_events.events().contains(&Event::MessageSent(id, "pong".to_string())));

    server.shut_down().await;
}

#[tokio::test]
async fn test_custom_commands_are_classified_as_commands() {
    let server = start_server().await;
    let server_events = Recorder::new();
    server.add_listener(server_events.clone());
    let (client, client_events) = connect(&server).await;
    let id = client.client_id();

    assert!(client.send_command(Command::custom("refresh")).await);
    server_events
        .wait_for(Event::Command(id, Command::custom("refresh")))
        .await;
    assert!(server_events.messages().is_empty());
    assert!(client_events
        .events()
        .contains(&Event::CommandSent(NOBODY, Command::custom("refresh"))));

    let handle = server.get_client(id).unwrap();
    assert!(handle.send_command(Command::custom("refreshed")).await);
    client_events
        .wait_for(Event::Command(NOBODY, Command::custom("refreshed")))
        .await;

    server.shut_down().await;
}

#[tokio::test]
async fn test_per_connection_order_is_preserved() {
    let server = start_server().await;
    let server_events = Recorder::new();
    server.add_listener(server_events.clone());
    let (client, client_events) = connect(&server).await;
    let id = client.client_id();

    let sent: Vec<String> = (0..100).map(|i| format!("message-{}", i)).collect();
    for message in ["A", "B", "C"].iter().map(|s| s.to_string()).chain(sent.clone()) {
        assert!(client.send(message).await);
    }
    wait_until(|| server_events.messages().len() == 103).await;

    let received = server_events.messages();
    assert_eq!(&received[..3], &["A", "B", "C"]);
    assert_eq!(&received[3..], &sent[..]);

    for message in ["A", "B", "C"] {
        assert!(server.send(message.to_string(), id).await);
    }
    wait_until(|| client_events.messages().len() == 3).await;
    assert_eq!(client_events.messages(), vec!["A", "B", "C"]);

    server.shut_down().await;
}

#[tokio::test]
async fn test_send_to_all_reaches_every_client() {
    let server = start_server().await;
    let (first, first_events) = connect(&server).await;
    let (second, second_events) = connect(&server).await;
    assert_ne!(first.client_id(), second.client_id());

    assert!(server.send_to_all("news".to_string()).await);

    first_events
        .wait_for(Event::Message(NOBODY, "news".to_string()))
        .await;
    second_events
        .wait_for(Event::Message(NOBODY, "news".to_string()))
        .await;

    server.shut_down().await;
}

/// Holds the first outbound send until the test lets it continue.
///
/// The hook blocks a runtime worker, so it signals through std channels only.
struct Stall {
    first: Mutex<Option<std_mpsc::Sender<ClientId>>>,
    resume: Mutex<Option<std_mpsc::Receiver<()>>>,
}

impl ServerHooks<PostcardSerializer, String> for Stall {
    fn send_init(&self, id: ClientId, item: Item<String>) -> Option<Item<String>> {
        let first = self.first.lock().take();
        if let Some(first) = first {
            let _ = first.send(id);
            let resume = self.resume.lock().take();
            if let Some(resume) = resume {
                let _ = resume.recv_timeout(WAIT);
            }
        }
        Some(item)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_send_to_all_reports_client_lost_mid_broadcast() {
    init_tracing();
    let (first_tx, first_rx) = std_mpsc::channel();
    let (resume_tx, resume_rx) = std_mpsc::channel();
    let server: TestServer = Server::with_hooks(
        PostcardSerializer::default(),
        server_config(),
        Stall {
            first: Mutex::new(Some(first_tx)),
            resume: Mutex::new(Some(resume_rx)),
        },
    );
    assert!(server.start().await);

    let (a, a_events) = connect(&server).await;
    let (b, b_events) = connect(&server).await;

    let broadcast = {
        let server = server.clone();
        tokio::spawn(async move { server.send_to_all("news".to_string()).await })
    };

    let first = within(tokio::task::spawn_blocking(move || first_rx.recv_timeout(WAIT)))
        .await
        .unwrap()
        .unwrap();
    let (stays, stays_events, leaves) = if first == a.client_id() {
        (&a, &a_events, &b)
    } else {
        (&b, &b_events, &a)
    };

    let leaving_id = leaves.client_id();
    leaves.shut_down().await;
    wait_until(|| !server.contains_id(leaving_id)).await;
    resume_tx.send(()).unwrap();

    assert!(!within(broadcast).await.unwrap());
    stays_events
        .wait_for(Event::Message(NOBODY, "news".to_string()))
        .await;
    assert!(stays.running());

    server.shut_down().await;
}

#[tokio::test]
async fn test_send_fails_when_not_running() {
    let server = start_server().await;
    let (client, _) = connect(&server).await;
    let id = client.client_id();

    assert!(!server.send("hello".to_string(), ClientId::from(id.as_i32().wrapping_add(1))).await);

    client.shut_down().await;
    assert!(!client.send("late".to_string()).await);
    wait_until(|| !server.contains_id(id)).await;
    assert!(!server.send("late".to_string(), id).await);

    server.shut_down().await;
    assert!(!server.send_to_all("late".to_string()).await);
}

struct Censor;

impl ServerHooks<PostcardSerializer, String> for Censor {
    fn message_received_init(&self, _id: ClientId, message: String) -> Option<String> {
        if message.starts_with("secret") {
            None
        } else {
            Some(message.to_uppercase())
        }
    }

    fn command_received_init(&self, _id: ClientId, command: Command) -> Option<Command> {
        match command {
            Command::Custom(name) if name == "noise" => None,
            other => Some(other),
        }
    }
}

struct Outbox;

impl ClientHooks<PostcardSerializer, String> for Outbox {
    fn send_init(&self, item: Item<String>) -> Option<Item<String>> {
        match item {
            Item::Message(message) if message == "forbidden" => None,
            other => Some(other),
        }
    }
}

#[tokio::test]
async fn test_filters_transform_and_veto() {
    init_tracing();
    let server: TestServer =
        Server::with_hooks(PostcardSerializer::default(), server_config(), Censor);
    let server_events = Recorder::new();
    server.add_listener(server_events.clone());
    assert!(server.start().await);

    let client: TestClient = Client::with_hooks(
        PostcardSerializer::default(),
        client_config(server.local_addr().unwrap()),
        Outbox,
    );
    let client_events = Recorder::new();
    client.add_listener(client_events.clone());
    assert!(client.start().await);
    let id = client.client_id();

    assert!(!client.send("forbidden".to_string()).await);
    assert!(client.send("secret plans".to_string()).await);
    assert!(client.send_command(Command::custom("noise")).await);
    assert!(client.send("hello".to_string()).await);
    assert!(client.send_command(Command::custom("signal")).await);

    server_events
        .wait_for(Event::Command(id, Command::custom("signal")))
        .await;
    assert_eq!(server_events.messages(), vec!["HELLO"]);
    assert_eq!(
        server_events.count(|e| matches!(e, Event::Command(..))),
        1
    );
    assert!(!client_events
        .events()
        .contains(&Event::MessageSent(NOBODY, "forbidden".to_string())));

    server.shut_down().await;
}

#[cfg(feature = "json")]
#[tokio::test]
async fn test_json_serializer_round_trip() {
    use tether::serialization::JsonSerializer;

    init_tracing();
    let server: Server<JsonSerializer, Vec<u32>> = Server::new(
        JsonSerializer::default(),
        server_config(),
    );
    assert!(server.start().await);

    let client: Client<JsonSerializer, Vec<u32>> = Client::new(
        JsonSerializer::default(),
        client_config(server.local_addr().unwrap()),
    );
    assert!(client.start().await);
    let id = client.client_id();
    assert!(server.contains_id(id));

    assert!(server.send(vec![1, 2, 3], id).await);
    assert!(client.send(vec![4, 5, 6]).await);

    server.shut_down().await;
}
