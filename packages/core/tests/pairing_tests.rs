//! End-to-end pairing tests
//!
//! Two clients talk through a minimal in-process relay that mimics the
//! room server: first entry waits, second entry pairs, keys and messages
//! are forwarded to the other side.

use paircode_core::crypto::suites::classic::ClassicSuiteProvider;
use paircode_core::crypto::MessageCipher;
use paircode_core::protocol::wire::decode_client_event;
use paircode_core::protocol::{ChannelTransport, ClientEvent, WireEvent};
use paircode_core::state::pairing::PairingConflict;
use paircode_core::utils::b64;
use paircode_core::utils::logging::init_logging;
use paircode_core::{ChatClient, ChatError, Notification, PairingState};
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

type Client = ChatClient<ClassicSuiteProvider, ChannelTransport>;

struct Peer {
    client: Client,
    outgoing: UnboundedReceiver<WireEvent>,
    notes: UnboundedReceiver<Notification>,
    /// Всё, что клиент отправил на сервер
    sent: Vec<WireEvent>,
}

impl Peer {
    fn connected() -> Self {
        init_logging();
        let (transport, outgoing) = ChannelTransport::new();
        let (mut client, notes) = Client::new(transport).unwrap();
        client.connect().unwrap();
        client.handle_wire_event(&WireEvent::new("connected", None)).unwrap();
        Self {
            client,
            outgoing,
            notes,
            sent: Vec::new(),
        }
    }

    fn deliver(&mut self, name: &str, payload: Option<serde_json::Value>) -> paircode_core::Result<()> {
        self.client.handle_wire_event(&WireEvent::new(name, payload))
    }

    /// Забрать новые исходящие события
    fn take_outgoing(&mut self) -> Vec<WireEvent> {
        let mut fresh = Vec::new();
        while let Ok(wire) = self.outgoing.try_recv() {
            self.sent.push(wire.clone());
            fresh.push(wire);
        }
        fresh
    }

    fn exits_sent(&self) -> usize {
        self.sent.iter().filter(|w| w.name == "exit").count()
    }

    fn notifications(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = self.notes.try_recv() {
            out.push(n);
        }
        out
    }
}

/// Сервер комнаты на одну пару
#[derive(Default)]
struct Relay {
    /// (индекс клиента, имя) в порядке входа
    entered: Vec<(usize, String)>,
    paired: bool,
}

impl Relay {
    /// Передавать события, пока обе стороны не затихнут
    fn pump(&mut self, peers: &mut [&mut Peer; 2]) {
        loop {
            let mut moved = false;
            for from in 0..2 {
                for wire in peers[from].take_outgoing() {
                    moved = true;
                    self.route(from, &wire, peers);
                }
            }
            if !moved {
                break;
            }
        }
    }

    fn route(&mut self, from: usize, wire: &WireEvent, peers: &mut [&mut Peer; 2]) {
        let other = 1 - from;
        let event = decode_client_event(wire).unwrap();
        let result = match event {
            ClientEvent::Entry(entry) => {
                self.entered.push((from, entry.name));
                if self.entered.len() == 1 {
                    peers[from].deliver("entry: await", None)
                } else {
                    self.paired = true;
                    let (first, first_name) = self.entered[0].clone();
                    let (second, second_name) = self.entered[1].clone();
                    peers[first]
                        .deliver("entry: success", Some(json!({ "chattingWith": second_name })))
                        .and_then(|_| {
                            peers[second].deliver(
                                "entry: success",
                                Some(json!({ "chattingWith": first_name })),
                            )
                        })
                }
            }
            ClientEvent::SendKey(_) => peers[other].deliver("receive key", wire.payload.clone()),
            ClientEvent::SendMessage(message) => {
                let from_name = self
                    .entered
                    .iter()
                    .find(|(index, _)| *index == from)
                    .map(|(_, name)| name.clone())
                    .unwrap_or_default();
                peers[other].deliver(
                    "receive message",
                    Some(json!({
                        "from": from_name,
                        "text": b64::encode(&message.text),
                        "time": message.time,
                    })),
                )
            }
            ClientEvent::Exit => {
                if self.paired {
                    self.paired = false;
                    peers[other].deliver("user exited", None)
                } else {
                    Ok(())
                }
            }
        };
        result.unwrap();
    }
}

fn pair(alice: &mut Peer, bob: &mut Peer, relay: &mut Relay) {
    alice.client.submit_entry("Alice", "1234").unwrap();
    relay.pump(&mut [&mut *alice, &mut *bob]);
    assert_eq!(alice.client.state(), PairingState::AwaitingPeer);

    bob.client.submit_entry("bob", "1234").unwrap();
    relay.pump(&mut [&mut *alice, &mut *bob]);
}

/// Entry on a connected session emits `entry`, success starts the key exchange
#[test]
fn test_entry_success_starts_key_exchange() {
    let mut alice = Peer::connected();

    alice.client.submit_entry("alice", "1234").unwrap();
    let sent = alice.take_outgoing();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name, "entry");
    assert_eq!(sent[0].payload, Some(json!({ "name": "alice", "code": "1234" })));

    alice
        .deliver("entry: success", Some(json!({ "chattingWith": "bob" })))
        .unwrap();
    assert_eq!(alice.client.state(), PairingState::KeyExchangePending);

    let sent = alice.take_outgoing();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name, "send key");
    assert_eq!(
        alice.client.session().peer().map(|p| p.display_name.as_str()),
        Some("bob")
    );
}

/// Name occupied returns to Connected without creating key material
#[test]
fn test_name_occupied_allows_resubmission() {
    let mut alice = Peer::connected();

    alice.client.submit_entry("alice", "1234").unwrap();
    alice.deliver("entry: name occupied", None).unwrap();

    assert_eq!(alice.client.state(), PairingState::Connected);
    assert_eq!(alice.client.last_conflict(), Some(PairingConflict::NameOccupied));
    assert_eq!(alice.client.session().keys().generation(), 1);
    assert!(alice
        .notifications()
        .contains(&Notification::EntryRejected(PairingConflict::NameOccupied)));

    alice.client.submit_entry("alice2", "1234").unwrap();
    assert_eq!(alice.client.state(), PairingState::EntrySubmitted);
    let names: Vec<_> = alice.take_outgoing().into_iter().map(|w| w.name).collect();
    assert_eq!(names, vec!["entry", "entry"]);
}

/// Invalid input never reaches the transport
#[test]
fn test_invalid_entry_is_not_sent() {
    let mut alice = Peer::connected();

    let result = alice.client.submit_entry("9lives", "12");
    match result {
        Err(ChatError::Validation(errors)) => {
            assert!(errors.nickname.is_some());
            assert!(errors.room_code.is_some());
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(alice.client.state(), PairingState::Connected);
    assert!(alice.take_outgoing().is_empty());
}

/// Both clients become active and can exchange messages in both directions
#[test]
fn test_full_conversation_through_relay() {
    let mut alice = Peer::connected();
    let mut bob = Peer::connected();
    let mut relay = Relay::default();

    pair(&mut alice, &mut bob, &mut relay);
    assert_eq!(alice.client.state(), PairingState::Active);
    assert_eq!(bob.client.state(), PairingState::Active);

    alice.client.send_text("hi bob").unwrap();
    bob.client.send_text("hi alice, 你好").unwrap();
    relay.pump(&mut [&mut alice, &mut bob]);

    let bob_log = bob.client.conversation().messages();
    assert_eq!(bob_log.len(), 2);
    assert_eq!(bob_log[0].text, "hi alice, 你好");
    assert!(bob_log[0].outgoing);
    assert_eq!(bob_log[1].text, "hi bob");
    assert_eq!(bob_log[1].sender, "alice");

    let alice_last = alice.client.conversation().last_message().unwrap();
    assert_eq!(alice_last.text, "hi alice, 你好");
    assert_eq!(alice_last.sender, "bob");
    assert!(alice
        .notifications()
        .iter()
        .any(|n| *n == Notification::SessionActive));
}

/// A message that arrives before the key exchange is never decrypted early
#[test]
fn test_message_before_active_is_held() {
    let mut alice = Peer::connected();
    let bob_keys = paircode_core::state::SessionContext::<ClassicSuiteProvider>::new().unwrap();

    alice.client.submit_entry("alice", "1234").unwrap();
    alice
        .deliver("entry: success", Some(json!({ "chattingWith": "bob" })))
        .unwrap();

    let ciphertext = MessageCipher::<ClassicSuiteProvider>::encrypt(
        "hello alice",
        Some(alice.client.session().keys().self_public_key()),
    )
    .unwrap();
    alice
        .deliver(
            "receive message",
            Some(json!({ "from": "bob", "text": b64::encode(&ciphertext), "time": 1234567 })),
        )
        .unwrap();

    assert_eq!(alice.client.state(), PairingState::KeyExchangePending);
    assert_eq!(alice.client.conversation().message_count(), 0);
    assert_eq!(alice.client.pending_messages(), 1);

    let key = bob_keys.keys().export_self_public_key().unwrap();
    alice
        .deliver("receive key", Some(json!({ "publicKey": b64::encode(&key) })))
        .unwrap();

    assert_eq!(alice.client.state(), PairingState::Active);
    let message = alice.client.conversation().last_message().unwrap();
    assert_eq!(message.text, "hello alice");
    assert_eq!(message.sender, "bob");
    assert_eq!(message.sent_at.timestamp_millis(), 1234567);
}

/// Peer leaving ends the session with a single `exit` and no key material left
#[test]
fn test_user_exited_terminates_once() {
    let mut alice = Peer::connected();
    let mut bob = Peer::connected();
    let mut relay = Relay::default();
    pair(&mut alice, &mut bob, &mut relay);

    bob.client.exit().unwrap();
    relay.pump(&mut [&mut alice, &mut bob]);

    assert_eq!(bob.client.state(), PairingState::Idle);
    assert_eq!(alice.client.state(), PairingState::Terminated);
    assert!(!alice.client.session().keys().has_peer_public_key());
    assert!(alice.notifications().contains(&Notification::PeerExited));

    alice.client.exit().unwrap();
    relay.pump(&mut [&mut alice, &mut bob]);

    assert_eq!(alice.client.state(), PairingState::Idle);
    assert_eq!(alice.exits_sent(), 1);
    assert_eq!(bob.exits_sent(), 1);
    assert!(alice.client.session().peer().is_none());
    assert_eq!(alice.client.conversation().message_count(), 0);
}

/// Ciphertext addressed to a previous session's key does not open after reset
#[test]
fn test_stale_ciphertext_fails_after_new_session() {
    let mut alice = Peer::connected();
    let mut bob = Peer::connected();
    let mut relay = Relay::default();
    pair(&mut alice, &mut bob, &mut relay);

    let stale = MessageCipher::<ClassicSuiteProvider>::encrypt(
        "old",
        Some(alice.client.session().keys().self_public_key()),
    )
    .unwrap();

    alice.client.exit().unwrap();
    relay.pump(&mut [&mut alice, &mut bob]);
    assert_eq!(bob.client.state(), PairingState::Terminated);
    bob.client.exit().unwrap();

    let mut relay = Relay::default();
    alice.client.connect().unwrap();
    bob.client.connect().unwrap();
    pair(&mut alice, &mut bob, &mut relay);
    assert_eq!(alice.client.state(), PairingState::Active);
    alice.notifications();

    let result = alice.deliver(
        "receive message",
        Some(json!({ "from": "bob", "text": b64::encode(&stale), "time": 0 })),
    );
    assert!(matches!(result, Err(ChatError::Decryption(_))));
    assert_eq!(alice.client.state(), PairingState::Active);
    assert!(alice
        .notifications()
        .iter()
        .any(|n| matches!(n, Notification::MessageDropped { .. })));
}

/// Unknown or malformed events are protocol errors and change nothing
#[test]
fn test_malformed_events_are_rejected() {
    let mut alice = Peer::connected();
    alice.client.submit_entry("alice", "1234").unwrap();

    assert!(matches!(alice.deliver("bogus", None), Err(ChatError::Protocol(_))));
    assert!(matches!(
        alice.deliver("entry: success", Some(json!({ "who": "bob" }))),
        Err(ChatError::Protocol(_))
    ));
    assert_eq!(alice.client.state(), PairingState::EntrySubmitted);
}
