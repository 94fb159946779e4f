// API для отправки и получения сообщений
// Шифрование на отправке, расшифровка на приёме, очередь до завершения обмена ключами

use crate::config::Config;
use crate::crypto::{CryptoProvider, MessageCipher};
use crate::protocol::messages::{ClientEvent, IncomingMessageData, OutgoingMessageData};
use crate::protocol::transport::EventTransport;
use crate::state::conversation::ChatMessage;
use crate::state::pairing::PairingState;
use crate::state::session::SessionContext;
use crate::utils::error::{ChatError, Result};
use crate::utils::time::{current_timestamp_millis, from_millis};
use crate::utils::uuid::generate_v4;
use std::collections::VecDeque;
use std::marker::PhantomData;
use tracing::{debug, trace, warn};

/// Зашифрованное сообщение в том виде, как его доставил сервер
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    /// Имя отправителя по версии сервера
    pub sender_ref: String,
    pub ciphertext: Vec<u8>,
    pub sent_at_epoch_millis: i64,
}

impl From<IncomingMessageData> for EncryptedEnvelope {
    fn from(data: IncomingMessageData) -> Self {
        Self {
            sender_ref: data.from,
            ciphertext: data.text,
            sent_at_epoch_millis: data.time,
        }
    }
}

/// Результат приёма одного конверта
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Расшифровано и добавлено в беседу
    Delivered(ChatMessage),
    /// Обмен ключами ещё не завершён, конверт ждёт в очереди
    Queued,
}

pub struct MessagingPipeline<P: CryptoProvider> {
    pending: VecDeque<EncryptedEnvelope>,
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> Default for MessagingPipeline<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: CryptoProvider> MessagingPipeline<P> {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            _phantom: PhantomData,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Зашифровать и отправить текст собеседнику.
    ///
    /// Только в `Active`. Сообщение попадает в беседу как исходящее.
    pub fn send_text(
        &mut self,
        state: PairingState,
        ctx: &mut SessionContext<P>,
        transport: &mut dyn EventTransport,
        text: &str,
    ) -> Result<ChatMessage> {
        if state != PairingState::Active {
            return Err(ChatError::InvalidState(format!(
                "cannot send message in state {:?}",
                state
            )));
        }

        let ciphertext =
            MessageCipher::<P>::encrypt(text, ctx.keys().peer_public_key()).map_err(ChatError::Crypto)?;
        let time = current_timestamp_millis();

        transport.emit(&ClientEvent::SendMessage(OutgoingMessageData {
            text: ciphertext,
            time,
        }))?;

        let message = ChatMessage {
            id: generate_v4(),
            sender: ctx.nickname().unwrap_or_default().to_string(),
            text: text.to_string(),
            sent_at: from_millis(time),
            outgoing: true,
        };
        ctx.conversation_mut().add_message(message.clone());
        trace!(target: "api::messaging", id = %message.id, "Message sent");
        Ok(message)
    }

    /// Принять зашифрованный конверт.
    ///
    /// В `Active` расшифровывает сразу. В `KeyExchangePending` откладывает
    /// (ограниченная очередь). В остальных состояниях конверт отклоняется.
    pub fn on_ciphertext_received(
        &mut self,
        state: PairingState,
        ctx: &mut SessionContext<P>,
        envelope: EncryptedEnvelope,
    ) -> Result<Delivery> {
        match state {
            PairingState::Active => self.decrypt_into(ctx, envelope).map(Delivery::Delivered),
            PairingState::KeyExchangePending => {
                let limit = Config::global().max_pending_envelopes;
                if self.pending.len() >= limit {
                    warn!(target: "api::messaging", limit, "Pending queue full, envelope dropped");
                    return Err(ChatError::InvalidState(format!(
                        "pending message queue is full ({} envelopes)",
                        limit
                    )));
                }
                debug!(target: "api::messaging", "Envelope queued until key exchange completes");
                self.pending.push_back(envelope);
                Ok(Delivery::Queued)
            }
            other => Err(ChatError::InvalidState(format!(
                "cannot receive message in state {:?}",
                other
            ))),
        }
    }

    /// Расшифровать всё, что накопилось до перехода в `Active`.
    ///
    /// Порядок сохраняется; ошибка одного конверта не останавливает остальные.
    pub fn drain_pending(&mut self, ctx: &mut SessionContext<P>) -> Vec<Result<ChatMessage>> {
        let mut results = Vec::with_capacity(self.pending.len());
        while let Some(envelope) = self.pending.pop_front() {
            results.push(self.decrypt_into(ctx, envelope));
        }
        results
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn decrypt_into(
        &self,
        ctx: &mut SessionContext<P>,
        envelope: EncryptedEnvelope,
    ) -> Result<ChatMessage> {
        let text = MessageCipher::<P>::decrypt(&envelope.ciphertext, ctx.keys().self_private_key())
            .map_err(|e| {
                warn!(target: "api::messaging", error = %e, "Failed to decrypt message");
                ChatError::Decryption(e)
            })?;

        let sender = ctx
            .peer()
            .map(|peer| peer.display_name.clone())
            .unwrap_or(envelope.sender_ref);

        let message = ChatMessage {
            id: generate_v4(),
            sender,
            text,
            sent_at: from_millis(envelope.sent_at_epoch_millis),
            outgoing: false,
        };
        ctx.conversation_mut().add_message(message.clone());
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::suites::classic::ClassicSuiteProvider;
    use crate::protocol::transport::ChannelTransport;

    type Ctx = SessionContext<ClassicSuiteProvider>;
    type Pipeline = MessagingPipeline<ClassicSuiteProvider>;

    fn paired() -> (Ctx, Ctx) {
        let mut alice = Ctx::new().unwrap();
        let mut bob = Ctx::new().unwrap();
        let alice_key = alice.keys().export_self_public_key().unwrap();
        let bob_key = bob.keys().export_self_public_key().unwrap();
        alice.keys_mut().import_peer_public_key(&bob_key).unwrap();
        bob.keys_mut().import_peer_public_key(&alice_key).unwrap();
        (alice, bob)
    }

    fn connected_transport() -> (ChannelTransport, tokio::sync::mpsc::UnboundedReceiver<crate::protocol::WireEvent>) {
        let (mut transport, rx) = ChannelTransport::new();
        transport.connect().unwrap();
        transport.mark_connected();
        (transport, rx)
    }

    fn envelope_for(ctx: &Ctx, text: &str) -> EncryptedEnvelope {
        let peer = ctx.keys().self_public_key();
        EncryptedEnvelope {
            sender_ref: "alice".to_string(),
            ciphertext: MessageCipher::<ClassicSuiteProvider>::encrypt(text, Some(peer)).unwrap(),
            sent_at_epoch_millis: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_send_emits_ciphertext_not_plaintext() {
        let (mut alice, _bob) = paired();
        let (mut transport, mut rx) = connected_transport();
        let mut pipeline = Pipeline::new();

        let sent = pipeline
            .send_text(PairingState::Active, &mut alice, &mut transport, "hi bob")
            .unwrap();
        assert!(sent.outgoing);
        assert_eq!(alice.conversation().message_count(), 1);

        let wire = rx.try_recv().unwrap();
        assert_eq!(wire.name, "send message");
        let body = serde_json::to_string(&wire.payload).unwrap();
        assert!(!body.contains("hi bob"));
    }

    #[test]
    fn test_send_requires_active() {
        let (mut alice, _bob) = paired();
        let (mut transport, mut rx) = connected_transport();
        let mut pipeline = Pipeline::new();

        let result = pipeline.send_text(PairingState::KeyExchangePending, &mut alice, &mut transport, "x");
        assert!(matches!(result, Err(ChatError::InvalidState(_))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_receive_in_active_decrypts() {
        let (_alice, mut bob) = paired();
        let mut pipeline = Pipeline::new();

        let envelope = envelope_for(&bob, "hello");
        let delivery = pipeline
            .on_ciphertext_received(PairingState::Active, &mut bob, envelope)
            .unwrap();
        match delivery {
            Delivery::Delivered(message) => {
                assert_eq!(message.text, "hello");
                assert_eq!(message.sender, "alice");
                assert!(!message.outgoing);
            }
            Delivery::Queued => panic!("expected delivery"),
        }
        assert_eq!(bob.conversation().unread_count(), 1);
    }

    #[test]
    fn test_receive_while_pending_queues_then_drains_in_order() {
        let (_alice, mut bob) = paired();
        let mut pipeline = Pipeline::new();

        for text in ["one", "two"] {
            let envelope = envelope_for(&bob, text);
            let delivery = pipeline
                .on_ciphertext_received(PairingState::KeyExchangePending, &mut bob, envelope)
                .unwrap();
            assert_eq!(delivery, Delivery::Queued);
        }
        assert_eq!(pipeline.pending_count(), 2);
        assert_eq!(bob.conversation().message_count(), 0);

        let texts: Vec<_> = pipeline
            .drain_pending(&mut bob)
            .into_iter()
            .map(|r| r.unwrap().text)
            .collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_eq!(pipeline.pending_count(), 0);
    }

    #[test]
    fn test_receive_outside_session_is_rejected() {
        let (_alice, mut bob) = paired();
        let mut pipeline = Pipeline::new();
        let envelope = envelope_for(&bob, "late");

        let result = pipeline.on_ciphertext_received(PairingState::Terminated, &mut bob, envelope);
        assert!(matches!(result, Err(ChatError::InvalidState(_))));
        assert_eq!(pipeline.pending_count(), 0);
    }

    #[test]
    fn test_garbage_ciphertext_is_decryption_error() {
        let (_alice, mut bob) = paired();
        let mut pipeline = Pipeline::new();
        let envelope = EncryptedEnvelope {
            sender_ref: "alice".to_string(),
            ciphertext: vec![7u8; 80],
            sent_at_epoch_millis: 0,
        };

        let result = pipeline.on_ciphertext_received(PairingState::Active, &mut bob, envelope);
        assert!(matches!(result, Err(ChatError::Decryption(_))));
        assert_eq!(bob.conversation().message_count(), 0);
    }
}
