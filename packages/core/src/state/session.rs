// Контекст одной сессии
// Единственный владелец ключей и данных собеседника на устройстве

use crate::crypto::{CryptoProvider, SessionKeyManager};
use crate::state::conversation::Conversation;
use crate::utils::error::Result;
use tracing::debug;

/// Собеседник, известный после `entry: success`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    pub display_name: String,
}

/// Всё, что принадлежит текущей попытке чата.
///
/// Создаётся один раз на клиента, `reset()` возвращает его в исходное
/// состояние со свежей парой ключей.
pub struct SessionContext<P: CryptoProvider> {
    keys: SessionKeyManager<P>,
    /// Никнейм в том виде, как его ввёл пользователь
    nickname: Option<String>,
    peer: Option<PeerIdentity>,
    self_key_sent: bool,
    exit_sent: bool,
    /// Ключ собеседника, пришедший раньше `entry: success`
    parked_peer_key: Option<Vec<u8>>,
    conversation: Conversation,
}

impl<P: CryptoProvider> SessionContext<P> {
    pub fn new() -> Result<Self> {
        Ok(Self {
            keys: SessionKeyManager::new()?,
            nickname: None,
            peer: None,
            self_key_sent: false,
            exit_sent: false,
            parked_peer_key: None,
            conversation: Conversation::new(),
        })
    }

    pub fn keys(&self) -> &SessionKeyManager<P> {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut SessionKeyManager<P> {
        &mut self.keys
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub(crate) fn set_nickname(&mut self, nickname: String) {
        self.nickname = Some(nickname);
    }

    pub fn peer(&self) -> Option<&PeerIdentity> {
        self.peer.as_ref()
    }

    pub(crate) fn set_peer(&mut self, peer: PeerIdentity) {
        self.peer = Some(peer);
    }

    pub fn self_key_sent(&self) -> bool {
        self.self_key_sent
    }

    pub(crate) fn mark_self_key_sent(&mut self) {
        self.self_key_sent = true;
    }

    pub fn exit_sent(&self) -> bool {
        self.exit_sent
    }

    pub(crate) fn mark_exit_sent(&mut self) {
        self.exit_sent = true;
    }

    pub(crate) fn park_peer_key(&mut self, bytes: Vec<u8>) -> bool {
        if self.parked_peer_key.is_some() {
            return false;
        }
        self.parked_peer_key = Some(bytes);
        true
    }

    pub(crate) fn take_parked_peer_key(&mut self) -> Option<Vec<u8>> {
        self.parked_peer_key.take()
    }

    /// Попытка входа закончилась без пары: забываем ник и
    /// отложенный ключ чужой комнаты.
    pub(crate) fn abandon_attempt(&mut self) {
        self.nickname = None;
        if self.parked_peer_key.take().is_some() {
            debug!(target: "state::session", "Dropped parked peer key of abandoned attempt");
        }
    }

    /// Обе половины обмена ключами выполнены
    pub fn key_exchange_complete(&self) -> bool {
        self.self_key_sent && self.keys.has_peer_public_key()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Сбросить только ключи: новая пара, ключа собеседника нет
    pub(crate) fn reset_keys(&mut self) -> Result<()> {
        self.parked_peer_key = None;
        self.keys.reset()
    }

    /// Полный сброс сессии перед новой попыткой
    pub fn reset(&mut self) -> Result<()> {
        self.nickname = None;
        self.peer = None;
        self.self_key_sent = false;
        self.exit_sent = false;
        self.parked_peer_key = None;
        self.conversation.clear();
        debug!(target: "state::session", "Session context cleared");
        self.keys.reset()
    }
}
