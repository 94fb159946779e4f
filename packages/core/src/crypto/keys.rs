// Управление сессионными ключами
// Одна пара ключей на сессию, ключ собеседника — не более одного

use crate::crypto::provider::CryptoProvider;
use crate::crypto::SuiteID;
use crate::error::CryptoError;
use crate::utils::b64;
use crate::utils::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

/// Пара ключей текущей сессии. Приватный ключ не экспортируется
/// и затирается при drop.
pub struct KeyPair<P: CryptoProvider> {
    public_key: P::KemPublicKey,
    private_key: P::KemPrivateKey,
}

impl<P: CryptoProvider> KeyPair<P> {
    pub fn generate() -> std::result::Result<Self, CryptoError> {
        let (private_key, public_key) = P::generate_kem_keys()?;
        Ok(Self {
            public_key,
            private_key,
        })
    }

    pub fn public_key(&self) -> &P::KemPublicKey {
        &self.public_key
    }

    pub(crate) fn private_key(&self) -> &P::KemPrivateKey {
        &self.private_key
    }
}

impl<P: CryptoProvider> Drop for KeyPair<P> {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.private_key);
    }
}

impl<P: CryptoProvider> fmt::Debug for KeyPair<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &b64::encode(self.public_key.as_ref()))
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Формат публичного ключа для передачи собеседнику (`send key` / `receive key`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyDocument {
    pub suite_id: SuiteID,
    /// Base64 публичного ключа
    pub public_key: String,
}

/// Владеет ключами одной сессии
pub struct SessionKeyManager<P: CryptoProvider> {
    key_pair: KeyPair<P>,
    peer_public_key: Option<P::KemPublicKey>,
    /// Счётчик поколений ключей, растёт при каждом reset
    generation: u64,
}

impl<P: CryptoProvider> SessionKeyManager<P> {
    /// Создать менеджер со свежей парой ключей
    pub fn new() -> Result<Self> {
        let key_pair = KeyPair::generate().map_err(ChatError::KeyGeneration)?;
        Ok(Self {
            key_pair,
            peer_public_key: None,
            generation: 1,
        })
    }

    /// Сгенерировать новую пару и забыть ключ собеседника.
    ///
    /// Ключ собеседника очищается даже при ошибке генерации;
    /// ошибка генерации фатальна для сессии.
    pub fn reset(&mut self) -> Result<()> {
        self.peer_public_key = None;
        let key_pair = KeyPair::generate().map_err(ChatError::KeyGeneration)?;
        self.key_pair = key_pair;
        self.generation += 1;

        debug!(
            target: "crypto::keys",
            generation = self.generation,
            "Session key pair regenerated"
        );
        Ok(())
    }

    /// Публичный ключ в формате, который импортирует собеседник
    pub fn export_self_public_key(&self) -> Result<Vec<u8>> {
        let document = PublicKeyDocument {
            suite_id: P::suite_id(),
            public_key: b64::encode(self.key_pair.public_key().as_ref()),
        };
        Ok(serde_json::to_vec(&document)?)
    }

    pub fn has_peer_public_key(&self) -> bool {
        self.peer_public_key.is_some()
    }

    /// Разобрать и сохранить ключ собеседника.
    ///
    /// Повторный импорт в рамках одной сессии отклоняется, сохранённый ключ
    /// не меняется.
    pub fn import_peer_public_key(&mut self, bytes: &[u8]) -> Result<()> {
        if self.peer_public_key.is_some() {
            warn!(
                target: "crypto::keys",
                generation = self.generation,
                "Rejected second peer public key for the same session"
            );
            return Err(ChatError::DuplicatePeerKey);
        }

        let peer_key = Self::parse_public_key_document(bytes).map_err(ChatError::PeerKey)?;
        self.peer_public_key = Some(peer_key);

        debug!(
            target: "crypto::keys",
            generation = self.generation,
            "Peer public key imported"
        );
        Ok(())
    }

    fn parse_public_key_document(bytes: &[u8]) -> std::result::Result<P::KemPublicKey, CryptoError> {
        let document: PublicKeyDocument = serde_json::from_slice(bytes)?;
        if document.suite_id != P::suite_id() {
            return Err(CryptoError::InvalidInputError(format!(
                "Unsupported suite id {}, expected {}",
                document.suite_id,
                P::suite_id()
            )));
        }
        let raw = b64::decode(&document.public_key).map_err(CryptoError::DeserializationError)?;
        P::kem_public_key_from_bytes(&raw)
    }

    pub fn peer_public_key(&self) -> Option<&P::KemPublicKey> {
        self.peer_public_key.as_ref()
    }

    pub fn self_public_key(&self) -> &P::KemPublicKey {
        self.key_pair.public_key()
    }

    pub(crate) fn self_private_key(&self) -> &P::KemPrivateKey {
        self.key_pair.private_key()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl<P: CryptoProvider> fmt::Debug for SessionKeyManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeyManager")
            .field("key_pair", &self.key_pair)
            .field("has_peer_public_key", &self.has_peer_public_key())
            .field("generation", &self.generation)
            .finish()
    }
}
