// Типы ошибок

use crate::error::CryptoError;
use crate::protocol::validation::EntryValidationError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Validation error: {0}")]
    Validation(#[from] EntryValidationError),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(CryptoError),

    #[error("Peer public key rejected: {0}")]
    PeerKey(CryptoError),

    #[error("Peer public key already imported for this session")]
    DuplicatePeerKey,

    #[error("Cryptography error: {0}")]
    Crypto(CryptoError),

    #[error("Decryption failed: {0}")]
    Decryption(CryptoError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChatError {
    /// Ошибки, после которых сессию нельзя продолжать
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChatError::KeyGeneration(_) | ChatError::PeerKey(_))
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(error: serde_json::Error) -> Self {
        ChatError::Serialization(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
