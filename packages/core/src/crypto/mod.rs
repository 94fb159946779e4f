//! Криптографический модуль
//!
//! # Архитектура
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              MessagingPipeline / PairingStateMachine        │
//! └─────────────────────────────────────────────────────────────┘
//!                │                           │
//!                ▼                           ▼
//! ┌───────────────────────────┐  ┌──────────────────────────┐
//! │   SessionKeyManager       │  │  MessageCipher           │
//! │  - пара ключей сессии     │  │  - encrypt(peer_public)  │
//! │  - ключ собеседника       │  │  - decrypt(self_private) │
//! │  - reset / export / import│  │  - без состояния         │
//! └───────────────────────────┘  └──────────────────────────┘
//!                │                           │
//!                └─────────────┬─────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              CryptoProvider (Crypto-Agility)                │
//! │  - KEM (X25519)                                             │
//! │  - AEAD (ChaCha20-Poly1305)                                 │
//! │  - KDF (HKDF-SHA256)                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Ключи живут только в памяти и только одну сессию.

/// CryptoProvider trait для crypto-agility
pub mod provider;

/// Криптографические наборы
pub mod suites;

/// Гибридное шифрование сообщений
pub mod cipher;

/// Ключи сессии
pub mod keys;

pub use cipher::MessageCipher;
pub use keys::{KeyPair, PublicKeyDocument, SessionKeyManager};
pub use provider::CryptoProvider;

/// Идентификатор набора, передаётся в `PublicKeyDocument`
pub type SuiteID = u16;
