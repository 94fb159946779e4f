//! Криптографические наборы (Crypto Suites)
//!
//! Этот модуль содержит реализации CryptoProvider trait.
//!
//! ## Classic Suite
//! - **KEM**: X25519 (ECDH на Curve25519, ephemeral-static)
//! - **AEAD**: ChaCha20-Poly1305
//! - **KDF**: HKDF-SHA256
//! - **Suite ID**: 1
//!
//! ## Выбор suite
//!
//! ```rust
//! use paircode_core::crypto::suites::classic::ClassicSuiteProvider;
//! use paircode_core::crypto::provider::CryptoProvider;
//!
//! type MySuite = ClassicSuiteProvider;
//!
//! let (private_key, public_key) = MySuite::generate_kem_keys().unwrap();
//! assert_eq!(public_key.len(), 32);
//! # drop(private_key);
//! ```

pub mod classic;
