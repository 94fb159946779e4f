//! MessageCipher — гибридное шифрование сообщений (ECIES-подобная схема)
//!
//! Отправителю нужен только публичный ключ получателя.
//!
//! ```text
//! encrypt(plaintext, peer_public):
//!   (enc, ss)  = KEM.encapsulate(peer_public)        // ephemeral X25519
//!   key        = HKDF(salt = peer_public, ikm = enc || ss, info)
//!   ct || tag  = AEAD(key, nonce, plaintext, aad = enc)
//!   output     = enc:32 || nonce:12 || ct || tag:16
//! ```
//!
//! Компонент не хранит ключи между вызовами и ничего не логирует о них.

use crate::config::Config;
use crate::crypto::provider::CryptoProvider;
use crate::error::CryptoError;
use std::marker::PhantomData;
use zeroize::Zeroizing;

/// Stateless hybrid public-key cipher over a `CryptoProvider` suite.
pub struct MessageCipher<P: CryptoProvider> {
    _phantom: PhantomData<P>,
}

impl<P: CryptoProvider> MessageCipher<P> {
    /// Smallest input `decrypt` can accept: encapsulated key, nonce and tag.
    pub fn min_ciphertext_len() -> usize {
        let cfg = Config::global();
        P::encapsulated_key_len() + cfg.chacha_nonce_length + cfg.aead_tag_length
    }

    /// Зашифровать сообщение для собеседника.
    ///
    /// Отсутствие ключа собеседника — нарушение предусловия, а не сетевая ошибка.
    pub fn encrypt(
        plaintext: &str,
        peer_public_key: Option<&P::KemPublicKey>,
    ) -> Result<Vec<u8>, CryptoError> {
        let peer_public_key = peer_public_key.ok_or_else(|| {
            CryptoError::MissingKeyError("peer public key is not available".to_string())
        })?;
        let cfg = Config::global();

        let (encapsulated, shared_secret) = P::kem_encapsulate(peer_public_key)?;
        let shared_secret = Zeroizing::new(shared_secret);
        let key = Self::derive_message_key(peer_public_key.as_ref(), &encapsulated, &shared_secret)?;

        let nonce = P::generate_nonce(cfg.chacha_nonce_length)?;
        let sealed = P::aead_encrypt(&key, &nonce, plaintext.as_bytes(), Some(&encapsulated))?;

        let mut output = Vec::with_capacity(encapsulated.len() + nonce.len() + sealed.len());
        output.extend_from_slice(&encapsulated);
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&sealed);
        Ok(output)
    }

    /// Расшифровать сообщение своим приватным ключом.
    ///
    /// Любая ошибка (обрезанный ввод, чужой или устаревший ключ, подмена,
    /// невалидный UTF-8) возвращается как `CryptoError`.
    pub fn decrypt(
        ciphertext: &[u8],
        self_private_key: &P::KemPrivateKey,
    ) -> Result<String, CryptoError> {
        let cfg = Config::global();
        if ciphertext.len() < Self::min_ciphertext_len() {
            return Err(CryptoError::InvalidInputError(format!(
                "Ciphertext too short: {} bytes",
                ciphertext.len()
            )));
        }

        let (encapsulated, rest) = ciphertext.split_at(P::encapsulated_key_len());
        let (nonce, sealed) = rest.split_at(cfg.chacha_nonce_length);

        let shared_secret = Zeroizing::new(P::kem_decapsulate(self_private_key, encapsulated)?);
        let self_public_key = P::from_private_key_to_public_key(self_private_key)?;
        let key = Self::derive_message_key(self_public_key.as_ref(), encapsulated, &shared_secret)?;

        let plaintext = P::aead_decrypt(&key, nonce, sealed, Some(encapsulated))?;
        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DeserializationError(format!("Invalid UTF-8: {}", e)))
    }

    fn derive_message_key(
        recipient_public: &[u8],
        encapsulated: &[u8],
        shared_secret: &[u8],
    ) -> Result<Zeroizing<P::AeadKey>, CryptoError> {
        let cfg = Config::global();
        let mut ikm = Zeroizing::new(Vec::with_capacity(encapsulated.len() + shared_secret.len()));
        ikm.extend_from_slice(encapsulated);
        ikm.extend_from_slice(shared_secret);

        let okm = P::hkdf_derive_key(recipient_public, &ikm, cfg.message_kdf_info, cfg.key_length)?;
        Ok(Zeroizing::new(P::aead_key_from_bytes(okm)))
    }
}
