use crate::crypto::provider::CryptoProvider;
use crate::crypto::SuiteID;
use crate::error::CryptoError;
use crate::utils::validation::validate_public_key;
use chacha20poly1305::{
    aead::{Aead, Payload},
    ChaCha20Poly1305, Key as AeadKeyChacha, KeyInit, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand_core::RngCore;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as KemPublicKeyDalek, StaticSecret};

/// Concrete implementation of `CryptoProvider` for the classic suite.
pub struct ClassicSuiteProvider;

impl ClassicSuiteProvider {
    fn to_array32(bytes: &[u8], what: &str) -> Result<[u8; 32], CryptoError> {
        bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidInputError(format!("Invalid {} length", what)))
    }
}

impl CryptoProvider for ClassicSuiteProvider {
    type KemPublicKey = Vec<u8>;
    type KemPrivateKey = Vec<u8>;
    type AeadKey = Vec<u8>;

    fn generate_kem_keys() -> Result<(Self::KemPrivateKey, Self::KemPublicKey), CryptoError> {
        let mut seed = [0u8; 32];
        OsRng.try_fill_bytes(&mut seed)?;
        let private_key = StaticSecret::from(seed);
        let public_key = KemPublicKeyDalek::from(&private_key);
        zeroize::Zeroize::zeroize(&mut seed);
        Ok((private_key.to_bytes().to_vec(), public_key.to_bytes().to_vec()))
    }

    fn from_private_key_to_public_key(
        private_key: &Self::KemPrivateKey,
    ) -> Result<Self::KemPublicKey, CryptoError> {
        let bytes = Self::to_array32(private_key, "KEM private key")?;
        let static_secret = StaticSecret::from(bytes);
        let public_key = KemPublicKeyDalek::from(&static_secret);
        Ok(public_key.to_bytes().to_vec())
    }

    fn kem_public_key_from_bytes(bytes: &[u8]) -> Result<Self::KemPublicKey, CryptoError> {
        validate_public_key(bytes)?;
        Ok(bytes.to_vec())
    }

    fn aead_key_from_bytes(bytes: Vec<u8>) -> Self::AeadKey {
        // For ClassicSuiteProvider, AeadKey is Vec<u8>, so just return it
        bytes
    }

    fn kem_encapsulate(
        public_key: &Self::KemPublicKey,
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
        let pk_bytes = Self::to_array32(public_key, "KEM public key")?;
        let recipient_public_key = KemPublicKeyDalek::from(pk_bytes);

        // Get ephemeral public key before consuming ephemeral_secret
        let ephemeral_public_key = KemPublicKeyDalek::from(&ephemeral_secret);

        let shared_secret = ephemeral_secret.diffie_hellman(&recipient_public_key);
        if !shared_secret.was_contributory() {
            return Err(CryptoError::KemEncapsulationError(
                "Recipient public key is a low-order point".to_string(),
            ));
        }

        Ok((
            ephemeral_public_key.to_bytes().to_vec(),
            shared_secret.to_bytes().to_vec(),
        ))
    }

    fn kem_decapsulate(
        private_key: &Self::KemPrivateKey,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let bytes = Self::to_array32(private_key, "KEM private key")?;
        let static_secret = StaticSecret::from(bytes);

        let ct_bytes = Self::to_array32(ciphertext, "KEM ciphertext")?;
        let ephemeral_public_key = KemPublicKeyDalek::from(ct_bytes);

        let shared_secret = static_secret.diffie_hellman(&ephemeral_public_key);
        if !shared_secret.was_contributory() {
            return Err(CryptoError::KemDecapsulationError(
                "Ephemeral public key is a low-order point".to_string(),
            ));
        }
        Ok(shared_secret.to_bytes().to_vec())
    }

    fn aead_encrypt(
        key: &Self::AeadKey,
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        if key.len() != 32 || nonce.len() != 12 {
            return Err(CryptoError::InvalidInputError(
                "Invalid AEAD key or nonce length".to_string(),
            ));
        }
        let cipher = ChaCha20Poly1305::new(AeadKeyChacha::from_slice(key));
        let nonce_ref = Nonce::from_slice(nonce);

        let payload = Payload {
            msg: plaintext,
            aad: associated_data.unwrap_or(b""),
        };

        cipher
            .encrypt(nonce_ref, payload)
            .map_err(|e| CryptoError::AeadEncryptionError(e.to_string()))
    }

    fn aead_decrypt(
        key: &Self::AeadKey,
        nonce: &[u8],
        ciphertext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError> {
        if key.len() != 32 || nonce.len() != 12 {
            return Err(CryptoError::InvalidInputError(
                "Invalid AEAD key or nonce length".to_string(),
            ));
        }
        let cipher = ChaCha20Poly1305::new(AeadKeyChacha::from_slice(key));
        let nonce_ref = Nonce::from_slice(nonce);

        let payload = Payload {
            msg: ciphertext,
            aad: associated_data.unwrap_or(b""),
        };

        cipher
            .decrypt(nonce_ref, payload)
            .map_err(|e| CryptoError::AeadDecryptionError(e.to_string()))
    }

    fn hkdf_derive_key(
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, CryptoError> {
        let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
        let mut okm = vec![0u8; len];
        hkdf.expand(info, &mut okm)
            .map_err(|e| CryptoError::KeyDerivationError(e.to_string()))?;
        Ok(okm)
    }

    fn generate_nonce(len: usize) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = vec![0u8; len];
        OsRng.try_fill_bytes(&mut nonce_bytes)?;
        Ok(nonce_bytes)
    }

    fn encapsulated_key_len() -> usize {
        crate::config::Config::global().public_key_size
    }

    fn suite_id() -> SuiteID {
        crate::config::Config::global().classic_suite_id
    }
}
