//! Defines the CryptoProvider trait for crypto-agility.

use crate::crypto::SuiteID;
use crate::error::CryptoError;
use core::fmt::Debug;
use zeroize::Zeroize;

/// Trait that formalizes the primitives a hybrid public-key cipher suite needs.
/// `MessageCipher` and `SessionKeyManager` are generic over it, so a suite on a
/// different curve can be swapped in without touching the session code.
pub trait CryptoProvider: Send + Sync + 'static {
    type KemPublicKey: AsRef<[u8]> + Debug + Clone + PartialEq + Send + 'static;
    type KemPrivateKey: AsRef<[u8]> + Clone + Zeroize + Send + 'static;
    type AeadKey: AsRef<[u8]> + Clone + Zeroize + 'static;

    /// Generates a new KEM key pair.
    fn generate_kem_keys() -> Result<(Self::KemPrivateKey, Self::KemPublicKey), CryptoError>;

    /// Derives a KEM public key from a KEM private key.
    fn from_private_key_to_public_key(
        private_key: &Self::KemPrivateKey,
    ) -> Result<Self::KemPublicKey, CryptoError>;

    /// Parses a KEM public key received from a peer.
    fn kem_public_key_from_bytes(bytes: &[u8]) -> Result<Self::KemPublicKey, CryptoError>;

    /// Creates an AEAD key from raw bytes
    fn aead_key_from_bytes(bytes: Vec<u8>) -> Self::AeadKey;

    /// Encapsulates a shared secret using the recipient's KEM public key.
    /// Returns the encapsulated ciphertext (ephemeral public key) and the shared secret.
    fn kem_encapsulate(public_key: &Self::KemPublicKey) -> Result<(Vec<u8>, Vec<u8>), CryptoError>;

    /// Decapsulates a shared secret using the recipient's KEM private key and the encapsulated ciphertext.
    fn kem_decapsulate(
        private_key: &Self::KemPrivateKey,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Performs AEAD encryption.
    /// `key`: The symmetric encryption key.
    /// `nonce`: The unique nonce for this encryption.
    /// `plaintext`: The data to encrypt.
    /// `associated_data`: Optional associated data (authenticated but not encrypted).
    fn aead_encrypt(
        key: &Self::AeadKey,
        nonce: &[u8],
        plaintext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Performs AEAD decryption.
    fn aead_decrypt(
        key: &Self::AeadKey,
        nonce: &[u8],
        ciphertext: &[u8],
        associated_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Derives a key from input key material using HKDF.
    fn hkdf_derive_key(
        salt: &[u8],
        ikm: &[u8],
        info: &[u8],
        len: usize,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Generates a cryptographically secure random nonce of a specified length.
    fn generate_nonce(len: usize) -> Result<Vec<u8>, CryptoError>;

    /// Length of the encapsulated key that prefixes every ciphertext.
    fn encapsulated_key_len() -> usize;

    /// Returns the SuiteID associated with this CryptoProvider.
    fn suite_id() -> SuiteID;
}
