use crate::config::Config;
use crate::error::CryptoError;

pub fn validate_public_key(key: &[u8]) -> Result<(), CryptoError> {
    let expected_size = Config::global().public_key_size;
    if key.len() != expected_size {
        return Err(CryptoError::InvalidInputError(format!(
            "Public key must be {} bytes, got {}",
            expected_size,
            key.len()
        )));
    }
    Ok(())
}
