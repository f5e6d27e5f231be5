use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use thiserror::Error;

const NONCE_SIZE: usize = 12; // AES-GCM standard nonce size

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CipherError {
    #[error("Invalid hex key: {0}")]
    InvalidKeyHex(String),
    #[error("Encryption key must be 32 bytes (256 bits) long")]
    InvalidKeyLength,
    #[error("Invalid hex ciphertext: {0}")]
    InvalidCiphertextHex(String),
    #[error("Ciphertext is too short to contain a nonce")]
    CiphertextTooShort,
    #[error("Encryption failed")]
    Encrypt,
    #[error("Decryption failed")]
    Decrypt,
    #[error("Invalid UTF-8 sequence: {0}")]
    InvalidUtf8(String),
}

/// AES-256-GCM sealing for repository access tokens.
///
/// Output is hex of `nonce || ciphertext`, with a fresh random nonce per call.
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    pub fn new(key_hex: &str) -> Result<Self, CipherError> {
        let key_bytes =
            hex::decode(key_hex).map_err(|e| CipherError::InvalidKeyHex(e.to_string()))?;
        if key_bytes.len() != 32 {
            return Err(CipherError::InvalidKeyLength);
        }
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    pub fn encrypt(&self, plain_text: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plain_text.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut result = nonce.to_vec();
        result.extend_from_slice(&ciphertext);
        Ok(hex::encode(result))
    }

    pub fn decrypt(&self, cipher_hex: &str) -> Result<String, CipherError> {
        let encrypted_data = hex::decode(cipher_hex)
            .map_err(|e| CipherError::InvalidCiphertextHex(e.to_string()))?;
        if encrypted_data.len() < NONCE_SIZE {
            return Err(CipherError::CiphertextTooShort);
        }

        let (nonce_bytes, ciphertext) = encrypted_data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let decrypted_bytes = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(decrypted_bytes).map_err(|e| CipherError::InvalidUtf8(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY1: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
    const KEY2: &str = "f1e1d1c1b1a191817161514131211101f0e0d0c0b0a090807060504030201000";

    #[test]
    fn test_encrypt_decrypt_success() {
        let cipher = TokenCipher::new(KEY1).unwrap();
        let token = "ghp_exampletoken";

        let encrypted = cipher.encrypt(token).unwrap();
        assert_ne!(token, encrypted);
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), token);
    }

    #[test]
    fn test_nonce_differs_per_call() {
        let cipher = TokenCipher::new(KEY1).unwrap();
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn test_decrypt_with_wrong_key() {
        let encrypted = TokenCipher::new(KEY1).unwrap().encrypt("another secret").unwrap();
        let result = TokenCipher::new(KEY2).unwrap().decrypt(&encrypted);
        assert_eq!(result, Err(CipherError::Decrypt));
    }

    #[test]
    fn test_invalid_key_length() {
        assert_eq!(
            TokenCipher::new("1234").err(),
            Some(CipherError::InvalidKeyLength)
        );
        assert_eq!(
            TokenCipher::new(&format!("{KEY1}20")).err(),
            Some(CipherError::InvalidKeyLength)
        );
    }

    #[test]
    fn test_invalid_hex() {
        assert!(matches!(
            TokenCipher::new("not-a-hex-string"),
            Err(CipherError::InvalidKeyHex(_))
        ));

        let cipher = TokenCipher::new(KEY1).unwrap();
        assert!(matches!(
            cipher.decrypt("not-a-hex-cipher"),
            Err(CipherError::InvalidCiphertextHex(_))
        ));
        assert_eq!(cipher.decrypt("abcd"), Err(CipherError::CiphertextTooShort));
    }
}
