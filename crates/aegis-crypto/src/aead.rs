// Path: crates/aegis-crypto/src/aead.rs
//! Direct-key ChaCha20-Poly1305 sealing for the on-device sealed-credential
//! store (§4.3), and for the issuer keyring's at-rest wrapping of signing
//! keys (§4.1). This operates straight on a 32-byte key the caller already
//! holds — no KDF, no passphrase; the device key's own storage is
//! platform-specific and out of scope (§4.3).

use crate::error::CryptoError;
use aegis_api::crypto::AeadCipher;
use dcrypt::algorithms::aead::chacha20poly1305::ChaCha20Poly1305;
use dcrypt::algorithms::types::Nonce;
use dcrypt::api::traits::symmetric::{DecryptOperation, EncryptOperation, SymmetricCipher};

/// A ChaCha20-Poly1305 cipher bound to a single 32-byte device key.
pub struct DeviceAead {
    key: [u8; 32],
}

impl DeviceAead {
    /// Wraps an existing 32-byte device key for sealing operations.
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }
}

impl AeadCipher for DeviceAead {
    fn seal(&self, nonce: &[u8; 12], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = ChaCha20Poly1305::new(&self.key);
        let nonce = Nonce::new(*nonce);

        let ciphertext = SymmetricCipher::encrypt(&cipher)
            .with_nonce(&nonce)
            .encrypt(plaintext)
            .map_err(|e| CryptoError::OperationFailed(format!("seal failed: {}", e)))?;

        Ok(ciphertext.as_ref().to_vec())
    }

    fn open(&self, nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = ChaCha20Poly1305::new(&self.key);
        let nonce = Nonce::new(*nonce);
        let ciphertext_obj = dcrypt::api::types::Ciphertext::new(ciphertext.to_vec());

        SymmetricCipher::decrypt(&cipher)
            .with_nonce(&nonce)
            .decrypt(&ciphertext_obj)
            .map_err(|_| CryptoError::AuthenticationFailed)
    }
}
