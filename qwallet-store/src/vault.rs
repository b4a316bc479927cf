//! Password-based encryption of serialized wallet records.
//!
//! # File Format
//!
//! ```text
//! {
//!   "version": 1,
//!   "kdf": "pbkdf2-hmac-sha256",
//!   "kdf_rounds": 210000,
//!   "salt": "<base64, 16 bytes>",
//!   "nonce": "<base64, 12 bytes>",
//!   "ciphertext": "<base64, AES-256-GCM output incl. tag>"
//! }
//! ```
//!
//! The header fields (version, kdf, rounds, salt) are bound to the
//! ciphertext as associated data.

use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use zeroize::Zeroizing;

use qwallet_core::constants::{
    ENCRYPTION_KEY_SIZE, KDF_NAME, MIN_KDF_ROUNDS, NONCE_SIZE, SALT_SIZE, STORE_FORMAT_VERSION,
};
use qwallet_core::encoding::base64_bytes;
use qwallet_core::error::{Result, WalletError};

/// A sealed wallet record as written to disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    /// File format version
    pub version: u8,
    /// Key derivation function name
    pub kdf: String,
    /// KDF iteration count
    pub kdf_rounds: u32,
    /// Per-save random salt
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    /// AES-GCM nonce
    #[serde(with = "base64_bytes")]
    pub nonce: Vec<u8>,
    /// Ciphertext with appended tag
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Encrypts `plaintext` under a key derived from `password`.
    ///
    /// # Errors
    /// `InvalidParameters` if `kdf_rounds` is below the minimum.
    pub fn seal(plaintext: &[u8], password: &str, kdf_rounds: u32) -> Result<Self> {
        if kdf_rounds < MIN_KDF_ROUNDS {
            return Err(WalletError::invalid(format!(
                "kdf_rounds must be at least {MIN_KDF_ROUNDS}, got {kdf_rounds}"
            )));
        }

        let mut salt = vec![0u8; SALT_SIZE];
        let mut nonce = vec![0u8; NONCE_SIZE];
        OsRng
            .try_fill_bytes(&mut salt)
            .and_then(|_| OsRng.try_fill_bytes(&mut nonce))
            .map_err(|e| WalletError::primitive(format!("entropy source failed: {e}")))?;

        let mut blob = Self {
            version: STORE_FORMAT_VERSION,
            kdf: KDF_NAME.to_string(),
            kdf_rounds,
            salt,
            nonce,
            ciphertext: Vec::new(),
        };

        let key = derive_key(password, &blob.salt, kdf_rounds);
        let cipher = cipher(&key)?;
        let aad = blob.associated_data();
        blob.ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&blob.nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|_| WalletError::primitive("AES-GCM encryption failed"))?;

        debug!(rounds = kdf_rounds, len = plaintext.len(), "Sealed wallet payload");
        Ok(blob)
    }

    /// Decrypts the payload.
    ///
    /// # Errors
    /// `DecryptionFailed` for a wrong password, a tampered file, or a
    /// malformed header. The causes are not distinguished. `Storage` for
    /// an unsupported format version.
    pub fn open(&self, password: &str) -> Result<Zeroizing<Vec<u8>>> {
        if self.version != STORE_FORMAT_VERSION {
            return Err(WalletError::Storage(format!(
                "unsupported wallet file version {}",
                self.version
            )));
        }
        if self.kdf != KDF_NAME
            || self.kdf_rounds < MIN_KDF_ROUNDS
            || self.salt.len() != SALT_SIZE
            || self.nonce.len() != NONCE_SIZE
        {
            return Err(WalletError::DecryptionFailed);
        }

        let key = derive_key(password, &self.salt, self.kdf_rounds);
        let aad = self.associated_data();
        cipher(&key)?
            .decrypt(
                Nonce::from_slice(&self.nonce),
                Payload {
                    msg: &self.ciphertext,
                    aad: &aad,
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| WalletError::DecryptionFailed)
    }

    /// Reads a blob file.
    ///
    /// # Errors
    /// `NotFound` if the file is missing; `DecryptionFailed` if it is not a
    /// blob at all.
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(WalletError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map_err(|_| WalletError::DecryptionFailed)
    }

    /// Serializes the blob as pretty JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    fn associated_data(&self) -> Vec<u8> {
        let mut aad = Vec::with_capacity(1 + self.kdf.len() + 4 + self.salt.len());
        aad.push(self.version);
        aad.extend_from_slice(self.kdf.as_bytes());
        aad.extend_from_slice(&self.kdf_rounds.to_le_bytes());
        aad.extend_from_slice(&self.salt);
        aad
    }
}

fn derive_key(password: &str, salt: &[u8], rounds: u32) -> Zeroizing<[u8; ENCRYPTION_KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; ENCRYPTION_KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut key[..]);
    key
}

fn cipher(key: &Zeroizing<[u8; ENCRYPTION_KEY_SIZE]>) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(&key[..])
        .map_err(|e| WalletError::primitive(format!("invalid encryption key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUNDS: u32 = MIN_KDF_ROUNDS;

    #[test]
    fn test_seal_open() {
        let blob = EncryptedBlob::seal(b"secret record", "pw1", ROUNDS).unwrap();
        assert_eq!(blob.salt.len(), SALT_SIZE);
        assert_eq!(blob.nonce.len(), NONCE_SIZE);
        assert_eq!(blob.kdf, KDF_NAME);
        assert_eq!(&blob.open("pw1").unwrap()[..], b"secret record");
    }

    #[test]
    fn test_wrong_password() {
        let blob = EncryptedBlob::seal(b"data", "pw1", ROUNDS).unwrap();
        assert!(matches!(blob.open("pw2"), Err(WalletError::DecryptionFailed)));
    }

    #[test]
    fn test_salt_is_fresh_per_seal() {
        let a = EncryptedBlob::seal(b"data", "pw", ROUNDS).unwrap();
        let b = EncryptedBlob::seal(b"data", "pw", ROUNDS).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_header_tampering_detected() {
        let blob = EncryptedBlob::seal(b"data", "pw", ROUNDS).unwrap();

        let mut rounds = blob.clone();
        rounds.kdf_rounds += 1;
        assert!(matches!(rounds.open("pw"), Err(WalletError::DecryptionFailed)));

        let mut salt = blob.clone();
        salt.salt[0] ^= 1;
        assert!(matches!(salt.open("pw"), Err(WalletError::DecryptionFailed)));

        let mut body = blob;
        body.ciphertext[0] ^= 1;
        assert!(matches!(body.open("pw"), Err(WalletError::DecryptionFailed)));
    }

    #[test]
    fn test_low_rounds_rejected() {
        let err = EncryptedBlob::seal(b"data", "pw", 1_000).unwrap_err();
        assert!(matches!(err, WalletError::InvalidParameters(_)));
    }

    #[test]
    fn test_unknown_version() {
        let mut blob = EncryptedBlob::seal(b"data", "pw", ROUNDS).unwrap();
        blob.version = 9;
        assert!(matches!(blob.open("pw"), Err(WalletError::Storage(_))));
    }

    #[test]
    fn test_text_encoding() {
        let blob = EncryptedBlob::seal(b"data", "pw", ROUNDS).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&blob.to_json().unwrap()).unwrap();
        assert_eq!(json["kdf"], KDF_NAME);
        assert!(json["salt"].is_string());
        assert!(json["ciphertext"].is_string());
    }
}
