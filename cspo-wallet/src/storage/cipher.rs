//! Password-based file encryption
//!
//! Envelope layout: `salt(16) || nonce(12) || ciphertext || tag(16)`.
//! The key is PBKDF2-HMAC-SHA256 over the password and salt, 100 000
//! iterations, 32 bytes. Salt and nonce are fresh for every encryption.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Error, Result};

/// Salt length in bytes
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;
/// AES-GCM tag length in bytes
pub const TAG_LEN: usize = 16;
/// PBKDF2 iteration count
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// 256-bit key derived from a password, wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
struct DerivedKey([u8; 32]);

impl DerivedKey {
    fn derive(password: &str, salt: &[u8]) -> Result<Self> {
        let mut key = [0u8; 32];
        pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut key)
            .map_err(|e| Error::encoding("encryption key", e))?;
        Ok(Self(key))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

/// Encrypt `plaintext` under `password` into a self-contained envelope
pub fn encrypt(password: &str, plaintext: &[u8], subject: &str) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key = DerivedKey::derive(password, &salt)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = key
        .cipher()
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::encoding(subject, format!("encryption failed: {e}")))?;

    let mut envelope = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Decrypt an envelope. A wrong password, truncation or tampering all
/// surface as [`Error::Authentication`] naming `subject`.
pub fn decrypt(password: &str, envelope: &[u8], subject: &str) -> Result<Zeroizing<Vec<u8>>> {
    if envelope.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(Error::Authentication {
            file: subject.to_string(),
        });
    }

    let (salt, rest) = envelope.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key = DerivedKey::derive(password, salt)?;
    key.cipher()
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| Error::Authentication {
            file: subject.to_string(),
        })
}
