//! Password-based export encryption.
//!
//! Key: PBKDF2-HMAC-SHA256, 100 000 iterations, fresh 16-byte salt per call.
//! Cipher: AES-256-GCM with a fresh 12-byte nonce per call.
//!
//! The envelope is base64 of a JSON object holding byte arrays:
//! `{"salt":[..],"iv":[..],"data":[..]}`. It carries no key material.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

const SALT_LEN: usize = 16;
const IV_LEN: usize = 12;
const KEY_LEN: usize = 32;
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Errors for export encryption.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// An empty password was supplied.
    #[error("a non-empty password is required")]
    EmptyPassword,
    /// Envelope text is not valid base64.
    #[error("encrypted payload is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    /// Envelope JSON could not be built or read.
    #[error("encrypted payload is malformed: {0}")]
    Envelope(#[from] serde_json::Error),
    /// Envelope fields have the wrong sizes.
    #[error("encrypted payload is invalid")]
    InvalidEnvelope,
    /// Encryption failed.
    #[error("failed to encrypt export")]
    EncryptionFailed,
    /// Wrong password or tampered payload.
    #[error("failed to decrypt export (wrong password or corrupted file)")]
    DecryptionFailed,
    /// Decrypted bytes are not UTF-8 text.
    #[error("decrypted export is not valid UTF-8")]
    InvalidUtf8,
}

/// Salt, nonce and ciphertext of one encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionEnvelope {
    pub salt: Vec<u8>,
    pub iv: Vec<u8>,
    /// Ciphertext with the GCM tag appended.
    #[serde(rename = "data")]
    pub ciphertext: Vec<u8>,
}

impl EncryptionEnvelope {
    /// Encodes the envelope as text.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Envelope`] if JSON serialization fails.
    pub fn to_text(&self) -> Result<String, CryptoError> {
        Ok(STANDARD.encode(serde_json::to_vec(self)?))
    }

    /// Decodes envelope text produced by [`EncryptionEnvelope::to_text`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError`] for bad base64, bad JSON, or a wrong-sized nonce.
    pub fn from_text(text: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD.decode(text.trim())?;
        let envelope: Self = serde_json::from_slice(&bytes)?;
        if envelope.iv.len() != IV_LEN || envelope.salt.is_empty() {
            return Err(CryptoError::InvalidEnvelope);
        }
        Ok(envelope)
    }
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0_u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypts `plaintext` with `password`.
///
/// # Errors
///
/// Returns [`CryptoError::EmptyPassword`] for an empty password, or
/// [`CryptoError::EncryptionFailed`] if the cipher fails.
pub fn encrypt(plaintext: &str, password: &str) -> Result<EncryptionEnvelope, CryptoError> {
    if password.is_empty() {
        return Err(CryptoError::EmptyPassword);
    }

    let mut rng = rand::thread_rng();
    let mut salt = [0_u8; SALT_LEN];
    rng.fill_bytes(&mut salt);
    let mut iv = [0_u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    let key = derive_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok(EncryptionEnvelope {
        salt: salt.to_vec(),
        iv: iv.to_vec(),
        ciphertext,
    })
}

/// Recovers the plaintext from `envelope`.
///
/// # Errors
///
/// Returns [`CryptoError::DecryptionFailed`] for a wrong password or tampered
/// ciphertext.
pub fn decrypt(envelope: &EncryptionEnvelope, password: &str) -> Result<String, CryptoError> {
    if password.is_empty() {
        return Err(CryptoError::EmptyPassword);
    }
    if envelope.iv.len() != IV_LEN {
        return Err(CryptoError::InvalidEnvelope);
    }

    let key = derive_key(password, &envelope.salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.ciphertext.as_slice())
        .map_err(|_| CryptoError::DecryptionFailed)?;
    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
}

/// Encrypts `plaintext` and returns the envelope text.
///
/// # Errors
///
/// See [`encrypt`].
pub fn encrypt_data(plaintext: &str, password: &str) -> Result<String, CryptoError> {
    encrypt(plaintext, password)?.to_text()
}

/// Decrypts envelope text produced by [`encrypt_data`].
///
/// # Errors
///
/// See [`EncryptionEnvelope::from_text`] and [`decrypt`].
pub fn decrypt_data(text: &str, password: &str) -> Result<String, CryptoError> {
    decrypt(&EncryptionEnvelope::from_text(text)?, password)
}
