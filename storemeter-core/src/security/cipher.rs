//! Field-level decryption of registry credentials.
//!
//! Two schemes share the [`FieldCipher`] interface:
//!
//! - [`LegacyCipher`]: AES-256-CTR with one process-wide key and IV. This is
//!   the format of the credential rows already stored in the registry. Because
//!   the IV is reused for every field, identical plaintexts produce identical
//!   ciphertexts and two ciphertexts XOR to the XOR of their plaintexts.
//! - [`SealedCipher`]: AES-256-GCM with a fresh random 96-bit nonce per field,
//!   stored as `base64(nonce || ciphertext || tag)`.
//!
//! Both are pure with respect to decryption: the same ciphertext always
//! yields the same plaintext.

use aes::Aes256;
use aes::cipher::{KeyIvInit, StreamCipher};
use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use zeroize::Zeroizing;

use crate::Result;
use crate::error::StoreMeterError;

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// AES-256 key size: 32 bytes
const AES_KEY_SIZE: usize = 32;

/// CTR initialization vector size: one AES block
const CTR_IV_SIZE: usize = 16;

/// AES-GCM nonce size: 96 bits
const AES_GCM_NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size: 128 bits
const AES_GCM_TAG_SIZE: usize = 16;

/// Decrypts (and encrypts) individual credential fields.
pub trait FieldCipher: std::fmt::Debug + Send + Sync {
    /// Decrypts a base64 ciphertext into its UTF-8 plaintext.
    ///
    /// # Errors
    /// Returns `Decryption` on malformed base64, cipher failure or
    /// non-UTF-8 plaintext.
    fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>>;

    /// Encrypts a plaintext into the base64 form accepted by [`decrypt`](Self::decrypt).
    fn encrypt(&self, plaintext: &str) -> Result<String>;
}

/// Process-wide key material for the legacy scheme.
#[derive(Clone)]
pub struct CipherKey {
    key: Zeroizing<[u8; AES_KEY_SIZE]>,
    iv: [u8; CTR_IV_SIZE],
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey").finish_non_exhaustive()
    }
}

impl CipherKey {
    /// Builds key material from raw bytes.
    pub fn new(key: [u8; AES_KEY_SIZE], iv: [u8; CTR_IV_SIZE]) -> Self {
        Self {
            key: Zeroizing::new(key),
            iv,
        }
    }

    /// Decodes base64 key (32 bytes) and IV (16 bytes).
    ///
    /// # Errors
    /// Returns `Configuration` if either value is not valid base64 or has the
    /// wrong length.
    pub fn from_base64(key: &str, iv: &str) -> Result<Self> {
        let key = decode_key(key)?;
        let iv_bytes = Zeroizing::new(BASE64.decode(iv.trim()).map_err(|e| {
            StoreMeterError::configuration(format!("Cipher IV is not valid base64: {}", e))
        })?);
        let iv: [u8; CTR_IV_SIZE] = iv_bytes.as_slice().try_into().map_err(|_| {
            StoreMeterError::configuration(format!(
                "Cipher IV must be {} bytes, got {}",
                CTR_IV_SIZE,
                iv_bytes.len()
            ))
        })?;
        Ok(Self { key, iv })
    }
}

/// Decodes a base64 AES-256 key into a zeroizing buffer.
pub fn decode_key(key: &str) -> Result<Zeroizing<[u8; AES_KEY_SIZE]>> {
    let bytes = Zeroizing::new(BASE64.decode(key.trim()).map_err(|e| {
        StoreMeterError::configuration(format!("Cipher key is not valid base64: {}", e))
    })?);
    if bytes.len() != AES_KEY_SIZE {
        return Err(StoreMeterError::configuration(format!(
            "Cipher key must be {} bytes, got {}",
            AES_KEY_SIZE,
            bytes.len()
        )));
    }
    let mut key = Zeroizing::new([0u8; AES_KEY_SIZE]);
    key.copy_from_slice(&bytes);
    Ok(key)
}

fn decode_ciphertext(ciphertext: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(ciphertext.trim())
        .map_err(|e| StoreMeterError::decryption(format!("ciphertext is not valid base64: {}", e)))
}

fn into_utf8(bytes: Vec<u8>) -> Result<Zeroizing<String>> {
    String::from_utf8(bytes).map(Zeroizing::new).map_err(|e| {
        // The bytes are key-stream output; wipe them before dropping.
        let _wipe = Zeroizing::new(e.into_bytes());
        StoreMeterError::decryption("plaintext is not valid UTF-8 (wrong key or IV?)")
    })
}

/// AES-256-CTR with a fixed, shared key and IV.
#[derive(Debug, Clone)]
pub struct LegacyCipher {
    key: CipherKey,
}

impl LegacyCipher {
    pub fn new(key: CipherKey) -> Self {
        Self { key }
    }

    fn apply_keystream(&self, buffer: &mut [u8]) -> Result<()> {
        let mut cipher = Aes256Ctr::new_from_slices(self.key.key.as_slice(), &self.key.iv)
            .map_err(|_| StoreMeterError::decryption("invalid key or IV length"))?;
        cipher.apply_keystream(buffer);
        Ok(())
    }
}

impl FieldCipher for LegacyCipher {
    fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>> {
        let mut buffer = decode_ciphertext(ciphertext)?;
        self.apply_keystream(&mut buffer)?;
        into_utf8(buffer)
    }

    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut buffer = Zeroizing::new(plaintext.as_bytes().to_vec());
        self.apply_keystream(&mut buffer)?;
        Ok(BASE64.encode(buffer.as_slice()))
    }
}

/// AES-256-GCM with a random nonce per ciphertext.
pub struct SealedCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SealedCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedCipher").finish_non_exhaustive()
    }
}

impl SealedCipher {
    pub fn new(key: &[u8; AES_KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_slice())),
        }
    }

    /// Builds the cipher from a base64 AES-256 key.
    pub fn from_base64_key(key: &str) -> Result<Self> {
        let key = decode_key(key)?;
        Ok(Self::new(&*key))
    }
}

impl FieldCipher for SealedCipher {
    fn decrypt(&self, ciphertext: &str) -> Result<Zeroizing<String>> {
        let sealed = decode_ciphertext(ciphertext)?;
        if sealed.len() < AES_GCM_NONCE_SIZE + AES_GCM_TAG_SIZE {
            return Err(StoreMeterError::decryption(format!(
                "sealed value too short: expected at least {} bytes, got {}",
                AES_GCM_NONCE_SIZE + AES_GCM_TAG_SIZE,
                sealed.len()
            )));
        }

        let (nonce, body) = sealed.split_at(AES_GCM_NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), body)
            .map_err(|_| StoreMeterError::decryption("authentication failed (wrong key or tampered value)"))?;
        into_utf8(plaintext)
    }

    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let body = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| StoreMeterError::decryption("AES-GCM encryption failed"))?;

        let mut sealed = Vec::with_capacity(AES_GCM_NONCE_SIZE + body.len());
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&body);
        Ok(BASE64.encode(sealed))
    }
}
