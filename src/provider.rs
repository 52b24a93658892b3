//! Cryptographic primitives behind an injectable seam
//!
//! [`CryptoProvider`] bundles the two primitives the cipher needs: a
//! password-based KDF and an AEAD. [`Pbkdf2AesGcm`] is the only
//! implementation and fixes the parameters that every envelope depends on:
//!
//! - PBKDF2-HMAC-SHA256, 100,000 iterations, 32-byte output
//! - AES-256-GCM, 12-byte nonce, 16-byte tag appended, no associated data

use crate::error::{CryptoguardError, ErrorCategory, ErrorKind, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

/// PBKDF2 iteration count.
///
/// Not recorded in the envelope; changing it makes every existing
/// envelope undecryptable.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Key derivation plus authenticated encryption.
pub trait CryptoProvider {
    /// Derive a key from a passphrase and salt. Deterministic and infallible.
    fn derive_key(&self, passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]>;

    /// Encrypt `plaintext`, returning ciphertext with the tag appended.
    fn seal(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    /// Verify and decrypt ciphertext-with-tag.
    fn open(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>>;
}

/// PBKDF2-HMAC-SHA256 and AES-256-GCM from the RustCrypto crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct Pbkdf2AesGcm;

impl CryptoProvider for Pbkdf2AesGcm {
    fn derive_key(&self, passphrase: &[u8], salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(passphrase, salt, PBKDF2_ITERATIONS, &mut *key);
        key
    }

    fn seal(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| {
                CryptoguardError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::EncryptionFailed,
                    "encryption failed",
                )
            })
    }

    fn open(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoguardError::decryption_failed())
    }
}
