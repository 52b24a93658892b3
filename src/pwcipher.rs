//! Passphrase-based message encryption using PBKDF2 + AES-256-GCM
//!
//! Each encryption draws a fresh 16-byte salt and 12-byte nonce, derives a
//! 256-bit key from the passphrase with PBKDF2-HMAC-SHA256, seals the UTF-8
//! plaintext with AES-256-GCM and armors `salt ‖ nonce ‖ sealed box` as
//! base64 (see [`crate::envelope`]).
//!
//! Decryption failures are deliberately indistinguishable: malformed base64,
//! a truncated envelope, a wrong passphrase and a tampered ciphertext all
//! produce the same [`ErrorKind::DecryptionFailed`] error.
//!
//! [`ErrorKind::DecryptionFailed`]: crate::error::ErrorKind::DecryptionFailed

use crate::envelope::{self, Envelope};
use crate::error::{CryptoguardError, Result};
use crate::provider::{CryptoProvider, KEY_LEN, NONCE_LEN, Pbkdf2AesGcm, SALT_LEN};
use crate::random::{OsRandom, SecureRandomSource};
use tracing::debug;
use zeroize::Zeroizing;

/// Stateless encryptor parameterized over its randomness and primitives.
///
/// Holds no keys or buffers between calls.
#[derive(Debug, Default, Clone)]
pub struct PasswordCipher<R = OsRandom, P = Pbkdf2AesGcm> {
    rng: R,
    provider: P,
}

impl PasswordCipher {
    /// A cipher backed by OS randomness and the RustCrypto primitives.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: SecureRandomSource, P: CryptoProvider> PasswordCipher<R, P> {
    pub fn with_parts(rng: R, provider: P) -> Self {
        Self { rng, provider }
    }

    /// Derive the 256-bit key for `passphrase` and `salt`.
    pub fn derive_key(&self, passphrase: &str, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
        self.provider.derive_key(passphrase.as_bytes(), salt)
    }

    /// Encrypt `plaintext` under `passphrase` with random salt and nonce.
    ///
    /// Returns the armored envelope.
    pub fn encrypt(&mut self, plaintext: &str, passphrase: &str) -> Result<String> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt)?;

        let mut nonce = [0u8; NONCE_LEN];
        self.rng.fill(&mut nonce)?;

        self.encrypt_deterministic(plaintext, passphrase, &salt, &nonce)
    }

    /// Encrypt `plaintext` under `passphrase` using provided salt and nonce
    ///
    /// This function is ONLY for testing purposes to generate deterministic output.
    /// NEVER use this in production - always use `encrypt()` which generates random salt/nonce.
    pub fn encrypt_deterministic(
        &self,
        plaintext: &str,
        passphrase: &str,
        salt: &[u8; SALT_LEN],
        nonce: &[u8; NONCE_LEN],
    ) -> Result<String> {
        let key = self.derive_key(passphrase, salt);
        let sealed_box = self.provider.seal(&key, nonce, plaintext.as_bytes())?;
        let armored = Envelope::new(*salt, *nonce, &sealed_box).armor();

        debug!(
            plaintext_len = plaintext.len(),
            envelope_len = armored.len(),
            "message encrypted"
        );
        Ok(armored)
    }

    /// Decrypt an armored envelope with `passphrase`.
    pub fn decrypt(&self, armored: &str, passphrase: &str) -> Result<String> {
        let body = envelope::unwrap(armored)?;
        let envelope = Envelope::parse(&body)?;

        let key = self.derive_key(passphrase, &envelope.salt);
        let plaintext = self
            .provider
            .open(&key, &envelope.nonce, envelope.sealed_box)?;

        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| CryptoguardError::decryption_failed())?
            .to_owned();

        debug!(plaintext_len = text.len(), "message decrypted");
        Ok(text)
    }
}

/// Derive the 256-bit key for `passphrase` and `salt` with PBKDF2-HMAC-SHA256.
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; KEY_LEN]> {
    PasswordCipher::new().derive_key(passphrase, salt)
}

/// Encrypt `plaintext` under `passphrase`, returning a base64 envelope.
pub fn encrypt(plaintext: &str, passphrase: &str) -> Result<String> {
    PasswordCipher::new().encrypt(plaintext, passphrase)
}

/// Decrypt a base64 envelope with `passphrase`.
pub fn decrypt(armored: &str, passphrase: &str) -> Result<String> {
    PasswordCipher::new().decrypt(armored, passphrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::HEADER_LEN;
    use crate::error::{ErrorCategory, ErrorKind};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    /// Replays a fixed byte sequence, cycling when exhausted.
    struct ReplayRandom {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl SecureRandomSource for ReplayRandom {
        fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
            for b in dest.iter_mut() {
                *b = self.bytes[self.pos % self.bytes.len()];
                self.pos += 1;
            }
            Ok(())
        }
    }

    struct BrokenRandom;

    impl SecureRandomSource for BrokenRandom {
        fn fill(&mut self, _dest: &mut [u8]) -> Result<()> {
            Err(CryptoguardError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::PlatformUnavailable,
                "simulated entropy failure",
            ))
        }
    }

    fn assert_decryption_failed(result: Result<String>) {
        let err = result.expect_err("expected decryption failure");
        assert_eq!(err.kind, Some(ErrorKind::DecryptionFailed));
        assert_eq!(
            err.to_string(),
            "decryption failed: invalid passphrase or corrupted data"
        );
        assert!(err.source_error().is_none());
    }

    #[test]
    fn test_hello_world_scenario() {
        let armored = encrypt("hello world", "correct-horse").unwrap();
        assert!(armored.len() >= 40);

        assert_eq!(decrypt(&armored, "correct-horse").unwrap(), "hello world");
        assert_decryption_failed(decrypt(&armored, "wrong-horse"));
    }

    #[test]
    fn test_empty_plaintext() {
        let armored = encrypt("", "test").unwrap();

        // 16 salt + 12 nonce + 16 tag = 44 bytes -> 60 base64 chars
        assert_eq!(armored.len(), 60);
        assert_eq!(decrypt(&armored, "test").unwrap(), "");
    }

    #[test]
    fn test_empty_passphrase_is_accepted() {
        let armored = encrypt("still works", "").unwrap();
        assert_eq!(decrypt(&armored, "").unwrap(), "still works");
        assert_decryption_failed(decrypt(&armored, " "));
    }

    #[test]
    fn test_unicode_roundtrip() {
        let plaintext = "Revele sua mensagem: ação, 日本語, 🔐";
        let armored = encrypt(plaintext, "pässwörd").unwrap();
        assert_eq!(decrypt(&armored, "pässwörd").unwrap(), plaintext);
    }

    #[test]
    fn test_encryption_is_not_deterministic() {
        let a = encrypt("same message", "same key").unwrap();
        let b = encrypt("same message", "same key").unwrap();
        assert_ne!(a, b);

        let raw_a = STANDARD.decode(&a).unwrap();
        let raw_b = STANDARD.decode(&b).unwrap();
        assert_ne!(raw_a[..SALT_LEN], raw_b[..SALT_LEN]);
        assert_ne!(raw_a[SALT_LEN..HEADER_LEN], raw_b[SALT_LEN..HEADER_LEN]);

        assert_eq!(decrypt(&a, "same key").unwrap(), "same message");
        assert_eq!(decrypt(&b, "same key").unwrap(), "same message");
    }

    #[test]
    fn test_injected_randomness_fills_salt_then_nonce() {
        let rng = ReplayRandom {
            bytes: (1..=28).collect(),
            pos: 0,
        };
        let mut cipher = PasswordCipher::with_parts(rng, Pbkdf2AesGcm);
        let armored = cipher.encrypt("abc", "k").unwrap();

        let raw = STANDARD.decode(&armored).unwrap();
        assert_eq!(raw[..SALT_LEN], (1..=16).collect::<Vec<u8>>()[..]);
        assert_eq!(raw[SALT_LEN..HEADER_LEN], (17..=28).collect::<Vec<u8>>()[..]);
        assert_eq!(raw.len(), HEADER_LEN + 3 + 16);

        // Matches the explicit-salt path byte for byte.
        let salt: [u8; SALT_LEN] = raw[..SALT_LEN].try_into().unwrap();
        let nonce: [u8; NONCE_LEN] = raw[SALT_LEN..HEADER_LEN].try_into().unwrap();
        let expected = cipher
            .encrypt_deterministic("abc", "k", &salt, &nonce)
            .unwrap();
        assert_eq!(armored, expected);
    }

    #[test]
    fn test_broken_random_source() {
        let mut cipher = PasswordCipher::with_parts(BrokenRandom, Pbkdf2AesGcm);
        let err = cipher
            .encrypt("hello", "k")
            .expect_err("expected platform failure");
        assert_eq!(err.kind, Some(ErrorKind::PlatformUnavailable));
    }

    #[test]
    fn test_golden_hello_world() {
        // Produced by an independent PBKDF2/AES-GCM implementation.
        let cipher = PasswordCipher::new();
        let armored = cipher
            .encrypt_deterministic("hello world", "correct-horse", &[0x42; 16], &[0x24; 12])
            .unwrap();
        assert_eq!(
            armored,
            "QkJCQkJCQkJCQkJCQkJCQiQkJCQkJCQkJCQkJFIjktvjKPIksbLvXtoVHa6utuoicBk/XD157g=="
        );
        assert_eq!(cipher.decrypt(&armored, "correct-horse").unwrap(), "hello world");
    }

    #[test]
    fn test_tamper_detection_every_byte() {
        let cipher = PasswordCipher::new();
        let armored = cipher
            .encrypt_deterministic("tamper me", "k", &[3u8; 16], &[4u8; 12])
            .unwrap();
        let raw = STANDARD.decode(&armored).unwrap();

        for i in 0..raw.len() {
            let mut corrupted = raw.clone();
            corrupted[i] ^= 0x01;
            assert_decryption_failed(cipher.decrypt(&STANDARD.encode(&corrupted), "k"));
        }
    }

    #[test]
    fn test_truncated_envelopes() {
        let cipher = PasswordCipher::new();
        for len in [0usize, 1, 16, 27] {
            let armored = STANDARD.encode(vec![0u8; len]);
            assert_decryption_failed(cipher.decrypt(&armored, "k"));
        }

        // Header present but sealed box shorter than a tag.
        let armored = STANDARD.encode(vec![0u8; HEADER_LEN + 15]);
        assert_decryption_failed(cipher.decrypt(&armored, "k"));
    }

    #[test]
    fn test_trailing_data_rejected() {
        let cipher = PasswordCipher::new();
        let armored = cipher
            .encrypt_deterministic("hello", "k", &[1u8; 16], &[2u8; 12])
            .unwrap();
        let mut raw = STANDARD.decode(&armored).unwrap();
        raw.push(0xFF);
        assert_decryption_failed(cipher.decrypt(&STANDARD.encode(&raw), "k"));
    }

    #[test]
    fn test_not_base64() {
        assert_decryption_failed(decrypt("not-base64!!", "anything"));
    }

    #[test]
    fn test_wrapped_envelope_decrypts() {
        let armored = encrypt("line-wrapped", "k").unwrap();
        let wrapped: String = armored
            .as_bytes()
            .chunks(20)
            .map(|chunk| format!("{}\n", String::from_utf8_lossy(chunk)))
            .collect();
        assert_eq!(decrypt(&wrapped, "k").unwrap(), "line-wrapped");

        let unpadded = armored.trim_end_matches('=');
        assert_eq!(decrypt(unpadded, "k").unwrap(), "line-wrapped");
    }

    #[test]
    fn test_non_utf8_payload_rejected() {
        let provider = Pbkdf2AesGcm;
        let salt = [5u8; SALT_LEN];
        let nonce = [6u8; NONCE_LEN];
        let key = provider.derive_key(b"k", &salt);
        let sealed = provider.seal(&key, &nonce, &[0xFF, 0xFE]).unwrap();
        let armored = Envelope::new(salt, nonce, &sealed).armor();

        assert_decryption_failed(decrypt(&armored, "k"));
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let salt = [9u8; SALT_LEN];
        assert_eq!(*derive_key("pass", &salt), *derive_key("pass", &salt));
        assert_ne!(*derive_key("pass", &salt), *derive_key("Pass", &salt));
    }
}
