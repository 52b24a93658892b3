//! Cryptoguard - Passphrase-based message protection using PBKDF2 and AES-256-GCM

#![forbid(unsafe_code)]

pub mod envelope;
pub mod error;
pub mod message_ops;
pub mod passphrase;
pub mod password;
pub mod provider;
pub mod pwcipher;
pub mod random;

pub use error::{CryptoguardError, ErrorCategory, ErrorKind, Result};
pub use password::{DEFAULT_PASSWORD_LENGTH, generate_password};
pub use pwcipher::{PasswordCipher, decrypt, derive_key, encrypt};
