//! Envelope layout and armoring
//!
//! The binary envelope is:
//! - salt: 16 bytes
//! - nonce: 12 bytes
//! - sealed box: variable length (ciphertext followed by the 16-byte GCM tag)
//!
//! There is no version byte and no length field; the sealed box runs to
//! the end of the input. The armored form is standard base64 with `=`
//! padding. When unarmoring, ASCII whitespace is ignored and padding is
//! optional, so envelopes survive line wrapping and copy/paste.
//!
//! Every parse failure in this module is reported as the same
//! [`ErrorKind::DecryptionFailed`](crate::error::ErrorKind) error.

use crate::error::{CryptoguardError, Result};
use crate::provider::{NONCE_LEN, SALT_LEN};
use base64::Engine;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};

/// Bytes preceding the sealed box.
pub const HEADER_LEN: usize = SALT_LEN + NONCE_LEN;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// A parsed envelope borrowing its sealed box from the decoded input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub sealed_box: &'a [u8],
}

impl<'a> Envelope<'a> {
    pub fn new(salt: [u8; SALT_LEN], nonce: [u8; NONCE_LEN], sealed_box: &'a [u8]) -> Self {
        Self {
            salt,
            nonce,
            sealed_box,
        }
    }

    /// Split raw envelope bytes into salt, nonce and sealed box.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CryptoguardError::decryption_failed());
        }
        let (salt, rest) = bytes.split_at(SALT_LEN);
        let (nonce, sealed_box) = rest.split_at(NONCE_LEN);

        Ok(Self {
            salt: salt
                .try_into()
                .map_err(|_| CryptoguardError::decryption_failed())?,
            nonce: nonce
                .try_into()
                .map_err(|_| CryptoguardError::decryption_failed())?,
            sealed_box,
        })
    }

    /// Concatenate salt ‖ nonce ‖ sealed box.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut output = Vec::with_capacity(HEADER_LEN + self.sealed_box.len());
        output.extend_from_slice(&self.salt);
        output.extend_from_slice(&self.nonce);
        output.extend_from_slice(self.sealed_box);
        output
    }

    /// Pack and armor in one step.
    pub fn armor(&self) -> String {
        wrap(&self.to_bytes())
    }
}

/// Armor raw envelope bytes as padded standard base64.
pub fn wrap(body: &[u8]) -> String {
    STANDARD.encode(body)
}

/// Decode armored text back into raw envelope bytes.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    let compact: String = armored
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    LENIENT
        .decode(compact.as_bytes())
        .map_err(|_| CryptoguardError::decryption_failed())
}
