//! Secure randomness as an injectable capability
//!
//! Salts, nonces and generated passwords all draw from a
//! [`SecureRandomSource`]. Production code uses [`OsRandom`]; tests
//! substitute deterministic sources.

use crate::error::{CryptoguardError, ErrorCategory, ErrorKind, Result};
use rand::RngCore;
use rand::rngs::OsRng;

/// A cryptographically secure source of random bytes.
///
/// Implementations must never fall back to a non-cryptographic generator;
/// if secure bytes cannot be produced they return an error.
pub trait SecureRandomSource {
    /// Fill `dest` entirely with random bytes.
    fn fill(&mut self, dest: &mut [u8]) -> Result<()>;

    /// Draw one uniformly distributed `u32`.
    fn next_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

/// Randomness from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl SecureRandomSource for OsRandom {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(dest).map_err(|e| {
            CryptoguardError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::PlatformUnavailable,
                format!("secure random source unavailable: {}", e),
                e,
            )
        })
    }
}
