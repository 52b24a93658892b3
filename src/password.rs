//! Random password generation

use crate::error::Result;
use crate::random::{OsRandom, SecureRandomSource};

/// Characters a generated password may contain: lowercase, uppercase,
/// digits and 29 punctuation marks.
pub const ALPHABET: &[u8; 91] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+~`|}{[]:;?><,./-=";

pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

/// Generate a password of `length` characters from [`ALPHABET`] using `rng`.
///
/// Each character is one `u32` draw reduced modulo the alphabet size. The
/// resulting skew is below 2^-25 and is accepted.
pub fn generate_password_with<R: SecureRandomSource + ?Sized>(
    rng: &mut R,
    length: usize,
) -> Result<String> {
    let mut password = String::with_capacity(length);
    for _ in 0..length {
        let value = rng.next_u32()?;
        let index = (value % ALPHABET.len() as u32) as usize;
        password.push(char::from(ALPHABET[index]));
    }
    Ok(password)
}

/// Generate a password of `length` characters using OS randomness.
///
/// # Panics
///
/// If the operating system cannot supply secure random bytes. There is no
/// safe fallback, so this is treated as fatal.
pub fn generate_password(length: usize) -> String {
    match generate_password_with(&mut OsRandom, length) {
        Ok(password) => password,
        Err(e) => panic!("{}", e),
    }
}
