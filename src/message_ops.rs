//! Message protect/reveal operations
//!
//! This module is the boundary between user input and the cipher: it reads
//! the message from a file or stdin, checks that both message and
//! passphrase are present, runs the cipher and writes the result to a file
//! or stdout. Optionally the protected envelope is rendered as a QR code
//! on stderr.

use crate::error::{CryptoguardError, ErrorCategory, ErrorKind, Result};
use crate::passphrase::PassphraseReader;
use crate::pwcipher;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Validate inputs and encrypt `message` under `passphrase`.
///
/// Unlike [`pwcipher::encrypt`], an empty message or passphrase is rejected.
pub fn protect_text(message: &str, passphrase: &str) -> Result<String> {
    require_inputs(message, passphrase)?;
    pwcipher::encrypt(message, passphrase)
}

/// Validate inputs and decrypt `envelope` with `passphrase`.
pub fn reveal_text(envelope: &str, passphrase: &str) -> Result<String> {
    require_inputs(envelope.trim(), passphrase)?;
    pwcipher::decrypt(envelope, passphrase)
}

/// Protect a message
///
/// Reads the message from `input_path` (stdin when `None`), encrypts it
/// using a passphrase from `passphrase_reader`, and writes the armored
/// envelope followed by a newline to `output_path` (stdout when `None`).
///
/// When `qr` is set the envelope is also rendered as a QR code on stderr.
/// The QR code is built before the output is written, so a render failure
/// leaves no output behind.
pub fn protect_message(
    input_path: Option<&Path>,
    output_path: Option<&Path>,
    passphrase_reader: &mut dyn PassphraseReader,
    qr: bool,
) -> Result<()> {
    let message = read_text(input_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let envelope = protect_text(&message, &passphrase)
        .map_err(|e| e.with_context("failed to protect message"))?;

    // A QR failure must leave no output behind.
    let qr_code = if qr { Some(render_qr(&envelope)?) } else { None };

    write_output(output_path, format!("{}\n", envelope).as_bytes())?;
    info!(envelope_len = envelope.len(), "message protected");

    if let Some(qr_code) = qr_code {
        io::stderr().write_all(qr_code.as_bytes()).map_err(|e| {
            CryptoguardError::io(ErrorCategory::Internal, "failed to write QR code", e)
        })?;
    }
    Ok(())
}

/// Reveal a message
///
/// Reads an armored envelope from `input_path` (stdin when `None`),
/// decrypts it using a passphrase from `passphrase_reader`, and writes the
/// plaintext to `output_path` (stdout when `None`).
pub fn reveal_message(
    input_path: Option<&Path>,
    output_path: Option<&Path>,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let envelope = read_text(input_path)?;
    let passphrase = passphrase_reader.read_passphrase()?;
    let plaintext = reveal_text(&envelope, &passphrase)
        .map_err(|e| e.with_context("failed to reveal message"))?;

    write_output(output_path, plaintext.as_bytes())?;
    info!(plaintext_len = plaintext.len(), "message revealed");
    Ok(())
}

/// Render `envelope` as a QR code drawn with terminal block characters.
///
/// Fails with [`ErrorKind::QrRender`] when the envelope exceeds QR capacity
/// (a little under 3 KB of base64).
pub fn render_qr(envelope: &str) -> Result<String> {
    qr2term::generate_qr_string(envelope).map_err(|e| {
        CryptoguardError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::QrRender,
            format!("QR code render failed: {}", e),
        )
    })
}

fn require_inputs(message: &str, passphrase: &str) -> Result<()> {
    if message.is_empty() || passphrase.is_empty() {
        return Err(CryptoguardError::with_kind(
            ErrorCategory::User,
            ErrorKind::InputMissing,
            "message and passphrase are required",
        ));
    }
    Ok(())
}

fn read_text(path: Option<&Path>) -> Result<String> {
    let bytes = match path {
        Some(path) => fs::read(path).map_err(|e| read_error(path, e))?,
        None => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data).map_err(|e| {
                CryptoguardError::io(ErrorCategory::Internal, "failed to read from stdin", e)
            })?;
            data
        }
    };
    debug!(len = bytes.len(), "input read");
    String::from_utf8(bytes).map_err(|e| {
        CryptoguardError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidText,
            "input is not valid UTF-8",
            e,
        )
    })
}

fn write_output(path: Option<&Path>, contents: &[u8]) -> Result<()> {
    match path {
        Some(path) => write_file_secure(path, contents)
            .map_err(|e| e.with_context(format!("failed to write to {}", path.display()))),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(contents)
                .and_then(|()| stdout.flush())
                .map_err(|e| {
                    CryptoguardError::io(ErrorCategory::Internal, "failed to write to stdout", e)
                })
        }
    }
}

/// Atomically write `contents` to `path` (tempfile + fsync + rename),
/// with mode 0o600 on Unix.
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        CryptoguardError::io(ErrorCategory::User, "failed to create tempfile", e)
    })?;

    temp_file.write_all(contents).map_err(|e| {
        CryptoguardError::io(ErrorCategory::Internal, "failed to write to tempfile", e)
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        CryptoguardError::io(ErrorCategory::Internal, "failed to flush tempfile", e)
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        CryptoguardError::io(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| {
                CryptoguardError::io(
                    ErrorCategory::Internal,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }

    temp_file.persist(path).map_err(|e| {
        CryptoguardError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> CryptoguardError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    CryptoguardError::io(
        category,
        format!("failed to read from {}", path.display()),
        err,
    )
}
