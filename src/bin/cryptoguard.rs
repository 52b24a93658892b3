//! Cryptoguard CLI - Passphrase-based message protection
//!
//! Command-line interface for protecting and revealing text messages using
//! AES-256-GCM with PBKDF2-HMAC-SHA256 key derivation.

use clap::{ArgAction, Parser, Subcommand};
use std::error::Error as StdError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cryptoguard::error::{CryptoguardError, ErrorCategory, ErrorKind};
use cryptoguard::message_ops;
use cryptoguard::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};
use cryptoguard::password::{DEFAULT_PASSWORD_LENGTH, generate_password_with};
use cryptoguard::random::OsRandom;

#[derive(Parser)]
#[command(name = "cryptoguard")]
#[command(version)]
#[command(about = "Protect and reveal messages with a passphrase.", long_about = None)]
struct Cli {
    /// Read passphrase from stdin instead of from terminal
    #[arg(long, global = true, conflicts_with = "passphrase_file")]
    passphrase_stdin: bool,

    /// Read passphrase from FILE instead of from terminal
    #[arg(long, global = true, value_name = "FILE")]
    passphrase_file: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Protect (encrypt) a message
    #[command(alias = "e")]
    Encrypt {
        /// File containing the message to protect [default: stdin]
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// File to write the protected envelope to [default: stdout]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Also render the envelope as a QR code on stderr
        #[arg(long)]
        qr: bool,
    },

    /// Reveal (decrypt) a protected message
    #[command(alias = "d")]
    Decrypt {
        /// File containing the protected envelope [default: stdin]
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// File to write the revealed message to [default: stdout]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Generate a random passphrase
    #[command(alias = "g")]
    GeneratePassword {
        /// Number of characters
        #[arg(short, long, default_value_t = DEFAULT_PASSWORD_LENGTH)]
        length: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let passphrase_file = cli.passphrase_file.as_deref();
    let result = match cli.command {
        Commands::Encrypt { input, output, qr } => {
            get_passphrase_reader(cli.passphrase_stdin, passphrase_file, input.is_some(), true)
                .and_then(|mut reader| {
                    message_ops::protect_message(
                        input.as_deref(),
                        output.as_deref(),
                        &mut *reader,
                        qr,
                    )
                })
        }
        Commands::Decrypt { input, output } => {
            get_passphrase_reader(cli.passphrase_stdin, passphrase_file, input.is_some(), false)
                .and_then(|mut reader| {
                    message_ops::reveal_message(input.as_deref(), output.as_deref(), &mut *reader)
                })
        }
        Commands::GeneratePassword { length } => {
            generate_password_with(&mut OsRandom, length).and_then(|password| {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{}", password).map_err(|e| {
                    CryptoguardError::io(ErrorCategory::Internal, "failed to write to stdout", e)
                })
            })
        }
    };

    if let Err(e) = result {
        tracing::debug!(category = ?e.category, kind = ?e.kind, "command failed");
        eprintln!("Error: {}", error_chain(&e));
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn get_passphrase_reader(
    use_stdin: bool,
    passphrase_file: Option<&Path>,
    has_input_file: bool,
    confirm: bool,
) -> cryptoguard::Result<Box<dyn PassphraseReader>> {
    if let Some(path) = passphrase_file {
        let file = File::open(path).map_err(|e| {
            CryptoguardError::io(
                ErrorCategory::User,
                format!("failed to open passphrase file {}", path.display()),
                e,
            )
        })?;
        Ok(Box::new(ReaderPassphraseReader::new(Box::new(file))))
    } else if use_stdin {
        if !has_input_file {
            return Err(CryptoguardError::with_kind(
                ErrorCategory::User,
                ErrorKind::InputMissing,
                "--passphrase-stdin requires the message to be given with --input",
            ));
        }
        Ok(Box::new(ReaderPassphraseReader::new(Box::new(
            std::io::stdin(),
        ))))
    } else if confirm {
        Ok(Box::new(TerminalPassphraseReader::confirming()))
    } else {
        Ok(Box::new(TerminalPassphraseReader::new()))
    }
}

/// Joins an error and its sources as `outer: inner: ...`.
fn error_chain(err: &CryptoguardError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}
