//! # Checkpoint Store Errors
//!
//! This module defines the [`CheckpointError`] enum used throughout the crate
//! for reporting cryptographic, encoding, and storage-agreement failures.

use std::borrow::Cow;
use std::path::PathBuf;

/// A specialized error enum for sealed-checkpoint-store failures.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Failure while encrypting a timestamp into a Fernet token.
    #[error("encryption error: {message}")]
    Encryption { message: Cow<'static, str> },

    /// Failure while decrypting or authenticating a Fernet token.
    ///
    /// This covers malformed base64, a bad version byte, and HMAC mismatch —
    /// any of which indicate either corruption or tampering.
    #[error("decryption error: {message}")]
    Decryption { message: Cow<'static, str> },

    /// Fewer than two of the three checkpoint files decrypted successfully.
    #[error("fewer than two checkpoint files are readable: {readable}/3")]
    InsufficientReplicas { readable: usize },

    /// The decrypted timestamps disagree beyond the configured tolerance.
    #[error("checkpoint files disagree beyond tolerance: spread={spread_secs:.3}s tolerance={tolerance_secs:.3}s")]
    Disagreement { spread_secs: f64, tolerance_secs: f64 },

    /// I/O failure reading or writing a checkpoint file.
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
}
