//! Error taxonomy for the cryptographic, wire-format, and transaction layers.
//!
//! Script evaluation is the one exception: a failing opcode or an invalid
//! final stack state is reported as `Ok(false)` from [`crate::script::Script::evaluate`],
//! never as an [`enum@Error`], so callers can keep validating other scripts.

use thiserror::Error;

/// Errors raised by the finite-field, curve, key, and wire-format layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Cross-field or cross-curve arithmetic, or a value out of its required
    /// range (e.g. a field element outside `[0, p)`, a scalar outside `(0,
    /// n)`).
    #[error("domain error: {0}")]
    Domain(String),

    /// Malformed SEC, DER, base58, WIF, varint, or Script encoding.
    #[error("format error: {0}")]
    Format(String),

    /// base58check checksum verification failed.
    #[error("checksum mismatch: expected {expected}, found {found}")]
    Checksum {
        /// Checksum computed from the decoded payload.
        expected: String,
        /// Checksum bytes embedded in the encoded string.
        found: String,
    },

    /// The external transaction fetcher failed, either at the network layer
    /// or while parsing the response.
    #[error("tx fetch error: {0}")]
    Fetch(String),

    /// Underlying I/O failure (disk cache load/dump).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
