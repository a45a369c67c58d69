#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(
    clippy::unwrap_used,
    missing_docs,
    rust_2018_idioms,
    unused_lifetimes,
    unused_qualifications
)]

//! See the crate-level README above for an overview. Module docs below
//! cover each layer: field/curve arithmetic, secp256k1's fixed parameters,
//! keys and their wire formats, the Script interpreter, and transactions.

pub mod error;
pub mod field;
pub mod hash;
pub mod keys;
pub mod point;
pub mod script;
pub mod secp256k1;
pub mod tx;

#[cfg(feature = "fetch")]
pub mod fetch;

pub use error::{Error, Result};
pub use field::FieldElement;
pub use keys::{PrivateKey, PublicKey, Signature};
pub use point::Point;
pub use script::Script;
pub use tx::{Tx, TxIn, TxOut};

#[cfg(feature = "fetch")]
pub use fetch::TxFetcher;
