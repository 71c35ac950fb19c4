//! Value types for the Tally proof-of-work ledger.
//!
//! These are the plain data carriers the chain engine consumes:
//!
//! - [`Digest`]: immutable hash output with byte-wise equality and hex rendering
//! - [`Transfer`]: one value movement (source, target, amount); an empty source is a deposit

pub mod digest;
pub mod error;
pub mod transfer;

pub use digest::{Digest, DIGEST_LEN};
pub use error::TypeError;
pub use transfer::Transfer;
