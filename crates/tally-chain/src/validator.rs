use serde::{Deserialize, Serialize};
use tally_types::Digest;

use crate::error::ConfigError;

/// Acceptance predicate over block digests.
///
/// Defines the proof-of-work difficulty of a chain. Any
/// `Fn(&Digest) -> bool` closure is a validator.
pub trait HashValidator: Send + Sync {
    fn is_valid(&self, digest: &Digest) -> bool;
}

impl<F> HashValidator for F
where
    F: Fn(&Digest) -> bool + Send + Sync,
{
    fn is_valid(&self, digest: &Digest) -> bool {
        self(digest)
    }
}

/// Configurable difficulty predicates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// The first `n` bytes must be zero.
    LeadingZeroBytes(usize),
    /// The first `n` bits must be zero.
    LeadingZeroBits(u32),
    /// The digest must start with these exact bytes.
    Prefix(Vec<u8>),
    /// Every digest is accepted.
    Any,
}

impl Difficulty {
    /// Prefix difficulty from a hex string such as `"0020"`.
    pub fn prefix_hex(hex: &str) -> Result<Self, ConfigError> {
        let prefix = Digest::from_hex(hex)?;
        Ok(Self::Prefix(prefix.as_bytes().to_vec()))
    }

    /// Expected number of attempts before a nonce is accepted.
    pub fn expected_attempts(&self) -> f64 {
        match self {
            Self::LeadingZeroBytes(n) => 256f64.powi(*n as i32),
            Self::LeadingZeroBits(n) => 2f64.powi(*n as i32),
            Self::Prefix(bytes) => 256f64.powi(bytes.len() as i32),
            Self::Any => 1.0,
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::LeadingZeroBytes(1)
    }
}

impl HashValidator for Difficulty {
    fn is_valid(&self, digest: &Digest) -> bool {
        let bytes = digest.as_bytes();
        match self {
            Self::LeadingZeroBytes(n) => bytes.len() >= *n && bytes[..*n].iter().all(|b| *b == 0),
            Self::LeadingZeroBits(n) => leading_zero_bits(bytes) >= *n,
            Self::Prefix(prefix) => bytes.starts_with(prefix),
            Self::Any => true,
        }
    }
}

fn leading_zero_bits(bytes: &[u8]) -> u32 {
    let mut count = 0;
    for byte in bytes {
        if *byte == 0 {
            count += 8;
        } else {
            return count + byte.leading_zeros();
        }
    }
    count
}
