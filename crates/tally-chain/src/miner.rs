use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tally_types::{Digest, Transfer};
use tracing::debug;

use crate::error::MiningError;
use crate::hasher::BlockHasher;
use crate::validator::HashValidator;

/// How candidate nonces are drawn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NonceStrategy {
    /// Uniformly random over the whole `u64` domain.
    #[default]
    Random,
    /// `start`, `start + 1`, ... wrapping at `u64::MAX`.
    Sequential { start: u64 },
}

/// Bounds and strategy for a nonce search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    pub strategy: NonceStrategy,
    /// Give up after this many digests. `None` searches until a nonce is
    /// found or the search is cancelled.
    pub max_attempts: Option<u64>,
}

impl MiningConfig {
    pub fn sequential(start: u64) -> Self {
        Self {
            strategy: NonceStrategy::Sequential { start },
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

/// Cooperative cancellation flag shared between a miner and its controller.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A winning nonce and the digest it produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub digest: Digest,
    pub attempts: u64,
}

/// Proof-of-work nonce search.
pub struct Miner<'a> {
    config: &'a MiningConfig,
    cancel: Option<&'a CancelToken>,
}

impl<'a> Miner<'a> {
    pub fn new(config: &'a MiningConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: &'a CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Search for a nonce whose digest satisfies `validator`.
    ///
    /// The cancellation token is polled before every attempt.
    pub fn search(
        &self,
        index: u32,
        transfer: &Transfer,
        previous: &Digest,
        validator: &dyn HashValidator,
    ) -> Result<Solution, MiningError> {
        let prefix = BlockHasher::prefix(index, transfer, previous);
        let mut rng = rand::thread_rng();
        let mut next = match self.config.strategy {
            NonceStrategy::Sequential { start } => start,
            NonceStrategy::Random => 0,
        };
        let mut attempts = 0u64;

        loop {
            if self.cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(MiningError::Cancelled { attempts });
            }
            if self.config.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(MiningError::Exhausted { attempts });
            }

            let nonce = match self.config.strategy {
                NonceStrategy::Random => rng.gen::<u64>(),
                NonceStrategy::Sequential { .. } => {
                    let nonce = next;
                    next = next.wrapping_add(1);
                    nonce
                }
            };

            let mut hasher = prefix.clone();
            hasher.update(&nonce.to_be_bytes());
            let digest = Digest::from_hash(*hasher.finalize().as_bytes());
            attempts += 1;

            if validator.is_valid(&digest) {
                debug!(index, nonce, attempts, digest = %digest.short_hex(), "nonce found");
                return Ok(Solution {
                    nonce,
                    digest,
                    attempts,
                });
            }
        }
    }
}
