use std::fmt;

use serde::Serialize;
use tally_types::{Digest, Transfer};

use crate::error::MiningError;
use crate::hasher::BlockHasher;
use crate::miner::{CancelToken, Miner, MiningConfig};
use crate::validator::HashValidator;

/// One ledger entry: a transfer bound to its predecessor by a mined digest.
///
/// Fields are private and the stored digest is always produced by
/// [`BlockHasher`] at construction time. Only the test mutators can
/// desynchronize it from the contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Block {
    index: u32,
    transfer: Transfer,
    previous: Digest,
    nonce: u64,
    digest: Digest,
}

impl Block {
    /// Mine a block: search for a nonce whose digest satisfies `validator`.
    pub fn mine(
        index: u32,
        transfer: Transfer,
        previous: Digest,
        validator: &dyn HashValidator,
        config: &MiningConfig,
    ) -> Result<Self, MiningError> {
        let solution = Miner::new(config).search(index, &transfer, &previous, validator)?;
        Ok(Self {
            index,
            transfer,
            previous,
            nonce: solution.nonce,
            digest: solution.digest,
        })
    }

    /// Like [`Block::mine`], stopping early once `cancel` is set.
    pub fn mine_with_cancel(
        index: u32,
        transfer: Transfer,
        previous: Digest,
        validator: &dyn HashValidator,
        config: &MiningConfig,
        cancel: &CancelToken,
    ) -> Result<Self, MiningError> {
        let solution = Miner::new(config)
            .with_cancel(cancel)
            .search(index, &transfer, &previous, validator)?;
        Ok(Self {
            index,
            transfer,
            previous,
            nonce: solution.nonce,
            digest: solution.digest,
        })
    }

    /// Rebuild a block from a known nonce. The predicate is not checked.
    pub fn with_nonce(index: u32, transfer: Transfer, previous: Digest, nonce: u64) -> Self {
        let digest = BlockHasher::compute(index, &transfer, &previous, nonce);
        Self {
            index,
            transfer,
            previous,
            nonce,
            digest,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn transfer(&self) -> &Transfer {
        &self.transfer
    }

    pub fn previous(&self) -> &Digest {
        &self.previous
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The digest stored at construction time.
    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    /// Digest recomputed from the current contents.
    pub fn computed_digest(&self) -> Digest {
        BlockHasher::compute(self.index, &self.transfer, &self.previous, self.nonce)
    }

    /// Whether the stored digest still matches the contents.
    pub fn is_consistent(&self) -> bool {
        BlockHasher::verify(
            self.index,
            &self.transfer,
            &self.previous,
            self.nonce,
            &self.digest,
        )
    }

    /// Replace the transfer without updating the digest.
    #[cfg(any(test, feature = "testing"))]
    pub fn tamper_transfer(&mut self, transfer: Transfer) {
        self.transfer = transfer;
    }

    /// Replace the nonce without updating the digest.
    #[cfg(any(test, feature = "testing"))]
    pub fn tamper_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Block {} (Transaction: {}, Nonce: {}, prevHash: {}, hash: {})",
            self.index, self.transfer, self.nonce, self.previous, self.digest
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::validator::Difficulty;

    use super::*;

    fn validator() -> impl Fn(&Digest) -> bool + Send + Sync {
        |d: &Digest| d.get(0) == Some(0) && d.get(1).is_some_and(|b| b < 64)
    }

    #[test]
    fn mined_block_satisfies_validator() {
        let v = validator();
        let prev = Digest::from_hash([5; 32]);
        let block = Block::mine(
            3,
            Transfer::new("Here", "There", 123),
            prev.clone(),
            &v,
            &MiningConfig::default(),
        )
        .unwrap();
        assert!(v(block.digest()));
        assert_eq!(block.index(), 3);
        assert_eq!(block.transfer(), &Transfer::new("Here", "There", 123));
        assert_eq!(block.previous(), &prev);
        assert!(block.is_consistent());
    }

    #[test]
    fn with_nonce_reproduces_mined_block() {
        let mined = Block::mine(
            1,
            Transfer::deposit("A", 10),
            Digest::empty(),
            &Difficulty::LeadingZeroBytes(1),
            &MiningConfig::default(),
        )
        .unwrap();
        let rebuilt = Block::with_nonce(1, Transfer::deposit("A", 10), Digest::empty(), mined.nonce());
        assert_eq!(rebuilt, mined);
    }

    #[test]
    fn with_nonce_does_not_check_predicate() {
        let block = Block::with_nonce(1, Transfer::deposit("A", 10), Digest::empty(), 7);
        assert!(block.is_consistent());
        assert_eq!(block.nonce(), 7);
    }

    #[test]
    fn bounded_mining_reports_exhaustion() {
        let err = Block::mine(
            1,
            Transfer::empty(),
            Digest::empty(),
            &Difficulty::LeadingZeroBytes(33),
            &MiningConfig::default().with_max_attempts(50),
        )
        .unwrap_err();
        assert_eq!(err, MiningError::Exhausted { attempts: 50 });
    }

    #[test]
    fn cancelled_mining() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = Block::mine_with_cancel(
            1,
            Transfer::empty(),
            Digest::empty(),
            &Difficulty::Any,
            &MiningConfig::default(),
            &cancel,
        )
        .unwrap_err();
        assert_eq!(err, MiningError::Cancelled { attempts: 0 });
    }

    #[test]
    fn tampering_desynchronizes_digest() {
        let mut block = Block::with_nonce(1, Transfer::deposit("A", 100), Digest::empty(), 9);
        block.tamper_transfer(Transfer::deposit("A", 1000));
        assert!(!block.is_consistent());

        let mut block = Block::with_nonce(1, Transfer::deposit("A", 100), Digest::empty(), 9);
        block.tamper_nonce(10);
        assert!(!block.is_consistent());
    }

    #[test]
    fn display_lists_fields() {
        let block = Block::with_nonce(2, Transfer::new("A", "B", 5), Digest::empty(), 11);
        let text = block.to_string();
        assert!(text.starts_with("Block 2 (Transaction: [Source: A, Target: B, Amount: 5], Nonce: 11"));
        assert!(text.contains(&block.digest().to_hex()));
    }
}
