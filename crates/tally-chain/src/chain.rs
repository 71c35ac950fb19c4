use std::collections::HashSet;

use tally_types::{Digest, Transfer};
use tracing::{debug, info, warn};

use crate::block::Block;
use crate::config::ChainConfig;
use crate::error::{ChainError, MiningError};
use crate::ledger::Ledger;
use crate::miner::{CancelToken, MiningConfig};
use crate::validation::{ChainVerifier, ValidationReport};
use crate::validator::HashValidator;

/// An append-only, proof-of-work secured sequence of transfers.
///
/// The chain owns its blocks (genesis first, tip last), the balances they
/// produce, and the acceptance predicate every block digest must satisfy.
/// Blocks and balances change together: a rejected append or a removal
/// never leaves one updated without the other.
pub struct Chain {
    blocks: Vec<Block>,
    /// Transfer of each block as it stood when applied to `ledger`.
    applied: Vec<Transfer>,
    ledger: Ledger,
    validator: Box<dyn HashValidator>,
    mining: MiningConfig,
}

impl Chain {
    /// Create a chain and mine its genesis block with unbounded random search.
    pub fn new(validator: impl HashValidator + 'static) -> Result<Self, MiningError> {
        Self::with_config(validator, MiningConfig::default())
    }

    /// Create a chain whose genesis and later blocks are mined with `mining`.
    pub fn with_config(
        validator: impl HashValidator + 'static,
        mining: MiningConfig,
    ) -> Result<Self, MiningError> {
        let validator: Box<dyn HashValidator> = Box::new(validator);
        let genesis = Block::mine(
            0,
            Transfer::empty(),
            Digest::empty(),
            validator.as_ref(),
            &mining,
        )?;
        info!(digest = %genesis.digest().short_hex(), "chain created");

        Ok(Self {
            applied: vec![genesis.transfer().clone()],
            blocks: vec![genesis],
            ledger: Ledger::new(),
            validator,
            mining,
        })
    }

    pub fn from_config(config: &ChainConfig) -> Result<Self, MiningError> {
        Self::with_config(config.difficulty.clone(), config.mining.clone())
    }

    /// Mine the next block for the current tip without appending it.
    pub fn mine(&self, transfer: Transfer) -> Result<Block, MiningError> {
        let index = self.successor_index()?;
        Block::mine(
            index,
            transfer,
            self.tip_digest().clone(),
            self.validator.as_ref(),
            &self.mining,
        )
    }

    /// Like [`Chain::mine`], stopping early once `cancel` is set.
    pub fn mine_with_cancel(
        &self,
        transfer: Transfer,
        cancel: &CancelToken,
    ) -> Result<Block, MiningError> {
        let index = self.successor_index()?;
        Block::mine_with_cancel(
            index,
            transfer,
            self.tip_digest().clone(),
            self.validator.as_ref(),
            &self.mining,
            cancel,
        )
    }

    /// Index the next appended block must carry, or `None` once the tip
    /// holds `u32::MAX`.
    pub fn next_index(&self) -> Option<u32> {
        self.last_block().index().checked_add(1)
    }

    fn successor_index(&self) -> Result<u32, MiningError> {
        self.next_index().ok_or(MiningError::IndexOverflow {
            tip: self.last_block().index(),
        })
    }

    /// Append a block after the tip.
    ///
    /// The block must reference the tip's digest, carry the next index,
    /// satisfy the predicate, hash to its stored digest, and carry a legal
    /// transfer. On any failure the chain and balances are unchanged.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        if let Err(err) = self.admit(&block) {
            warn!(index = block.index(), error = %err, "block rejected");
            return Err(err);
        }

        debug!(
            index = block.index(),
            digest = %block.digest().short_hex(),
            transfer = %block.transfer(),
            "block appended"
        );
        self.applied.push(block.transfer().clone());
        self.blocks.push(block);
        Ok(())
    }

    /// Validate `block` against the tip and apply its transfer to the ledger.
    fn admit(&mut self, block: &Block) -> Result<(), ChainError> {
        let index = block.index();

        if block.previous() != self.tip_digest() {
            return Err(ChainError::BrokenLink { index });
        }
        let expected = self
            .next_index()
            .ok_or(ChainError::IndexOverflow { index })?;
        if index != expected {
            return Err(ChainError::SequenceGap { index, expected });
        }
        if !self.validator.is_valid(block.digest()) {
            return Err(ChainError::InsufficientWork { index });
        }
        if !block.is_consistent() {
            return Err(ChainError::ForgedBlock { index });
        }

        self.ledger
            .apply(block.transfer())
            .map_err(|source| ChainError::IllegalTransfer { index, source })
    }

    /// Remove the tip and rebuild the balances for the new tip.
    ///
    /// Returns `false` without changes when only the genesis block remains.
    /// The balances become a replay of the remaining blocks from genesis, so
    /// participants no longer named by any remaining transfer are dropped.
    /// If a remaining block was altered into an illegal transfer, the replay
    /// is impossible; the transfer recorded for the removed block when it was
    /// appended is undone instead.
    pub fn remove_last(&mut self) -> bool {
        if self.blocks.len() <= 1 {
            return false;
        }
        let (Some(removed), Some(applied)) = (self.blocks.pop(), self.applied.pop()) else {
            return false;
        };

        match Ledger::replay(&self.blocks) {
            Ok(ledger) => {
                self.ledger = ledger;
                self.applied = self.blocks.iter().map(|b| b.transfer().clone()).collect();
            }
            Err(err) => {
                warn!(error = %err, "remaining blocks do not replay, undoing recorded transfer");
                self.ledger.revert(&applied);
                let referenced: HashSet<&str> = self
                    .applied
                    .iter()
                    .flat_map(|t| [t.source.as_str(), t.target.as_str()])
                    .collect();
                self.ledger.retain(|name| referenced.contains(name));
            }
        }

        debug!(
            index = removed.index(),
            size = self.blocks.len(),
            users = self.ledger.len(),
            "tip removed"
        );
        true
    }

    /// Replay the whole chain and report the first violation.
    ///
    /// The live balances are not touched; the replay runs on a fresh ledger.
    pub fn check(&self) -> Result<(), ChainError> {
        ChainVerifier::new(self.validator.as_ref())
            .verify(&self.blocks)
            .map(|_| ())
    }

    pub fn is_correct(&self) -> bool {
        self.check().is_ok()
    }

    /// Replay the whole chain and report every violation.
    pub fn audit(&self) -> ValidationReport {
        ChainVerifier::new(self.validator.as_ref()).audit(&self.blocks)
    }

    /// Balance of `name`, or 0 if unknown.
    pub fn balance(&self, name: &str) -> i64 {
        self.ledger.balance(name)
    }

    /// Every participant currently holding a ledger entry.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.ledger.users()
    }

    /// Blocks from genesis to tip.
    pub fn blocks(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Transfers of every block after genesis.
    pub fn transfers(&self) -> impl Iterator<Item = &Transfer> {
        self.blocks.iter().skip(1).map(Block::transfer)
    }

    pub fn block(&self, index: u32) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// Number of blocks including genesis. Always at least 1.
    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn last_block(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_digest(&self) -> &Digest {
        self.last_block().digest()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn validator(&self) -> &dyn HashValidator {
        self.validator.as_ref()
    }

    pub fn mining_config(&self) -> &MiningConfig {
        &self.mining
    }

    /// Direct mutable access to an appended block, for tampering tests.
    #[cfg(any(test, feature = "testing"))]
    pub fn block_mut(&mut self, index: u32) -> Option<&mut Block> {
        self.blocks.get_mut(index as usize)
    }
}
