use tally_types::{Digest, Transfer};

use crate::block::Block;
use crate::error::ChainError;
use crate::ledger::Ledger;
use crate::validator::HashValidator;

/// Result of a full audit of a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub block_count: usize,
    pub violations: Vec<ChainError>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// The violation a fail-fast check would have reported.
    pub fn first(&self) -> Option<&ChainError> {
        self.violations.first()
    }
}

/// Replays a block sequence from genesis and checks every chain invariant.
///
/// For each block, in index order:
/// 1. its transfer is legal against the balances replayed so far
/// 2. its previous digest equals the preceding block's digest
///    (genesis: the empty digest, index 0, empty transfer)
/// 3. its index is one past the preceding block's index
/// 4. its stored digest equals the digest recomputed from its fields
/// 5. the digest satisfies the acceptance predicate
pub struct ChainVerifier<'a> {
    validator: &'a dyn HashValidator,
}

impl<'a> ChainVerifier<'a> {
    pub fn new(validator: &'a dyn HashValidator) -> Self {
        Self { validator }
    }

    /// Stop at the first violation. On success returns the replayed ledger.
    pub fn verify(&self, blocks: &[Block]) -> Result<Ledger, ChainError> {
        let mut first = None;
        let ledger = self.walk(blocks, |violation| {
            first = Some(violation);
            false
        });
        match first {
            Some(violation) => Err(violation),
            None => Ok(ledger),
        }
    }

    /// Check every block and collect all violations.
    ///
    /// An illegal transfer is skipped, leaving the replayed balances as they
    /// were, and the walk continues with the next block.
    pub fn audit(&self, blocks: &[Block]) -> ValidationReport {
        let mut violations = Vec::new();
        self.walk(blocks, |violation| {
            violations.push(violation);
            true
        });
        ValidationReport {
            block_count: blocks.len(),
            violations,
        }
    }

    /// Walk the blocks, handing each violation to `report`. The walk stops as
    /// soon as `report` returns `false`.
    fn walk(&self, blocks: &[Block], mut report: impl FnMut(ChainError) -> bool) -> Ledger {
        let mut ledger = Ledger::new();
        let mut previous: Option<&Block> = None;

        for block in blocks {
            let index = block.index();

            if let Err(source) = ledger.apply(block.transfer()) {
                if !report(ChainError::IllegalTransfer { index, source }) {
                    return ledger;
                }
            }

            for violation in self.structural_violations(previous, block) {
                if !report(violation) {
                    return ledger;
                }
            }

            previous = Some(block);
        }

        ledger
    }

    fn structural_violations(&self, previous: Option<&Block>, block: &Block) -> Vec<ChainError> {
        let index = block.index();
        let mut violations = Vec::new();

        match previous {
            None => {
                if let Some(reason) = genesis_defect(block) {
                    violations.push(ChainError::MalformedGenesis { reason });
                }
            }
            Some(prev) => {
                if block.previous() != prev.digest() {
                    violations.push(ChainError::BrokenLink { index });
                }
                match prev.index().checked_add(1) {
                    Some(expected) if expected != index => {
                        violations.push(ChainError::SequenceGap { index, expected });
                    }
                    Some(_) => {}
                    None => violations.push(ChainError::IndexOverflow { index }),
                }
            }
        }

        let computed = block.computed_digest();
        if computed != *block.digest() {
            violations.push(ChainError::ForgedBlock { index });
        }
        if !self.validator.is_valid(&computed) {
            violations.push(ChainError::InsufficientWork { index });
        }

        violations
    }
}

fn genesis_defect(block: &Block) -> Option<String> {
    if block.index() != 0 {
        return Some(format!("index is {}, expected 0", block.index()));
    }
    if *block.previous() != Digest::empty() {
        return Some("previous digest is not empty".into());
    }
    if *block.transfer() != Transfer::empty() {
        return Some(format!("carries transfer {}", block.transfer()));
    }
    None
}
