use std::collections::BTreeMap;

use tally_types::Transfer;

use crate::block::Block;
use crate::error::{ChainError, TransferError};

/// Running balance per participant.
///
/// A name is present once it has been credited by some transfer; a legal
/// source is therefore always present before it is debited.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    balances: BTreeMap<String, i64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild balances from scratch by applying every block's transfer in order.
    pub fn replay<'a>(blocks: impl IntoIterator<Item = &'a Block>) -> Result<Self, ChainError> {
        let mut ledger = Self::new();
        for block in blocks {
            ledger
                .apply(block.transfer())
                .map_err(|source| ChainError::IllegalTransfer {
                    index: block.index(),
                    source,
                })?;
        }
        Ok(ledger)
    }

    /// Check a transfer against the current balances without applying it.
    ///
    /// A negative amount is illegal for deposits as well as transfers.
    pub fn check(&self, transfer: &Transfer) -> Result<(), TransferError> {
        if transfer.amount < 0 {
            return Err(TransferError::NegativeAmount {
                amount: transfer.amount,
            });
        }
        if transfer.is_deposit() {
            return Ok(());
        }

        let balance = self
            .balances
            .get(&transfer.source)
            .copied()
            .ok_or_else(|| TransferError::UnknownSource {
                name: transfer.source.clone(),
            })?;

        // A self-transfer credits before it debits, leaving the balance unchanged.
        let remaining = if transfer.source == transfer.target {
            balance
        } else {
            balance - i64::from(transfer.amount)
        };
        if remaining < 0 {
            return Err(TransferError::InsufficientFunds {
                name: transfer.source.clone(),
                balance,
                amount: transfer.amount,
            });
        }
        Ok(())
    }

    /// Apply a transfer. An illegal transfer leaves the ledger untouched.
    pub fn apply(&mut self, transfer: &Transfer) -> Result<(), TransferError> {
        self.check(transfer)?;
        let amount = i64::from(transfer.amount);
        if !transfer.target.is_empty() {
            *self.balances.entry(transfer.target.clone()).or_insert(0) += amount;
        }
        if !transfer.is_deposit() {
            if let Some(balance) = self.balances.get_mut(&transfer.source) {
                *balance -= amount;
            }
        }
        Ok(())
    }

    /// Undo a transfer previously applied with [`Ledger::apply`].
    ///
    /// Entries are never removed here; see [`Ledger::retain`].
    pub fn revert(&mut self, transfer: &Transfer) {
        let amount = i64::from(transfer.amount);
        if !transfer.source.is_empty() {
            *self.balances.entry(transfer.source.clone()).or_insert(0) += amount;
        }
        if !transfer.target.is_empty() {
            *self.balances.entry(transfer.target.clone()).or_insert(0) -= amount;
        }
    }

    /// Drop every participant for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.balances.retain(|name, _| keep(name));
    }

    /// Balance of `name`, or 0 if unknown.
    pub fn balance(&self, name: &str) -> i64 {
        self.balances.get(name).copied().unwrap_or(0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.balances.contains_key(name)
    }

    /// Every participant name, in byte order.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.balances.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
