use std::fmt;

use serde::{Deserialize, Serialize};

/// A single value movement between two named participants.
///
/// An empty `source` marks a deposit: the target is credited and nobody is
/// debited. The type carries no validity rules of its own; whether a transfer
/// is legal depends on the balances it is applied against.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transfer {
    pub source: String,
    pub target: String,
    pub amount: i32,
}

impl Transfer {
    pub fn new(source: impl Into<String>, target: impl Into<String>, amount: i32) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            amount,
        }
    }

    /// Credit `target` with `amount` without debiting anyone.
    pub fn deposit(target: impl Into<String>, amount: i32) -> Self {
        Self::new(String::new(), target, amount)
    }

    /// The transfer recorded in every genesis block.
    pub fn empty() -> Self {
        Self::new(String::new(), String::new(), 0)
    }

    pub fn is_deposit(&self) -> bool {
        self.source.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.target.is_empty() && self.amount == 0
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_deposit() {
            write!(f, "[Deposit, Target: {}, Amount: {}]", self.target, self.amount)
        } else {
            write!(
                f,
                "[Source: {}, Target: {}, Amount: {}]",
                self.source, self.target, self.amount
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_transfer() {
        let t = Transfer::new("Here", "There", 10);
        assert_eq!(t.source, "Here");
        assert_eq!(t.target, "There");
        assert_eq!(t.amount, 10);
        assert!(!t.is_deposit());
        assert_eq!(t.to_string(), "[Source: Here, Target: There, Amount: 10]");
    }

    #[test]
    fn deposit_has_empty_source() {
        let t = Transfer::deposit("There", 42);
        assert_eq!(t.source, "");
        assert!(t.is_deposit());
        assert_eq!(t.to_string(), "[Deposit, Target: There, Amount: 42]");
    }

    #[test]
    fn empty_transfer() {
        let t = Transfer::empty();
        assert!(t.is_empty());
        assert!(t.is_deposit());
        assert!(!Transfer::deposit("A", 0).is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let t = Transfer::new("A", "B", -3);
        let json = serde_json::to_string(&t).unwrap();
        let parsed: Transfer = serde_json::from_str(&json).unwrap();
        assert_eq!(t, parsed);
    }
}
