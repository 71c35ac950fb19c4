use tally_types::TypeError;

/// Why a transfer cannot be applied to the current balances.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("amount {amount} is negative")]
    NegativeAmount { amount: i32 },

    #[error("source {name:?} has never received funds")]
    UnknownSource { name: String },

    #[error("source {name:?} holds {balance}, cannot send {amount}")]
    InsufficientFunds {
        name: String,
        balance: i64,
        amount: i32,
    },
}

/// Integrity violations reported by append and full-chain checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("broken link at block {index}: previous digest does not match")]
    BrokenLink { index: u32 },

    #[error("sequence gap at block {index}: expected index {expected}")]
    SequenceGap { index: u32, expected: u32 },

    #[error("forged block {index}: stored digest differs from computed digest")]
    ForgedBlock { index: u32 },

    #[error("insufficient proof of work at block {index}")]
    InsufficientWork { index: u32 },

    #[error("illegal transfer at block {index}: {source}")]
    IllegalTransfer {
        index: u32,
        #[source]
        source: TransferError,
    },

    #[error("genesis block is malformed: {reason}")]
    MalformedGenesis { reason: String },

    #[error("block {index} follows a block holding the last representable index")]
    IndexOverflow { index: u32 },
}

impl ChainError {
    /// Index of the offending block.
    pub fn index(&self) -> u32 {
        match self {
            Self::BrokenLink { index }
            | Self::SequenceGap { index, .. }
            | Self::ForgedBlock { index }
            | Self::InsufficientWork { index }
            | Self::IllegalTransfer { index, .. }
            | Self::IndexOverflow { index } => *index,
            Self::MalformedGenesis { .. } => 0,
        }
    }
}

/// Reasons a nonce search stopped without a winning digest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MiningError {
    #[error("no acceptable nonce found in {attempts} attempts")]
    Exhausted { attempts: u64 },

    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("tip index {tip} has no successor")]
    IndexOverflow { tip: u32 },
}

/// Errors from loading chain configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid difficulty prefix: {0}")]
    InvalidPrefix(#[from] TypeError),
}
