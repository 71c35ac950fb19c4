//! Core of the Tally proof-of-work ledger.
//!
//! A [`Chain`] is an in-memory, append-only sequence of [`Block`]s, each
//! recording one [`Transfer`](tally_types::Transfer) and secured by a digest
//! that must satisfy the chain's [`HashValidator`]. This crate provides:
//! - Nonce search with bounded attempts and cooperative cancellation
//! - Append-time validation (link, index, proof of work, digest, balances)
//! - Tip removal with balance rollback
//! - Full replay from genesis, fail-fast ([`Chain::check`]) or collecting
//!   every violation ([`Chain::audit`])
//! - TOML-loadable difficulty and mining configuration

pub mod block;
pub mod chain;
pub mod config;
pub mod error;
pub mod hasher;
pub mod ledger;
pub mod miner;
pub mod validation;
pub mod validator;

pub use block::Block;
pub use chain::Chain;
pub use config::ChainConfig;
pub use error::{ChainError, ConfigError, MiningError, TransferError};
pub use hasher::BlockHasher;
pub use ledger::Ledger;
pub use miner::{CancelToken, Miner, MiningConfig, NonceStrategy, Solution};
pub use validation::{ChainVerifier, ValidationReport};
pub use validator::{Difficulty, HashValidator};
