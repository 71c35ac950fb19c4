use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::miner::MiningConfig;
use crate::validator::Difficulty;

/// Configuration for a chain: its acceptance predicate and how blocks are mined.
///
/// ```toml
/// difficulty = { prefix = [0, 32] }
///
/// [mining]
/// max_attempts = 10000000
/// strategy = { kind = "sequential", start = 0 }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub difficulty: Difficulty,
    pub mining: MiningConfig,
}

impl ChainConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
