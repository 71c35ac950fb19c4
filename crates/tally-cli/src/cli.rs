use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tally_chain::{ChainConfig, Difficulty};

#[derive(Parser)]
#[command(
    name = "tally",
    about = "Tally: an in-memory ledger secured by a proof-of-work hash chain",
    version
)]
pub struct Cli {
    /// TOML file with difficulty and mining settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Require this many leading zero bytes in every block digest
    #[arg(long, conflicts_with = "prefix")]
    pub zero_bytes: Option<usize>,

    /// Require every block digest to start with these hex bytes
    #[arg(long)]
    pub prefix: Option<String>,

    /// Give up mining a block after this many attempts
    #[arg(long)]
    pub max_attempts: Option<u64>,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    /// Chain configuration from the config file (if any) with flag overrides applied.
    pub fn chain_config(&self) -> anyhow::Result<ChainConfig> {
        let mut config = match &self.config {
            Some(path) => ChainConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ChainConfig::default(),
        };
        if let Some(n) = self.zero_bytes {
            config.difficulty = Difficulty::LeadingZeroBytes(n);
        }
        if let Some(hex) = &self.prefix {
            config.difficulty = Difficulty::prefix_hex(hex)?;
        }
        if let Some(max) = self.max_attempts {
            config.mining.max_attempts = Some(max);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tally_chain::NonceStrategy;

    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["tally"]).unwrap();
        assert!(!cli.verbose);
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.chain_config().unwrap(), ChainConfig::default());
    }

    #[test]
    fn zero_bytes_override() {
        let cli = Cli::try_parse_from(["tally", "--zero-bytes", "2", "--max-attempts", "9"]).unwrap();
        let config = cli.chain_config().unwrap();
        assert_eq!(config.difficulty, Difficulty::LeadingZeroBytes(2));
        assert_eq!(config.mining.max_attempts, Some(9));
    }

    #[test]
    fn prefix_override() {
        let cli = Cli::try_parse_from(["tally", "--prefix", "0020"]).unwrap();
        assert_eq!(
            cli.chain_config().unwrap().difficulty,
            Difficulty::Prefix(vec![0, 32])
        );
    }

    #[test]
    fn bad_prefix_is_an_error() {
        let cli = Cli::try_parse_from(["tally", "--prefix", "0g"]).unwrap();
        assert!(cli.chain_config().is_err());
    }

    #[test]
    fn zero_bytes_conflicts_with_prefix() {
        assert!(Cli::try_parse_from(["tally", "--zero-bytes", "1", "--prefix", "00"]).is_err());
    }

    #[test]
    fn config_file_with_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "difficulty = {{ leading_zero_bits = 4 }}").unwrap();
        writeln!(file, "[mining]").unwrap();
        writeln!(file, "strategy = {{ kind = \"sequential\", start = 5 }}").unwrap();

        let path = file.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["tally", "--config", path, "--max-attempts", "100"]).unwrap();
        let config = cli.chain_config().unwrap();
        assert_eq!(config.difficulty, Difficulty::LeadingZeroBits(4));
        assert_eq!(config.mining.strategy, NonceStrategy::Sequential { start: 5 });
        assert_eq!(config.mining.max_attempts, Some(100));
    }

    #[test]
    fn json_format() {
        let cli = Cli::try_parse_from(["tally", "--format", "json", "-v"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.verbose);
    }
}
