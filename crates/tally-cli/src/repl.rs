use std::io::{BufRead, Write};

use colored::Colorize;
use serde::Serialize;
use tally_chain::{Block, Chain};
use tally_types::Transfer;

use crate::cli::OutputFormat;

const HELP: &str = "\
Valid commands:
  mine: discovers the nonce for a given transaction
  append: appends a new block onto the end of the chain
  remove: removes the last block from the end of the chain
  check: checks that the block chain is valid
  audit: lists every problem found in the block chain
  blocks: prints every block in the chain
  users: prints a list of users
  balance: finds a user's balance
  help: prints this list of commands
  quit: quits the program";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Mine,
    Append,
    Remove,
    Check,
    Audit,
    Blocks,
    Users,
    Balance,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "mine" => Some(Self::Mine),
            "append" => Some(Self::Append),
            "remove" => Some(Self::Remove),
            "check" => Some(Self::Check),
            "audit" => Some(Self::Audit),
            "blocks" => Some(Self::Blocks),
            "users" => Some(Self::Users),
            "balance" => Some(Self::Balance),
            "help" => Some(Self::Help),
            "quit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// JSON rendering of a block with hex digests.
#[derive(Serialize)]
struct BlockView<'a> {
    index: u32,
    source: &'a str,
    target: &'a str,
    amount: i32,
    nonce: u64,
    previous: String,
    digest: String,
}

impl<'a> From<&'a Block> for BlockView<'a> {
    fn from(block: &'a Block) -> Self {
        Self {
            index: block.index(),
            source: &block.transfer().source,
            target: &block.transfer().target,
            amount: block.transfer().amount,
            nonce: block.nonce(),
            previous: block.previous().to_hex(),
            digest: block.digest().to_hex(),
        }
    }
}

/// Line-oriented command loop over a chain.
///
/// Reads commands and their fields from `input`, writes prompts and results
/// to `output`. End of input ends the session like `quit`.
pub struct Session<R, W> {
    chain: Chain,
    input: R,
    output: W,
    format: OutputFormat,
}

impl<R: BufRead, W: Write> Session<R, W> {
    pub fn new(chain: Chain, input: R, output: W, format: OutputFormat) -> Self {
        Self {
            chain,
            input,
            output,
            format,
        }
    }

    #[cfg(test)]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "{HELP}")?;
        loop {
            let Some(line) = self.prompt("\nCommand: ")? else {
                break;
            };
            match Command::parse(&line) {
                Some(Command::Quit) => break,
                Some(command) => self.execute(command)?,
                None => writeln!(
                    self.output,
                    "{} use help to see the valid commands",
                    "invalid command,".red()
                )?,
            }
        }
        Ok(())
    }

    pub fn execute(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Mine => self.cmd_mine(),
            Command::Append => self.cmd_append(),
            Command::Remove => self.cmd_remove(),
            Command::Check => self.cmd_check(),
            Command::Audit => self.cmd_audit(),
            Command::Blocks => self.cmd_blocks(),
            Command::Users => self.cmd_users(),
            Command::Balance => self.cmd_balance(),
            Command::Help => Ok(writeln!(self.output, "{HELP}")?),
            Command::Quit => Ok(()),
        }
    }

    fn cmd_mine(&mut self) -> anyhow::Result<()> {
        let Some(transfer) = self.prompt_transfer()? else {
            return Ok(());
        };
        match self.chain.mine(transfer) {
            Ok(block) => writeln!(self.output, "Use nonce: {}", block.nonce().to_string().yellow())?,
            Err(e) => writeln!(self.output, "{} {e}", "mining failed:".red())?,
        }
        Ok(())
    }

    fn cmd_append(&mut self) -> anyhow::Result<()> {
        let Some(transfer) = self.prompt_transfer()? else {
            return Ok(());
        };
        let Some(nonce_text) = self.prompt("Nonce: ")? else {
            return Ok(());
        };
        let Ok(nonce) = nonce_text.trim().parse::<u64>() else {
            writeln!(self.output, "please make sure your nonce is a number")?;
            return Ok(());
        };

        let Some(index) = self.chain.next_index() else {
            writeln!(self.output, "{}", "the chain has no index left for another block".red())?;
            return Ok(());
        };
        let block = Block::with_nonce(index, transfer, self.chain.tip_digest().clone(), nonce);
        let summary = block.to_string();
        match self.chain.append(block) {
            Ok(()) => writeln!(self.output, "{} {summary}", "Appended:".green().bold())?,
            Err(e) => writeln!(self.output, "{} {e}", "failed to add block because".red())?,
        }
        Ok(())
    }

    fn cmd_remove(&mut self) -> anyhow::Result<()> {
        if self.chain.remove_last() {
            writeln!(self.output, "{}", "last block removed".green())?;
        } else {
            writeln!(self.output, "only the genesis block remains; nothing removed")?;
        }
        Ok(())
    }

    fn cmd_check(&mut self) -> anyhow::Result<()> {
        match self.chain.check() {
            Ok(()) => writeln!(self.output, "{} the block chain is valid", "✓".green().bold())?,
            Err(e) => writeln!(self.output, "{} {e}", "✗ the block chain is invalid:".red().bold())?,
        }
        Ok(())
    }

    fn cmd_audit(&mut self) -> anyhow::Result<()> {
        let report = self.chain.audit();
        if report.is_valid() {
            writeln!(
                self.output,
                "{} {} block(s), no problems found",
                "✓".green().bold(),
                report.block_count
            )?;
        } else {
            writeln!(
                self.output,
                "{} {} problem(s) in {} block(s):",
                "✗".red().bold(),
                report.violations.len(),
                report.block_count
            )?;
            for violation in &report.violations {
                writeln!(self.output, "  {violation}")?;
            }
        }
        Ok(())
    }

    fn cmd_blocks(&mut self) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let views: Vec<BlockView<'_>> = self.chain.blocks().map(BlockView::from).collect();
                writeln!(self.output, "{}", serde_json::to_string_pretty(&views)?)?;
            }
            OutputFormat::Text => {
                for block in self.chain.blocks() {
                    writeln!(
                        self.output,
                        "{} {} nonce={} hash={}",
                        format!("#{}", block.index()).yellow(),
                        block.transfer(),
                        block.nonce(),
                        block.digest().short_hex().dimmed()
                    )?;
                }
            }
        }
        Ok(())
    }

    fn cmd_users(&mut self) -> anyhow::Result<()> {
        let users: Vec<String> = self.chain.users().map(str::to_owned).collect();
        if users.is_empty() {
            writeln!(self.output, "no users yet")?;
        }
        for user in users {
            writeln!(self.output, "{user}")?;
        }
        Ok(())
    }

    fn cmd_balance(&mut self) -> anyhow::Result<()> {
        let Some(user) = self.prompt("User: ")? else {
            return Ok(());
        };
        let user = user.trim();
        if self.chain.ledger().contains(user) {
            writeln!(self.output, "{user}'s balance is {}", self.chain.balance(user))?;
        } else {
            writeln!(
                self.output,
                "{user} does not exist, try users to see valid users"
            )?;
        }
        Ok(())
    }

    /// Prompt for source, target, and a positive amount.
    fn prompt_transfer(&mut self) -> anyhow::Result<Option<Transfer>> {
        let Some(source) = self.prompt("Source (return for deposit): ")? else {
            return Ok(None);
        };
        let Some(target) = self.prompt("Target: ")? else {
            return Ok(None);
        };
        let Some(amount) = self.prompt("Amount: ")? else {
            return Ok(None);
        };

        let target = target.trim();
        if target.is_empty() {
            writeln!(self.output, "please make sure your target is not empty")?;
            return Ok(None);
        }
        match amount.trim().parse::<i32>() {
            Ok(amount) if amount > 0 => Ok(Some(Transfer::new(source.trim(), target, amount))),
            Ok(_) => {
                writeln!(self.output, "please make sure your amount is a positive nonzero value")?;
                Ok(None)
            }
            Err(_) => {
                writeln!(self.output, "please make sure your amount is a number")?;
                Ok(None)
            }
        }
    }

    /// Write `label` and read one line. `None` at end of input.
    fn prompt(&mut self, label: &str) -> anyhow::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tally_chain::{Difficulty, HashValidator};

    use super::*;

    fn session(script: &str) -> Session<Cursor<Vec<u8>>, Vec<u8>> {
        colored::control::set_override(false);
        let chain = Chain::new(Difficulty::LeadingZeroBytes(1)).unwrap();
        Session::new(chain, Cursor::new(script.as_bytes().to_vec()), Vec::new(), OutputFormat::Text)
    }

    fn run(script: &str) -> (Chain, String) {
        let mut s = session(script);
        s.run().unwrap();
        let Session { chain, output, .. } = s;
        (chain, String::from_utf8(output).unwrap())
    }

    /// Mine a block for `transfer` on a copy of the chain state and return its nonce.
    fn nonce_for(chain: &Chain, transfer: Transfer) -> u64 {
        chain.mine(transfer).unwrap().nonce()
    }

    #[test]
    fn parse_commands() {
        assert_eq!(Command::parse("mine"), Some(Command::Mine));
        assert_eq!(Command::parse("  quit \n"), Some(Command::Quit));
        assert_eq!(Command::parse("dance"), None);
    }

    #[test]
    fn quit_ends_session() {
        let (chain, out) = run("quit\nmine\n");
        assert_eq!(chain.size(), 1);
        assert!(out.contains("Valid commands:"));
    }

    #[test]
    fn end_of_input_ends_session() {
        let (_, out) = run("");
        assert!(out.contains("Command: "));
    }

    #[test]
    fn invalid_command_reported() {
        let (_, out) = run("dance\nquit\n");
        assert!(out.contains("invalid command,"));
    }

    #[test]
    fn mine_prints_nonce() {
        let (chain, out) = run("mine\n\nA\n100\nquit\n");
        assert!(out.contains("Use nonce: "));
        assert_eq!(chain.size(), 1);
    }

    #[test]
    fn mine_rejects_bad_amounts() {
        let (_, out) = run("mine\n\nA\nlots\nmine\n\nA\n-5\nquit\n");
        assert!(out.contains("please make sure your amount is a number"));
        assert!(out.contains("please make sure your amount is a positive nonzero value"));
    }

    #[test]
    fn append_with_mined_nonce() {
        let mut s = session("");
        let nonce = nonce_for(s.chain(), Transfer::deposit("A", 100));
        s.input = Cursor::new(format!("append\n\nA\n100\n{nonce}\nbalance\nA\nusers\nquit\n").into_bytes());
        s.run().unwrap();

        assert_eq!(s.chain().size(), 2);
        assert_eq!(s.chain().balance("A"), 100);
        let out = String::from_utf8(s.into_output()).unwrap();
        assert!(out.contains("Appended:"));
        assert!(out.contains("A's balance is 100"));
    }

    #[test]
    fn append_with_wrong_nonce_fails() {
        let mut s = session("");
        let tip = s.chain().tip_digest().clone();
        // A nonce that fails the predicate for the typed transfer.
        let nonce = (0u64..)
            .find(|n| {
                let block = Block::with_nonce(1, Transfer::deposit("A", 101), tip.clone(), *n);
                !s.chain().validator().is_valid(block.digest())
            })
            .unwrap();
        s.input = Cursor::new(format!("append\n\nA\n101\n{nonce}\nquit\n").into_bytes());
        s.run().unwrap();

        assert_eq!(s.chain().size(), 1);
        assert_eq!(s.chain().balance("A"), 0);
        let out = String::from_utf8(s.into_output()).unwrap();
        assert!(out.contains("failed to add block because insufficient proof of work at block 1"));
    }

    #[test]
    fn append_rejects_non_numeric_nonce() {
        let (chain, out) = run("append\n\nA\n100\nabc\nquit\n");
        assert_eq!(chain.size(), 1);
        assert!(out.contains("please make sure your nonce is a number"));
    }

    #[test]
    fn remove_on_genesis_only() {
        let (chain, out) = run("remove\nquit\n");
        assert_eq!(chain.size(), 1);
        assert!(out.contains("nothing removed"));
    }

    #[test]
    fn remove_and_check() {
        let mut s = session("");
        let block = s.chain.mine(Transfer::deposit("X", 5)).unwrap();
        s.chain.append(block).unwrap();
        s.input = Cursor::new(b"check\nremove\nusers\nquit\n".to_vec());
        s.run().unwrap();

        assert_eq!(s.chain().size(), 1);
        let out = String::from_utf8(s.into_output()).unwrap();
        assert!(out.contains("the block chain is valid"));
        assert!(out.contains("last block removed"));
        assert!(out.contains("no users yet"));
    }

    #[test]
    fn check_and_audit_report_tampering() {
        let mut s = session("");
        let block = s.chain.mine(Transfer::deposit("X", 5)).unwrap();
        s.chain.append(block).unwrap();
        s.chain
            .block_mut(1)
            .unwrap()
            .tamper_transfer(Transfer::deposit("X", 500));
        s.input = Cursor::new(b"check\naudit\nquit\n".to_vec());
        s.run().unwrap();

        let out = String::from_utf8(s.into_output()).unwrap();
        assert!(out.contains("the block chain is invalid:"));
        assert!(out.contains("forged block 1"));
        assert!(out.contains("problem(s) in 2 block(s):"));
    }

    #[test]
    fn unknown_user_balance() {
        let (_, out) = run("balance\nNobody\nquit\n");
        assert!(out.contains("Nobody does not exist"));
    }

    #[test]
    fn blocks_as_json() {
        colored::control::set_override(false);
        let chain = Chain::new(Difficulty::LeadingZeroBytes(1)).unwrap();
        let genesis = chain.tip_digest().to_hex();
        let mut s = Session::new(
            chain,
            Cursor::new(b"blocks\nquit\n".to_vec()),
            Vec::new(),
            OutputFormat::Json,
        );
        s.run().unwrap();

        let out = String::from_utf8(s.into_output()).unwrap();
        let start = out.find('[').unwrap();
        let end = out.rfind(']').unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out[start..=end]).unwrap();
        assert_eq!(parsed[0]["index"], 0);
        assert_eq!(parsed[0]["previous"], "");
        assert_eq!(parsed[0]["digest"], genesis.as_str());
    }

    #[test]
    fn blocks_as_text() {
        let (chain, out) = run("blocks\nquit\n");
        assert!(out.contains("#0 [Deposit, Target: , Amount: 0]"));
        assert!(out.contains(&chain.tip_digest().short_hex()));
    }
}
