use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ledger-commit")]
pub struct Opt {
    #[arg(long = "config", global = true, help = "TOML configuration file")]
    pub config: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "genesis", about = "Print the genesis block and its commitments")]
    Genesis,
    #[command(name = "init", about = "Create a chain database holding the genesis block")]
    Init {
        #[arg(long = "db", help = "Database directory (defaults to the configured path)")]
        db: Option<String>,
    },
    #[command(name = "tip", about = "Print the current chain tip")]
    Tip {
        #[arg(long = "db", help = "Database directory (defaults to the configured path)")]
        db: Option<String>,
    },
    #[command(name = "printchain", about = "Print all connected blocks, newest first")]
    Printchain {
        #[arg(long = "db", help = "Database directory (defaults to the configured path)")]
        db: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_init_with_db() {
        let opt = Opt::parse_from(["ledger-commit", "init", "--db", "/tmp/chain"]);
        assert!(matches!(opt.command, Command::Init { db: Some(ref p) } if p == "/tmp/chain"));
        assert!(opt.config.is_none());
    }

    #[test]
    fn test_parse_global_config() {
        let opt = Opt::parse_from(["ledger-commit", "tip", "--config", "chain.toml"]);
        assert_eq!(opt.config.as_deref(), Some("chain.toml"));
        assert!(matches!(opt.command, Command::Tip { db: None }));
    }
}
