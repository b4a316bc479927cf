//! qwallet CLI
//!
//! Command-line interface for the quantum-resistant keyring and wallet.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qwallet_core::error::{ErrorKind, WalletError};

mod commands;

use commands::{bench, config, ledger, wallet, App, GlobalArgs};

const LOG_CRATES: [&str; 6] = [
    "qwallet_cli",
    "qwallet_core",
    "qwallet_crypto",
    "qwallet_store",
    "qwallet_ledger",
    "qwallet_bench",
];

/// qwallet - quantum-resistant keyring and wallet
#[derive(Parser)]
#[command(name = "qwallet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new wallet
    Create {
        /// Wallet name
        name: String,
        /// Signature scheme (sphincs, dilithium, lamport)
        #[arg(short, long)]
        scheme: Option<String>,
        /// Security level
        #[arg(short, long)]
        level: Option<u8>,
        /// Transaction pre-hash (sha256, sha3-256, shake256, blake2b-256)
        #[arg(long)]
        hash: Option<String>,
        /// How signatures fit the ledger slot (out-of-band, truncating)
        #[arg(long, default_value = "out-of-band")]
        policy: String,
        /// Skip the recovery keypair
        #[arg(long)]
        no_backup: bool,
        /// Replace an existing wallet of the same name
        #[arg(long)]
        overwrite: bool,
    },

    /// Show a wallet's balance
    Balance {
        /// Wallet name
        name: String,
    },

    /// Send funds
    Send {
        /// Wallet name
        name: String,
        /// Recipient address (quantum-native or ledger-native)
        recipient: String,
        /// Amount in SOL
        amount: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Request test funds (not available on mainnet)
    Airdrop {
        /// Wallet name
        name: String,
        /// Amount in SOL
        #[arg(default_value = "1")]
        amount: String,
    },

    /// Show transaction history
    History {
        /// Wallet name
        name: String,
    },

    /// Re-check pending transactions
    Reconcile {
        /// Wallet name
        name: String,
    },

    /// List wallets
    List,

    /// Show a wallet's public profile
    Info {
        /// Wallet name
        name: String,
    },

    /// Snapshot a wallet and list its backups
    Backup {
        /// Wallet name
        name: String,
        /// List backups without creating one
        #[arg(long)]
        list: bool,
    },

    /// Restore a wallet from a backup (0 = most recent)
    Restore {
        /// Wallet name
        name: String,
        /// Backup index from `backup --list`
        #[arg(short, long, default_value = "0")]
        index: usize,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Export a wallet's public profile, or its encrypted file
    Export {
        /// Wallet name
        name: String,
        /// Destination file
        output: PathBuf,
        /// Export the encrypted file including secret keys
        #[arg(long)]
        include_secrets: bool,
    },

    /// Import an encrypted wallet file
    Import {
        /// Encrypted wallet file
        source: PathBuf,
        /// Store under a different name
        #[arg(long = "as")]
        rename: Option<String>,
        /// Replace an existing wallet of the same name
        #[arg(long)]
        overwrite: bool,
    },

    /// Run or summarise benchmarks
    Benchmark {
        #[command(subcommand)]
        command: BenchCommands,
    },

    /// List supported schemes and parameters
    Schemes,

    /// Check an address string
    Validate {
        /// Address to check
        address: String,
    },

    /// Show or change persisted defaults
    Config(config::ConfigArgs),
}

#[derive(Subcommand)]
enum BenchCommands {
    /// Time keygen, sign and verify
    Run {
        /// Only this scheme (default: every scheme)
        #[arg(short, long)]
        scheme: Option<String>,
        /// Security level (default: the scheme's default)
        #[arg(short, long)]
        level: Option<u8>,
        /// Iterations per operation
        #[arg(short, long, default_value = "20")]
        iterations: usize,
        /// Save results to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a saved result set
    Summarize {
        /// Result file written by `benchmark run --output`
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn init_logging(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let default_filter = std::iter::once(if verbose { "info" } else { "warn" }.to_string())
        .chain(LOG_CRATES.iter().map(|c| format!("{c}={level}")))
        .collect::<Vec<_>>()
        .join(",");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::new(&cli.global)?;

    match cli.command {
        Commands::Create {
            name,
            scheme,
            level,
            hash,
            policy,
            no_backup,
            overwrite,
        } => wallet::create(
            &app,
            wallet::CreateArgs {
                name,
                scheme,
                level,
                hash,
                policy,
                no_backup,
                overwrite,
            },
        ),
        Commands::Balance { name } => ledger::balance(&app, &name).await,
        Commands::Send {
            name,
            recipient,
            amount,
            yes,
        } => ledger::send(&app, &name, &recipient, &amount, yes).await,
        Commands::Airdrop { name, amount } => ledger::airdrop(&app, &name, &amount).await,
        Commands::History { name } => ledger::history(&app, &name).await,
        Commands::Reconcile { name } => ledger::reconcile(&app, &name).await,
        Commands::List => wallet::list(&app),
        Commands::Info { name } => wallet::info(&app, &name),
        Commands::Backup { name, list } => wallet::backup(&app, &name, list),
        Commands::Restore { name, index, yes } => wallet::restore(&app, &name, index, yes),
        Commands::Export {
            name,
            output,
            include_secrets,
        } => wallet::export(&app, &name, &output, include_secrets),
        Commands::Import {
            source,
            rename,
            overwrite,
        } => wallet::import(&app, &source, rename.as_deref(), overwrite),
        Commands::Benchmark { command } => match command {
            BenchCommands::Run {
                scheme,
                level,
                iterations,
                output,
            } => bench::run(&app, scheme.as_deref(), level, iterations, output.as_deref()),
            BenchCommands::Summarize { path } => bench::summarize(&path),
        },
        Commands::Schemes => bench::schemes(&app),
        Commands::Validate { address } => bench::validate(&app, &address),
        Commands::Config(args) => config::run(&app, args),
    }
}

/// Prints `error[<kind>]: <cause>` and picks the kind's exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    match error_kind(err) {
        Some(kind) => eprintln!("{} {err:#}", format!("error[{kind}]:").red().bold()),
        None => eprintln!("{} {err:#}", "error:".red().bold()),
    }
    ExitCode::from(exit_code(err))
}

fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<WalletError>())
        .map(WalletError::kind)
}

fn exit_code(err: &anyhow::Error) -> u8 {
    error_kind(err)
        .and_then(|kind| u8::try_from(kind.exit_code()).ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from(["qwallet", "send", "alice", "qw1abc", "0.5", "--yes"]).unwrap();
        match cli.command {
            Commands::Send { name, amount, yes, .. } => {
                assert_eq!(name, "alice");
                assert_eq!(amount, "0.5");
                assert!(yes);
            }
            _ => panic!("expected send"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["qwallet", "list", "--network", "devnet", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.global.network.as_deref(), Some("devnet"));
    }

    #[test]
    fn test_exit_code_follows_error_kind() {
        let err = anyhow::Error::new(WalletError::DecryptionFailed).context("loading alice");
        assert_eq!(error_kind(&err), Some(ErrorKind::DecryptionFailed));
        assert_eq!(exit_code(&err), 5);

        let err = Err::<(), _>(WalletError::Rejected("insufficient funds".into()))
            .context("sending")
            .unwrap_err();
        assert_eq!(exit_code(&err), 8);

        assert_eq!(exit_code(&anyhow::anyhow!("plain failure")), 1);
    }
}
