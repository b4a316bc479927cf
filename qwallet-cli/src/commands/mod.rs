//! Command implementations and shared CLI plumbing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};

use qwallet_core::context::{Settings, WalletContext};
use qwallet_store::WalletStore;

pub mod bench;
pub mod config;
pub mod ledger;
pub mod wallet;

/// Environment variable read instead of prompting for a password.
pub const PASSWORD_ENV: &str = "QWALLET_PASSWORD";

/// Options shared by every command. Each overrides its environment variable.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Storage root (default ~/.qwallet)
    #[arg(long, global = true, env = "QWALLET_HOME")]
    pub home: Option<PathBuf>,

    /// Network (mainnet, testnet, devnet, local)
    #[arg(short, long, global = true)]
    pub network: Option<String>,

    /// RPC endpoint override
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

/// Resolved configuration for one invocation.
pub struct App {
    /// Layered context: defaults, settings file, environment, flags
    pub ctx: WalletContext,
    /// Persisted preferences
    pub settings: Settings,
    /// JSON output
    pub json: bool,
}

impl App {
    /// Builds the context, layering flags over the environment.
    pub fn new(global: &GlobalArgs) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let home = global.home.as_ref().map(|p| p.display().to_string());
        let ctx = WalletContext::from_lookup(|key| match key {
            "QWALLET_HOME" if home.is_some() => home.clone(),
            "QWALLET_NETWORK" if global.network.is_some() => global.network.clone(),
            "QWALLET_RPC_URL" if global.rpc_url.is_some() => global.rpc_url.clone(),
            _ => std::env::var(key).ok(),
        })
        .context("invalid configuration")?;

        let settings = Settings::load(&ctx.settings_path())?.unwrap_or_default();
        Ok(Self {
            ctx,
            settings,
            json: global.json,
        })
    }

    /// Store under the configured root.
    pub fn store(&self) -> Result<WalletStore> {
        Ok(WalletStore::from_context(&self.ctx)?)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROMPTS & OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Password for an existing wallet.
pub fn password(name: &str) -> Result<String> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(pw);
    }
    Ok(Password::new()
        .with_prompt(format!("Password for '{name}'"))
        .interact()?)
}

/// Password for a new wallet, entered twice.
pub fn new_password(name: &str) -> Result<String> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(pw);
    }
    Ok(Password::new()
        .with_prompt(format!("New password for '{name}'"))
        .with_confirmation("Repeat password", "Passwords do not match")
        .interact()?)
}

/// Asks for confirmation unless `yes` was given.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Ok(dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// Spinner on stderr.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prints a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), msg.yellow());
}

/// Prints a `label: value` line.
pub fn field(label: &str, value: impl std::fmt::Display) {
    println!("   {} {}", format!("{label}:").dimmed(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use qwallet_core::types::Network;
    use tempfile::TempDir;

    fn args(dir: &TempDir) -> GlobalArgs {
        GlobalArgs {
            home: Some(dir.path().to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_flags_layer_over_settings_file() {
        let dir = TempDir::new().unwrap();
        Settings {
            default_network: Network::Devnet,
            ..Default::default()
        }
        .save(&dir.path().join("settings.json"))
        .unwrap();

        let app = App::new(&args(&dir)).unwrap();
        assert_eq!(app.ctx.storage_root, dir.path());
        assert_eq!(app.settings.default_network, Network::Devnet);

        let app = App::new(&GlobalArgs {
            network: Some("local".into()),
            ..args(&dir)
        })
        .unwrap();
        assert_eq!(app.ctx.network, Network::Local);
    }

    #[test]
    fn test_bad_flag_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(App::new(&GlobalArgs {
            rpc_url: Some("not a url".into()),
            ..args(&dir)
        })
        .is_err());
        assert!(App::new(&GlobalArgs {
            network: Some("moonnet".into()),
            ..args(&dir)
        })
        .is_err());
    }
}
