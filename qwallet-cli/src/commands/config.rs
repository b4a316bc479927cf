//! Persisted defaults (`settings.json` under the storage root).

use anyhow::Result;
use clap::Args;
use colored::*;

use qwallet_core::types::{HashVariant, Network, Scheme};
use qwallet_crypto::registry;

use super::{field, print_json, print_success, App};

/// Options for `config`. With no options the current settings are shown.
#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Default network
    #[arg(long = "set-network")]
    pub network: Option<String>,
    /// Default scheme for new wallets
    #[arg(long = "set-scheme")]
    pub scheme: Option<String>,
    /// Default security level for new wallets
    #[arg(long = "set-level")]
    pub level: Option<u8>,
    /// Default hash variant for new wallets
    #[arg(long = "set-hash")]
    pub hash: Option<String>,
    /// PBKDF2 rounds for new saves
    #[arg(long = "set-kdf-rounds")]
    pub kdf_rounds: Option<u32>,
    /// Persisted RPC endpoint
    #[arg(long = "set-rpc-url")]
    pub rpc_url: Option<String>,
}

impl ConfigArgs {
    fn is_empty(&self) -> bool {
        self.network.is_none()
            && self.scheme.is_none()
            && self.level.is_none()
            && self.hash.is_none()
            && self.kdf_rounds.is_none()
            && self.rpc_url.is_none()
    }
}

/// Shows or updates the settings file.
pub fn run(app: &App, args: ConfigArgs) -> Result<()> {
    let path = app.ctx.settings_path();
    if args.is_empty() {
        if app.json {
            return print_json(&app.settings);
        }
        println!("{} {}", "Settings".bold().green(), path.display().to_string().dimmed());
        show(app);
        return Ok(());
    }

    let mut settings = app.settings.clone();
    if let Some(n) = &args.network {
        settings.default_network = n.parse::<Network>()?;
    }
    if let Some(s) = &args.scheme {
        settings.default_scheme = s.parse::<Scheme>()?;
        if args.level.is_none() {
            settings.default_security_level = registry::describe(settings.default_scheme).default_level;
        }
    }
    if let Some(level) = args.level {
        settings.default_security_level = level;
    }
    registry::validate(settings.default_scheme, settings.default_security_level)?;
    if let Some(h) = &args.hash {
        settings.default_hash_variant = h.parse::<HashVariant>()?;
    }
    if let Some(rounds) = args.kdf_rounds {
        settings.kdf_rounds = Some(rounds);
    }
    if let Some(url) = &args.rpc_url {
        settings.rpc_url = Some(url.clone());
    }

    // Validate the combined result before persisting it
    let mut ctx = app.ctx.clone();
    ctx.apply_settings(&settings);
    ctx.validate()?;

    settings.save(&path)?;
    if app.json {
        return print_json(&settings);
    }
    print_success(&format!("Settings saved to {}", path.display()));
    Ok(())
}

fn show(app: &App) {
    let s = &app.settings;
    field("Network", s.default_network);
    field("Scheme", format!("{} level {}", s.default_scheme, s.default_security_level));
    field("Hash", s.default_hash_variant);
    field(
        "KDF rounds",
        s.kdf_rounds.map_or_else(|| format!("{} (default)", app.ctx.kdf_rounds), |r| r.to_string()),
    );
    field("RPC URL", app.ctx.rpc_endpoint());
    field("Storage root", app.ctx.storage_root.display());
}
