//! Local wallet commands: no network access.

use std::path::Path;

use anyhow::{Context, Result};
use colored::*;
use serde_json::json;

use qwallet_core::error::WalletError;
use qwallet_core::types::{AdapterPolicy, HashVariant, Scheme, WalletRecord};
use qwallet_crypto::registry;
use qwallet_store::{BackupInfo, NewWallet};

use super::{
    confirm, field, new_password, password, print_info, print_json, print_success, print_warning,
    spinner, App,
};

/// Options for `create`.
pub struct CreateArgs {
    pub name: String,
    pub scheme: Option<String>,
    pub level: Option<u8>,
    pub hash: Option<String>,
    pub policy: String,
    pub no_backup: bool,
    pub overwrite: bool,
}

/// Generates keys and saves a new encrypted wallet.
pub fn create(app: &App, args: CreateArgs) -> Result<()> {
    let scheme: Scheme = match &args.scheme {
        Some(s) => registry::describe_name(s)?.scheme,
        None => app.settings.default_scheme,
    };
    let level = match args.level {
        Some(level) => level,
        None if scheme == app.settings.default_scheme => app.settings.default_security_level,
        None => registry::describe(scheme).default_level,
    };
    let hash: HashVariant = match &args.hash {
        Some(h) => h.parse()?,
        None => app.settings.default_hash_variant,
    };
    let policy: AdapterPolicy = args.policy.parse()?;
    registry::validate(scheme, level)?;

    let store = app.store()?;
    if store.exists(&args.name) && !args.overwrite {
        return Err(WalletError::AlreadyExists(format!(
            "wallet '{}' (use --overwrite to replace it)",
            args.name
        ))
        .into());
    }

    let pw = new_password(&args.name)?;

    let pb = spinner(format!("Generating {scheme} level {level} keys..."));
    let keys = (|| -> qwallet_core::error::Result<_> {
        let primary = qwallet_crypto::generate(scheme, level, hash)?;
        let backup = if args.no_backup {
            None
        } else {
            Some(qwallet_crypto::generate_backup(scheme)?)
        };
        Ok((primary, backup))
    })();
    pb.finish_and_clear();
    let (primary, backup) = keys.context("key generation failed")?;

    let record = store.create(
        NewWallet {
            name: args.name.clone(),
            network: app.ctx.network,
            primary,
            backup,
            policy,
        },
        &pw,
        args.overwrite,
    )?;

    if app.json {
        return print_json(&record.public_profile());
    }
    print_success(&format!("Created wallet '{}'", record.name));
    print_addresses(&record);
    if scheme == Scheme::Lamport {
        print_warning("Lamport keys are one-time: sign at most one transaction with this wallet.");
    }
    if policy == AdapterPolicy::Truncating {
        print_warning("Truncating policy: on-chain signatures carry no post-quantum security.");
    }
    Ok(())
}

/// Lists wallet names.
pub fn list(app: &App) -> Result<()> {
    let names = app.store()?.list()?;
    if app.json {
        return print_json(&names);
    }
    if names.is_empty() {
        print_info("No wallets found. Create one with 'qwallet create <name>'");
        return Ok(());
    }
    println!("{}", "Wallets".bold().green());
    for name in names {
        println!("  • {}", name.cyan());
    }
    Ok(())
}

/// Shows the public profile.
pub fn info(app: &App, name: &str) -> Result<()> {
    let record = app.store()?.load(name, &password(name)?)?;
    let profile = record.public_profile();
    if app.json {
        return print_json(&profile);
    }

    println!("{} {}", "Wallet".bold().green(), profile.name.cyan());
    field("Network", profile.network);
    field(
        "Scheme",
        format!("{} level {} ({})", profile.scheme, profile.security_level, profile.hash_variant),
    );
    if let Some(backup) = profile.backup_scheme {
        field("Backup scheme", backup);
    }
    field("Signature policy", profile.signature_policy);
    field("Public key", format!("{} bytes", profile.public_key.len()));
    field("Created", profile.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    field("Transactions", profile.history.len());
    print_addresses(&record);
    Ok(())
}

/// Creates a snapshot, or only lists them.
pub fn backup(app: &App, name: &str, list_only: bool) -> Result<()> {
    let store = app.store()?;
    let backups = if list_only {
        store.backups(name)?
    } else {
        store.backup(name)?
    };

    if app.json {
        return print_json(&backups);
    }
    if !list_only {
        print_success(&format!("Backed up '{name}'"));
    }
    print_backups(&backups);
    Ok(())
}

/// Restores a snapshot over the live wallet.
pub fn restore(app: &App, name: &str, index: usize, yes: bool) -> Result<()> {
    let store = app.store()?;
    let backups = store.backups(name)?;
    if let Some(target) = backups.get(index) {
        let prompt = format!(
            "Replace '{name}' with the backup from {}?",
            target.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if !confirm(&prompt, yes)? {
            print_info("Restore cancelled.");
            return Ok(());
        }
    }

    let restored = store.restore(name, index)?;
    if app.json {
        return print_json(&restored);
    }
    print_success(&format!(
        "Restored '{name}' from {}",
        restored.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    print_info("The previous state was kept as a new backup.");
    Ok(())
}

/// Writes a public profile or the encrypted file.
pub fn export(app: &App, name: &str, dest: &Path, include_secrets: bool) -> Result<()> {
    let written = app
        .store()?
        .export(name, &password(name)?, dest, include_secrets)?;
    if app.json {
        return print_json(&json!({ "path": written, "include_secrets": include_secrets }));
    }
    print_success(&format!("Exported '{name}' to {}", written.display()));
    if include_secrets {
        print_warning("The export contains encrypted secret keys. Protect it like the wallet itself.");
    }
    Ok(())
}

/// Imports an encrypted wallet file.
pub fn import(app: &App, source: &Path, rename: Option<&str>, overwrite: bool) -> Result<()> {
    let label = rename.map(str::to_string).unwrap_or_else(|| source.display().to_string());
    let record = app
        .store()?
        .import(source, &password(&label)?, rename, overwrite)?;
    if app.json {
        return print_json(&record.public_profile());
    }
    print_success(&format!("Imported wallet '{}'", record.name));
    print_addresses(&record);
    Ok(())
}

fn print_addresses(record: &WalletRecord) {
    field("Quantum address", record.quantum_address.to_string().yellow());
    field("Ledger address", record.ledger_address.to_string().yellow());
}

fn print_backups(backups: &[BackupInfo]) {
    if backups.is_empty() {
        print_info("No backups.");
        return;
    }
    println!("{}", "Backups (newest first)".bold());
    for (i, b) in backups.iter().enumerate() {
        println!(
            "  [{}] {}  {} bytes",
            i.to_string().cyan(),
            b.timestamp.format("%Y-%m-%d %H:%M:%S%.3f UTC"),
            b.size
        );
    }
}
