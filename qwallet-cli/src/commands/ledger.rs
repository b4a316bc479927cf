//! Commands that talk to the ledger.

use std::sync::Arc;

use anyhow::{Context, Result};
use colored::*;
use serde_json::json;

use qwallet_core::error::WalletError;
use qwallet_core::types::{Amount, ConfirmationStatus, Direction, TransactionEntry};
use qwallet_ledger::{JsonRpcClient, RpcConfig, SubmitPolicy, TransferOutcome, WalletService};

use super::{confirm, field, password, print_info, print_json, print_success, print_warning, spinner, App};

/// Service bound to the wallet's own network.
async fn service_for(app: &App, name: &str, pw: &str) -> Result<WalletService> {
    let store = app.store()?;
    let network = {
        let (store, name, pw) = (store.clone(), name.to_string(), pw.to_string());
        tokio::task::spawn_blocking(move || store.load(&name, &pw).map(|w| w.network)).await??
    };

    let rpc = JsonRpcClient::new(RpcConfig::for_network(&app.ctx, network))
        .context("failed to create RPC client")?;
    tracing::debug!(%network, url = rpc.url(), "Ledger client ready");
    Ok(WalletService::new(
        store,
        Arc::new(rpc),
        network,
        SubmitPolicy::from_context(&app.ctx),
    ))
}

/// Shows the balance of a wallet's ledger account.
pub async fn balance(app: &App, name: &str) -> Result<()> {
    let pw = password(name)?;
    let service = service_for(app, name, &pw).await?;

    let pb = spinner("Fetching balance...");
    let balance = service.balance(name, &pw).await;
    pb.finish_and_clear();
    let balance = balance?;

    if app.json {
        return print_json(&json!({
            "wallet": name,
            "network": service.network(),
            "lamports": balance.lamports(),
            "sol": balance.to_string(),
        }));
    }
    println!("{} {} SOL", "Balance:".bold(), balance.to_string().green().bold());
    field("Network", service.network());
    Ok(())
}

/// Requests faucet funds.
pub async fn airdrop(app: &App, name: &str, amount: &str) -> Result<()> {
    let amount = Amount::parse_sol(amount)?;
    let pw = password(name)?;
    let service = service_for(app, name, &pw).await?;

    let pb = spinner(format!("Requesting {amount} SOL airdrop..."));
    let outcome = service.airdrop(name, &pw, amount).await;
    pb.finish_and_clear();
    report_outcome(app, "Airdrop", amount, &outcome?)
}

/// Builds, signs, submits and confirms a transfer.
pub async fn send(app: &App, name: &str, recipient: &str, amount: &str, yes: bool) -> Result<()> {
    let amount = Amount::parse_sol(amount)?;
    let form = qwallet_crypto::address::validate(recipient);
    if !form.valid {
        return Err(WalletError::InvalidAddress(format!(
            "'{recipient}' is not a quantum-native or ledger-native address"
        ))
        .into());
    }

    if !app.json {
        println!("{}", "Transfer".bold());
        field("To", format!("{recipient} ({})", form.form));
        field("Amount", format!("{amount} SOL"));
    }
    if !confirm("Sign and submit?", yes)? {
        print_info("Transfer cancelled.");
        return Ok(());
    }

    let pw = password(name)?;
    let service = service_for(app, name, &pw).await?;

    let pb = spinner("Signing and submitting...");
    let outcome = service.send(name, &pw, recipient, amount).await;
    pb.finish_and_clear();
    report_outcome(app, "Transfer", amount, &outcome?)
}

/// Prints history in chronological order.
pub async fn history(app: &App, name: &str) -> Result<()> {
    let pw = password(name)?;
    let store = app.store()?;
    let wallet = {
        let (name, pw) = (name.to_string(), pw.clone());
        tokio::task::spawn_blocking(move || store.load(&name, &pw)).await??
    };
    let entries: Vec<TransactionEntry> = qwallet_ledger::history::list(&wallet)
        .into_iter()
        .cloned()
        .collect();

    if app.json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        print_info("No transactions yet.");
        return Ok(());
    }

    println!(
        "{:<20} {:<8} {:>16} {:<10} {:<44}",
        "Time", "Type", "Amount (SOL)", "Status", "Counterparty"
    );
    println!("{}", "-".repeat(100));
    for e in &entries {
        let direction = format!("{:<8}", e.direction.to_string());
        let direction = match e.direction {
            Direction::Send => direction.red(),
            Direction::Receive => direction.green(),
            Direction::Airdrop => direction.blue(),
        };
        println!(
            "{:<20} {} {:>16} {} {}",
            e.local_timestamp.format("%Y-%m-%d %H:%M:%S"),
            direction,
            e.amount.to_string(),
            status_label(e.status(), 10),
            e.counterparty
        );
    }
    Ok(())
}

/// Re-polls pending entries.
pub async fn reconcile(app: &App, name: &str) -> Result<()> {
    let pw = password(name)?;
    let service = service_for(app, name, &pw).await?;

    let pb = spinner("Checking pending transactions...");
    let report = service.reconcile(name, &pw).await;
    pb.finish_and_clear();
    let report = report?;

    if app.json {
        return print_json(&report);
    }
    if report.checked == 0 && report.unresolved == 0 {
        print_info("Nothing pending.");
        return Ok(());
    }
    print_success(&format!(
        "{} confirmed, {} failed, {} still pending",
        report.confirmed, report.failed, report.unresolved
    ));
    Ok(())
}

fn report_outcome(app: &App, what: &str, amount: Amount, outcome: &TransferOutcome) -> Result<()> {
    if app.json {
        return print_json(outcome);
    }
    match outcome.status {
        ConfirmationStatus::Confirmed => print_success(&format!("{what} of {amount} SOL confirmed")),
        ConfirmationStatus::Failed => print_warning(&format!("{what} of {amount} SOL failed on the ledger")),
        _ => print_warning(&format!(
            "{what} submitted but not yet confirmed. Run 'qwallet reconcile' later."
        )),
    }
    field("Signature", outcome.remote_signature.cyan());
    field("Status", status_label(outcome.status, 0));
    Ok(())
}

fn status_label(status: ConfirmationStatus, width: usize) -> ColoredString {
    let s = format!("{:<width$}", status.to_string());
    match status {
        ConfirmationStatus::Confirmed => s.green(),
        ConfirmationStatus::Failed => s.red(),
        ConfirmationStatus::Pending | ConfirmationStatus::Unknown => s.yellow(),
    }
}
