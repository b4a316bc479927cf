//! Registry, address and benchmark commands.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use qwallet_bench::BenchmarkResults;
use qwallet_crypto::registry;

use super::{print_json, print_success, App};

/// Times keygen, sign and verify for one or every scheme.
pub fn run(
    app: &App,
    scheme: Option<&str>,
    level: Option<u8>,
    iterations: usize,
    output: Option<&Path>,
) -> Result<()> {
    let targets = match scheme {
        Some(name) => {
            let info = registry::describe_name(name)?;
            vec![(info.scheme, level.unwrap_or(info.default_level))]
        }
        None => registry::list_schemes()
            .into_iter()
            .map(|s| (s, registry::describe(s).default_level))
            .collect(),
    };
    for (scheme, level) in &targets {
        registry::validate(*scheme, *level)?;
    }

    let pb = ProgressBar::new(targets.len() as u64 + u64::from(scheme.is_none()));
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut reports = Vec::with_capacity(targets.len());
    for (scheme, level) in targets {
        pb.set_message(format!("{scheme} level {level}"));
        reports.push(qwallet_bench::run(scheme, level, iterations)?);
        pb.inc(1);
    }
    let hashing = if scheme.is_none() {
        pb.set_message("hash variants");
        let hashing = qwallet_bench::run_hashing(iterations)?;
        pb.inc(1);
        hashing
    } else {
        BTreeMap::new()
    };
    pb.finish_and_clear();

    let results = BenchmarkResults::new(iterations, reports, hashing);
    if let Some(path) = output {
        qwallet_bench::save(&results, path)?;
    }

    if app.json {
        return print_json(&results);
    }
    print!("{}", qwallet_bench::render(&results));
    if let Some(path) = output {
        println!();
        print_success(&format!("Results saved to {}", path.display()));
    }
    Ok(())
}

/// Prints a saved result set.
pub fn summarize(path: &Path) -> Result<()> {
    print!("{}", qwallet_bench::summarize(path)?);
    Ok(())
}

/// Lists every scheme with its per-level sizes.
pub fn schemes(app: &App) -> Result<()> {
    let infos: Vec<_> = registry::list_schemes()
        .into_iter()
        .map(registry::describe)
        .collect();
    if app.json {
        return print_json(&infos);
    }

    for info in infos {
        println!(
            "{} {} (default level {}{})",
            info.scheme.to_string().bold().cyan(),
            info.family.dimmed(),
            info.default_level,
            if info.one_time { ", one-time" } else { "" }
        );
        println!(
            "   {:<6} {:<28} {:>10} {:>10} {:>10}",
            "Level", "Parameter set", "pk bytes", "sk bytes", "sig bytes"
        );
        for p in &info.levels {
            println!(
                "   {:<6} {:<28} {:>10} {:>10} {:>10}",
                p.level, p.parameter_set, p.public_key_size, p.secret_key_size, p.signature_size
            );
        }
        println!();
    }
    let hashes: Vec<String> = registry::list_hash_variants()
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("{} {}", "Hash variants:".bold(), hashes.join(", "));
    Ok(())
}

/// Classifies an address string.
pub fn validate(app: &App, address: &str) -> Result<()> {
    let result = qwallet_crypto::address::validate(address);
    if app.json {
        return print_json(&result);
    }
    if result.valid {
        print_success(&format!("valid {} address", result.form));
    } else {
        println!("{} not a valid address", "✗".red().bold());
    }
    Ok(())
}
