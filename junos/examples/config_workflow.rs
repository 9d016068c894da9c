//! Configuration workflow
//!
//! Lock, load, check, commit confirmed, confirm, unlock. Also shows the
//! commit history and the diff against the previous configuration.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example config_workflow -- <host> <user> <password> [set-file | url]
//! ```
//!
//! Without a file, a single `set system name-server` line is loaded.

use std::env;

use junos::{ConfigFormat, ConfigSource, RescueAction, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        eprintln!("usage: config_workflow <host> <user> <password> [set-file | url]");
        std::process::exit(1);
    }

    let mut session = Session::open(&args[0], &args[1], args[2].as_str()).await?;
    println!("Connected to {}", session.hostname());

    let source = match args.get(3) {
        Some(location) => ConfigSource::from(location.as_str()),
        None => ConfigSource::inline("set system name-server 1.1.1.1"),
    };

    session.rescue(RescueAction::Save).await?;
    session.lock().await?;
    println!("state: {}", session.tx_state());

    if let Err(e) = session.load_config(source, ConfigFormat::Set, false).await {
        eprintln!("load failed: {e}");
        session.close().await?;
        return Ok(());
    }

    let check = session.commit_check().await?;
    if !check.valid {
        eprintln!("commit check failed:");
        for error in &check.errors {
            eprintln!("  {error}");
        }
        // close() discards the candidate and releases the lock
        session.close().await?;
        return Ok(());
    }
    for warning in &check.warnings {
        println!("warning: {warning}");
    }

    session.commit_confirm(5).await?;
    println!("state: {}", session.tx_state());

    // Still reachable, so keep the change
    session.commit().await?;
    session.unlock().await?;

    let diff = session.config_diff(1).await?;
    if diff.is_empty() {
        println!("No changes.");
    } else {
        println!("{diff}");
    }

    println!("\nRecent commits:");
    for entry in session.commit_history().await?.iter().take(5) {
        println!(
            "{:>3}  {}  {} via {}  {}",
            entry.index,
            entry.timestamp,
            entry.user,
            entry.client,
            entry.comment.as_deref().unwrap_or("")
        );
    }

    session.close().await?;
    Ok(())
}
