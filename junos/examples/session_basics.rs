//! Session basics
//!
//! Connects to a Junos device over NETCONF, prints its facts, runs a few
//! operational commands and reads part of the configuration.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example session_basics -- --host srx1 --user admin --password secret
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use junos::{HostKeyVerification, OutputFormat, SessionBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== junos session basics ===\n");
    println!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout));

    if args.insecure {
        builder = builder.host_key_verification(HostKeyVerification::Disabled);
    }
    if let Some(password) = &args.password {
        builder = builder.password(password.as_str());
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }

    let mut session = builder.open().await?;
    println!("Connected!\n");
    print!("{}", session.facts());
    println!();

    for command in ["show version", "show chassis hardware", "show interfaces terse"] {
        println!("> {command}");
        match session.command(command, OutputFormat::Text).await {
            Ok(response) => {
                let lines: Vec<&str> = response.lines().take(15).collect();
                println!("{}", lines.join("\n"));
                if response.lines().count() > 15 {
                    println!("... (truncated)");
                }
            }
            Err(e) => eprintln!("Command failed: {e}"),
        }
        println!();
    }

    // XML output for programmatic use
    let route = session
        .command("show route summary", OutputFormat::Xml)
        .await?;
    println!("show route summary (xml): {} bytes in {:?}\n", route.result.len(), route.elapsed);

    println!("--- system stanza ---");
    println!("{}", session.get_config("system", OutputFormat::Text).await?);

    session.close().await?;
    println!("Done!");
    Ok(())
}

/// Simple argument parser
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    timeout: u64,
    insecure: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: 830,
            user: env::var("USER").unwrap_or_else(|_| "admin".to_string()),
            password: None,
            key: None,
            timeout: 30,
            insecure: false,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value.unwrap_or(parsed.host),
                "--port" | "-p" => {
                    parsed.port = value.and_then(|v| v.parse().ok()).unwrap_or(830)
                }
                "--user" | "-u" => parsed.user = value.unwrap_or(parsed.user),
                "--password" | "-P" => parsed.password = value,
                "--key" | "-k" => parsed.key = value.map(PathBuf::from),
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(30)
                }
                "--insecure" => {
                    parsed.insecure = true;
                    i += 1;
                    continue;
                }
                "--help" => {
                    println!(
                        "USAGE:\n    cargo run --example session_basics -- --host <HOST> --user <USER> \
                         (--password <PASS> | --key <PATH>) [--port 830] [--timeout 30] [--insecure]"
                    );
                    std::process::exit(0);
                }
                _ => {
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }
        parsed
    }
}
