//! Command-line interface for the exporter.
//!
//! This binary provides a CLI for checking the exporter daemon via its
//! HTTP API.

use std::env;

use anyhow::Result;

use avalon_exporter::api_client;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: avalon-cli <command>");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  status    Show exporter and miner status");
        eprintln!("  version   Show exporter version");
        eprintln!();
        eprintln!("Environment:");
        eprintln!("  AVALON_API_URL    API base URL (default: http://127.0.0.1:9100)");
        std::process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "status" => cmd_status().await?,
        "version" => cmd_version().await?,
        _ => {
            eprintln!("Unknown command: {}", command);
            eprintln!("Run without arguments to see usage.");
            std::process::exit(1);
        }
    }

    Ok(())
}

/// Build an API client, honoring AVALON_API_URL if set.
fn make_client() -> api_client::Client {
    match env::var("AVALON_API_URL") {
        Ok(url) => api_client::Client::with_base_url(url),
        Err(_) => api_client::Client::new(),
    }
}

/// Print a summary of the exporter and every configured miner.
async fn cmd_status() -> Result<()> {
    let client = make_client();
    let debug = client.get_debug().await?;

    println!("Exporter: v{}", debug.version);
    match debug.poller.heartbeat_age_seconds {
        Some(age) => println!("Poller:   last heartbeat {age:.1}s ago"),
        None => println!("Poller:   no heartbeat yet"),
    }

    if debug.miners.is_empty() {
        println!("Miners:   (none)");
        return Ok(());
    }

    println!("Miners:");
    for (ip, miner) in &debug.miners {
        let state = if miner.up { "up" } else { "DOWN" };
        match &miner.last_error {
            Some(err) => println!("  - {ip}: {state} ({err})"),
            None => println!("  - {ip}: {state}"),
        }
    }

    Ok(())
}

/// Print the daemon's version.
async fn cmd_version() -> Result<()> {
    let client = make_client();
    let version = client.get_version().await?;
    println!("{} v{}", version.exporter, version.version);
    Ok(())
}
