//! One-shot query and dissection tool for Avalon miner API responses.
//!
//! Connects to a single miner, sends an API command, and prints the reply
//! either raw, split into per-command sections, or fully decoded with the
//! same decoders the exporter daemon runs. Useful for capturing fixtures
//! from new firmware and for checking what a miner actually reports.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use avalon_exporter::config::COMBINED_CMD;
use avalon_exporter::decoder::{decode_chips, decode_device, decode_pools, decode_version};
use avalon_exporter::protocol::transport::query_miner;
use avalon_exporter::protocol::{device_segment, split_sections};

#[derive(Parser)]
#[command(name = "avalon-dump", version, about)]
struct Args {
    /// Miner hostname or IP address
    host: String,

    /// Miner API port
    #[arg(short, long, default_value_t = 4028)]
    port: u16,

    /// API command to send, e.g. "version" or "summary+stats"
    #[arg(short, long, default_value = COMBINED_CMD)]
    cmd: String,

    /// Timeout for the whole exchange, in seconds
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand)]
enum Mode {
    /// Print the reply exactly as received (default)
    Raw,
    /// Split the reply into per-command sections
    Sections,
    /// Run the reply through the exporter's decoders and print the result
    Decode,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args = Args::parse();

    let reply = query_miner(
        &args.host,
        args.port,
        &args.cmd,
        Duration::from_secs(args.timeout),
    )
    .await
    .with_context(|| format!("querying {}:{}", args.host, args.port))?;

    match args.mode.unwrap_or(Mode::Raw) {
        Mode::Raw => print!("{reply}"),
        Mode::Sections => print_sections(&reply),
        Mode::Decode => print_decoded(&reply),
    }

    Ok(())
}

fn print_sections(reply: &str) {
    let sections = split_sections(reply);
    if sections.is_empty() {
        eprintln!("no recognizable sections in reply ({} bytes)", reply.len());
        return;
    }
    for (cmd, body) in &sections {
        println!("=== {cmd} ({} bytes) ===", body.len());
        for segment in body.split('|').filter(|s| !s.trim().is_empty()) {
            println!("  {segment}");
        }
    }
}

fn print_decoded(reply: &str) {
    let sections = split_sections(reply);

    if let Some(version) = sections.get("version") {
        let info = decode_version(version);
        if !info.is_empty() {
            println!("--- version ---");
            for (name, value) in info.label_pairs() {
                if !value.is_empty() {
                    println!("  {name}: {value}");
                }
            }
        }
    }

    let stats = sections.get("stats").map(String::as_str).unwrap_or("");
    let summary = sections.get("summary").map(String::as_str).unwrap_or("");
    let stats0 = device_segment(stats).unwrap_or("");

    let metrics = decode_device(stats0, summary);
    if !metrics.is_empty() {
        println!("--- device ---");
        for (name, value) in &metrics {
            println!("  {name} {value}");
        }
    }

    let (chip_metrics, chips) = decode_chips(stats0, true);
    if !chip_metrics.is_empty() {
        println!("--- chips ---");
        for (name, value) in &chip_metrics {
            println!("  {name} {value}");
        }
        for record in &chips {
            println!("  chip[{}] {} {}", record.chip, record.name, record.value);
        }
    }

    let pools_section = sections.get("pools").map(String::as_str).unwrap_or("");
    let pools = decode_pools(pools_section, stats);
    if !pools.is_empty() {
        println!("--- pools ---");
        for pool in &pools {
            let labels: Vec<String> = pool
                .labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            println!("  [{}]", labels.join(" "));
            for (name, value) in &pool.metrics {
                println!("    {name} {value}");
            }
        }
    }
}
