use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod long_poll;
mod output;
mod sse_client;

use long_poll::LongPollClient;
use output::{print_test_summary, TestResult};
use sse_client::Connection;

#[derive(Parser)]
#[command(name = "remote-view-client")]
#[command(about = "Follows an export of a remote view server through SSE pings and long polls")]
struct Cli {
    /// Base URL of the server (e.g., http://localhost:8080)
    #[arg(long, default_value = "http://localhost:8080")]
    base_url: String,

    /// Export to follow
    #[arg(long, default_value = "status")]
    export: String,

    /// Number of published snapshots to follow before stopping
    #[arg(long, default_value_t = 3)]
    snapshots: u32,

    /// Seconds to wait for each notification
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Write the last fetched snapshot to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    let timeout = Duration::from_secs(cli.timeout_secs);
    let mut results = Vec::new();

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());
    println!("{} Subscribing to {}.png...", "→".blue(), cli.export);
    let mut sse = Connection::establish(&cli.base_url, &cli.export, cli.export.clone()).await?;

    let started = Instant::now();
    match sse.wait_for_event("connected", timeout).await {
        Ok(_) => {
            println!("{} {} stream connected", "✓".green(), sse.label);
            results.push(TestResult::passed("connected event", started.elapsed()));
        }
        Err(e) => {
            results.push(TestResult::failed("connected event", e.to_string(), started.elapsed()));
            print_test_summary(&results);
            std::process::exit(1);
        }
    }

    let poller = LongPollClient::new(&cli.base_url, &cli.export)?;
    let mut last = poller.next_snapshot().await?;
    println!(
        "{} Current snapshot: version {} ({} bytes)",
        "✓".green(),
        last.version,
        last.bytes.len()
    );

    println!("\n{}", "=== FOLLOW PHASE ===".bright_white().bold());
    for n in 1..=cli.snapshots {
        let name = format!("snapshot {n}");
        let started = Instant::now();

        let announced = match sse.wait_for_event("message", timeout).await {
            Ok(event) => event.ping_version(),
            Err(e) => {
                results.push(TestResult::failed(name, e.to_string(), started.elapsed()));
                break;
            }
        };

        let snapshot = poller.next_snapshot().await?;
        let result = match announced {
            Some(version) if snapshot.version >= version && snapshot.version > last.version => {
                println!(
                    "{} PING {} -> fetched version {} ({} bytes)",
                    "✓".green(),
                    version,
                    snapshot.version,
                    snapshot.bytes.len()
                );
                TestResult::passed(name, started.elapsed())
            }
            Some(version) => TestResult::failed(
                name,
                format!(
                    "PING {} but fetched version {} after {}",
                    version, snapshot.version, last.version
                ),
                started.elapsed(),
            ),
            None => TestResult::failed(name, "PING without a version", started.elapsed()),
        };
        results.push(result);
        last = snapshot;
    }

    if let Some(path) = &cli.output {
        tokio::fs::write(path, &last.bytes).await?;
        println!("{} Wrote version {} to {}", "✓".green(), last.version, path.display());
    }

    println!("\n{}", "=== RESULTS ===".bright_white().bold());
    print_test_summary(&results);

    let all_passed = results.iter().all(|r| r.passed);

    if all_passed {
        println!("\n{}", "All checks passed! ✓".bright_green().bold());
    } else {
        println!("\n{}", "Some checks failed! ✗".bright_red().bold());
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}
