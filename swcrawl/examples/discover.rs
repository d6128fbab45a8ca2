//! Discovery example: crawl CDP neighbors from one or more seed switches
//!
//! Prints a summary, the parent/child links, and optionally writes the
//! export rows as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example discover -- --seed 10.0.0.1 --user admin --password secret
//!
//! # Several credential pairs, separate enable secret, JSON export
//! cargo run --example discover -- --seed 10.0.0.1 --seed 10.1.0.1 \
//!     --user admin --password secret --user legacy --password cisco \
//!     --enable enable123 --json devices.json
//! ```

use std::env;
use std::time::Duration;

use swcrawl::discovery::{DiscoveryCrawler, DiscoveryOptions};
use swcrawl::session::{Credentials, DriverConnector, DriverOptions};
use swcrawl::topology::{DeviceKind, TopologyGraph, export_records};
use swcrawl::transport::DeviceType;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (set RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.seeds.is_empty() || args.users.is_empty() {
        Args::print_help();
        std::process::exit(1);
    }

    let mut credentials = Credentials::new();
    for (user, password) in args.users.iter().zip(args.passwords.iter()) {
        credentials = credentials.with_pair(user, password);
    }
    if let Some(secret) = &args.enable {
        credentials = credentials.with_enable_secret(secret);
    }

    let connector = DriverConnector::new(DriverOptions {
        timeout: Duration::from_secs(args.timeout),
        ..DriverOptions::default()
    });
    let options = DiscoveryOptions::new()
        .max_concurrency(args.concurrency)
        .device_type(args.device_type)
        .collect_licenses(!args.no_licenses);
    let crawler = DiscoveryCrawler::new(connector, options);

    // Ctrl-C finishes the current round and returns what was found
    let stop = crawler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Stopping after the current round...");
            stop.stop();
        }
    });

    println!("Crawling from {}...", args.seeds.join(", "));
    let report = crawler.discover(&args.seeds, &mut credentials).await;

    println!("{}", "-".repeat(50));
    println!(
        "{} switch(es) in {} round(s){}",
        report.ips.len(),
        report.rounds,
        if report.stopped { " (stopped)" } else { "" }
    );
    if !report.unreachable.is_empty() {
        println!("Unreachable: {}", report.unreachable.join(", "));
    }

    let graph = TopologyGraph::build(&report.records);
    for &(parent, child) in &graph.edges {
        let name = |i: usize| graph.nodes[i].hostname.clone().unwrap_or_default();
        let kind = match graph.kind(child) {
            Some(DeviceKind::Switch) => "switch",
            Some(DeviceKind::WirelessAp) => "ap",
            Some(DeviceKind::Phone) => "phone",
            _ => "other",
        };
        println!("  {} -> {} [{}]", name(parent), name(child), kind);
    }

    if let Some(path) = &args.json {
        let rows = export_records(&report.records);
        std::fs::write(path, serde_json::to_string_pretty(&rows)?)?;
        println!("Wrote {} record(s) to {}", rows.len(), path);
    }

    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
struct Args {
    seeds: Vec<String>,
    users: Vec<String>,
    passwords: Vec<String>,
    enable: Option<String>,
    device_type: DeviceType,
    concurrency: usize,
    timeout: u64,
    no_licenses: bool,
    json: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            seeds: vec![],
            users: vec![],
            passwords: vec![],
            enable: None,
            device_type: DeviceType::Autodetect,
            concurrency: 100,
            timeout: 10,
            no_licenses: false,
            json: None,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--seed" | "-s" => {
                    parsed.seeds.extend(value);
                    i += 1;
                }
                "--user" | "-u" => {
                    parsed.users.extend(value);
                    i += 1;
                }
                "--password" | "-P" => {
                    parsed.passwords.extend(value);
                    i += 1;
                }
                "--enable" | "-e" => {
                    parsed.enable = value;
                    i += 1;
                }
                "--transport" => {
                    parsed.device_type = match value.as_deref() {
                        Some("ssh") => DeviceType::Ssh,
                        Some("telnet") => DeviceType::Telnet,
                        _ => DeviceType::Autodetect,
                    };
                    i += 1;
                }
                "--concurrency" | "-c" => {
                    parsed.concurrency = value.and_then(|v| v.parse().ok()).unwrap_or(100);
                    i += 1;
                }
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(10);
                    i += 1;
                }
                "--no-licenses" => parsed.no_licenses = true,
                "--json" => {
                    parsed.json = value;
                    i += 1;
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                other => eprintln!("Unknown argument: {}", other),
            }
            i += 1;
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"swcrawl discover example

USAGE:
    cargo run --example discover -- [OPTIONS]

OPTIONS:
    -s, --seed <IP>            Seed switch (repeatable)
    -u, --user <USER>          Username (repeatable, paired with --password)
    -P, --password <PASS>      Password (repeatable)
    -e, --enable <SECRET>      Enable secret [default: the login password]
    --transport <KIND>         ssh, telnet or auto [default: auto]
    -c, --concurrency <N>      Devices probed at once [default: 100]
    -t, --timeout <SECS>       Connect timeout [default: 10]
    --no-licenses              Skip `show license`
    --json <PATH>              Write export records as JSON
    --help                     Print this help message
"#
        );
    }
}
