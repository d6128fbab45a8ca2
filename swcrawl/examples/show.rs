//! Driver example: run show commands on one switch
//!
//! # Usage
//!
//! ```bash
//! cargo run --example show -- --host 10.0.0.2 --user admin --password secret \
//!     "show version" "show interface status"
//!
//! # Telnet-only device
//! cargo run --example show -- --host 10.0.0.3 --telnet --user admin --password secret "show cdp neighbors"
//! ```

use std::env;
use std::time::Duration;

use swcrawl::transport::{DeviceType, HostKeyVerification};
use swcrawl::{Driver, DriverBuilder};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut host = None;
    let mut user = None;
    let mut password = None;
    let mut enable = None;
    let mut device_type = DeviceType::Ssh;
    let mut commands = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--host" | "-h" => host = iter.next(),
            "--user" | "-u" => user = iter.next(),
            "--password" | "-P" => password = iter.next(),
            "--enable" | "-e" => enable = iter.next(),
            "--telnet" => device_type = DeviceType::Telnet,
            _ => commands.push(arg),
        }
    }

    let (Some(host), Some(user), Some(password)) = (host, user, password) else {
        eprintln!("Usage: show --host <HOST> --user <USER> --password <PASS> [--enable <SECRET>] [--telnet] <COMMAND>...");
        std::process::exit(1);
    };

    let mut builder = DriverBuilder::new(&host)
        .device_type(device_type)
        .username(user)
        .password(password)
        .timeout(Duration::from_secs(10))
        .host_key_verification(HostKeyVerification::AcceptNew);
    if let Some(secret) = enable {
        builder = builder.enable_secret(secret);
    }
    let mut driver = builder.build()?;

    println!("Connecting to {} over {}...", host, device_type);
    driver.open().await?;
    println!("Connected, prompt: {}", driver.prompt());

    driver.acquire_privilege("privilege_exec").await?;

    let commands: Vec<&str> = commands.iter().map(String::as_str).collect();
    let responses = driver.send_commands(&commands).await?;
    let hostname = driver.hostname();

    for response in &responses {
        println!("{}", "-".repeat(50));
        println!("{}# {}", hostname, response.command);
        if let Some(failure) = &response.failure_message {
            eprintln!("Command failed: {}", failure);
        } else {
            println!("{}", response.result);
        }
        println!("({:?})", response.elapsed);
    }

    driver.close().await?;
    Ok(())
}
