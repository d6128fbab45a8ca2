//! Configure example: read one switch, edit an interface, apply the change
//!
//! # Usage
//!
//! ```bash
//! # Show the commands only
//! cargo run --example configure -- --host 10.0.0.2 --user admin --password secret \
//!     --interface Gi1/0/12 --description "desk 12" --access-vlan 20 --dry-run
//!
//! # Apply and save
//! cargo run --example configure -- --host 10.0.0.2 --user admin --password secret \
//!     --interface Gi1/0/12 --shutdown --save
//! ```

use std::env;

use swcrawl::config::{self, SwitchportMode};
use swcrawl::session::{Credentials, DeviceIdentity, DeviceSession, DriverConnector, SessionConnector};
use swcrawl::transport::DeviceType;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let (Some(host), Some(user), Some(password), Some(interface)) = (
        args.host.as_deref(),
        args.user.as_deref(),
        args.password.as_deref(),
        args.interface.as_deref(),
    ) else {
        Args::print_help();
        std::process::exit(1);
    };

    let mut credentials = Credentials::new().with_pair(user, password);
    if let Some(secret) = &args.enable {
        credentials = credentials.with_enable_secret(secret);
    }
    let pair = &credentials.pairs()[0];

    println!("Connecting to {}...", host);
    let connector = DriverConnector::default();
    let mut session = connector
        .connect(
            DeviceType::Autodetect,
            host,
            pair,
            credentials.enable_secret_for(pair),
        )
        .await?;
    let identity = DeviceIdentity::of(host, DeviceType::Autodetect, &session);
    println!("Connected to {}", identity);

    let mut device = config::fetch_device_config(&mut session).await;
    if !device.is_available() {
        eprintln!("{}", device.raw_config);
        std::process::exit(1);
    }
    println!(
        "{} interface(s), {} vlan(s)",
        device.interfaces.len(),
        device.vlans.len()
    );

    let Some(port) = device.interface_mut(interface) else {
        eprintln!("No interface {} on {}", interface, identity);
        std::process::exit(1);
    };
    if let Some(description) = &args.description {
        port.set_description(description.clone());
    }
    if let Some(vlan) = args.access_vlan {
        port.set_mode(SwitchportMode::Access);
        port.set_access_vlan(Some(vlan));
    }
    if let Some(vlan) = args.voice_vlan {
        port.set_voice_vlan(Some(vlan));
    }
    if let Some(shutdown) = args.shutdown {
        port.set_shutdown(shutdown);
    }

    if args.dry_run {
        for command in config::build_commands(&device.interfaces, &device.vlans) {
            println!("{}", command);
        }
    } else {
        let report = config::apply_changes(&mut session, &identity, &mut device).await?;
        println!("Applied {} command(s)", report.commands.len());
        if args.save {
            config::save_config(&mut session).await?;
            println!("Saved");
        }
    }

    session.close().await?;
    Ok(())
}

/// Simple argument parser (avoiding external dependencies)
#[derive(Default)]
struct Args {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    enable: Option<String>,
    interface: Option<String>,
    description: Option<String>,
    access_vlan: Option<u16>,
    voice_vlan: Option<u16>,
    shutdown: Option<bool>,
    dry_run: bool,
    save: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self::default();

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            let mut takes_value = true;
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value,
                "--user" | "-u" => parsed.user = value,
                "--password" | "-P" => parsed.password = value,
                "--enable" | "-e" => parsed.enable = value,
                "--interface" | "-i" => parsed.interface = value,
                "--description" | "-d" => parsed.description = value,
                "--access-vlan" => parsed.access_vlan = value.and_then(|v| v.parse().ok()),
                "--voice-vlan" => parsed.voice_vlan = value.and_then(|v| v.parse().ok()),
                flag => {
                    takes_value = false;
                    match flag {
                        "--shutdown" => parsed.shutdown = Some(true),
                        "--no-shutdown" => parsed.shutdown = Some(false),
                        "--dry-run" => parsed.dry_run = true,
                        "--save" => parsed.save = true,
                        "--help" => {
                            Self::print_help();
                            std::process::exit(0);
                        }
                        other => eprintln!("Unknown argument: {}", other),
                    }
                }
            }
            i += if takes_value { 2 } else { 1 };
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"swcrawl configure example

USAGE:
    cargo run --example configure -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Switch address
    -u, --user <USER>          Username
    -P, --password <PASS>      Password
    -e, --enable <SECRET>      Enable secret [default: the login password]
    -i, --interface <NAME>     Interface to edit (long or short name)
    -d, --description <TEXT>   New description ("" removes it)
    --access-vlan <ID>         Make the port an access port on this VLAN
    --voice-vlan <ID>          Voice VLAN
    --shutdown                 Disable the port
    --no-shutdown              Enable the port
    --dry-run                  Print the commands instead of applying them
    --save                     Write memory after applying
    --help                     Print this help message
"#
        );
    }
}
