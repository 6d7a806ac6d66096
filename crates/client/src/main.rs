//! zk-attendance CLI
//!
//! Thin presentation layer over the client library: parses the range and
//! user-id strings, drives scan/fetch/remove, and turns each error kind
//! into its own message. No device or scan logic lives here.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use common::{AddressRange, setup_logging};
use tracing::info;

use client::config::ClientConfig;
use client::device::{delete_user, fetch_attendance};
use client::export::write_attendance_json;
use client::network::Scanner;

#[derive(Parser, Debug)]
#[command(name = "zk-attendance")]
#[command(author, version, about = "Find and read an attendance terminal on the local network")]
#[command(long_about = "
Discovers a ZKTeco-compatible attendance terminal by probing the vendor
port across an IPv4 range, then downloads its attendance log or removes a
user record. The terminal is disabled only for the duration of a read and
always re-enabled, even when the read fails.

EXAMPLES:
    # Scan the default range and report the device address
    zk-attendance scan

    # Scan, then export the attendance log to attendance_logs.json
    zk-attendance fetch

    # Known device address: skip the scan
    zk-attendance fetch --addr 192.168.1.37 --output today.json

    # Remove user 1002, scanning 192.168.1.33-60 to find the device
    zk-attendance remove-user 1002 --start 192.168.1.33 --end 192.168.1.60

CONFIGURATION:
    Device port, credential, timeouts, and the probe cap come from
    ~/.config/zk-attendance/config.toml (see --save-config) or the file
    given with --config.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to the default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Args, Debug)]
struct TargetArgs {
    /// First address of the scan range
    #[arg(long, value_name = "ADDR", default_value = "192.168.1.33")]
    start: String,

    /// Last address of the scan range (same /24 as --start)
    #[arg(long, value_name = "ADDR", default_value = "192.168.1.254")]
    end: String,

    /// Skip scanning and talk to this address directly
    #[arg(long, value_name = "ADDR")]
    addr: Option<Ipv4Addr>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the address range for a terminal answering on the vendor port
    Scan {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Locate the terminal and export its attendance log as JSON
    Fetch {
        #[command(flatten)]
        target: TargetArgs,

        /// Destination file for the export
        #[arg(short, long, value_name = "PATH", default_value = "attendance_logs.json")]
        output: PathBuf,
    },
    /// Locate the terminal and remove a user record by user id
    RemoveUser {
        /// User id as enrolled on the terminal
        user_id: String,

        #[command(flatten)]
        target: TargetArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = ClientConfig::default();
        let path = ClientConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = match args.config {
        Some(ref path) => ClientConfig::load(path).context("Failed to load configuration")?,
        None => ClientConfig::load_or_default(),
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.client.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("zk-attendance v{}", env!("CARGO_PKG_VERSION"));

    let Some(command) = args.command else {
        bail!("no command given; try `zk-attendance fetch` or --help");
    };

    match command {
        Command::Scan { target } => {
            let range = AddressRange::parse(&target.start, &target.end)?;
            match Scanner::new(config.scan_settings()).scan(&range).await {
                Some(addr) => println!("Device found at {addr}"),
                None => bail!("no attendance terminal found in the range {range}"),
            }
        }
        Command::Fetch { target, output } => {
            let addr = resolve_device(&config, &target).await?;
            let records = fetch_attendance(addr, &config.session_settings()).await?;
            println!("Fetched {} raw logs from {}", records.len(), addr);
            write_attendance_json(&records, &output)?;
            println!("Exported to {}", output.display());
        }
        Command::RemoveUser { user_id, target } => {
            let addr = resolve_device(&config, &target).await?;
            delete_user(addr, &user_id, &config.session_settings()).await?;
            println!("User {user_id} has been removed from the device at {addr}");
        }
    }

    Ok(())
}

/// Use the explicit address when given, otherwise scan for the device.
async fn resolve_device(config: &ClientConfig, target: &TargetArgs) -> Result<Ipv4Addr> {
    if let Some(addr) = target.addr {
        return Ok(addr);
    }
    let range = AddressRange::parse(&target.start, &target.end)?;
    match Scanner::new(config.scan_settings()).scan(&range).await {
        Some(addr) => Ok(addr),
        None => bail!("no attendance terminal found in the range {range}"),
    }
}
