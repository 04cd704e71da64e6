use anyhow::{Context, Result};
use clap::Parser;
use scanguard_cli::{Cli, ScanStation, Settings, StationEvent};
use scanguard_hardware::{AnyPortBackend, PortBackend, WatcherEvent};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let backend = AnyPortBackend::system();

    if cli.list_ports {
        for port in backend.list_ports().context("Failed to list serial ports")? {
            println!(
                "{}\t{}\t{}",
                port.name,
                port.kind,
                port.product.as_deref().unwrap_or("-")
            );
        }
        return Ok(());
    }

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    cli.apply(&mut settings);
    debug!("Settings: {:?}", settings);

    let mut station = ScanStation::start(&settings, backend)?;
    info!("Waiting for scanners (Ctrl+C to stop)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            event = station.next_event() => match event {
                Some(StationEvent::Scan(scan)) => println!("{}", scan),
                Some(StationEvent::Device(WatcherEvent::Connected { port })) => {
                    info!("Scanner connected: {}", port);
                }
                Some(StationEvent::Device(WatcherEvent::Disconnected { port })) => {
                    warn!("Scanner disconnected: {}", port);
                }
                Some(StationEvent::Device(other)) => debug!("Watcher event: {:?}", other),
                Some(StationEvent::Guard(event)) => debug!("Guard event: {:?}", event),
                None => break,
            },
        }
    }

    info!("{}", station.status());
    station.shutdown().await
}
