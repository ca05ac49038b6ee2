//! zonekeeper - a minimal authoritative DNS responder
//!
//! Loads A records from an HTTP zone source, answers UDP queries for them and
//! takes flush/reload commands on stdin.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use zonekeeper::config::load_config;
use zonekeeper::console::{run_console, spawn_stdin_reader};
use zonekeeper::dns::DnsServer;
use zonekeeper::error::ServerError;
use zonekeeper::logging;
use zonekeeper::zone::{ingest, HttpZoneSource, ZoneStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args: Vec<String> = env::args().collect();

    // Parse command line arguments
    let mut config_path: Option<&str> = None;
    let mut cli_listen_addr: Option<String> = None;
    let mut cli_source: Option<String> = None;
    let mut use_console = true;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                config_path = args.get(i).map(|s| s.as_str());
            }
            "--source" => {
                i += 1;
                cli_source = args.get(i).cloned();
            }
            "--no-console" => {
                use_console = false;
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                return Ok(());
            }
            arg if !arg.starts_with('-') && cli_listen_addr.is_none() => {
                cli_listen_addr = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage(&args[0]);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut config = load_config(config_path)?;

    // CLI arguments override config file
    if let Some(addr) = cli_listen_addr {
        config.dns.listen = addr;
    }
    if let Some(endpoint) = cli_source {
        config.source.endpoint = endpoint;
    }
    if !use_console {
        config.console.enabled = false;
    }
    config.validate()?;

    let _log_guard = logging::init_logging(&config.logging);
    logging::spawn_log_maintenance(&config.logging);

    let store = Arc::new(ZoneStore::new());
    let source = Arc::new(HttpZoneSource::new(&config.source).map_err(ServerError::from)?);

    println!("Zone source: {}", source.endpoint());

    // A failed first load is fatal
    match ingest(&*source, &store).await {
        Ok(summary) => {
            println!(
                "Loaded {} A records across {} zones ({} ignored, {} invalid)",
                summary.accepted, summary.zones, summary.ignored, summary.invalid
            );
        }
        Err(e) => {
            error!(endpoint = %source.endpoint(), error = %e, "Failed to load zone data");
            return Err(ServerError::from(e).into());
        }
    }

    let listen_addr: SocketAddr = config.dns.listen.parse()?;
    let server = DnsServer::bind(listen_addr, Arc::clone(&store), config.logging.log_queries)
        .await
        .map_err(ServerError::from)?;
    println!("DNS server listening on {}", server.local_addr()?);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(server.run(async move {
        let _ = shutdown_rx.await;
    }));

    if config.console.enabled {
        println!("Console commands: flush, flushstale, flushrecord, reload");
        let lines = spawn_stdin_reader();
        tokio::spawn(run_console(lines, Arc::clone(&store), Arc::clone(&source)));
    }

    shutdown_signal().await;
    info!("Shutting down the DNS server");

    let _ = shutdown_tx.send(());
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "DNS server stopped with error"),
        Err(e) => warn!(error = %e, "DNS server task failed"),
    }

    let stats = store.stats();
    info!(
        live_records = stats.live_records,
        stale_records = stats.stale_records,
        "Stopped"
    );

    Ok(())
}

/// Resolve on SIGINT, or SIGTERM where supported
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} [listen_addr] [options]", program);
    eprintln!();
    eprintln!("Authoritative DNS responder for A records loaded from an HTTP zone source.");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  listen_addr             UDP address to answer on (default: 127.0.0.1:53)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <path>     Load config from YAML file");
    eprintln!("  --source <url>          Zone source endpoint (http:// or https://)");
    eprintln!("  --no-console            Do not read commands from stdin");
    eprintln!("  -h, --help              Show this help message");
    eprintln!();
    eprintln!("Console commands:");
    eprintln!("  flush, flushstale       Drop all stale records");
    eprintln!("  flushrecord             Then '<domain> <TYPE>': move live records to stale");
    eprintln!("  reload                  Fetch the zone source again");
    eprintln!();
    eprintln!("Config file (zonekeeper.yaml):");
    eprintln!("  dns:");
    eprintln!("    listen: \"127.0.0.1:53\"");
    eprintln!("  source:");
    eprintln!("    endpoint: \"http://localhost:8080/dns\"");
    eprintln!("    username: \"your-username\"");
    eprintln!("    password: \"your-password\"");
    eprintln!("    timeout_ms: 5000");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} 127.0.0.1:5353                           # Unprivileged port", program);
    eprintln!(
        "  {} --source https://zones.example.net/export # Different source",
        program
    );
    eprintln!(
        "  {} --config zonekeeper.yaml                  # Use config file",
        program
    );
}
