//! `upcscan` - CLI for the upcscan barcode scanner
//!
//! This binary scans barcodes from standard input, looks products up and
//! manages the local history of scanned items.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use upcscan::cli::{Cli, Command, ConfigCommand};
use upcscan::connectivity::{
    watch, ConnectivityMonitor, ConnectivityProbe, StaticProbe, TcpProbe, WatchHandle,
};
use upcscan::display::{item_views, ResultsView, TextRenderer};
use upcscan::{
    init_logging, App, AppEvent, Config, HttpProductApi, ItemStore, KeyboardWedgeDecoder,
    LookupOutcome, SessionMode, Storage, Symbology,
};

/// Capacity of the application event channel.
const EVENT_BUFFER: usize = 16;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let result = runtime.block_on(execute(cli.command, &config));
    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_background();
    result
}

async fn execute(command: Command, config: &Config) -> anyhow::Result<ExitCode> {
    match command {
        Command::Scan(cmd) => handle_scan(config, cmd.mode()).await,
        Command::Lookup(cmd) => handle_lookup(config, &cmd.barcode).await,
        Command::List(cmd) => handle_list(config, cmd.json),
        Command::Clear(cmd) => handle_clear(config, cmd.yes),
        Command::Status(cmd) => handle_status(config, cmd.json).await,
        Command::Config(cmd) => handle_config(config, cmd),
    }
}

fn open_store(config: &Config) -> anyhow::Result<ItemStore> {
    let path = config.database_path();
    let storage = Storage::open(&path)
        .with_context(|| format!("failed to open item store at {}", path.display()))?;
    Ok(ItemStore::new(storage, config.storage.storage_key.as_str()))
}

fn http_api(config: &Config) -> anyhow::Result<HttpProductApi> {
    Ok(HttpProductApi::new(
        &config.api.base_url,
        config.request_timeout(),
    )?)
}

/// The reachability probe for the API host, unless probing is disabled.
fn tcp_probe(config: &Config, api: &HttpProductApi) -> Option<TcpProbe> {
    if !config.connectivity.enabled {
        return None;
    }
    TcpProbe::for_url(api.base_url(), config.probe_timeout())
}

async fn check_online(config: &Config, api: &HttpProductApi) -> bool {
    match tcp_probe(config, api) {
        Some(probe) => probe.is_online().await,
        None => true,
    }
}

async fn handle_scan(config: &Config, mode: SessionMode) -> anyhow::Result<ExitCode> {
    let api = http_api(config)?;
    match tcp_probe(config, &api) {
        Some(probe) => scan_session(config, api, probe, mode).await,
        None => scan_session(config, api, StaticProbe(true), mode).await,
    }
}

async fn scan_session<P>(
    config: &Config,
    api: HttpProductApi,
    probe: P,
    mode: SessionMode,
) -> anyhow::Result<ExitCode>
where
    P: ConnectivityProbe + 'static,
{
    let store = open_store(config)?;
    let monitor = ConnectivityMonitor::from_probe(&probe).await;

    let mut app = App::new(
        store,
        api,
        KeyboardWedgeDecoder::stdin(),
        TextRenderer::stdout(),
        config.decoder_config(),
        monitor.is_online(),
    );
    app.start()?;

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let watch_handle = WatchHandle::new();
    let watcher = watch(
        probe,
        monitor,
        config.probe_interval(),
        tx.clone(),
        watch_handle.clone(),
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping scanner");
            let _ = tx.send(AppEvent::Shutdown).await;
        }
    });

    let result = app.run(rx, mode).await;
    watch_handle.stop();
    watcher.abort();
    result?;

    Ok(ExitCode::SUCCESS)
}

async fn handle_lookup(config: &Config, barcode: &str) -> anyhow::Result<ExitCode> {
    if Symbology::classify(barcode, &config.scanner.readers).is_none() {
        warn!(barcode, "Barcode does not match any configured symbology");
    }

    let api = http_api(config)?;
    let online = check_online(config, &api).await;

    // No scanner input: the barcode comes from the command line.
    let mut app = App::new(
        open_store(config)?,
        api,
        KeyboardWedgeDecoder::new(tokio::io::empty()),
        TextRenderer::stdout(),
        config.decoder_config(),
        online,
    );

    match app.lookup(barcode).await? {
        LookupOutcome::Saved(_) => Ok(ExitCode::SUCCESS),
        LookupOutcome::NotFound | LookupOutcome::Failed(_) => Ok(ExitCode::FAILURE),
    }
}

fn handle_list(config: &Config, json: bool) -> anyhow::Result<ExitCode> {
    let items = open_store(config)?.get_all()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        println!("{}", ResultsView::Items(item_views(&items)));
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_clear(config: &Config, yes: bool) -> anyhow::Result<ExitCode> {
    let store = open_store(config)?;
    let count = store.count()?;

    if !yes {
        println!("This will remove {count} scanned item(s).");
        println!("Use --yes to confirm.");
        return Ok(ExitCode::SUCCESS);
    }

    if store.clear()? {
        info!(count, "Cleared scanned items");
        println!("Removed {count} scanned item(s).");
    } else {
        println!("No items scanned yet");
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_status(config: &Config, json: bool) -> anyhow::Result<ExitCode> {
    let api = http_api(config)?;
    let online = check_online(config, &api).await;
    let store = open_store(config)?;
    let items = store.count()?;
    let stats = store.storage().stats()?;

    if json {
        let status = serde_json::json!({
            "online": online,
            "connectivity_probe": config.connectivity.enabled,
            "api_base_url": api.base_url().as_str(),
            "database_path": config.database_path(),
            "storage_key": store.key(),
            "scanned_items": items,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("upcscan status");
        println!("--------------");
        println!(
            "Network:       {}",
            if online { "online" } else { "offline" }
        );
        if !config.connectivity.enabled {
            println!("               (probe disabled, assumed online)");
        }
        println!("Product API:   {}", api.base_url());
        println!("Database:      {}", config.database_path().display());
        println!("Storage key:   {}", store.key());
        println!("Scanned items: {items}");
        println!("Database size: {} bytes", stats.db_size_bytes);
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                let readers: Vec<String> =
                    config.scanner.readers.iter().map(ToString::to_string).collect();

                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[API]");
                println!("  Base URL:           {}", config.api.base_url);
                println!(
                    "  Request timeout:    {}",
                    match config.request_timeout() {
                        Some(timeout) => format!("{}s", timeout.as_secs()),
                        None => "none".to_string(),
                    }
                );
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Storage key:        {}", config.storage.storage_key);
                println!();
                println!("[Scanner]");
                println!(
                    "  Resolution:         {}x{}",
                    config.scanner.width, config.scanner.height
                );
                println!("  Facing mode:        {}", config.scanner.facing_mode);
                println!(
                    "  Aspect ratio:       {} - {}",
                    config.scanner.aspect_ratio_min, config.scanner.aspect_ratio_max
                );
                println!("  Readers:            {}", readers.join(", "));
                println!();
                println!("[Connectivity]");
                println!("  Probe enabled:      {}", config.connectivity.enabled);
                println!(
                    "  Probe interval:     {}ms",
                    config.connectivity.probe_interval_ms
                );
                println!(
                    "  Probe timeout:      {}ms",
                    config.connectivity.probe_timeout_ms
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
