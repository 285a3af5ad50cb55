mod backends;
mod cache;
mod config;
mod connection;
mod error;
mod snapshot;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task;
use tokio::time::{MissedTickBehavior, interval};

use crate::backends::connection_table::{detect_connection_backends, select_connection_backend};
use crate::backends::process::{ProcessLookup, create_process_lookup};
use crate::config::Config;
use crate::snapshot::{ConnectionFilter, ConnectionSnapshotService};
use crate::ui::RowView;

/// NetStatView - active TCP connections and the processes that own them
#[derive(Parser, Debug)]
#[command(name = "netstatview")]
#[command(version)]
#[command(about = "Lists active TCP connections with their owning process", long_about = None)]
struct Args {
    /// Only show connections to this remote IPv4 address
    #[arg(long, value_name = "ADDR")]
    remote_addr: Option<Ipv4Addr>,

    /// Only show connections to this remote port
    #[arg(long, value_name = "PORT")]
    remote_port: Option<u16>,

    /// Only show connections owned by a process with exactly this name
    #[arg(long, value_name = "NAME")]
    process: Option<String>,

    /// Poll interval in milliseconds (default: 500)
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// How long resolved process names are cached (default: 30)
    #[arg(long, value_name = "SECONDS")]
    cache_ttl_secs: Option<u64>,

    /// Connection table backend to use
    #[arg(long, value_name = "BACKEND")]
    backend: Option<String>,

    /// List all available backends and exit
    #[arg(long)]
    list_backends: bool,

    /// Take a single snapshot and exit
    #[arg(long)]
    once: bool,

    /// Print rows as JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Save the effective settings as the new defaults
    #[arg(long)]
    save_config: bool,
}

impl Args {
    fn has_filter(&self) -> bool {
        self.remote_addr.is_some() || self.remote_port.is_some() || self.process.is_some()
    }

    /// Command-line flags take precedence over the config file
    fn apply_to(&self, config: &mut Config) {
        if let Some(ms) = self.interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(secs) = self.cache_ttl_secs {
            config.process_cache_ttl_secs = secs;
        }
        if let Some(ref backend) = self.backend {
            config.preferred_backend = Some(backend.clone());
        }
        if self.has_filter() {
            config.default_filter = ConnectionFilter {
                remote_addr: self.remote_addr,
                remote_port: self.remote_port,
                process_name: self.process.clone(),
            };
        }
    }
}

fn print_available_backends() {
    println!("NetStatView - Available Backends\n");

    println!("Connection Table Backends:");
    let backends = detect_connection_backends();
    if backends.is_empty() {
        println!("  (none for this platform)");
    } else {
        for backend in backends {
            let status = if backend.available {
                "available"
            } else {
                "unavailable"
            };
            println!(
                "  {:20} [priority: {:?}] {}",
                backend.name, backend.priority, status
            );
        }
    }

    println!();
    println!("Process Lookup:");
    println!("  {}", create_process_lookup().name());
}

fn print_rows(view: &RowView, backend_name: &str, json: bool) -> Result<()> {
    let rows = view.rows();

    if json {
        let line = serde_json::to_string(rows).context("Failed to serialize rows")?;
        println!("{}", line);
    } else {
        println!(
            "[{}] {} connection(s) via {}",
            chrono::Local::now().format("%H:%M:%S"),
            rows.len(),
            backend_name
        );
        print!("{}", ui::render_table(rows));
        println!();
    }

    Ok(())
}

fn stop_on_ctrl_c(res: std::io::Result<()>) -> Result<()> {
    res.context("Failed to listen for Ctrl+C")?;
    log::info!("Received Ctrl+C, stopping");
    Ok(())
}

/// Poll until Ctrl+C, printing whenever the row set changes
///
/// Snapshots run on the blocking pool so a slow table or fd scan never
/// delays Ctrl+C.
async fn run_poll_loop(
    service: Arc<ConnectionSnapshotService>,
    filter: ConnectionFilter,
    poll_interval: Duration,
    json: bool,
) -> Result<()> {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut view = RowView::new();

    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            res = &mut ctrl_c => return stop_on_ctrl_c(res),
        }

        let snapshot = {
            let service = Arc::clone(&service);
            let filter = filter.clone();
            task::spawn_blocking(move || service.list_connections(&filter))
        };

        tokio::select! {
            res = snapshot => {
                match res.context("Snapshot task failed")? {
                    Ok(rows) => {
                        if view.replace(rows) {
                            print_rows(&view, service.backend_name(), json)?;
                        }
                    }
                    // The next tick retries
                    Err(e) => log::warn!("Failed to list connections: {}", e),
                }
            }
            res = &mut ctrl_c => return stop_on_ctrl_c(res),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    if std::env::var("RUST_LOG").is_ok() {
        pretty_env_logger::formatted_builder()
            .parse_default_env()
            .init();
    }

    // Handle --list-backends
    if args.list_backends {
        print_available_backends();
        return Ok(());
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    args.apply_to(&mut config);

    if args.save_config {
        config.save()?;
    }

    let table = select_connection_backend(config.preferred_backend.as_deref())?;
    let lookup: Arc<dyn ProcessLookup> = Arc::from(create_process_lookup());
    log::info!(
        "Using connection table backend {} [priority: {:?}] with {} process lookup",
        table.name(),
        table.priority(),
        lookup.name()
    );

    let service = Arc::new(ConnectionSnapshotService::new(
        table,
        lookup,
        config.process_cache_ttl(),
    ));
    let filter = config.default_filter.clone();
    log::debug!("Filter: {:?}", filter);

    let res = if args.once {
        let mut view = RowView::new();
        service
            .list_connections(&filter)
            .context("Failed to list connections")
            .and_then(|rows| {
                view.replace(rows);
                print_rows(&view, service.backend_name(), args.json)
            })
    } else {
        run_poll_loop(Arc::clone(&service), filter, config.poll_interval(), args.json).await
    };

    log::debug!(
        "Shutting down with {} cached process name(s)",
        service.cached_process_count()
    );
    service.shutdown();

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "netstatview",
            "--interval-ms",
            "1000",
            "--remote-port",
            "443",
            "--backend",
            "procfs",
        ]);
        let mut config = Config::default();
        config.default_filter.process_name = Some("old".to_string());

        args.apply_to(&mut config);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.process_cache_ttl_secs, 30);
        assert_eq!(config.preferred_backend.as_deref(), Some("procfs"));
        // Any filter flag replaces the whole saved filter
        assert_eq!(config.default_filter.remote_port, Some(443));
        assert_eq!(config.default_filter.process_name, None);
    }

    #[test]
    fn test_no_filter_flags_keep_saved_filter() {
        let args = Args::parse_from(["netstatview", "--once"]);
        let mut config = Config::default();
        config.default_filter.remote_addr = Some(Ipv4Addr::new(8, 8, 8, 8));

        args.apply_to(&mut config);
        assert_eq!(
            config.default_filter.remote_addr,
            Some(Ipv4Addr::new(8, 8, 8, 8))
        );
    }

    #[test]
    fn test_remote_addr_must_be_ipv4() {
        assert!(Args::try_parse_from(["netstatview", "--remote-addr", "::1"]).is_err());
    }
}
