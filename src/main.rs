//! yamn-proxy
//!
//! Runs the loopback relay and, unless started standalone, the YAMN client
//! behind it.
//!
//! # Architecture Overview
//!
//! ```text
//!   yamn (companion)                 yamn-proxy                      SOCKS5 (Tor)
//!  ┌────────────────┐   HTTP_PROXY  ┌──────────────────────────┐    ┌──────────┐
//!  │ GET pubring.mix│──────────────▶│ listener → sniff         │    │          │
//!  │                │               │   ├─ http  → route table ├───▶│ ──▶ URL  │
//!  │ SMTP submit    │──────────────▶│   └─ opaque → relay      ├───▶│ ──▶ MTA  │
//!  └────────────────┘               └──────────────────────────┘    └──────────┘
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser;
use notify::RecommendedWatcher;

use yamn_proxy::config::watcher::ConfigWatcher;
use yamn_proxy::config::{load_or_default, LogFormat};
use yamn_proxy::lifecycle::{self, companion, signals, Companion, Shutdown};
use yamn_proxy::observability::init_logging;
use yamn_proxy::state::{apply_reload, SharedState};

const DEFAULT_CONFIG_FILE: &str = "yamn-proxy.toml";

/// Loopback HTTP/SMTP relay for the YAMN remailer client.
#[derive(Parser, Debug)]
#[command(name = "yamn-proxy", version, about)]
struct Cli {
    /// Configuration file [default: yamn-proxy.toml next to the executable]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Reload the configuration file when it changes
    #[arg(long)]
    watch: bool,

    /// Run the relay only, until interrupted
    #[arg(long)]
    standalone: bool,

    /// Companion program to launch instead of the configured one
    #[arg(long, value_name = "PATH")]
    companion: Option<PathBuf>,

    /// Log output format (text or json)
    #[arg(long, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,

    /// Arguments passed to the companion unchanged (use `--` before flags)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<OsString>,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    match value {
        "text" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => Err(format!("unknown log format {other:?}, expected text or json")),
    }
}

fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_FILE)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Watch `path` and swap in every valid configuration it produces.
fn watch_config(path: &Path, state: SharedState) -> Result<RecommendedWatcher, notify::Error> {
    let (watcher, mut updates) = ConfigWatcher::new(path);
    let handle = watcher.run()?;

    tokio::spawn(async move {
        while let Some(config) = updates.recv().await {
            if let Err(e) = apply_reload(&state, config) {
                tracing::error!(error = %e, "Failed to apply reloaded config, keeping current configuration");
            }
        }
    });

    Ok(handle)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_or_default(&config_path)?;

    init_logging(&config.observability, cli.log_format);

    tracing::info!("yamn-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config = %config_path.display(),
        listen_address = %config.listen_address,
        proxy_address = %config.proxy_address,
        smtp_target = %config.smtp_target,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    let companion_config = config.companion.clone();
    let shutdown = Shutdown::new();

    let running = match lifecycle::start(config, &shutdown).await {
        Ok(running) => running,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };
    tracing::info!(address = %running.local_addr, "Listening for connections");

    // Dropping the watcher stops reloads, so it lives until main returns.
    let _watcher = if cli.watch {
        Some(watch_config(&config_path, running.state.clone())?)
    } else {
        None
    };

    let launch = !cli.standalone && (companion_config.enabled || cli.companion.is_some());
    if !launch {
        signals::shutdown_signal().await;
        shutdown.trigger();
        let _ = running.accept_loop.await;
        tracing::info!("Shutdown complete");
        return Ok(());
    }

    let program = match cli.companion {
        Some(program) => program,
        None => Companion::locate(&companion_config.program)?,
    };
    let companion = Companion::new(program, cli.args, &running.local_addr.to_string());

    let status = match companion.run().await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!(error = %e, "Companion failed");
            return Err(e.into());
        }
    };

    shutdown.trigger();
    std::process::exit(companion::exit_code(status));
}
