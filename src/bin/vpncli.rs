//! vpncli - VPN Control CLI Tool
//!
//! Command-line front-end for the vpnctl connection controller. Drives the
//! same presenter boundary a graphical shell would: configure, toggle, and
//! observe the connection.

use clap::{Parser, Subcommand};
use libvpnctl::{
    ConfigurationView, CredentialStore, Presenter, TunnelHost, VpnStatus,
};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vpncli", version, about = "Control a host-managed VPN connection")]
struct Cli {
    /// Configuration directory (profile and credential store)
    #[arg(long, default_value = "/etc/vpnctl")]
    config_dir: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current connection status
    Status {
        /// Emit the full host state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save the connection configuration
    Configure {
        /// VPN server address
        #[arg(long)]
        server: String,
        /// Account name
        #[arg(long)]
        username: String,
        /// Account password (stored in the credential store, not the profile)
        #[arg(long)]
        password: String,
        /// Protocol selector index (0 = IKEv2, 1 = IPSec)
        #[arg(long, default_value_t = 0)]
        protocol: i64,
    },
    /// Bring the tunnel up
    Connect,
    /// Tear the tunnel down
    Disconnect,
    /// Toggle the connection based on the current status
    Toggle,
}

/// Console rendering of the view callbacks
struct ConsoleView {
    /// Suppress status lines (JSON output mode)
    quiet: bool,
    error_count: AtomicUsize,
}

impl ConsoleView {
    fn new(quiet: bool) -> Self {
        Self { quiet, error_count: AtomicUsize::new(0) }
    }

    fn had_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }
}

impl ConfigurationView for ConsoleView {
    fn update_connection_status(&self, status: VpnStatus) {
        if !self.quiet {
            println!("Status: {}", status);
        }
    }

    fn show_error(&self, message: &str) {
        eprintln!("Error: {}", message);
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Initialize logging based on command-line arguments
fn init_logging(cli: &Cli) {
    let log_level = if cli.verbose { "debug" } else { &cli.log_level };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("vpncli={},libvpnctl={}", log_level, log_level))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(atty::is(atty::Stream::Stdout))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let json_output = matches!(&cli.command, Commands::Status { json: true });

    let host = Arc::new(TunnelHost::new(&cli.config_dir));
    let credentials = CredentialStore::new(cli.config_dir.join("credentials"));
    let view = Arc::new(ConsoleView::new(json_output));
    let presenter = Presenter::assemble(host.clone(), credentials, view.clone());

    let controller = presenter.controller();
    if controller.initialize().await.is_err() {
        process::exit(1);
    }

    match cli.command {
        Commands::Status { json } => {
            if json {
                match host.status_json().await {
                    Ok(value) => println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default()),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    }
                }
            }
            // The status line was already printed by initialize
        }
        Commands::Configure { server, username, password, protocol } => {
            presenter
                .submit_configuration(&server, &username, &password, protocol)
                .await;
        }
        Commands::Connect => {
            let current = controller.current_status().await;
            if current.is_active() {
                println!("Already {}", current);
            } else {
                presenter.connection_tapped(current).await;
                controller.load_status().await;
            }
        }
        Commands::Disconnect => {
            let current = controller.current_status().await;
            if !current.is_active() {
                println!("Not connected ({})", current);
            } else {
                presenter.connection_tapped(current).await;
                controller.load_status().await;
            }
        }
        Commands::Toggle => {
            let current = controller.current_status().await;
            presenter.connection_tapped(current).await;
            controller.load_status().await;
        }
    }

    if view.had_errors() {
        process::exit(1);
    }
}
