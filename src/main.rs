use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use reqwest::Client;
use tower_http::trace::TraceLayer;

mod auth;
mod config;
mod observability;
mod routes;

const DEFAULT_CONFIG_PATH: &str = "portcullis.toml";

const DEFAULT_CONFIG: &str = r#"# Portcullis configuration.
# Values support environment variable interpolation: ${VAR_NAME}

[server]
host = "0.0.0.0"
port = 8080

[sso]
# Base URL of the CAS service.
url = "https://sso.example.edu/cas"
# Service identifier registered with the CAS service.
service = "https://app.example.edu/auth/login"
# Landing page after a complete SSO logout (optional).
redirect_url = ""
# Also terminate the SSO session on logout.
logout_completely = false
# Require a matching user record in the host application.
lookup_user_in_host = false

[host]
authenticate_url = "https://app.example.edu/internal/authenticate"
logout_url = "https://app.example.edu/internal/logout"
login_page = "https://app.example.edu/login"
# lookup_url = "https://app.example.edu/internal/users"

[observability.logging]
level = "info"
format = "compact"
"#;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::BridgeConfig>,
    pub gateway: Arc<auth::CasGateway>,
}

impl AppState {
    pub fn new(config: config::BridgeConfig) -> Result<Self, Box<dyn std::error::Error>> {
        // One shared HTTP client for all outbound calls; reqwest keeps
        // per-host connection pools internally.
        let http_client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let validator = Arc::new(auth::Cas20TicketValidator::new(
            config.sso.url.clone(),
            http_client.clone(),
            Duration::from_secs(config.sso.validation_timeout_secs),
        ));
        let host = Arc::new(auth::RemoteHost::new(config.host.clone(), http_client));
        let gateway = Arc::new(auth::CasGateway::new(
            &config.sso,
            validator,
            host.clone(),
            host,
        ));

        Ok(Self {
            config: Arc::new(config),
            gateway,
        })
    }
}

#[derive(Parser)]
#[command(name = "portcullis", version, about)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the bridge (default).
    Serve,

    /// Write a starter configuration file.
    Init {
        /// Where to write the file.
        #[arg(short, long)]
        output: Option<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Init { output, force }) => {
            run_init(output, force);
        }
        Some(Command::Serve) | None => {
            run_server(args.config.as_deref()).await;
        }
    }
}

/// Create a default configuration file.
fn run_init(output: Option<String>, force: bool) {
    let output_path = PathBuf::from(output.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()));

    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&output_path, DEFAULT_CONFIG) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("To start the bridge, run:");
    println!("  portcullis serve --config {}", output_path.display());
}

async fn run_server(explicit_config_path: Option<&str>) {
    let config_path = explicit_config_path.unwrap_or(DEFAULT_CONFIG_PATH);

    let config = match config::BridgeConfig::from_file(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", config_path, e);
            eprintln!("Run 'portcullis init' to create a starter config file.");
            std::process::exit(1);
        }
    };

    observability::init_tracing(&config.observability);

    tracing::info!(
        sso_url = %config.sso.url,
        service = %config.sso.service,
        logout_completely = config.sso.logout_completely,
        lookup_user_in_host = config.sso.lookup_user_in_host,
        "Authentication bridge configured"
    );

    let bind_addr = config.server.bind_addr();
    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("Failed to initialize: {}", e);
            std::process::exit(1);
        }
    };

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %bind_addr, "Authentication bridge listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
