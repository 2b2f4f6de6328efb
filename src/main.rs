//! kubeproxy-ext binary.
//!
//! Configuration precedence, lowest first: built-in defaults, the TOML
//! file given by `--config`, environment variables, command-line flags.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use kubeproxy_ext::config::{
    apply_env_overrides, read_config, validate_config, ConfigError, ProxyConfig,
};
use kubeproxy_ext::lifecycle::signals::shutdown_on_signal;
use kubeproxy_ext::observability::{logging, metrics};
use kubeproxy_ext::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "kubeproxy-ext")]
#[command(about = "Kubernetes API proxy that adds kubectl display columns", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Upstream Kubernetes API URL
    #[arg(long)]
    target_url: Option<String>,

    /// Address to listen on
    #[arg(long)]
    listen_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(url) = self.target_url {
            config.proxy.target_url = url;
        }
        if let Some(addr) = self.listen_addr {
            config.proxy.listen_addr = addr;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
    }
}

fn resolve_config(cli: Cli) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    cli.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(Cli::parse())?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        "{} v{} starting",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(
        target_url = %config.proxy.target_url,
        listen_addr = %config.proxy.listen_addr,
        log_level = %config.observability.log_level,
        request_timeout_secs = config.timeouts.request_secs,
        max_body_bytes = config.limits.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.proxy.listen_addr).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(shutdown_on_signal(shutdown));

    let server = HttpServer::new(config)?;
    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
