use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpStream;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use brokertls_net::{TlsSocketFactory, build_socket_factory_with};

use crate::config::ClientTlsConfig;
use crate::error::CliError;

mod config;
mod error;

#[derive(Debug, Parser)]
#[command(name = "brokertls-cli")]
struct Cli {
    #[arg(long)]
    config: PathBuf,
    /// Environment variable holding the client key passphrase.
    #[arg(long = "passphrase-env")]
    passphrase_env: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build the socket factory and report the loaded identity.
    Check,
    /// Build the socket factory and complete one handshake with a broker.
    Connect {
        #[arg(long)]
        host: String,
        #[arg(long)]
        port: u16,
        /// Name to verify the broker certificate against; defaults to `host`.
        #[arg(long)]
        domain: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();
    let cli = Cli::parse();
    run(cli).await.map_err(|err| err.to_string())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientTlsConfig::load(&cli.config)?;
    let factory = build_factory(&config, cli.passphrase_env.as_deref()).await?;

    match cli.command {
        Command::Check => {
            info!(
                protocol = %factory.protocol(),
                ca = factory.ca_subject(),
                client = factory.client_subject(),
                "socket factory ready"
            );
            if !factory.verifies_hostname() {
                warn!("broker hostname verification is disabled");
            }
        }
        Command::Connect { host, port, domain } => {
            let domain = domain.unwrap_or_else(|| host.clone());
            let stream = TcpStream::connect((host.as_str(), port)).await?;
            let tls = factory.connect_async(&domain, stream).await?;
            info!(
                broker = %format!("{host}:{port}"),
                version = tls.ssl().version_str(),
                cipher = tls.ssl().current_cipher().map(|cipher| cipher.name()).unwrap_or("none"),
                "mutual TLS handshake complete"
            );
        }
    }
    Ok(())
}

async fn build_factory(
    config: &ClientTlsConfig,
    passphrase_env: Option<&str>,
) -> Result<TlsSocketFactory, CliError> {
    let lookup = |name: &str| std::env::var(name).ok();
    let passphrase = config.passphrase(passphrase_env, lookup)?;
    let options = config.build_options(lookup)?;
    let paths = config.material_paths();

    let factory = tokio::task::spawn_blocking(move || {
        build_socket_factory_with(&paths, &passphrase, &options)
    })
    .await
    .map_err(|err| CliError::Io(std::io::Error::other(err)))??;
    Ok(factory)
}
