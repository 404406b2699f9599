use brokertls_net::TlsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unable to read config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("environment variable {0} is not set")]
    MissingEnv(String),
    #[error(transparent)]
    Tls(#[from] TlsError),
    #[error("cli IO error: {0}")]
    Io(#[from] std::io::Error),
}
