use std::path::{Path, PathBuf};
use std::time::Duration;

use brokertls_net::{BuildOptions, ClientMaterialPaths, Passphrase, TlsProtocol};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientTlsConfig {
    pub ca_cert: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default)]
    pub passphrase_env: Option<String>,
    #[serde(default)]
    pub identity_passphrase_env: Option<String>,
    #[serde(default)]
    pub protocol: TlsProtocol,
    #[serde(default = "enabled")]
    pub verify_hostname: bool,
    #[serde(default = "enabled")]
    pub verify_key_match: bool,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub build_timeout_ms: Option<u64>,
}

fn enabled() -> bool {
    true
}

impl ClientTlsConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, base).map_err(|err| match err {
            CliError::ConfigParse { source, .. } => CliError::ConfigParse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })
    }

    /// Parses `text` and resolves relative certificate paths against `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, CliError> {
        let mut config: Self = toml::from_str(text).map_err(|source| CliError::ConfigParse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.ca_cert = resolve(base_dir, &config.ca_cert);
        config.client_cert = resolve(base_dir, &config.client_cert);
        config.client_key = resolve(base_dir, &config.client_key);
        Ok(config)
    }

    pub fn material_paths(&self) -> ClientMaterialPaths {
        ClientMaterialPaths::new(&self.ca_cert, &self.client_cert, &self.client_key)
    }

    /// Looks the key passphrase up in order: `env_override`, `passphrase_env`, then the
    /// literal `passphrase`. A key without any configured passphrase gets an empty one.
    pub fn passphrase<F>(&self, env_override: Option<&str>, lookup: F) -> Result<Passphrase, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = env_override.or(self.passphrase_env.as_deref()) {
            return lookup(name)
                .map(Passphrase::from)
                .ok_or_else(|| CliError::MissingEnv(name.to_string()));
        }
        Ok(self
            .passphrase
            .as_deref()
            .map(Passphrase::from)
            .unwrap_or_default())
    }

    pub fn build_options<F>(&self, lookup: F) -> Result<BuildOptions, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let identity_passphrase = match &self.identity_passphrase_env {
            Some(name) => Some(
                lookup(name)
                    .map(Passphrase::from)
                    .ok_or_else(|| CliError::MissingEnv(name.clone()))?,
            ),
            None => None,
        };

        let options = BuildOptions {
            protocol: self.protocol,
            verify_hostname: self.verify_hostname,
            verify_key_match: self.verify_key_match,
            identity_passphrase,
            provider: self.provider.clone(),
            ..BuildOptions::default()
        };
        Ok(match self.build_timeout_ms {
            Some(ms) => options.with_timeout(Duration::from_millis(ms)),
            None => options,
        })
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
