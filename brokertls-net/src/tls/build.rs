use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info_span};

use super::cancel::{BuildGuard, CancelToken};
use super::key::resolve;
use super::openssl::{ContextOptions, TlsSocketFactory, build_tls_socket_factory};
use super::pem::{Certificate, ClientPrivateKey, decode_bytes, decode_guarded};
use super::store::{build_identity_store, build_trust_store};
use super::types::{ClientMaterialPaths, Passphrase, TlsError, TlsProtocol};

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub protocol: TlsProtocol,
    /// Verifies the broker certificate against the connect domain. On by default, which is
    /// stricter than a socket factory without endpoint identification: a broker reached by an
    /// address missing from its SANs fails the handshake unless this is turned off.
    pub verify_hostname: bool,
    /// Checks that the client certificate belongs to the client key before sealing them.
    pub verify_key_match: bool,
    /// Protects the identity store; the key passphrase is reused when unset.
    pub identity_passphrase: Option<Passphrase>,
    /// OpenSSL provider to load on first use, e.g. `"default"` or `"fips"`.
    pub provider: Option<String>,
    pub deadline: Option<Instant>,
    pub cancel: Option<CancelToken>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            protocol: TlsProtocol::default(),
            verify_hostname: true,
            verify_key_match: true,
            identity_passphrase: None,
            provider: None,
            deadline: None,
            cancel: None,
        }
    }
}

impl BuildOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    fn guard(&self) -> BuildGuard {
        BuildGuard::new(self.deadline, self.cancel.clone())
    }

    fn context_options(&self) -> ContextOptions {
        ContextOptions {
            protocol: self.protocol,
            verify_hostname: self.verify_hostname,
            provider: self.provider.clone(),
        }
    }
}

/// Builds a TLS socket factory from PEM files using [`BuildOptions::default`].
pub fn build_socket_factory(
    ca_cert: impl AsRef<Path>,
    client_cert: impl AsRef<Path>,
    client_key: impl AsRef<Path>,
    passphrase: &Passphrase,
) -> Result<TlsSocketFactory, TlsError> {
    let paths = ClientMaterialPaths::new(
        ca_cert.as_ref(),
        client_cert.as_ref(),
        client_key.as_ref(),
    );
    build_socket_factory_with(&paths, passphrase, &BuildOptions::default())
}

pub fn build_socket_factory_with(
    paths: &ClientMaterialPaths,
    passphrase: &Passphrase,
    options: &BuildOptions,
) -> Result<TlsSocketFactory, TlsError> {
    let span = info_span!("build_socket_factory", ca = %paths.ca_cert.display());
    let _entered = span.enter();

    let guard = options.guard();
    let ca = decode_guarded(&paths.ca_cert, &guard)?.into_certificate()?;
    let cert = decode_guarded(&paths.client_cert, &guard)?.into_certificate()?;
    let key = decode_guarded(&paths.client_key, &guard)?.into_private_key()?;
    assemble(ca, cert, key, passphrase, options, &guard)
}

/// Same pipeline for PEM material already held in memory.
pub fn build_socket_factory_from_pem(
    ca_pem: &[u8],
    cert_pem: &[u8],
    key_pem: &[u8],
    passphrase: &Passphrase,
    options: &BuildOptions,
) -> Result<TlsSocketFactory, TlsError> {
    let span = info_span!("build_socket_factory_from_pem");
    let _entered = span.enter();

    let guard = options.guard();
    guard.check("decode")?;
    let ca = decode_bytes(ca_pem)?.into_certificate()?;
    let cert = decode_bytes(cert_pem)?.into_certificate()?;
    let key = decode_bytes(key_pem)?.into_private_key()?;
    assemble(ca, cert, key, passphrase, options, &guard)
}

fn assemble(
    ca: Certificate,
    cert: Certificate,
    key: ClientPrivateKey,
    passphrase: &Passphrase,
    options: &BuildOptions,
    guard: &BuildGuard,
) -> Result<TlsSocketFactory, TlsError> {
    debug!(ca = %ca.subject(), client = %cert.subject(), "decoded PEM material");

    guard.check("decrypt")?;
    let key = resolve(key, passphrase)?;
    guard.check("decrypt")?;

    let store_passphrase = options.identity_passphrase.as_ref().unwrap_or(passphrase);
    let trust = build_trust_store(ca)?;
    let identity = build_identity_store(&cert, key, store_passphrase, options.verify_key_match)?;

    build_tls_socket_factory(trust, &identity, store_passphrase, &options.context_options())
}
