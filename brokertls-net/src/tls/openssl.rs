use std::fmt;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::pin::Pin;

use openssl::ssl::{
    HandshakeError, Ssl, SslConnector, SslConnectorBuilder, SslMethod, SslOptions, SslStream,
    SslVerifyMode,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::provider::ensure_provider;
use super::store::{IdentityStore, TrustStore};
use super::types::{Passphrase, TlsError, TlsErrorKind, TlsProtocol};

#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub protocol: TlsProtocol,
    pub verify_hostname: bool,
    pub provider: Option<String>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            protocol: TlsProtocol::default(),
            verify_hostname: true,
            provider: None,
        }
    }
}

/// A configured TLS client context. Cloning shares the context; every socket it hands out
/// is independent.
#[derive(Clone)]
pub struct TlsSocketFactory {
    connector: SslConnector,
    protocol: TlsProtocol,
    verify_hostname: bool,
    ca_subject: String,
    client_subject: String,
}

pub fn build_tls_socket_factory(
    trust: TrustStore,
    identity: &IdentityStore,
    store_passphrase: &Passphrase,
    options: &ContextOptions,
) -> Result<TlsSocketFactory, TlsError> {
    ensure_provider(options.provider.as_deref())?;

    let mut builder = SslConnector::builder(SslMethod::tls_client())
        .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;

    lock_protocol(&mut builder, options.protocol)?;

    let ca_subject = trust.anchor().subject();
    builder.set_cert_store(trust.into_x509_store());
    builder.set_verify(SslVerifyMode::PEER);

    let unlocked = identity.unlock(store_passphrase)?;
    builder
        .set_certificate(&unlocked.cert)
        .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;
    builder
        .set_private_key(&unlocked.key)
        .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;
    builder.check_private_key().map_err(|err| {
        TlsError::new(
            TlsErrorKind::ContextInit,
            format!("client certificate and key do not match: {err}"),
        )
    })?;
    drop(unlocked);

    info!(
        protocol = %options.protocol,
        verify_hostname = options.verify_hostname,
        identity = identity.alias(),
        client = identity.subject(),
        "built TLS socket factory"
    );

    Ok(TlsSocketFactory {
        connector: builder.build(),
        protocol: options.protocol,
        verify_hostname: options.verify_hostname,
        ca_subject,
        client_subject: identity.subject().to_string(),
    })
}

fn lock_protocol(builder: &mut SslConnectorBuilder, protocol: TlsProtocol) -> Result<(), TlsError> {
    let version = Some(protocol.ssl_version());
    builder
        .set_min_proto_version(version)
        .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;
    builder
        .set_max_proto_version(version)
        .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;
    builder.set_options(SslOptions::NO_SSLV2 | SslOptions::NO_SSLV3);
    Ok(())
}

impl TlsSocketFactory {
    pub fn protocol(&self) -> TlsProtocol {
        self.protocol
    }

    pub fn verifies_hostname(&self) -> bool {
        self.verify_hostname
    }

    /// Subject of the CA the factory trusts, as loaded at build time.
    pub fn ca_subject(&self) -> &str {
        &self.ca_subject
    }

    /// Subject of the client certificate the factory presents.
    pub fn client_subject(&self) -> &str {
        &self.client_subject
    }

    /// A fresh, unconnected TLS session for `domain`, ready to be attached to a stream.
    pub fn new_socket(&self, domain: &str) -> Result<Ssl, TlsError> {
        let mut config = self
            .connector
            .configure()
            .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;
        if !self.verify_hostname {
            config.set_verify_hostname(false);
        }
        config
            .into_ssl(domain)
            .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))
    }

    pub fn connect<S: Read + Write>(&self, domain: &str, stream: S) -> Result<SslStream<S>, TlsError> {
        let ssl = self.new_socket(domain)?;
        let stream = ssl.connect(stream).map_err(|err| match err {
            HandshakeError::SetupFailure(err) => {
                TlsError::new(TlsErrorKind::ContextInit, err.to_string())
            }
            HandshakeError::Failure(mid) => TlsError::new(
                TlsErrorKind::Handshake,
                format!("{} ({})", mid.error(), mid.ssl().verify_result()),
            ),
            HandshakeError::WouldBlock(mid) => TlsError::new(
                TlsErrorKind::Handshake,
                format!("handshake interrupted: {}", mid.error()),
            ),
        })?;
        debug!(
            domain,
            version = stream.ssl().version_str(),
            "TLS handshake complete"
        );
        Ok(stream)
    }

    pub fn connect_tcp(&self, host: &str, port: u16) -> Result<SslStream<TcpStream>, TlsError> {
        let stream = TcpStream::connect((host, port))
            .map_err(|err| TlsError::new(TlsErrorKind::Io, format!("{host}:{port}: {err}")))?;
        self.connect(host, stream)
    }

    pub async fn connect_async<S>(
        &self,
        domain: &str,
        stream: S,
    ) -> Result<tokio_openssl::SslStream<S>, TlsError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let ssl = self.new_socket(domain)?;
        let mut tls = tokio_openssl::SslStream::new(ssl, stream)
            .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;
        Pin::new(&mut tls)
            .connect()
            .await
            .map_err(|err| TlsError::new(TlsErrorKind::Handshake, err.to_string()))?;
        debug!(
            domain,
            version = tls.ssl().version_str(),
            "TLS handshake complete"
        );
        Ok(tls)
    }
}

impl fmt::Debug for TlsSocketFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSocketFactory")
            .field("protocol", &self.protocol)
            .field("verify_hostname", &self.verify_hostname)
            .field("ca_subject", &self.ca_subject)
            .field("client_subject", &self.client_subject)
            .finish()
    }
}
