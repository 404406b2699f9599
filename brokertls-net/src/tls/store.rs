use std::fmt;

use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use tracing::debug;

use super::pem::{Certificate, PlainKeyPair};
use super::types::{Passphrase, TlsError, TlsErrorKind};

pub const TRUST_ANCHOR_ALIAS: &str = "ca-certificate";
pub const IDENTITY_ALIAS: &str = "client-identity";

/// The CA certificate the server chain is verified against.
pub struct TrustStore {
    alias: &'static str,
    anchor: Certificate,
    store: X509Store,
}

impl TrustStore {
    pub fn alias(&self) -> &str {
        self.alias
    }

    pub fn anchor(&self) -> &Certificate {
        &self.anchor
    }

    pub(crate) fn into_x509_store(self) -> X509Store {
        self.store
    }
}

impl fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustStore")
            .field("alias", &self.alias)
            .field("anchor", &self.anchor)
            .finish()
    }
}

/// Client certificate and key sealed in a PKCS#12 container.
pub struct IdentityStore {
    alias: &'static str,
    subject: String,
    sealed: Vec<u8>,
}

pub(crate) struct UnlockedIdentity {
    pub(crate) cert: X509,
    pub(crate) key: PKey<Private>,
}

impl IdentityStore {
    pub fn alias(&self) -> &str {
        self.alias
    }

    /// Subject of the sealed client certificate.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub(crate) fn unlock(&self, passphrase: &Passphrase) -> Result<UnlockedIdentity, TlsError> {
        passphrase.ensure_c_compatible(TlsErrorKind::ContextInit)?;
        let parsed = Pkcs12::from_der(&self.sealed)
            .and_then(|pkcs12| pkcs12.parse2(passphrase.expose()))
            .map_err(|err| {
                TlsError::new(
                    TlsErrorKind::ContextInit,
                    format!("unable to open identity store: {err}"),
                )
            })?;
        match (parsed.cert, parsed.pkey) {
            (Some(cert), Some(key)) => Ok(UnlockedIdentity { cert, key }),
            _ => Err(TlsError::new(
                TlsErrorKind::ContextInit,
                "identity store has no certificate/key entry",
            )),
        }
    }
}

impl fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityStore")
            .field("alias", &self.alias)
            .field("subject", &self.subject)
            .field("sealed_len", &self.sealed.len())
            .finish()
    }
}

pub fn build_trust_store(ca: Certificate) -> Result<TrustStore, TlsError> {
    let mut builder = X509StoreBuilder::new()
        .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;
    builder
        .add_cert(ca.x509().clone())
        .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;
    debug!(alias = TRUST_ANCHOR_ALIAS, subject = %ca.subject(), "built trust store");
    Ok(TrustStore {
        alias: TRUST_ANCHOR_ALIAS,
        anchor: ca,
        store: builder.build(),
    })
}

/// Seals `cert` and `key` under `passphrase`.
///
/// With `verify_key_match` the certificate's public key must belong to `key`; otherwise a
/// mismatch only surfaces when the TLS context is assembled.
pub fn build_identity_store(
    cert: &Certificate,
    key: PlainKeyPair,
    passphrase: &Passphrase,
    verify_key_match: bool,
) -> Result<IdentityStore, TlsError> {
    passphrase.ensure_c_compatible(TlsErrorKind::ContextInit)?;
    if verify_key_match {
        let public = cert
            .x509()
            .public_key()
            .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;
        if !public.public_eq(key.key()) {
            return Err(TlsError::new(
                TlsErrorKind::ContextInit,
                format!(
                    "client certificate {} does not match the {} private key",
                    cert.subject(),
                    key.algorithm()
                ),
            ));
        }
    }

    let mut builder = Pkcs12::builder();
    builder.name(IDENTITY_ALIAS).pkey(key.key()).cert(cert.x509());
    let sealed = builder
        .build2(passphrase.expose())
        .and_then(|pkcs12| pkcs12.to_der())
        .map_err(|err| TlsError::new(TlsErrorKind::ContextInit, err.to_string()))?;

    debug!(alias = IDENTITY_ALIAS, subject = %cert.subject(), "built identity store");
    Ok(IdentityStore {
        alias: IDENTITY_ALIAS,
        subject: cert.subject(),
        sealed,
    })
}
