use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use openssl::ssl::SslVersion;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Clone)]
pub struct ClientMaterialPaths {
    pub ca_cert: PathBuf,
    pub client_cert: PathBuf,
    pub client_key: PathBuf,
}

impl ClientMaterialPaths {
    pub fn new(
        ca_cert: impl Into<PathBuf>,
        client_cert: impl Into<PathBuf>,
        client_key: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ca_cert: ca_cert.into(),
            client_cert: client_cert.into(),
            client_key: client_key.into(),
        }
    }
}

/// Secret used to decrypt the client key and to protect the identity store.
///
/// The backing buffer is wiped on drop and the value never shows up in `Debug` output.
#[derive(Clone, Default)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// OpenSSL's C-string APIs cannot carry an interior NUL byte.
    pub(crate) fn ensure_c_compatible(&self, kind: TlsErrorKind) -> Result<(), TlsError> {
        if self.0.contains('\0') {
            return Err(TlsError::new(kind, "passphrase contains a NUL byte"));
        }
        Ok(())
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

/// The single protocol version a socket factory is locked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TlsProtocol {
    #[default]
    Tls12,
    Tls13,
}

impl TlsProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsProtocol::Tls12 => "TLSv1.2",
            TlsProtocol::Tls13 => "TLSv1.3",
        }
    }

    pub(crate) fn ssl_version(&self) -> SslVersion {
        match self {
            TlsProtocol::Tls12 => SslVersion::TLS1_2,
            TlsProtocol::Tls13 => SslVersion::TLS1_3,
        }
    }
}

impl fmt::Display for TlsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TlsProtocol {
    type Err = TlsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TLSV1.2" | "TLS1.2" => Ok(TlsProtocol::Tls12),
            "TLSV1.3" | "TLS1.3" => Ok(TlsProtocol::Tls13),
            _ => Err(TlsError::new(
                TlsErrorKind::UnsupportedAlgorithm,
                format!("unsupported protocol version: {value}"),
            )),
        }
    }
}

impl Serialize for TlsProtocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TlsProtocol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TlsError {
    pub kind: TlsErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsErrorKind {
    Io,
    Parse,
    Decryption,
    UnsupportedAlgorithm,
    ContextInit,
    TimedOut,
    Cancelled,
    Handshake,
}

impl TlsErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsErrorKind::Io => "io error",
            TlsErrorKind::Parse => "parse error",
            TlsErrorKind::Decryption => "decryption error",
            TlsErrorKind::UnsupportedAlgorithm => "unsupported algorithm",
            TlsErrorKind::ContextInit => "context initialization error",
            TlsErrorKind::TimedOut => "timed out",
            TlsErrorKind::Cancelled => "cancelled",
            TlsErrorKind::Handshake => "handshake error",
        }
    }
}

impl fmt::Display for TlsErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TlsError {
    pub fn new(kind: TlsErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_protocol_names() {
        assert_eq!("TLSv1.2".parse::<TlsProtocol>().unwrap(), TlsProtocol::Tls12);
        assert_eq!("tlsv1.3".parse::<TlsProtocol>().unwrap(), TlsProtocol::Tls13);
        let err = "SSLv3".parse::<TlsProtocol>().unwrap_err();
        assert_eq!(err.kind, TlsErrorKind::UnsupportedAlgorithm);
    }

    #[test]
    fn nul_in_passphrase_is_rejected_with_given_kind() {
        assert!(Passphrase::from("secret").ensure_c_compatible(TlsErrorKind::Decryption).is_ok());
        let err = Passphrase::from("se\0cret")
            .ensure_c_compatible(TlsErrorKind::ContextInit)
            .unwrap_err();
        assert_eq!(err.kind, TlsErrorKind::ContextInit);
    }

    #[test]
    fn default_protocol_is_tls12() {
        assert_eq!(TlsProtocol::default().to_string(), "TLSv1.2");
    }

    #[test]
    fn passphrase_debug_is_redacted() {
        let passphrase = Passphrase::from("secret");
        assert_eq!(format!("{passphrase:?}"), "Passphrase(<redacted>)");
        assert_eq!(passphrase.expose(), "secret");
    }

    #[test]
    fn error_display_includes_kind() {
        let err = TlsError::new(TlsErrorKind::Decryption, "bad decrypt");
        assert_eq!(err.to_string(), "decryption error: bad decrypt");
    }
}
