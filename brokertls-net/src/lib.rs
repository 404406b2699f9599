//! Mutual-TLS client socket factories built from PEM material.
//!
//! The pipeline decodes a CA certificate, a client certificate and a client key, decrypts
//! the key when needed, seals trust and identity stores and assembles an OpenSSL client
//! context locked to one protocol version. Building never touches the network.

mod tls;

pub use tls::{
    BuildOptions, CancelToken, Certificate, ClientMaterialPaths, ClientPrivateKey,
    ContextOptions, EncryptedKeyPair, EncryptionScheme, IDENTITY_ALIAS, IdentityStore,
    KeyEncoding, Passphrase, PemObject, PlainKeyPair, SUPPORTED_LEGACY_CIPHERS,
    TRUST_ANCHOR_ALIAS, TlsError, TlsErrorKind, TlsProtocol, TlsSocketFactory, TrustStore,
    build_identity_store, build_socket_factory, build_socket_factory_from_pem,
    build_socket_factory_with, build_tls_socket_factory, build_trust_store, decode,
    decode_bytes, decrypt, ensure_provider, load_certificate, load_private_key,
    registered_provider, resolve,
};
