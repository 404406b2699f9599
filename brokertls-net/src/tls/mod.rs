mod build;
mod cancel;
mod key;
mod openssl;
mod pem;
mod provider;
mod store;
mod types;

pub use build::{
    BuildOptions, build_socket_factory, build_socket_factory_from_pem, build_socket_factory_with,
};
pub use cancel::CancelToken;
pub use key::{SUPPORTED_LEGACY_CIPHERS, decrypt, resolve};
pub use self::pem::{
    Certificate, ClientPrivateKey, EncryptedKeyPair, EncryptionScheme, KeyEncoding, PemObject,
    PlainKeyPair, decode, decode_bytes, load_certificate, load_private_key,
};
pub use provider::{ensure_provider, registered_provider};
pub use self::openssl::{ContextOptions, TlsSocketFactory, build_tls_socket_factory};
pub use store::{
    IDENTITY_ALIAS, IdentityStore, TRUST_ANCHOR_ALIAS, TrustStore, build_identity_store,
    build_trust_store,
};
pub use types::{ClientMaterialPaths, Passphrase, TlsError, TlsErrorKind, TlsProtocol};
