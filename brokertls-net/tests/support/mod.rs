#![allow(dead_code)]

use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::path::Path;
use std::thread::JoinHandle;

use brokertls_net::ClientMaterialPaths;
use openssl::pkey::PKey;
use openssl::ssl::{SslAcceptor, SslMethod, SslVerifyMode, SslVersion};
use openssl::symm::Cipher;
use openssl::x509::X509;
use rcgen::{Certificate, CertificateParams, DistinguishedName, DnType, IsCa};
use tempfile::TempDir;

pub const PASSPHRASE: &str = "secret";

pub struct Leaf {
    pub cert_pem: String,
    pub key_pem: String,
}

pub struct Fixture {
    pub dir: TempDir,
    pub paths: ClientMaterialPaths,
    pub ca_pem: String,
    pub client: Leaf,
    pub server: Leaf,
}

pub fn generate_ca(common_name: &str) -> Certificate {
    let mut params = CertificateParams::new(Vec::new());
    params.is_ca = IsCa::Ca(rcgen::BasicConstraints::Unconstrained);
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::OrganizationName, "Brokertls Test");
    params.distinguished_name = dn;
    Certificate::from_params(params).unwrap()
}

pub fn generate_leaf(common_name: &str, sans: &[&str], ca: &Certificate) -> Leaf {
    let mut params =
        CertificateParams::new(sans.iter().map(|san| san.to_string()).collect::<Vec<_>>());
    params.is_ca = IsCa::NoCa;
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    params.distinguished_name = dn;

    let cert = Certificate::from_params(params).unwrap();
    Leaf {
        cert_pem: cert.serialize_pem_with_signer(ca).unwrap(),
        key_pem: cert.serialize_private_key_pem(),
    }
}

/// Re-encodes an rcgen PKCS#8 EC key as a legacy `Proc-Type: 4,ENCRYPTED` PEM.
pub fn encrypt_key(key_pem: &str, passphrase: &str) -> Vec<u8> {
    let key = PKey::private_key_from_pem(key_pem.as_bytes()).unwrap();
    key.ec_key()
        .unwrap()
        .private_key_to_pem_passphrase(Cipher::aes_256_cbc(), passphrase.as_bytes())
        .unwrap()
}

/// Writes `ca.pem`, `client.pem` and `client-key.pem` into a fresh directory. The key is
/// encrypted with `passphrase` when one is given.
pub fn write_fixture(passphrase: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let ca = generate_ca("Brokertls Test CA");
    let ca_pem = ca.serialize_pem().unwrap();
    let client = generate_leaf("broker-client", &["broker-client"], &ca);
    let server = generate_leaf("localhost", &["localhost"], &ca);

    let key_bytes = match passphrase {
        Some(passphrase) => encrypt_key(&client.key_pem, passphrase),
        None => client.key_pem.clone().into_bytes(),
    };

    let paths = ClientMaterialPaths::new(
        dir.path().join("ca.pem"),
        dir.path().join("client.pem"),
        dir.path().join("client-key.pem"),
    );
    fs::write(&paths.ca_cert, &ca_pem).unwrap();
    fs::write(&paths.client_cert, &client.cert_pem).unwrap();
    fs::write(&paths.client_key, key_bytes).unwrap();

    Fixture {
        dir,
        paths,
        ca_pem,
        client,
        server,
    }
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// A one-shot TLS server that demands a client certificate issued by the fixture CA.
/// The join handle yields the client's subject common name.
pub fn spawn_mtls_server(
    fixture: &Fixture,
    max_version: Option<SslVersion>,
) -> (SocketAddr, JoinHandle<Result<String, String>>) {
    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server()).unwrap();
    let cert = X509::from_pem(fixture.server.cert_pem.as_bytes()).unwrap();
    let key = PKey::private_key_from_pem(fixture.server.key_pem.as_bytes()).unwrap();
    builder.set_certificate(&cert).unwrap();
    builder.set_private_key(&key).unwrap();
    builder
        .cert_store_mut()
        .add_cert(X509::from_pem(fixture.ca_pem.as_bytes()).unwrap())
        .unwrap();
    builder.set_verify(SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT);
    builder.set_max_proto_version(max_version).unwrap();
    let acceptor = builder.build();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().map_err(|err| err.to_string())?;
        let mut tls = acceptor.accept(stream).map_err(|err| err.to_string())?;
        let peer = tls
            .ssl()
            .peer_certificate()
            .ok_or_else(|| "no client certificate".to_string())?;
        let common_name = peer
            .subject_name()
            .entries_by_nid(openssl::nid::Nid::COMMONNAME)
            .next()
            .and_then(|entry| entry.data().as_utf8().ok())
            .map(|value| value.to_string())
            .unwrap_or_default();
        let mut buf = [0u8; 4];
        tls.read_exact(&mut buf).map_err(|err| err.to_string())?;
        tls.write_all(b"pong").map_err(|err| err.to_string())?;
        Ok(common_name)
    });

    (addr, handle)
}
