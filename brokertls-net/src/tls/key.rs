use openssl::hash::MessageDigest;
use openssl::pkcs5::bytes_to_key;
use openssl::pkey::PKey;
use openssl::symm::{Cipher, decrypt as symm_decrypt};
use tracing::debug;
use zeroize::Zeroizing;

use super::pem::{ClientPrivateKey, EncryptedKeyPair, EncryptionScheme, PlainKeyPair};
use super::types::{Passphrase, TlsError, TlsErrorKind};

/// Ciphers accepted in a legacy `DEK-Info` header.
pub const SUPPORTED_LEGACY_CIPHERS: &[&str] =
    &["AES-128-CBC", "AES-192-CBC", "AES-256-CBC", "DES-EDE3-CBC"];

/// Returns the plain key, decrypting it first when it is stored encrypted.
pub fn resolve(key: ClientPrivateKey, passphrase: &Passphrase) -> Result<PlainKeyPair, TlsError> {
    match key {
        ClientPrivateKey::Plain(plain) => Ok(plain),
        ClientPrivateKey::Encrypted(encrypted) => decrypt(&encrypted, passphrase),
    }
}

pub fn decrypt(
    encrypted: &EncryptedKeyPair,
    passphrase: &Passphrase,
) -> Result<PlainKeyPair, TlsError> {
    passphrase.ensure_c_compatible(TlsErrorKind::Decryption)?;
    match &encrypted.scheme {
        EncryptionScheme::Legacy { cipher, iv } => {
            decrypt_legacy(encrypted, cipher, iv, passphrase)
        }
        EncryptionScheme::Pkcs8 => {
            let key = PKey::private_key_from_pkcs8_passphrase(
                &encrypted.ciphertext,
                passphrase.expose().as_bytes(),
            )
            .map_err(|err| TlsError::new(TlsErrorKind::Decryption, err.to_string()))?;
            debug!("decrypted PKCS#8 private key");
            Ok(PlainKeyPair::new(key))
        }
    }
}

fn decrypt_legacy(
    encrypted: &EncryptedKeyPair,
    cipher_name: &str,
    iv: &[u8],
    passphrase: &Passphrase,
) -> Result<PlainKeyPair, TlsError> {
    let cipher = legacy_cipher(cipher_name)?;
    if iv.len() != cipher.iv_len().unwrap_or(0) || iv.len() < 8 {
        return Err(TlsError::new(
            TlsErrorKind::Decryption,
            format!("IV length {} does not match {cipher_name}", iv.len()),
        ));
    }

    // EVP_BytesToKey with MD5, one round, salted with the first 8 IV bytes.
    let derived = bytes_to_key(
        cipher,
        MessageDigest::md5(),
        passphrase.expose().as_bytes(),
        Some(&iv[..8]),
        1,
    )
    .map_err(|err| TlsError::new(TlsErrorKind::Decryption, err.to_string()))?;
    let secret = Zeroizing::new(derived.key);

    let der = symm_decrypt(cipher, &secret, Some(iv), &encrypted.ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| {
            TlsError::new(
                TlsErrorKind::Decryption,
                "wrong passphrase or corrupted key data",
            )
        })?;

    let key = encrypted.encoding.parse_der(&der).map_err(|_| {
        TlsError::new(
            TlsErrorKind::Decryption,
            "decrypted data is not a valid private key; wrong passphrase?",
        )
    })?;
    debug!(cipher = cipher_name, "decrypted legacy private key");
    Ok(PlainKeyPair::new(key))
}

fn legacy_cipher(name: &str) -> Result<Cipher, TlsError> {
    match name {
        "AES-128-CBC" => Ok(Cipher::aes_128_cbc()),
        "AES-192-CBC" => Ok(Cipher::aes_192_cbc()),
        "AES-256-CBC" => Ok(Cipher::aes_256_cbc()),
        "DES-EDE3-CBC" => Ok(Cipher::des_ede3_cbc()),
        other => Err(TlsError::new(
            TlsErrorKind::UnsupportedAlgorithm,
            format!(
                "unsupported key cipher {other}, expected one of {}",
                SUPPORTED_LEGACY_CIPHERS.join(", ")
            ),
        )),
    }
}
