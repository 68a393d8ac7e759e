use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ring::digest::{digest, SHA256};
use tracing::info;
use wtransport::Identity;

// Dev certificate paths
const DEV_CERT_FILE: &str = "certs/cert.pem";
const DEV_KEY_FILE: &str = "certs/key.pem";

/// TLS identity for the WebTransport endpoint
pub struct TlsConfig {
    pub identity: Identity,
    /// Base64-encoded SHA-256 hash of the leaf certificate
    pub cert_hash: String,
}

impl TlsConfig {
    /// Load TLS configuration
    ///
    /// Uses TLS_CERT_PATH and TLS_KEY_PATH when both are set, otherwise the
    /// development pair under certs/.
    pub async fn load() -> Result<Self> {
        let (cert_path, key_path) = Self::resolve_paths()?;
        info!("Loading TLS certificate from {}", cert_path.display());
        Self::load_from_paths(&cert_path, &key_path).await
    }

    fn resolve_paths() -> Result<(PathBuf, PathBuf)> {
        if let (Ok(cert), Ok(key)) = (env::var("TLS_CERT_PATH"), env::var("TLS_KEY_PATH")) {
            return Ok((PathBuf::from(cert), PathBuf::from(key)));
        }

        if Path::new(DEV_CERT_FILE).exists() && Path::new(DEV_KEY_FILE).exists() {
            Ok((PathBuf::from(DEV_CERT_FILE), PathBuf::from(DEV_KEY_FILE)))
        } else {
            Err(anyhow!(
                "TLS certificate not found.\n\n\
                For development: place a self-signed pair at {} and {}.\n\
                For production: set TLS_CERT_PATH and TLS_KEY_PATH.",
                DEV_CERT_FILE,
                DEV_KEY_FILE
            ))
        }
    }

    async fn load_from_paths(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let identity = Identity::load_pemfiles(cert_path, key_path)
            .await
            .context("Failed to load certificate from PEM files")?;

        let config = Self::from_identity(identity);
        info!("Certificate hash: {}", config.cert_hash);
        info!(
            "Chrome flag: --ignore-certificate-errors-spki-list={}",
            config.cert_hash
        );

        Ok(config)
    }

    /// Wrap an already loaded identity and fingerprint its leaf certificate
    pub fn from_identity(identity: Identity) -> Self {
        let cert_hash = identity
            .certificate_chain()
            .as_slice()
            .first()
            .map(|cert| fingerprint(cert.der()))
            .unwrap_or_default();

        Self {
            identity,
            cert_hash,
        }
    }
}

/// Base64 SHA-256 digest of a DER certificate
pub fn fingerprint(der: &[u8]) -> String {
    STANDARD.encode(digest(&SHA256, der).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_of_empty_input() {
        assert_eq!(
            fingerprint(b""),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn test_fingerprint_is_32_bytes() {
        let hash = fingerprint(b"not really a certificate");
        assert_eq!(STANDARD.decode(hash).unwrap().len(), 32);
    }

    #[test]
    fn test_from_identity_hashes_leaf() {
        let identity = Identity::self_signed(["localhost"]).unwrap();
        let expected = fingerprint(identity.certificate_chain().as_slice()[0].der());

        let config = TlsConfig::from_identity(identity);
        assert_eq!(config.cert_hash, expected);
        assert_eq!(STANDARD.decode(&config.cert_hash).unwrap().len(), 32);
    }

    #[tokio::test]
    #[ignore] // Requires a certificate pair under certs/
    async fn test_load_cert() {
        let config = TlsConfig::load().await.unwrap();
        assert!(!config.cert_hash.is_empty());
    }
}
