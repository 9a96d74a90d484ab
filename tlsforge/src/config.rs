use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::tls::enums::{CipherSuite, ProtocolVersion};

/// Record-layer settings of a test run.
///
/// ```toml
/// additional_padding = 16
/// default_version = "TLSv1_3"
/// default_cipher_suite = "TLS13_AES_128_GCM_SHA256"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of zero bytes appended to TLS 1.3 plaintexts. Clamped to `[0, 65536]` when used.
    pub additional_padding: i64,
    pub default_version: ProtocolVersion,
    pub default_cipher_suite: CipherSuite,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            additional_padding: 0,
            default_version: ProtocolVersion::TLSv1_2,
            default_cipher_suite: CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use test_log::test;

    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = Config::from_toml("additional_padding = 7").unwrap();

        assert_eq!(config.additional_padding, 7);
        assert_eq!(config.default_version, ProtocolVersion::TLSv1_2);
        assert_eq!(
            config.default_cipher_suite,
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "default_version = \"TLSv1_3\"\ndefault_cipher_suite = \"TLS13_CHACHA20_POLY1305_SHA256\""
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.default_version, ProtocolVersion::TLSv1_3);
        assert_eq!(
            config.default_cipher_suite,
            CipherSuite::TLS13_CHACHA20_POLY1305_SHA256
        );
        assert_eq!(config.additional_padding, 0);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            Config::from_toml("additional_padding = \"lots\""),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_file("/nonexistent/tlsforge.toml"),
            Err(Error::Config(_))
        ));
    }
}
