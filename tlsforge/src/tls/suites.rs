use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::tls::enums::{CipherSuite, ProtocolVersion};

/// Length of the nonce handed to every AEAD backend.
pub const NONCE_LEN: usize = 12;

pub const TAG_LEN: usize = 16;

/// Tag length of the CCM_8 suites (RFC 6655).
pub const SHORT_TAG_LEN: usize = 8;

/// The bulk AEAD algorithms a record can be protected with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AeadAlgorithm {
    Aes128Gcm,
    Aes256Gcm,
    Aes128Ccm,
    Aes256Ccm,
    ChaCha20Poly1305,
}

impl AeadAlgorithm {
    pub fn key_len(&self) -> usize {
        match self {
            AeadAlgorithm::Aes128Gcm | AeadAlgorithm::Aes128Ccm => 16,
            AeadAlgorithm::Aes256Gcm
            | AeadAlgorithm::Aes256Ccm
            | AeadAlgorithm::ChaCha20Poly1305 => 32,
        }
    }

    /// Length of the per-record nonce part sent on the wire before TLS 1.3.
    pub fn record_nonce_len(&self) -> usize {
        match self {
            AeadAlgorithm::ChaCha20Poly1305 => 0,
            _ => 8,
        }
    }

    /// Length of the implicit part of the nonce derived from the key block before TLS 1.3.
    pub fn fixed_iv_len(&self) -> usize {
        match self {
            AeadAlgorithm::ChaCha20Poly1305 => NONCE_LEN,
            _ => 4,
        }
    }
}

impl CipherSuite {
    /// The AEAD algorithm of the suite, `None` for CBC, stream, NULL and unknown suites.
    pub fn aead_algorithm(&self) -> Option<AeadAlgorithm> {
        use CipherSuite::*;

        match self {
            TLS13_AES_128_GCM_SHA256
            | TLS_RSA_WITH_AES_128_GCM_SHA256
            | TLS_DHE_RSA_WITH_AES_128_GCM_SHA256
            | TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256
            | TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256 => Some(AeadAlgorithm::Aes128Gcm),
            TLS13_AES_256_GCM_SHA384
            | TLS_RSA_WITH_AES_256_GCM_SHA384
            | TLS_DHE_RSA_WITH_AES_256_GCM_SHA384
            | TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384
            | TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384 => Some(AeadAlgorithm::Aes256Gcm),
            TLS13_AES_128_CCM_SHA256
            | TLS13_AES_128_CCM_8_SHA256
            | TLS_RSA_WITH_AES_128_CCM
            | TLS_RSA_WITH_AES_128_CCM_8
            | TLS_ECDHE_ECDSA_WITH_AES_128_CCM
            | TLS_ECDHE_ECDSA_WITH_AES_128_CCM_8 => Some(AeadAlgorithm::Aes128Ccm),
            TLS_RSA_WITH_AES_256_CCM
            | TLS_RSA_WITH_AES_256_CCM_8
            | TLS_ECDHE_ECDSA_WITH_AES_256_CCM
            | TLS_ECDHE_ECDSA_WITH_AES_256_CCM_8 => Some(AeadAlgorithm::Aes256Ccm),
            TLS13_CHACHA20_POLY1305_SHA256
            | TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256
            | TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256
            | TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256 => Some(AeadAlgorithm::ChaCha20Poly1305),
            _ => None,
        }
    }

    pub fn is_ccm_8(&self) -> bool {
        use CipherSuite::*;

        matches!(
            self,
            TLS13_AES_128_CCM_8_SHA256
                | TLS_RSA_WITH_AES_128_CCM_8
                | TLS_RSA_WITH_AES_256_CCM_8
                | TLS_ECDHE_ECDSA_WITH_AES_128_CCM_8
                | TLS_ECDHE_ECDSA_WITH_AES_256_CCM_8
        )
    }
}

/// Everything the record layer needs to know about a negotiated (suite, version) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherSuiteParameters {
    pub suite: CipherSuite,
    pub version: ProtocolVersion,
    pub aead_algorithm: AeadAlgorithm,
    pub tag_len: usize,
    pub explicit_nonce_len: usize,
    /// Length of the salt taken from the write IV.
    pub implicit_iv_len: usize,
    pub key_len: usize,
    /// Whether the nonce is XORed with the padded sequence number (RFC 7905, RFC 8446) instead
    /// of carrying an explicit nonce (RFC 5288).
    pub xor_nonce_construction: bool,
}

impl CipherSuiteParameters {
    pub fn resolve(suite: CipherSuite, version: ProtocolVersion) -> Result<Self, Error> {
        let aead_algorithm = suite
            .aead_algorithm()
            .ok_or(Error::UnsupportedSuite(suite))?;

        let tls13 = version.is_tls13();
        let chacha = aead_algorithm == AeadAlgorithm::ChaCha20Poly1305;

        Ok(Self {
            suite,
            version,
            aead_algorithm,
            tag_len: if suite.is_ccm_8() {
                SHORT_TAG_LEN
            } else {
                TAG_LEN
            },
            explicit_nonce_len: if tls13 {
                0
            } else {
                aead_algorithm.record_nonce_len()
            },
            implicit_iv_len: if tls13 {
                NONCE_LEN
            } else {
                aead_algorithm.fixed_iv_len()
            },
            key_len: aead_algorithm.key_len(),
            xor_nonce_construction: tls13 || chacha,
        })
    }

    pub fn is_short_tag(&self) -> bool {
        self.tag_len == SHORT_TAG_LEN
    }

    pub fn is_tls13(&self) -> bool {
        self.version.is_tls13()
    }

    /// Bytes a protected record is longer than its plaintext, not counting TLS 1.3 padding and
    /// the inner content type.
    pub fn size_increase(&self) -> usize {
        self.explicit_nonce_len + self.tag_len
    }
}
