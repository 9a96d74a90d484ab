use std::fmt;

use ring::hkdf;

use crate::error::Error;
use crate::tls::enums::CipherSuite;
use crate::tls::suites::CipherSuiteParameters;

/// Write key and write IV of one direction in one epoch.
///
/// Supplied by whoever runs the key schedule. The record layer never mutates it; a key update
/// produces new key material and a new epoch.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    write_key: Vec<u8>,
    write_iv: Vec<u8>,
}

impl KeyMaterial {
    pub fn new(write_key: Vec<u8>, write_iv: Vec<u8>) -> Self {
        Self {
            write_key,
            write_iv,
        }
    }

    pub fn write_key(&self) -> &[u8] {
        &self.write_key
    }

    pub fn write_iv(&self) -> &[u8] {
        &self.write_iv
    }

    /// Derives the record keys from a TLS 1.3 traffic secret (RFC 8446, Section 7.3).
    pub fn from_tls13_secret(
        params: &CipherSuiteParameters,
        traffic_secret: &[u8],
    ) -> Result<Self, Error> {
        let algorithm = match params.suite {
            CipherSuite::TLS13_AES_256_GCM_SHA384 => hkdf::HKDF_SHA384,
            _ => hkdf::HKDF_SHA256,
        };
        let prk = hkdf::Prk::new_less_safe(algorithm, traffic_secret);

        Ok(Self {
            write_key: hkdf_expand_label(&prk, b"key", params.key_len)?,
            write_iv: hkdf_expand_label(&prk, b"iv", params.implicit_iv_len)?,
        })
    }

    /// Splits a TLS 1.2 key block (RFC 5246, Section 6.3) into the client and server key
    /// material. AEAD suites have no MAC keys, so the block starts with the client write key.
    pub fn from_tls12_key_block(
        params: &CipherSuiteParameters,
        key_block: &[u8],
    ) -> Result<(Self, Self), Error> {
        let key_len = params.key_len;
        let iv_len = params.implicit_iv_len;
        let needed = 2 * (key_len + iv_len);

        if key_block.len() < needed {
            return Err(Error::Computation(format!(
                "key block of {} bytes is too short for {:?}, needs {}",
                key_block.len(),
                params.suite,
                needed
            )));
        }

        let (client_key, rest) = key_block.split_at(key_len);
        let (server_key, rest) = rest.split_at(key_len);
        let (client_iv, rest) = rest.split_at(iv_len);
        let server_iv = &rest[..iv_len];

        Ok((
            Self::new(client_key.to_vec(), client_iv.to_vec()),
            Self::new(server_key.to_vec(), server_iv.to_vec()),
        ))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("write_key", &hex::encode(&self.write_key))
            .field("write_iv", &hex::encode(&self.write_iv))
            .finish()
    }
}

struct OkmLength(usize);

impl hkdf::KeyType for OkmLength {
    fn len(&self) -> usize {
        self.0
    }
}

fn hkdf_expand_label(prk: &hkdf::Prk, label: &[u8], len: usize) -> Result<Vec<u8>, Error> {
    const LABEL_PREFIX: &[u8] = b"tls13 ";

    let output_len = u16::to_be_bytes(len as u16);
    let label_len = u8::to_be_bytes((LABEL_PREFIX.len() + label.len()) as u8);
    let context_len = u8::to_be_bytes(0);

    let info = &[
        &output_len[..],
        &label_len[..],
        LABEL_PREFIX,
        label,
        &context_len[..],
    ];

    let mut out = vec![0u8; len];
    prk.expand(info, OkmLength(len))?.fill(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::tls::enums::ProtocolVersion;

    fn params(suite: CipherSuite, version: ProtocolVersion) -> CipherSuiteParameters {
        CipherSuiteParameters::resolve(suite, version).unwrap()
    }

    #[test]
    fn test_tls13_key_lengths() {
        let aes256 = params(CipherSuite::TLS13_AES_256_GCM_SHA384, ProtocolVersion::TLSv1_3);
        let keys = KeyMaterial::from_tls13_secret(&aes256, &[7u8; 48]).unwrap();

        assert_eq!(keys.write_key().len(), 32);
        assert_eq!(keys.write_iv().len(), 12);
    }

    #[test]
    fn test_tls13_derivation_is_deterministic() {
        let aes128 = params(CipherSuite::TLS13_AES_128_GCM_SHA256, ProtocolVersion::TLSv1_3);

        let a = KeyMaterial::from_tls13_secret(&aes128, &[1u8; 32]).unwrap();
        let b = KeyMaterial::from_tls13_secret(&aes128, &[1u8; 32]).unwrap();
        let c = KeyMaterial::from_tls13_secret(&aes128, &[2u8; 32]).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.write_key(), &a.write_iv()[..]);
    }

    #[test]
    fn test_tls12_key_block_layout() {
        let gcm = params(
            CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
            ProtocolVersion::TLSv1_2,
        );
        let block: Vec<u8> = (0u8..40).collect();

        let (client, server) = KeyMaterial::from_tls12_key_block(&gcm, &block).unwrap();

        assert_eq!(client.write_key(), &block[0..16]);
        assert_eq!(server.write_key(), &block[16..32]);
        assert_eq!(client.write_iv(), &block[32..36]);
        assert_eq!(server.write_iv(), &block[36..40]);
    }

    #[test]
    fn test_short_key_block_is_rejected() {
        let chacha = params(
            CipherSuite::TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
            ProtocolVersion::TLSv1_2,
        );

        let result = KeyMaterial::from_tls12_key_block(&chacha, &[0u8; 40]);

        assert!(matches!(result, Err(Error::Computation(_))));
    }

    #[test]
    fn test_debug_is_hex() {
        let keys = KeyMaterial::new(vec![0xab], vec![0x01, 0x02]);

        assert_eq!(
            format!("{:?}", keys),
            "KeyMaterial { write_key: \"ab\", write_iv: \"0102\" }"
        );
    }
}
