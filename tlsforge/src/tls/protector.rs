//! Record protectors seal and open the payload of one record for one epoch.

use std::fmt;

use forge::codec::{encode_u64_sized, Codec};
use log::{debug, trace, warn};

use crate::error::Error;
use crate::tls::aead::{new_cipher, AeadCipher};
use crate::tls::enums::{ContentType, ProtocolVersion};
use crate::tls::key_material::KeyMaterial;
use crate::tls::record::{length_field, Record};
use crate::tls::suites::{CipherSuiteParameters, NONCE_LEN};

/// Upper bound of the TLS 1.3 padding appended to a plaintext.
pub const MAX_PADDING: usize = 65536;

pub trait RecordProtector: fmt::Debug {
    /// Protects `record.clean_bytes` into `record.protected_bytes`.
    fn seal(&self, record: &mut Record) -> Result<(), Error>;

    /// Recovers `record.clean_bytes` from `record.protected_bytes`.
    fn open(&self, record: &mut Record) -> Result<(), Error>;

    /// `None` for the null protector.
    fn parameters(&self) -> Option<&CipherSuiteParameters>;
}

/// The protector of epoch 0: records travel in the clear.
#[derive(Debug, Default)]
pub struct NullProtector;

impl RecordProtector for NullProtector {
    fn seal(&self, record: &mut Record) -> Result<(), Error> {
        let c = &record.computations;
        let content_type = record.content_type;
        c.content_type.resolve_with(|| content_type);
        c.record_length
            .effective_value(|| length_field(record.clean_bytes.len()))?;

        record.protected_bytes = record.clean_bytes.clone();
        Ok(())
    }

    fn open(&self, record: &mut Record) -> Result<(), Error> {
        let c = &record.computations;
        let content_type = record.content_type;
        c.content_type.resolve_with(|| content_type);
        c.record_length.effective_value(|| match record.length_on_wire {
            Some(length) => Ok(length),
            None => length_field(record.protected_bytes.len()),
        })?;

        record.clean_bytes = record.protected_bytes.clone();
        Ok(())
    }

    fn parameters(&self) -> Option<&CipherSuiteParameters> {
        None
    }
}

/// Protects records with the AEAD construction of the negotiated suite and version.
pub struct AeadProtector {
    params: CipherSuiteParameters,
    keys: KeyMaterial,
    cipher: Box<dyn AeadCipher>,
    additional_padding: i64,
}

impl AeadProtector {
    pub fn new(
        params: CipherSuiteParameters,
        keys: KeyMaterial,
        additional_padding: i64,
    ) -> Result<Self, Error> {
        let cipher = new_cipher(params.aead_algorithm, params.tag_len, keys.write_key())?;

        Ok(Self {
            params,
            keys,
            cipher,
            additional_padding,
        })
    }
}

impl fmt::Debug for AeadProtector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AeadProtector")
            .field("suite", &self.params.suite)
            .field("version", &self.params.version)
            .field("cipher", &self.cipher)
            .finish()
    }
}

impl RecordProtector for AeadProtector {
    fn seal(&self, record: &mut Record) -> Result<(), Error> {
        let params = &self.params;
        let tag_len = params.tag_len;
        let seq = record.sequence_number;
        let c = &record.computations;

        debug!(
            "Sealing record {} of type {:?} with {:?}",
            seq, record.content_type, params.suite
        );

        let (plaintext, wire_type, tls13_length) = if params.is_tls13() {
            let padding = c
                .padding
                .resolve_with(|| vec![0u8; clamp_padding(self.additional_padding)]);
            let padded = c
                .padded_plaintext
                .resolve_with(|| {
                    let mut padded = record.clean_bytes.clone();
                    record.content_type.encode(&mut padded);
                    padded.extend_from_slice(padding);
                    padded
                })
                .clone();
            let length = *c
                .record_length
                .effective_value(|| length_field(padded.len() + tag_len))?;
            let wire_type = *c
                .content_type
                .resolve_with(|| ContentType::ApplicationData);
            (padded, wire_type, Some(length))
        } else {
            let content_type = record.content_type;
            let wire_type = *c.content_type.resolve_with(|| content_type);
            (record.clean_bytes.clone(), wire_type, None)
        };

        let explicit_nonce = c
            .explicit_nonce
            .resolve_with(|| encode_u64_sized(seq, params.explicit_nonce_len))
            .clone();
        let salt = c.salt.resolve_with(|| self.keys.write_iv().to_vec());
        let nonce = c
            .nonce
            .effective_value(|| construct_nonce(params, salt, &explicit_nonce, seq))?;
        debug!("Sealing with nonce {}", hex::encode(nonce));

        let aad = c.aad.effective_value(|| -> Result<_, Error> {
            match tls13_length {
                Some(length) => Ok(additional_data_tls13(wire_type, record.version, length)),
                None => Ok(additional_data_tls12(
                    seq,
                    wire_type,
                    record.version,
                    length_field(plaintext.len())?,
                )),
            }
        })?;
        debug!("Sealing with AAD {}", hex::encode(aad));

        let sealed = self.cipher.seal(nonce, aad, &plaintext)?;
        if sealed.len() <= tag_len {
            return Err(Error::Crypto(format!(
                "sealed output of {} bytes does not exceed the {} byte tag",
                sealed.len(),
                tag_len
            )));
        }
        let (ciphertext, tag) = sealed.split_at(sealed.len() - tag_len);

        let ciphertext = c.ciphertext.resolve_with(|| ciphertext.to_vec());
        let tag = c.tag.resolve_with(|| tag.to_vec());
        c.tag_valid.resolve_with(|| true);

        let mut protected =
            Vec::with_capacity(explicit_nonce.len() + ciphertext.len() + tag.len());
        protected.extend_from_slice(&explicit_nonce);
        protected.extend_from_slice(ciphertext);
        protected.extend_from_slice(tag);

        c.record_length
            .effective_value(|| length_field(protected.len()))?;
        trace!("Protected payload {}", hex::encode(&protected));

        record.protected_bytes = protected;
        Ok(())
    }

    fn open(&self, record: &mut Record) -> Result<(), Error> {
        let params = &self.params;
        let tag_len = params.tag_len;
        let seq = record.sequence_number;

        debug!("Opening record {} with {:?}", seq, params.suite);

        let protected = &record.protected_bytes;
        let needed = params.explicit_nonce_len + tag_len;
        if protected.len() < needed {
            return Err(Error::TruncatedRecord {
                needed,
                available: protected.len(),
            });
        }
        let (explicit_nonce, rest) = protected.split_at(params.explicit_nonce_len);
        let (ciphertext, tag) = rest.split_at(rest.len() - tag_len);

        let c = &record.computations;
        let explicit_nonce = c.explicit_nonce.resolve_with(|| explicit_nonce.to_vec());
        let salt = c.salt.resolve_with(|| self.keys.write_iv().to_vec());
        let ciphertext = c.ciphertext.resolve_with(|| ciphertext.to_vec());

        let content_type = record.content_type;
        let wire_type = *c.content_type.resolve_with(|| content_type);
        let length = *c.record_length.effective_value(|| match record.length_on_wire {
            Some(length) => Ok(length),
            None => length_field(protected.len()),
        })?;

        let aad = c.aad.effective_value(|| -> Result<_, Error> {
            if params.is_tls13() {
                Ok(additional_data_tls13(wire_type, record.version, length))
            } else {
                Ok(additional_data_tls12(
                    seq,
                    wire_type,
                    record.version,
                    length_field(ciphertext.len())?,
                ))
            }
        })?;
        debug!("Opening with AAD {}", hex::encode(aad));

        let nonce = c
            .nonce
            .effective_value(|| construct_nonce(params, salt, explicit_nonce, seq))?;
        debug!("Opening with nonce {}", hex::encode(nonce));

        let tag = c.tag.resolve_with(|| tag.to_vec());
        let mut ciphertext_and_tag = ciphertext.clone();
        ciphertext_and_tag.extend_from_slice(tag);

        let plaintext = match self.cipher.open(nonce, aad, &ciphertext_and_tag) {
            Ok(plaintext) => {
                c.tag_valid.resolve_with(|| true);
                plaintext
            }
            Err(Error::Authentication(msg)) => {
                c.tag_valid.resolve_with(|| false);
                return Err(Error::Authentication(msg));
            }
            Err(err) => return Err(err),
        };

        if params.is_tls13() {
            let padded = c.padded_plaintext.resolve_with(|| plaintext).clone();
            let padding_len = padded.iter().rev().take_while(|b| **b == 0).count();

            if padding_len == padded.len() {
                warn!("Record contains only padding and no content type, keeping it as clean bytes");
                record.clean_bytes = padded;
                return Ok(());
            }

            let type_index = padded.len() - padding_len - 1;
            c.padding.resolve_with(|| vec![0u8; padding_len]);
            record.content_type = ContentType::from(padded[type_index]);
            record.clean_bytes = padded[..type_index].to_vec();
        } else {
            record.clean_bytes = plaintext;
        }

        Ok(())
    }

    fn parameters(&self) -> Option<&CipherSuiteParameters> {
        Some(&self.params)
    }
}

/// `salt || explicit nonce`, XORed with the left-padded sequence number for the XOR
/// construction of TLS 1.3 and ChaCha20-Poly1305.
pub fn construct_nonce(
    params: &CipherSuiteParameters,
    salt: &[u8],
    explicit_nonce: &[u8],
    sequence_number: u64,
) -> Result<Vec<u8>, Error> {
    let mut nonce = Vec::with_capacity(salt.len() + explicit_nonce.len());
    nonce.extend_from_slice(salt);
    nonce.extend_from_slice(explicit_nonce);

    if params.xor_nonce_construction {
        if nonce.len() != NONCE_LEN {
            return Err(Error::Computation(format!(
                "nonce of {} bytes cannot be combined with the {} byte sequence number",
                nonce.len(),
                NONCE_LEN
            )));
        }

        let padded_seq = encode_u64_sized(sequence_number, NONCE_LEN);
        nonce
            .iter_mut()
            .zip(padded_seq.iter())
            .for_each(|(n, s)| *n ^= s);
    }

    Ok(nonce)
}

/// `content type || record version || record length` (RFC 8446, Section 5.2)
pub fn additional_data_tls13(
    content_type: ContentType,
    version: ProtocolVersion,
    record_length: u16,
) -> Vec<u8> {
    let mut aad = Vec::with_capacity(5);
    content_type.encode(&mut aad);
    version.encode(&mut aad);
    record_length.encode(&mut aad);
    aad
}

/// `seq || content type || version || plaintext length` (RFC 5246, Section 6.2.3.3)
pub fn additional_data_tls12(
    sequence_number: u64,
    content_type: ContentType,
    version: ProtocolVersion,
    length: u16,
) -> Vec<u8> {
    let mut aad = Vec::with_capacity(13);
    sequence_number.encode(&mut aad);
    content_type.encode(&mut aad);
    version.encode(&mut aad);
    length.encode(&mut aad);
    aad
}

fn clamp_padding(additional_padding: i64) -> usize {
    if additional_padding < 0 {
        warn!("Additional padding {} is negative, using 0", additional_padding);
        0
    } else if additional_padding as u64 > MAX_PADDING as u64 {
        warn!(
            "Additional padding {} is too big, using {}",
            additional_padding, MAX_PADDING
        );
        MAX_PADDING
    } else {
        additional_padding as usize
    }
}

#[cfg(test)]
mod tests {
    use forge::computed::bytes;
    use test_log::test;

    use super::*;
    use crate::tls::enums::CipherSuite;
    use crate::tls::record::Artifact;

    fn protector(suite: CipherSuite, version: ProtocolVersion, padding: i64) -> AeadProtector {
        let params = CipherSuiteParameters::resolve(suite, version).unwrap();
        let keys = KeyMaterial::new(
            vec![0x11; params.key_len],
            vec![0x22; params.implicit_iv_len],
        );
        AeadProtector::new(params, keys, padding).unwrap()
    }

    #[test]
    fn test_additional_data_layout() {
        assert_eq!(
            additional_data_tls13(ContentType::ApplicationData, ProtocolVersion::TLSv1_2, 0x0102),
            vec![0x17, 0x03, 0x03, 0x01, 0x02]
        );
        assert_eq!(
            additional_data_tls12(5, ContentType::Handshake, ProtocolVersion::TLSv1_2, 16),
            vec![0, 0, 0, 0, 0, 0, 0, 5, 0x16, 0x03, 0x03, 0x00, 0x10]
        );
    }

    #[test]
    fn test_construct_nonce() {
        let gcm = CipherSuiteParameters::resolve(
            CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256,
            ProtocolVersion::TLSv1_2,
        )
        .unwrap();
        let chacha = CipherSuiteParameters::resolve(
            CipherSuite::TLS_DHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
            ProtocolVersion::TLSv1_2,
        )
        .unwrap();

        assert_eq!(
            construct_nonce(&gcm, &[1, 2, 3, 4], &[0, 0, 0, 0, 0, 0, 0, 9], 9).unwrap(),
            vec![1, 2, 3, 4, 0, 0, 0, 0, 0, 0, 0, 9]
        );
        assert_eq!(
            construct_nonce(&chacha, &[0xff; 12], &[], 1).unwrap(),
            vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe]
        );
        assert!(matches!(
            construct_nonce(&chacha, &[0xff; 4], &[], 1),
            Err(Error::Computation(_))
        ));
    }

    #[test]
    fn test_clamp_padding() {
        assert_eq!(clamp_padding(-3), 0);
        assert_eq!(clamp_padding(12), 12);
        assert_eq!(clamp_padding(1 << 20), MAX_PADDING);
    }

    #[test]
    fn test_tls13_padding_from_config() {
        let protector = protector(
            CipherSuite::TLS13_AES_128_GCM_SHA256,
            ProtocolVersion::TLSv1_3,
            3,
        );
        let mut record = Record::new(ContentType::Handshake, ProtocolVersion::TLSv1_2, b"hi".to_vec());

        protector.seal(&mut record).unwrap();

        let c = &record.computations;
        assert_eq!(c.padded_plaintext.effective(), Some(&vec![b'h', b'i', 0x16, 0, 0, 0]));
        assert_eq!(c.record_length.effective(), Some(&(6 + 16)));
        assert_eq!(c.content_type.effective(), Some(&ContentType::ApplicationData));
        assert_eq!(record.protected_bytes.len(), 22);

        let mut received = Record::new(ContentType::ApplicationData, ProtocolVersion::TLSv1_2, vec![]);
        received.protected_bytes = record.protected_bytes.clone();
        received.length_on_wire = Some(22);
        protector.open(&mut received).unwrap();

        assert_eq!(received.clean_bytes, b"hi");
        assert_eq!(received.content_type, ContentType::Handshake);
        assert_eq!(received.computations.padding.effective(), Some(&vec![0, 0, 0]));
    }

    #[test]
    fn test_oversized_record_length_is_a_computation_error() {
        let protector = protector(
            CipherSuite::TLS13_AES_128_GCM_SHA256,
            ProtocolVersion::TLSv1_3,
            MAX_PADDING as i64,
        );
        let mut record = Record::new(ContentType::Handshake, ProtocolVersion::TLSv1_2, b"x".to_vec());

        let result = protector.seal(&mut record);

        assert!(matches!(result, Err(Error::Computation(_))));
        assert!(record.protected_bytes.is_empty());
        assert!(!record.computations.record_length.is_resolved());
        assert_eq!(
            record.computations.padded_plaintext.effective().map(Vec::len),
            Some(1 + 1 + MAX_PADDING)
        );
    }

    #[test]
    fn test_all_zero_plaintext_is_kept_as_clean_bytes() {
        let protector = protector(
            CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
            ProtocolVersion::TLSv1_3,
            0,
        );
        let mut record = Record::new(ContentType::Unknown(0), ProtocolVersion::TLSv1_2, vec![0, 0]);
        protector.seal(&mut record).unwrap();

        let mut received = Record::new(ContentType::ApplicationData, ProtocolVersion::TLSv1_2, vec![]);
        received.protected_bytes = record.protected_bytes.clone();
        received.length_on_wire = Some(record.protected_bytes.len() as u16);
        protector.open(&mut received).unwrap();

        assert_eq!(received.clean_bytes, vec![0, 0, 0]);
        assert_eq!(received.content_type, ContentType::ApplicationData);
    }

    #[test]
    fn test_empty_legacy_plaintext_fails() {
        let protector = protector(
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CCM,
            ProtocolVersion::TLSv1_2,
            0,
        );
        let mut record = Record::new(ContentType::ApplicationData, ProtocolVersion::TLSv1_2, vec![]);

        assert!(matches!(protector.seal(&mut record), Err(Error::Crypto(_))));
    }

    #[test]
    fn test_truncated_payload() {
        let protector = protector(
            CipherSuite::TLS_ECDHE_ECDSA_WITH_AES_128_CCM_8,
            ProtocolVersion::TLSv1_2,
            0,
        );
        let mut record = Record::new(ContentType::ApplicationData, ProtocolVersion::TLSv1_2, vec![]);
        record.protected_bytes = vec![0; 15];

        assert_eq!(
            protector.open(&mut record),
            Err(Error::TruncatedRecord {
                needed: 16,
                available: 15
            })
        );
        assert_eq!(record.computations.tag_valid.effective(), None);
    }

    #[test]
    fn test_overridden_nonce_of_wrong_length_reaches_backend() {
        let protector = protector(
            CipherSuite::TLS_RSA_WITH_AES_256_GCM_SHA384,
            ProtocolVersion::TLSv1_2,
            0,
        );
        let mut record = Record::new(ContentType::ApplicationData, ProtocolVersion::TLSv1_2, b"x".to_vec());
        record
            .register_override(Artifact::ConstructedNonce, bytes::truncate(11).into())
            .unwrap();

        assert!(matches!(protector.seal(&mut record), Err(Error::Crypto(_))));
        assert_eq!(record.computations.nonce.original().map(Vec::len), Some(12));
    }

    #[test]
    fn test_null_protector_is_identity() {
        let mut record = Record::new(ContentType::Alert, ProtocolVersion::TLSv1_2, vec![2, 40]);

        NullProtector.seal(&mut record).unwrap();

        assert_eq!(record.protected_bytes, vec![2, 40]);
        assert_eq!(record.computations.record_length.effective(), Some(&2));
        assert_eq!(record.computations.content_type.effective(), Some(&ContentType::Alert));
        assert!(NullProtector.parameters().is_none());
    }
}
