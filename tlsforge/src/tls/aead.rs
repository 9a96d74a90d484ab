//! AEAD backends.
//!
//! AES-GCM and ChaCha20-Poly1305 are provided by `ring`, AES-CCM and AES-CCM_8 by the RustCrypto
//! `ccm` crate. Both are hidden behind [`AeadCipher`], which works on byte slices so that
//! overridden nonces and AAD of any length reach the backend, which then decides whether to
//! reject them.

use std::fmt;

use aes::{Aes128, Aes256};
use ccm::aead::consts::{U12, U16, U8};
use ccm::aead::generic_array::{typenum::Unsigned, GenericArray};
use ccm::aead::{Aead, AeadCore, KeyInit, Payload};
use ccm::Ccm;
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey};

use crate::error::Error;
use crate::tls::suites::{AeadAlgorithm, NONCE_LEN, SHORT_TAG_LEN, TAG_LEN};

pub trait AeadCipher: fmt::Debug {
    /// Returns `ciphertext || tag`.
    fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error>;

    /// Expects `ciphertext || tag`, returns the plaintext or [`Error::Authentication`].
    fn open(&self, nonce: &[u8], aad: &[u8], ciphertext_and_tag: &[u8])
        -> Result<Vec<u8>, Error>;

    fn tag_len(&self) -> usize;
}

/// Builds the backend for `algorithm` keyed with `key`.
pub fn new_cipher(
    algorithm: AeadAlgorithm,
    tag_len: usize,
    key: &[u8],
) -> Result<Box<dyn AeadCipher>, Error> {
    match (algorithm, tag_len) {
        (AeadAlgorithm::Aes128Gcm, TAG_LEN) => RingCipher::new(&aead::AES_128_GCM, key),
        (AeadAlgorithm::Aes256Gcm, TAG_LEN) => RingCipher::new(&aead::AES_256_GCM, key),
        (AeadAlgorithm::ChaCha20Poly1305, TAG_LEN) => {
            RingCipher::new(&aead::CHACHA20_POLY1305, key)
        }
        (AeadAlgorithm::Aes128Ccm, TAG_LEN) => {
            CcmCipher::<Ccm<Aes128, U16, U12>>::new("AES-128-CCM", key)
        }
        (AeadAlgorithm::Aes128Ccm, SHORT_TAG_LEN) => {
            CcmCipher::<Ccm<Aes128, U8, U12>>::new("AES-128-CCM_8", key)
        }
        (AeadAlgorithm::Aes256Ccm, TAG_LEN) => {
            CcmCipher::<Ccm<Aes256, U16, U12>>::new("AES-256-CCM", key)
        }
        (AeadAlgorithm::Aes256Ccm, SHORT_TAG_LEN) => {
            CcmCipher::<Ccm<Aes256, U8, U12>>::new("AES-256-CCM_8", key)
        }
        (algorithm, tag_len) => Err(Error::Crypto(format!(
            "{:?} has no variant with a {} byte tag",
            algorithm, tag_len
        ))),
    }
}

fn check_nonce_len(nonce: &[u8]) -> Result<(), Error> {
    if nonce.len() != NONCE_LEN {
        return Err(Error::Crypto(format!(
            "nonce must be {} bytes, got {}",
            NONCE_LEN,
            nonce.len()
        )));
    }
    Ok(())
}

pub struct RingCipher {
    key: LessSafeKey,
}

impl RingCipher {
    fn new(
        algorithm: &'static aead::Algorithm,
        key: &[u8],
    ) -> Result<Box<dyn AeadCipher>, Error> {
        let unbound = UnboundKey::new(algorithm, key).map_err(|_| {
            Error::Crypto(format!(
                "invalid key of {} bytes for {:?}",
                key.len(),
                algorithm
            ))
        })?;

        Ok(Box::new(Self {
            key: LessSafeKey::new(unbound),
        }))
    }
}

impl fmt::Debug for RingCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RingCipher")
            .field(self.key.algorithm())
            .finish()
    }
}

impl AeadCipher for RingCipher {
    fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        check_nonce_len(nonce)?;
        let nonce = Nonce::try_assume_unique_for_key(nonce)?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(nonce, Aad::from(aad), &mut in_out)?;
        Ok(in_out)
    }

    fn open(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext_and_tag: &[u8],
    ) -> Result<Vec<u8>, Error> {
        check_nonce_len(nonce)?;
        let nonce = Nonce::try_assume_unique_for_key(nonce)?;

        let mut in_out = ciphertext_and_tag.to_vec();
        let plaintext_len = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| Error::Authentication(format!("{:?}", self.key.algorithm())))?
            .len();
        in_out.truncate(plaintext_len);
        Ok(in_out)
    }

    fn tag_len(&self) -> usize {
        self.key.algorithm().tag_len()
    }
}

pub struct CcmCipher<C> {
    name: &'static str,
    cipher: C,
}

impl<C> CcmCipher<C>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12> + 'static,
{
    fn new(name: &'static str, key: &[u8]) -> Result<Box<dyn AeadCipher>, Error> {
        let cipher = C::new_from_slice(key).map_err(|_| {
            Error::Crypto(format!("invalid key of {} bytes for {}", key.len(), name))
        })?;

        Ok(Box::new(Self { name, cipher }))
    }
}

impl<C> fmt::Debug for CcmCipher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CcmCipher").field(&self.name).finish()
    }
}

impl<C> AeadCipher for CcmCipher<C>
where
    C: Aead + AeadCore<NonceSize = U12>,
{
    fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        check_nonce_len(nonce)?;

        self.cipher
            .encrypt(
                GenericArray::from_slice(nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| Error::Crypto(format!("{} refused to seal", self.name)))
    }

    fn open(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext_and_tag: &[u8],
    ) -> Result<Vec<u8>, Error> {
        check_nonce_len(nonce)?;

        self.cipher
            .decrypt(
                GenericArray::from_slice(nonce),
                Payload {
                    msg: ciphertext_and_tag,
                    aad,
                },
            )
            .map_err(|_| Error::Authentication(self.name.to_string()))
    }

    fn tag_len(&self) -> usize {
        <<C as AeadCore>::TagSize as Unsigned>::USIZE
    }
}
