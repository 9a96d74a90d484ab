//! Records and the artifacts computed while protecting them.

use std::fmt;

use forge::codec::{Codec, Reader};
use forge::computed::{ComputedValue, Modification};

use crate::error::Error;
use crate::tls::enums::{ContentType, ProtocolVersion};

/// `type(1) || version(2) || length(2)`
pub const HEADER_LEN: usize = 5;

/// Every intermediate value of the record protection.
///
/// Which of them get resolved depends on the protector: the null protector of epoch 0 only
/// resolves the record length and the wire content type.
#[derive(Debug, Clone, Default)]
pub struct RecordComputations {
    pub explicit_nonce: ComputedValue<Vec<u8>>,
    pub salt: ComputedValue<Vec<u8>>,
    pub nonce: ComputedValue<Vec<u8>>,
    pub aad: ComputedValue<Vec<u8>>,
    pub ciphertext: ComputedValue<Vec<u8>>,
    pub tag: ComputedValue<Vec<u8>>,
    pub tag_valid: ComputedValue<bool>,
    pub padding: ComputedValue<Vec<u8>>,
    /// `clean || content type || padding`, TLS 1.3 only.
    pub padded_plaintext: ComputedValue<Vec<u8>>,
    pub record_length: ComputedValue<u16>,
    /// Content type written into the record header.
    pub content_type: ComputedValue<ContentType>,
}

/// The closed set of artifacts an override can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    ExplicitNonce,
    Salt,
    ConstructedNonce,
    Aad,
    Ciphertext,
    Tag,
    TagValidity,
    Padding,
    PaddedPlaintext,
    RecordLength,
    ContentType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Bytes,
    Flag,
    Length,
    ContentType,
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::TagValidity => ArtifactKind::Flag,
            Artifact::RecordLength => ArtifactKind::Length,
            Artifact::ContentType => ArtifactKind::ContentType,
            _ => ArtifactKind::Bytes,
        }
    }
}

/// A modification of any artifact kind.
#[derive(Clone)]
pub enum Override {
    Bytes(Modification<Vec<u8>>),
    Flag(Modification<bool>),
    Length(Modification<u16>),
    ContentType(Modification<ContentType>),
}

impl Override {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Override::Bytes(_) => ArtifactKind::Bytes,
            Override::Flag(_) => ArtifactKind::Flag,
            Override::Length(_) => ArtifactKind::Length,
            Override::ContentType(_) => ArtifactKind::ContentType,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Override::Bytes(m) => m.name(),
            Override::Flag(m) => m.name(),
            Override::Length(m) => m.name(),
            Override::ContentType(m) => m.name(),
        }
    }
}

impl fmt::Debug for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind(), self.name())
    }
}

impl From<Modification<Vec<u8>>> for Override {
    fn from(m: Modification<Vec<u8>>) -> Self {
        Override::Bytes(m)
    }
}

impl From<Modification<bool>> for Override {
    fn from(m: Modification<bool>) -> Self {
        Override::Flag(m)
    }
}

impl From<Modification<u16>> for Override {
    fn from(m: Modification<u16>) -> Self {
        Override::Length(m)
    }
}

impl From<Modification<ContentType>> for Override {
    fn from(m: Modification<ContentType>) -> Self {
        Override::ContentType(m)
    }
}

/// A TLS record together with all values computed while protecting or unprotecting it.
#[derive(Debug, Clone)]
pub struct Record {
    pub sequence_number: u64,
    /// The true content type. For TLS 1.3 this travels inside the encrypted payload.
    pub content_type: ContentType,
    pub version: ProtocolVersion,
    pub clean_bytes: Vec<u8>,
    /// `explicit nonce || ciphertext || tag`
    pub protected_bytes: Vec<u8>,
    /// Length field of the header this record was read from.
    pub length_on_wire: Option<u16>,
    pub computations: RecordComputations,
}

impl Record {
    pub fn new(content_type: ContentType, version: ProtocolVersion, clean_bytes: Vec<u8>) -> Self {
        Self {
            sequence_number: 0,
            content_type,
            version,
            clean_bytes,
            protected_bytes: Vec::new(),
            length_on_wire: None,
            computations: RecordComputations::default(),
        }
    }

    pub fn with_sequence_number(mut self, sequence_number: u64) -> Self {
        self.sequence_number = sequence_number;
        self
    }

    /// Reads the header and the protected payload of one record.
    pub fn read(r: &mut Reader) -> Result<Self, Error> {
        if r.left() < HEADER_LEN {
            return Err(Error::TruncatedRecord {
                needed: HEADER_LEN,
                available: r.left(),
            });
        }

        let (content_type, version, len) = match (
            ContentType::read(r),
            ProtocolVersion::read(r),
            u16::read(r),
        ) {
            (Some(content_type), Some(version), Some(len)) => (content_type, version, len),
            _ => {
                return Err(Error::Computation(
                    "unable to read record header".to_string(),
                ))
            }
        };

        let available = r.left();
        let protected_bytes = r.take(len as usize).ok_or(Error::TruncatedRecord {
            needed: len as usize,
            available,
        })?;

        Ok(Self {
            sequence_number: 0,
            content_type,
            version,
            clean_bytes: Vec::new(),
            protected_bytes: protected_bytes.to_vec(),
            length_on_wire: Some(len),
            computations: RecordComputations::default(),
        })
    }

    /// Header with the effective length and wire content type, followed by the protected bytes.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let content_type = self.computations.content_type.effective().ok_or_else(|| {
            Error::Computation("wire content type is not resolved".to_string())
        })?;
        let length = self.computations.record_length.effective().ok_or_else(|| {
            Error::Computation("record length is not resolved".to_string())
        })?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + self.protected_bytes.len());
        content_type.encode(&mut bytes);
        self.version.encode(&mut bytes);
        length.encode(&mut bytes);
        bytes.extend_from_slice(&self.protected_bytes);
        Ok(bytes)
    }

    pub fn register_override(
        &mut self,
        artifact: Artifact,
        modification: Override,
    ) -> Result<(), Error> {
        let c = &mut self.computations;

        match (artifact, modification) {
            (Artifact::ExplicitNonce, Override::Bytes(m)) => c.explicit_nonce.register(m)?,
            (Artifact::Salt, Override::Bytes(m)) => c.salt.register(m)?,
            (Artifact::ConstructedNonce, Override::Bytes(m)) => c.nonce.register(m)?,
            (Artifact::Aad, Override::Bytes(m)) => c.aad.register(m)?,
            (Artifact::Ciphertext, Override::Bytes(m)) => c.ciphertext.register(m)?,
            (Artifact::Tag, Override::Bytes(m)) => c.tag.register(m)?,
            (Artifact::Padding, Override::Bytes(m)) => c.padding.register(m)?,
            (Artifact::PaddedPlaintext, Override::Bytes(m)) => c.padded_plaintext.register(m)?,
            (Artifact::TagValidity, Override::Flag(m)) => c.tag_valid.register(m)?,
            (Artifact::RecordLength, Override::Length(m)) => c.record_length.register(m)?,
            (Artifact::ContentType, Override::ContentType(m)) => c.content_type.register(m)?,
            (artifact, modification) => {
                return Err(mismatch(artifact, &modification));
            }
        }

        Ok(())
    }
}

pub(crate) fn mismatch(artifact: Artifact, modification: &Override) -> Error {
    Error::Overlay(format!(
        "{:?} expects a {:?} override, got {:?}",
        artifact,
        artifact.kind(),
        modification
    ))
}

/// Converts a computed payload length into the 16-bit length field.
///
/// Lengths which do not fit are a computation error instead of a truncated field.
pub fn length_field(len: usize) -> Result<u16, Error> {
    u16::try_from(len).map_err(|_| {
        Error::Computation(format!(
            "length {} does not fit into the 16-bit length field",
            len
        ))
    })
}
