//! TLS record protection for deliberate protocol abuse.
//!
//! A [`RecordPipeline`](tls::pipeline::RecordPipeline) seals and opens TLS records with the AEAD
//! constructions of TLS 1.2 (RFC 5246, RFC 5288, RFC 7905, RFC 6655) and TLS 1.3 (RFC 8446).
//! Every intermediate artifact of the record protection (explicit nonce, salt, nonce, AAD,
//! ciphertext, tag, padding, record length, content type) is a
//! [`ComputedValue`](forge::computed::ComputedValue) and can be overridden before it ends up on
//! the wire:
//!
//! ```
//! use forge::computed::bytes;
//! use tlsforge::tls::enums::{CipherSuite, ContentType, ProtocolVersion};
//! use tlsforge::tls::key_material::KeyMaterial;
//! use tlsforge::tls::pipeline::{Direction, RecordPipeline};
//! use tlsforge::tls::record::Artifact;
//! use tlsforge::config::Config;
//!
//! let mut pipeline = RecordPipeline::new(Config::default());
//! pipeline
//!     .negotiate(
//!         CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
//!         ProtocolVersion::TLSv1_2,
//!     )
//!     .unwrap();
//! pipeline
//!     .on_key_schedule_update(Direction::Local, KeyMaterial::new(vec![1; 16], vec![2; 4]))
//!     .unwrap();
//!
//! // Corrupt the authentication tag of the next record.
//! pipeline
//!     .register_override(Artifact::Tag, bytes::xor(vec![0xff], 0))
//!     .unwrap();
//!
//! let wire = pipeline.send(ContentType::ApplicationData, b"hello").unwrap();
//! assert_eq!(wire.len(), 5 + 8 + 5 + 16);
//! ```

pub mod config;
pub mod error;
pub mod tls;
