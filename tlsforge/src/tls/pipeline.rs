//! Orchestration of the record protection of one connection.

use std::collections::BTreeMap;
use std::mem;

use forge::codec::Reader;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::tls::enums::{CipherSuite, ContentType, ProtocolVersion};
use crate::tls::epoch::{Epoch, EpochRegistry};
use crate::tls::key_material::KeyMaterial;
use crate::tls::protector::AeadProtector;
use crate::tls::record::{mismatch, Artifact, Override, Record};
use crate::tls::suites::CipherSuiteParameters;

/// Which side's write keys protect a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Records we write.
    Local,
    /// Records the peer writes.
    Peer,
}

#[derive(Debug, Default)]
struct DirectionState {
    epochs: EpochRegistry,
    sequence_numbers: BTreeMap<Epoch, u64>,
}

/// Record protection of one connection attempt.
///
/// Holds one [`EpochRegistry`] per direction and a sequence counter per (direction, epoch).
/// Overrides registered through [`RecordPipeline::register_override`] apply to the next record
/// processed in either direction.
#[derive(Debug)]
pub struct RecordPipeline {
    config: Config,
    negotiated: Option<CipherSuiteParameters>,
    local: DirectionState,
    peer: DirectionState,
    pending: Vec<(Artifact, Override)>,
}

impl RecordPipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            negotiated: None,
            local: DirectionState::default(),
            peer: DirectionState::default(),
            pending: Vec::new(),
        }
    }

    /// Creates a pipeline which already negotiated the configured default suite and version.
    pub fn from_config(config: Config) -> Result<Self, Error> {
        let mut pipeline = Self::new(config);
        pipeline.negotiate(
            pipeline.config.default_cipher_suite,
            pipeline.config.default_version,
        )?;
        Ok(pipeline)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fixes the suite and version used by all following key schedule updates.
    pub fn negotiate(
        &mut self,
        suite: CipherSuite,
        version: ProtocolVersion,
    ) -> Result<&CipherSuiteParameters, Error> {
        let params = CipherSuiteParameters::resolve(suite, version)?;
        debug!("Negotiated {:?} with {:?}", suite, version);
        Ok(&*self.negotiated.insert(params))
    }

    pub fn parameters(&self) -> Option<&CipherSuiteParameters> {
        self.negotiated.as_ref()
    }

    /// Installs `keys` as the next epoch of `direction` and returns that epoch.
    pub fn on_key_schedule_update(
        &mut self,
        direction: Direction,
        keys: KeyMaterial,
    ) -> Result<Epoch, Error> {
        let params = self
            .negotiated
            .clone()
            .ok_or_else(|| Error::Computation("no cipher suite negotiated".to_string()))?;
        let protector = AeadProtector::new(params, keys, self.config.additional_padding)?;

        let state = self.state_mut(direction);
        let epoch = state.epochs.advance_epoch(Box::new(protector));
        state.sequence_numbers.insert(epoch, 0);

        debug!("{:?} records are now protected in epoch {}", direction, epoch);
        Ok(epoch)
    }

    pub fn epochs(&self, direction: Direction) -> &EpochRegistry {
        &self.state(direction).epochs
    }

    /// Queues an override for the next processed record.
    pub fn register_override(
        &mut self,
        artifact: Artifact,
        modification: impl Into<Override>,
    ) -> Result<(), Error> {
        let modification = modification.into();
        if modification.kind() != artifact.kind() {
            return Err(mismatch(artifact, &modification));
        }

        self.pending.push((artifact, modification));
        Ok(())
    }

    pub fn pending_overrides(&self) -> usize {
        self.pending.len()
    }

    /// Returns the sequence number to use for the next record of (direction, epoch) and
    /// advances the counter.
    pub fn next_sequence_number(&mut self, direction: Direction, epoch: Epoch) -> u64 {
        let counter = self
            .state_mut(direction)
            .sequence_numbers
            .entry(epoch)
            .or_insert(0);
        let sequence_number = *counter;
        *counter = counter.wrapping_add(1);
        sequence_number
    }

    /// Protects `record` with the protector of (direction, epoch) and returns the wire bytes.
    pub fn protect(
        &mut self,
        record: &mut Record,
        direction: Direction,
        epoch: Epoch,
    ) -> Result<Vec<u8>, Error> {
        self.apply_pending(record)?;

        self.state(direction)
            .epochs
            .protector_for_epoch(epoch)
            .seal(record)?;

        record.encode()
    }

    /// Reads one record from `wire` and opens it with the protector of (direction, epoch).
    pub fn unprotect(
        &mut self,
        wire: &[u8],
        direction: Direction,
        epoch: Epoch,
    ) -> Result<Record, Error> {
        let mut record = Record::read(&mut Reader::init(wire)).map_err(log_failure)?;
        record.sequence_number = self.next_sequence_number(direction, epoch);

        self.unprotect_record(&mut record, direction, epoch)?;
        Ok(record)
    }

    /// Opens `record` in place. On failure the record keeps every artifact computed so far.
    pub fn unprotect_record(
        &mut self,
        record: &mut Record,
        direction: Direction,
        epoch: Epoch,
    ) -> Result<(), Error> {
        self.apply_pending(record)?;

        self.state(direction)
            .epochs
            .protector_for_epoch(epoch)
            .open(record)
            .map_err(log_failure)
    }

    /// Protects `bytes` in the current local epoch with the next sequence number.
    pub fn send(&mut self, content_type: ContentType, bytes: &[u8]) -> Result<Vec<u8>, Error> {
        let epoch = self.local.epochs.current_epoch();
        let sequence_number = self.next_sequence_number(Direction::Local, epoch);

        let mut record = Record::new(content_type, self.record_version(), bytes.to_vec())
            .with_sequence_number(sequence_number);
        self.protect(&mut record, Direction::Local, epoch)
    }

    /// Opens one record of the peer in its current epoch.
    pub fn receive(&mut self, wire: &[u8]) -> Result<Record, Error> {
        let epoch = self.peer.epochs.current_epoch();
        self.unprotect(wire, Direction::Peer, epoch)
    }

    /// Version written into record headers. TLS 1.3 records claim to be TLS 1.2.
    pub fn record_version(&self) -> ProtocolVersion {
        let version = self
            .negotiated
            .as_ref()
            .map(|params| params.version)
            .unwrap_or(self.config.default_version);

        if version.is_tls13() {
            ProtocolVersion::TLSv1_2
        } else {
            version
        }
    }

    /// Moves the queued overrides onto `record`. If one is rejected, it and every override
    /// behind it stay queued for the next record.
    fn apply_pending(&mut self, record: &mut Record) -> Result<(), Error> {
        let mut pending = mem::take(&mut self.pending).into_iter();
        while let Some((artifact, modification)) = pending.next() {
            debug!("Applying override {:?} to {:?}", modification, artifact);
            if let Err(err) = record.register_override(artifact, modification.clone()) {
                self.pending.push((artifact, modification));
                self.pending.extend(pending);
                warn!(
                    "Override of {:?} rejected, {} overrides stay queued: {}",
                    artifact,
                    self.pending.len(),
                    err
                );
                return Err(err);
            }
        }
        Ok(())
    }

    fn state(&self, direction: Direction) -> &DirectionState {
        match direction {
            Direction::Local => &self.local,
            Direction::Peer => &self.peer,
        }
    }

    fn state_mut(&mut self, direction: Direction) -> &mut DirectionState {
        match direction {
            Direction::Local => &mut self.local,
            Direction::Peer => &mut self.peer,
        }
    }
}

fn log_failure(err: Error) -> Error {
    match &err {
        Error::Authentication(_) | Error::TruncatedRecord { .. } => {
            warn!("Unable to unprotect record: {}", err)
        }
        _ => {}
    }
    err
}

#[cfg(test)]
mod tests {
    use forge::computed::{bytes, integer, Modification};
    use test_log::test;

    use super::*;

    fn tls12_pipeline() -> RecordPipeline {
        let mut pipeline = RecordPipeline::from_config(Config::default()).unwrap();
        pipeline
            .on_key_schedule_update(Direction::Local, KeyMaterial::new(vec![1; 16], vec![2; 4]))
            .unwrap();
        pipeline
            .on_key_schedule_update(Direction::Peer, KeyMaterial::new(vec![1; 16], vec![2; 4]))
            .unwrap();
        pipeline
    }

    #[test]
    fn test_plaintext_epoch() {
        let mut pipeline = RecordPipeline::new(Config::default());

        let wire = pipeline.send(ContentType::Handshake, &[1, 2, 3]).unwrap();
        assert_eq!(wire, vec![0x16, 0x03, 0x03, 0x00, 0x03, 1, 2, 3]);

        let record = pipeline.receive(&wire).unwrap();
        assert_eq!(record.clean_bytes, vec![1, 2, 3]);
        assert_eq!(record.content_type, ContentType::Handshake);
    }

    #[test]
    fn test_key_update_requires_negotiation() {
        let mut pipeline = RecordPipeline::new(Config::default());

        let result =
            pipeline.on_key_schedule_update(Direction::Local, KeyMaterial::new(vec![], vec![]));

        assert!(matches!(result, Err(Error::Computation(_))));
        assert_eq!(pipeline.epochs(Direction::Local).len(), 1);
    }

    #[test]
    fn test_unsupported_suite_at_negotiation() {
        let mut pipeline = RecordPipeline::new(Config::default());

        assert_eq!(
            pipeline
                .negotiate(
                    CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256,
                    ProtocolVersion::TLSv1_2
                )
                .unwrap_err(),
            Error::UnsupportedSuite(CipherSuite::TLS_ECDHE_RSA_WITH_AES_128_CBC_SHA256)
        );
        assert!(pipeline.parameters().is_none());
    }

    #[test]
    fn test_directions_are_independent() {
        let mut pipeline = tls12_pipeline();
        pipeline
            .on_key_schedule_update(Direction::Local, KeyMaterial::new(vec![3; 16], vec![4; 4]))
            .unwrap();

        assert_eq!(pipeline.epochs(Direction::Local).current_epoch(), 2);
        assert_eq!(pipeline.epochs(Direction::Peer).current_epoch(), 1);
    }

    #[test]
    fn test_sequence_numbers_reset_per_epoch() {
        let mut pipeline = tls12_pipeline();

        assert_eq!(pipeline.next_sequence_number(Direction::Local, 1), 0);
        assert_eq!(pipeline.next_sequence_number(Direction::Local, 1), 1);
        assert_eq!(pipeline.next_sequence_number(Direction::Peer, 1), 0);

        let epoch = pipeline
            .on_key_schedule_update(Direction::Local, KeyMaterial::new(vec![1; 16], vec![2; 4]))
            .unwrap();
        assert_eq!(pipeline.next_sequence_number(Direction::Local, epoch), 0);
    }

    #[test]
    fn test_override_applies_to_next_record_only() {
        let mut pipeline = tls12_pipeline();
        pipeline
            .register_override(Artifact::RecordLength, integer::explicit(0xffffu16))
            .unwrap();
        assert_eq!(pipeline.pending_overrides(), 1);

        let first = pipeline.send(ContentType::ApplicationData, b"a").unwrap();
        let second = pipeline.send(ContentType::ApplicationData, b"a").unwrap();

        assert_eq!(&first[3..5], &[0xff, 0xff]);
        assert_eq!(&second[3..5], &[0x00, 0x19]);
        assert_eq!(pipeline.pending_overrides(), 0);
    }

    #[test]
    fn test_rejected_override_keeps_the_queue() {
        let mut pipeline = tls12_pipeline();
        pipeline
            .register_override(Artifact::Tag, bytes::xor(vec![0xff], 0))
            .unwrap();
        pipeline
            .register_override(Artifact::RecordLength, integer::explicit(7u16))
            .unwrap();
        pipeline
            .register_override(Artifact::Aad, bytes::truncate(0))
            .unwrap();

        let mut record = Record::new(ContentType::ApplicationData, ProtocolVersion::TLSv1_2, b"a".to_vec());
        record.computations.record_length.resolve_with(|| 1);
        let result = pipeline.protect(&mut record, Direction::Local, 1);

        assert!(matches!(result, Err(Error::Overlay(_))));
        assert!(record.computations.tag.has_modifications());
        assert!(!record.computations.aad.has_modifications());
        assert_eq!(pipeline.pending_overrides(), 2);

        let wire = pipeline.send(ContentType::ApplicationData, b"a").unwrap();
        assert_eq!(&wire[3..5], &[0x00, 0x07]);
        assert_eq!(pipeline.pending_overrides(), 0);
    }

    #[test]
    fn test_override_kind_is_checked_on_registration() {
        let mut pipeline = tls12_pipeline();

        let result = pipeline.register_override(Artifact::Tag, integer::explicit(1u16));

        assert!(matches!(result, Err(Error::Overlay(_))));
        assert_eq!(pipeline.pending_overrides(), 0);
    }

    #[test]
    fn test_content_type_override() {
        let mut pipeline = tls12_pipeline();
        pipeline
            .register_override(
                Artifact::ContentType,
                Modification::explicit(ContentType::Alert),
            )
            .unwrap();

        let wire = pipeline.send(ContentType::ApplicationData, b"abc").unwrap();

        assert_eq!(wire[0], 0x15);
    }

    #[test]
    fn test_corrupted_ciphertext_leaves_record_inspectable() {
        let mut pipeline = tls12_pipeline();
        let wire = pipeline.send(ContentType::ApplicationData, b"abc").unwrap();

        let mut record = Record::read(&mut Reader::init(&wire)).unwrap();
        pipeline
            .register_override(Artifact::Ciphertext, bytes::xor(vec![1], 0))
            .unwrap();
        let result = pipeline.unprotect_record(&mut record, Direction::Peer, 1);

        assert!(matches!(result, Err(Error::Authentication(_))));
        assert_eq!(record.computations.tag_valid.effective(), Some(&false));
        assert!(record.computations.ciphertext.is_overridden());
        assert!(record.clean_bytes.is_empty());
    }

    #[test]
    fn test_tls13_record_version() {
        let mut pipeline = RecordPipeline::new(Config::default());
        assert_eq!(pipeline.record_version(), ProtocolVersion::TLSv1_2);

        pipeline
            .negotiate(CipherSuite::TLS13_AES_128_GCM_SHA256, ProtocolVersion::TLSv1_3)
            .unwrap();
        assert_eq!(pipeline.record_version(), ProtocolVersion::TLSv1_2);

        pipeline
            .negotiate(
                CipherSuite::TLS_RSA_WITH_AES_128_GCM_SHA256,
                ProtocolVersion::TLSv1_1,
            )
            .unwrap();
        assert_eq!(pipeline.record_version(), ProtocolVersion::TLSv1_1);
    }
}
