use log::{debug, warn};

use crate::tls::protector::{NullProtector, RecordProtector};

pub type Epoch = u32;

/// The protectors of one direction, indexed by epoch.
///
/// Epoch 0 is the null protector. Every key schedule change appends a protector, epochs are never
/// reused or removed.
#[derive(Debug)]
pub struct EpochRegistry {
    protectors: Vec<Box<dyn RecordProtector>>,
}

impl Default for EpochRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EpochRegistry {
    pub fn new() -> Self {
        Self {
            protectors: vec![Box::new(NullProtector)],
        }
    }

    pub fn current_epoch(&self) -> Epoch {
        (self.protectors.len() - 1) as Epoch
    }

    pub fn current_protector(&self) -> &dyn RecordProtector {
        self.protector_for_epoch(self.current_epoch())
    }

    /// Looks up the protector of `epoch`. Unknown epochs fall back to epoch 0.
    pub fn protector_for_epoch(&self, epoch: Epoch) -> &dyn RecordProtector {
        match self.protectors.get(epoch as usize) {
            Some(protector) => protector.as_ref(),
            None => {
                warn!(
                    "No protector for epoch {}, only {} known. Falling back to epoch 0",
                    epoch,
                    self.protectors.len()
                );
                self.protectors[0].as_ref()
            }
        }
    }

    pub fn advance_epoch(&mut self, protector: Box<dyn RecordProtector>) -> Epoch {
        self.protectors.push(protector);
        let epoch = self.current_epoch();
        debug!("Advanced to epoch {}", epoch);
        epoch
    }

    pub fn len(&self) -> usize {
        self.protectors.len()
    }

    /// Never true, epoch 0 always exists.
    pub fn is_empty(&self) -> bool {
        self.protectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::tls::enums::{CipherSuite, ProtocolVersion};
    use crate::tls::key_material::KeyMaterial;
    use crate::tls::protector::AeadProtector;
    use crate::tls::suites::CipherSuiteParameters;

    fn aead_protector() -> Box<dyn RecordProtector> {
        let params = CipherSuiteParameters::resolve(
            CipherSuite::TLS13_AES_128_GCM_SHA256,
            ProtocolVersion::TLSv1_3,
        )
        .unwrap();
        Box::new(AeadProtector::new(params, KeyMaterial::new(vec![0; 16], vec![0; 12]), 0).unwrap())
    }

    #[test]
    fn test_starts_with_null_epoch() {
        let registry = EpochRegistry::new();

        assert_eq!(registry.current_epoch(), 0);
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
        assert!(registry.current_protector().parameters().is_none());
    }

    #[test]
    fn test_advance_epoch() {
        let mut registry = EpochRegistry::new();

        assert_eq!(registry.advance_epoch(aead_protector()), 1);
        assert_eq!(registry.advance_epoch(aead_protector()), 2);

        assert_eq!(registry.current_epoch(), 2);
        assert!(registry.current_protector().parameters().is_some());
        assert!(registry.protector_for_epoch(0).parameters().is_none());
        assert!(registry.protector_for_epoch(1).parameters().is_some());
    }

    #[test]
    fn test_unknown_epoch_falls_back_to_null() {
        let mut registry = EpochRegistry::new();
        registry.advance_epoch(aead_protector());

        assert!(registry.protector_for_epoch(7).parameters().is_none());
        assert!(registry.protector_for_epoch(Epoch::MAX).parameters().is_none());
    }
}
