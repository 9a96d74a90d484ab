//! Values which have a natural computation and an optional chain of overrides.
//!
//! Every field a protocol stack would normally compute deterministically (lengths, nonces, tags,
//! random values, protocol fields) is wrapped into a [`ComputedValue`]. The stack resolves the
//! value by handing over a producer of the natural value. The producer runs at most once, then
//! all registered [`Modification`]s are applied in registration order. Consumers only ever see
//! the *effective* value, while [`ComputedValue::original`] keeps returning what the stack
//! computed.
//!
//! ```
//! use forge::computed::{bytes, ComputedValue};
//!
//! let mut tag: ComputedValue<Vec<u8>> = ComputedValue::new();
//! tag.register(bytes::xor(vec![0xff], 0)).unwrap();
//!
//! let effective = tag.resolve_with(|| vec![0x0f, 0x01]).clone();
//!
//! assert_eq!(effective, vec![0xf0, 0x01]);
//! assert_eq!(tag.original(), Some(&vec![0x0f, 0x01]));
//! ```

use std::fmt;

use log::trace;
use once_cell::unsync::OnceCell;

use crate::error::Error;

mod modification;

pub use modification::{boolean, bytes, integer, Modification, WrappingInteger};

/// A value with a natural computation, an ordered override chain and a cached effective value.
///
/// Once resolved, the value is frozen: later resolutions return the cache and further overrides
/// are rejected.
#[derive(Clone)]
pub struct ComputedValue<T> {
    original: OnceCell<T>,
    effective: OnceCell<T>,
    modifications: Vec<Modification<T>>,
}

impl<T> Default for ComputedValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ComputedValue<T> {
    pub fn new() -> Self {
        Self {
            original: OnceCell::new(),
            effective: OnceCell::new(),
            modifications: Vec::new(),
        }
    }

    /// Builder variant of [`ComputedValue::register`] for values which are not resolved yet.
    pub fn with_override(mut self, modification: Modification<T>) -> Self {
        self.modifications.push(modification);
        self
    }

    /// Appends `modification` to the override chain.
    pub fn register(&mut self, modification: Modification<T>) -> Result<(), Error> {
        if self.is_resolved() {
            return Err(Error::Overlay(format!(
                "value already resolved, cannot apply {} modification",
                modification.name()
            )));
        }

        self.modifications.push(modification);
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.effective.get().is_some()
    }

    /// The value the stack computed, before any override. `None` until resolved.
    pub fn original(&self) -> Option<&T> {
        self.original.get()
    }

    /// The value emitted to consumers. `None` until resolved.
    pub fn effective(&self) -> Option<&T> {
        self.effective.get()
    }

    pub fn modifications(&self) -> &[Modification<T>] {
        &self.modifications
    }

    pub fn has_modifications(&self) -> bool {
        !self.modifications.is_empty()
    }
}

impl<T: Clone> ComputedValue<T> {
    /// Resolves the value with a fallible `producer` of the natural value.
    ///
    /// The producer only runs on the first call. Errors are returned without caching anything,
    /// so a later call may retry.
    pub fn effective_value<F, E>(&self, producer: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.effective.get_or_try_init(|| {
            let original = self.original.get_or_try_init(producer)?;
            Ok(self.apply_modifications(original))
        })
    }

    /// Infallible variant of [`ComputedValue::effective_value`].
    pub fn resolve_with<F>(&self, producer: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.effective.get_or_init(|| {
            let original = self.original.get_or_init(producer);
            self.apply_modifications(original)
        })
    }

    fn apply_modifications(&self, original: &T) -> T {
        self.modifications
            .iter()
            .fold(original.clone(), |value, modification| {
                trace!("Applying {} modification", modification.name());
                modification.apply(value)
            })
    }
}

impl<T: PartialEq> ComputedValue<T> {
    /// Whether the emitted value differs from the natural one.
    pub fn is_overridden(&self) -> bool {
        match (self.original.get(), self.effective.get()) {
            (Some(original), Some(effective)) => original != effective,
            _ => false,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ComputedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedValue")
            .field("original", &self.original.get())
            .field("effective", &self.effective.get())
            .field("modifications", &self.modifications)
            .finish()
    }
}
