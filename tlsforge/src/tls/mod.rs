//! The TLS record layer: enums, suite parameters, key material, AEAD backends, record
//! protectors, epochs and the pipeline tying them together.

#[macro_use]
mod macros;

pub mod aead;
pub mod enums;
pub mod epoch;
pub mod key_material;
pub mod pipeline;
pub mod protector;
pub mod record;
pub mod suites;
