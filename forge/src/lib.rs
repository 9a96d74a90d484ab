//! Protocol-agnostic building blocks of tlsforge.
//!
//! The crate offers the pieces which do not depend on TLS itself:
//!
//! * [`computed`] contains [`ComputedValue`](computed::ComputedValue), a value which is
//!   computed naturally by a protocol stack but can be forced to an attacker-chosen value before
//!   it ends up on the wire. The original computation always stays inspectable.
//! * [`codec`] contains a byte [`Reader`](codec::Reader) and the [`Codec`](codec::Codec) trait
//!   used to encode and decode wire structures.
//! * [`log`] contains the `log4rs` configurations used by binaries and test campaigns.

#![allow(unused_doc_comments)]

pub mod codec;
pub mod computed;
pub mod error;
pub mod log;
