//! Cryptographic primitives and encodings
//!
//! Mnemonic handling, derivation paths and key pairs, address and credential
//! encoding, and text envelopes for key files.

pub mod address;
pub mod envelope;
pub mod keys;
pub mod mnemonic;

pub use address::*;
pub use envelope::*;
pub use keys::*;
pub use mnemonic::*;
